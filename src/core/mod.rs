pub mod calc;
mod config;
mod engine;
mod error;
mod ledger;
pub mod strategy;
mod summary;
mod types;

pub use config::{
    DEFAULT_MAX_ITERATIONS, PENALTY_FREE_AGE, ProjectionConfig, RothConversionConfig, TaxRules,
};
pub use engine::{ProjectionEngine, run_projection};
pub use error::{CalcError, ProjectionError};
pub use ledger::{
    BALANCE_TOLERANCE, DerivedTotals, IndividualLedger, LedgerFields,
    SOCIAL_SECURITY_TAXABLE_SHARE, YearLedger,
};
pub use summary::{YearSummary, summarize};
pub use types::{
    Category, Employment, FilingStatus, FinancialEntry, GrowthAssumptions, Person, Plan,
};
