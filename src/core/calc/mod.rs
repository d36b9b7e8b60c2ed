//! Pure calculators the optimization strategies are built on.

mod capital_gains;
mod fica;
mod incremental;
mod mortgage;
mod rmd;
mod tax;

pub use capital_gains::{
    CapitalGainsCalculator, DEFAULT_CAPITAL_GAINS_RATE, DEFAULT_COST_BASIS_FRACTION,
};
pub use fica::{
    ADDITIONAL_MEDICARE_RATE, DEFAULT_SOCIAL_SECURITY_WAGE_BASE, FicaCalculator, FicaConfig,
};
pub use incremental::IncrementalIncomeCalculator;
pub use mortgage::{AmortizationRow, MortgageCalculator};
pub use rmd::{RmdCalculator, UNIFORM_TABLE_MAX_AGE, UNIFORM_TABLE_MIN_AGE};
pub use tax::{BracketSchedule, BracketTax, IncomeTax, NoIncomeTax, StateJurisdiction};
