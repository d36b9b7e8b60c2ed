//! Per-year optimization passes over a [`YearLedger`].
//!
//! Every strategy mutates the current year's ledger in place and leaves the
//! household totals re-derived from the per-person ledgers before returning.

mod composite;
mod expense;
mod rmd;
mod roth;
mod tax;

use std::fmt::Debug;

pub use composite::CompositeStrategy;
pub use expense::ExpenseManagement;
pub use rmd::RmdOptimization;
pub use roth::RothConversionOptimization;
pub use tax::TaxCalculation;

use super::error::CalcError;
use super::ledger::YearLedger;

pub trait Strategy: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Adjust `current` given the closed ledger of the year before, if any.
    fn optimize(
        &self,
        previous: Option<&YearLedger>,
        current: &mut YearLedger,
    ) -> Result<(), CalcError>;
}
