use std::sync::Arc;

use tracing::{debug, warn};

use super::{
    ExpenseManagement, RmdOptimization, RothConversionOptimization, Strategy, TaxCalculation,
};
use crate::core::config::{ProjectionConfig, TaxRules};
use crate::core::error::CalcError;
use crate::core::ledger::YearLedger;

/// Runs RMD, tax, expense and Roth passes until the year's cash balances.
///
/// Order per year:
/// 1. required minimum distributions;
/// 2. alternate taxes and expense funding until the cash identity holds;
/// 3. Roth conversions, only when nothing was left unfunded;
/// 4. the same tax/expense loop again to settle the conversion tax.
#[derive(Debug, Clone)]
pub struct CompositeStrategy {
    rmd: RmdOptimization,
    tax: TaxCalculation,
    expense: ExpenseManagement,
    roth: RothConversionOptimization,
    max_iterations: u32,
    tolerance: f64,
}

impl CompositeStrategy {
    pub fn new(config: &ProjectionConfig) -> Result<Self, CalcError> {
        let rules = Arc::new(TaxRules::from_config(config)?);
        Ok(Self {
            rmd: RmdOptimization::new(),
            tax: TaxCalculation::new(Arc::clone(&rules)),
            expense: ExpenseManagement::new(config.qualified_withdrawal_min_age),
            roth: RothConversionOptimization::new(rules, config.roth),
            max_iterations: config.max_iterations.max(1),
            tolerance: config.balance_tolerance,
        })
    }

    /// Strategies in the order they first run.
    pub fn strategies(&self) -> [&dyn Strategy; 4] {
        [&self.rmd, &self.tax, &self.expense, &self.roth]
    }

    /// Alternates tax and expense passes; returns `(passes, converged)`.
    fn balance(
        &self,
        previous: Option<&YearLedger>,
        current: &mut YearLedger,
    ) -> Result<(u32, bool), CalcError> {
        for pass in 1..=self.max_iterations {
            self.tax.optimize(previous, current)?;
            if current.totals().cash_flow_gap().abs() <= self.tolerance {
                return Ok((pass, true));
            }
            self.expense.optimize(previous, current)?;
        }
        let settled = current.totals().cash_flow_gap().abs() <= self.tolerance;
        Ok((self.max_iterations, settled))
    }
}

impl Strategy for CompositeStrategy {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn description(&self) -> &'static str {
        "Apply RMD, tax, expense and Roth conversion strategies until the year balances"
    }

    fn optimize(
        &self,
        previous: Option<&YearLedger>,
        current: &mut YearLedger,
    ) -> Result<(), CalcError> {
        self.rmd.optimize(previous, current)?;
        let (mut iterations, mut converged) = self.balance(previous, current)?;

        if current.deficit() <= 0.0 {
            self.roth.optimize(previous, current)?;
        }
        let (more, settled) = self.balance(previous, current)?;
        iterations += more;
        converged &= settled;

        current.record_convergence(iterations, converged);
        if converged {
            debug!(year = current.year(), iterations, "year balanced");
        } else {
            warn!(
                year = current.year(),
                iterations,
                gap = current.totals().cash_flow_gap(),
                "cash flow did not converge; keeping last state"
            );
        }
        Ok(())
    }
}
