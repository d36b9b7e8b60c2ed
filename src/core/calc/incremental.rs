use crate::core::calc::tax::IncomeTax;
use crate::core::error::{CalcError, non_negative};
use crate::core::types::FilingStatus;

const MAX_ITERATIONS: u32 = 10;
const CENT: f64 = 0.01;

/// Gross-up across stacked federal and state brackets.
#[derive(Debug, Clone, Copy)]
pub struct IncrementalIncomeCalculator<'a> {
    federal: &'a dyn IncomeTax,
    state: &'a dyn IncomeTax,
}

impl<'a> IncrementalIncomeCalculator<'a> {
    pub fn new(federal: &'a dyn IncomeTax, state: &'a dyn IncomeTax) -> Self {
        Self { federal, state }
    }

    /// Combined federal and state tax owed on `amount` stacked on `base_income`.
    pub fn incremental_tax(
        &self,
        base_income: f64,
        amount: f64,
        status: FilingStatus,
    ) -> Result<f64, CalcError> {
        let before = self.combined_tax(base_income, status)?;
        let after = self.combined_tax(base_income + amount, status)?;
        Ok((after - before).max(0.0))
    }

    /// Additional gross income whose after-tax portion equals `target_net`.
    pub fn additional_income_needed(
        &self,
        base_income: f64,
        target_net: f64,
        status: FilingStatus,
    ) -> Result<f64, CalcError> {
        let base_income = non_negative("base income", base_income)?;
        let target_net = non_negative("target amount", target_net)?;
        if target_net == 0.0 {
            return Ok(0.0);
        }

        let combined_marginal = self.federal.marginal_rate(base_income, status)?
            + self.state.marginal_rate(base_income, status)?;
        let mut estimate = target_net / (1.0 - combined_marginal).max(CENT);

        for _ in 0..MAX_ITERATIONS {
            let tax = self.incremental_tax(base_income, estimate, status)?;
            let gap = target_net - (estimate - tax);
            if gap.abs() <= CENT {
                break;
            }
            let effective = if estimate > 0.0 { tax / estimate } else { 0.0 };
            estimate = (estimate + gap / (1.0 - effective).max(CENT)).max(0.0);
        }
        Ok(estimate)
    }

    fn combined_tax(&self, income: f64, status: FilingStatus) -> Result<f64, CalcError> {
        Ok(self.federal.tax(income, status)? + self.state.tax(income, status)?)
    }
}
