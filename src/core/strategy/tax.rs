use std::sync::Arc;

use tracing::debug;

use super::Strategy;
use crate::core::calc::IncomeTax;
use crate::core::config::TaxRules;
use crate::core::error::CalcError;
use crate::core::ledger::YearLedger;

/// Recomputes the year's federal, state, capital gains and payroll taxes.
#[derive(Debug, Clone)]
pub struct TaxCalculation {
    rules: Arc<TaxRules>,
}

impl TaxCalculation {
    pub fn new(rules: Arc<TaxRules>) -> Self {
        Self { rules }
    }
}

impl Strategy for TaxCalculation {
    fn name(&self) -> &'static str {
        "tax"
    }

    fn description(&self) -> &'static str {
        "Compute income, capital gains and FICA taxes from the year's income and withdrawals"
    }

    fn optimize(
        &self,
        _previous: Option<&YearLedger>,
        current: &mut YearLedger,
    ) -> Result<(), CalcError> {
        let rules = self.rules.as_ref();
        let status = rules.filing_status;
        let year = current.year();
        let mut participants = current.participants_mut();

        let ordinary: f64 = participants.iter().map(|(_, f)| f.ordinary_income()).sum();
        let wages: f64 = participants.iter().map(|(_, f)| f.income).sum();

        let federal = rules.federal.tax(ordinary, status)?;
        let state = rules.state.tax(ordinary, status)?;
        let state_gain_rate = rules.state.marginal_rate(ordinary, status)?;
        let additional_medicare = rules.fica.additional_medicare_tax(wages, status)?;

        let equal_share = 1.0 / participants.len() as f64;
        for (_, fields) in participants.iter_mut() {
            let income_share = if ordinary > 0.0 {
                fields.ordinary_income() / ordinary
            } else {
                equal_share
            };
            let wage_share = if wages > 0.0 { fields.income / wages } else { 0.0 };
            let gain = rules.capital_gains.gain(fields.non_qualified_withdrawal)?;

            fields.federal_tax = federal * income_share;
            fields.state_tax = state * income_share + gain * state_gain_rate;
            fields.capital_gains_tax = rules.capital_gains.tax(fields.non_qualified_withdrawal)?;
            fields.social_security_tax =
                rules.fica.social_security_tax(fields.income, rules.employment)?;
            fields.medicare_tax = rules.fica.medicare_tax(fields.income, rules.employment)?
                + additional_medicare * wage_share;
        }
        drop(participants);

        current.resync();
        debug!(
            year,
            ordinary,
            total_taxes = current.total_taxes(),
            "taxes recomputed"
        );
        Ok(())
    }
}
