use tracing::debug;

use super::Strategy;
use crate::core::calc::RmdCalculator;
use crate::core::error::CalcError;
use crate::core::ledger::YearLedger;

/// Takes each person's required minimum distribution from qualified assets.
#[derive(Debug, Clone, Copy, Default)]
pub struct RmdOptimization {
    calculator: RmdCalculator,
}

impl RmdOptimization {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for RmdOptimization {
    fn name(&self) -> &'static str {
        "rmd"
    }

    fn description(&self) -> &'static str {
        "Withdraw required minimum distributions based on the prior year's qualified balance"
    }

    fn optimize(
        &self,
        previous: Option<&YearLedger>,
        current: &mut YearLedger,
    ) -> Result<(), CalcError> {
        let year = current.year();
        for individual in current.individuals_mut() {
            let prior_balance = previous
                .and_then(|ledger| ledger.individual(individual.name()))
                .map(|prior| prior.fields().qualified_assets)
                .unwrap_or(0.0);
            let required = if prior_balance > 0.0 {
                self.calculator.required_for_person(
                    individual.birth_year(),
                    individual.age(),
                    prior_balance,
                )?
            } else {
                0.0
            };

            let fields = individual.fields_mut();
            // Undo an earlier pass so re-running stays idempotent.
            fields.qualified_assets += fields.rmd_withdrawal;
            let rmd = required.min(fields.qualified_assets.max(0.0));
            fields.qualified_assets -= rmd;
            fields.rmd_withdrawal = rmd;
            if rmd > 0.0 {
                debug!(year, person = individual.name(), rmd, "required minimum distribution");
            }
        }
        current.resync();
        Ok(())
    }
}
