use std::sync::Arc;

use tracing::debug;

use super::Strategy;
use crate::core::calc::IncrementalIncomeCalculator;
use crate::core::config::{RothConversionConfig, TaxRules};
use crate::core::error::CalcError;
use crate::core::ledger::{CENT, YearLedger};

/// Converts qualified assets to Roth up to the top of a target bracket.
#[derive(Debug, Clone)]
pub struct RothConversionOptimization {
    rules: Arc<TaxRules>,
    config: RothConversionConfig,
}

impl RothConversionOptimization {
    pub fn new(rules: Arc<TaxRules>, config: RothConversionConfig) -> Self {
        Self { rules, config }
    }

    /// Taxable income the household may reach through conversions.
    pub fn threshold(&self) -> Option<f64> {
        self.config.threshold.or_else(|| {
            self.rules
                .federal
                .bracket_ceiling(self.rules.filing_status, self.config.target_rate)
        })
    }
}

impl Strategy for RothConversionOptimization {
    fn name(&self) -> &'static str {
        "roth-conversion"
    }

    fn description(&self) -> &'static str {
        "Convert qualified assets to Roth while taxable income stays inside the target bracket"
    }

    fn optimize(
        &self,
        _previous: Option<&YearLedger>,
        current: &mut YearLedger,
    ) -> Result<(), CalcError> {
        if !self.config.enabled {
            return Ok(());
        }
        let Some(threshold) = self.threshold() else {
            debug!(
                rate = self.config.target_rate,
                "no federal bracket at target rate; skipping conversions"
            );
            return Ok(());
        };

        let rules = self.rules.as_ref();
        let status = rules.filing_status;
        let incremental = IncrementalIncomeCalculator::new(&rules.federal, rules.state.as_ref());
        let year = current.year();
        let mut participants = current.participants_mut();

        let mut taxable: f64 = participants.iter().map(|(_, f)| f.ordinary_income()).sum();
        let mut room = threshold - taxable;

        for (age, fields) in participants.iter_mut() {
            if room <= CENT {
                break;
            }
            if age.is_some_and(|age| age < self.config.min_age) {
                continue;
            }
            let amount = room.min(fields.qualified_assets.max(0.0));
            if amount <= 0.0 {
                continue;
            }

            let tax_cost = incremental.incremental_tax(taxable, amount, status)?;
            let from_surplus = tax_cost
                .min(fields.surplus_saved.max(0.0))
                .min(fields.non_qualified_assets.max(0.0));
            fields.surplus_saved -= from_surplus;
            fields.non_qualified_contribution -= from_surplus;
            fields.non_qualified_assets -= from_surplus;

            let unfunded = tax_cost - from_surplus;
            let net = amount - unfunded;
            fields.qualified_assets -= amount;
            fields.roth_conversion += amount;
            fields.roth_contribution += net;
            fields.roth_assets += net;

            debug!(year, amount, tax_cost, from_surplus, "roth conversion");
            taxable += amount;
            room -= amount;
        }
        drop(participants);

        current.resync();
        Ok(())
    }
}
