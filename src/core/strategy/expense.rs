use tracing::debug;

use super::Strategy;
use crate::core::config::PENALTY_FREE_AGE;
use crate::core::error::CalcError;
use crate::core::ledger::{LedgerFields, YearLedger};

/// Funding sources for a shortfall, in the order they are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    NonQualified,
    Qualified,
    Roth,
    Cash,
}

const DRAW_ORDER: [Source; 4] = [
    Source::NonQualified,
    Source::Qualified,
    Source::Roth,
    Source::Cash,
];

impl Source {
    fn slots(self, fields: &mut LedgerFields) -> (&mut f64, &mut f64) {
        match self {
            Source::NonQualified => (
                &mut fields.non_qualified_assets,
                &mut fields.non_qualified_withdrawal,
            ),
            Source::Qualified => (&mut fields.qualified_assets, &mut fields.qualified_withdrawal),
            Source::Roth => (&mut fields.roth_assets, &mut fields.roth_withdrawal),
            Source::Cash => (&mut fields.cash_assets, &mut fields.cash_withdrawal),
        }
    }
}

/// Saves a surplus into taxable assets or funds a shortfall from savings.
#[derive(Debug, Clone, Copy)]
pub struct ExpenseManagement {
    qualified_min_age: u32,
}

impl ExpenseManagement {
    pub fn new(qualified_min_age: u32) -> Self {
        Self { qualified_min_age }
    }

    fn eligible(&self, source: Source, age: Option<u32>) -> bool {
        match (source, age) {
            (Source::Qualified, Some(age)) => age >= self.qualified_min_age,
            _ => true,
        }
    }

    fn save_surplus(&self, current: &mut YearLedger, surplus: f64) {
        let mut participants = current.participants_mut();

        let deficit: f64 = participants.iter().map(|(_, f)| f.deficit).sum();
        let absorbed = surplus.min(deficit);
        if absorbed > 0.0 {
            let keep = 1.0 - absorbed / deficit;
            for (_, fields) in participants.iter_mut() {
                fields.deficit *= keep;
            }
        }

        let share = (surplus - absorbed) / participants.len() as f64;
        if share <= 0.0 {
            return;
        }
        for (_, fields) in participants.iter_mut() {
            fields.non_qualified_assets += share;
            fields.non_qualified_contribution += share;
            fields.surplus_saved += share;
        }
    }

    fn fund_shortfall(&self, current: &mut YearLedger, shortfall: f64) -> f64 {
        let mut participants = current.participants_mut();
        let mut remaining = shortfall;
        for source in DRAW_ORDER {
            for (age, fields) in participants.iter_mut() {
                if remaining <= 0.0 {
                    break;
                }
                if !self.eligible(source, *age) {
                    continue;
                }
                let (balance, withdrawal) = source.slots(fields);
                let take = remaining.min(balance.max(0.0));
                *balance -= take;
                *withdrawal += take;
                remaining -= take;
            }
        }

        if remaining > 0.0 {
            let share = remaining / participants.len() as f64;
            for (_, fields) in participants.iter_mut() {
                fields.deficit += share;
            }
        }
        remaining.max(0.0)
    }
}

impl Default for ExpenseManagement {
    fn default() -> Self {
        Self::new(PENALTY_FREE_AGE)
    }
}

impl Strategy for ExpenseManagement {
    fn name(&self) -> &'static str {
        "expense"
    }

    fn description(&self) -> &'static str {
        "Save surplus cash to taxable assets or cover a shortfall from savings in tax order"
    }

    fn optimize(
        &self,
        _previous: Option<&YearLedger>,
        current: &mut YearLedger,
    ) -> Result<(), CalcError> {
        // The gap already nets off any deficit recorded by an earlier pass.
        let gap = current.totals().cash_flow_gap();
        if gap > 0.0 {
            self.save_surplus(current, gap);
        } else if gap < 0.0 {
            let unmet = self.fund_shortfall(current, -gap);
            if unmet > 0.0 {
                debug!(year = current.year(), unmet, "shortfall exceeds available savings");
            }
        }
        current.resync();
        Ok(())
    }
}
