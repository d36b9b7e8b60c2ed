use serde::Serialize;

use super::calc::IncrementalIncomeCalculator;
use super::config::{ProjectionConfig, TaxRules};
use super::error::CalcError;
use super::ledger::YearLedger;

/// Household headline figures for one projected year.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSummary {
    pub year: i32,
    pub income: f64,
    pub social_security: f64,
    pub expenses: f64,
    pub withdrawals: f64,
    pub rmd_withdrawal: f64,
    pub roth_conversion: f64,
    pub contributions: f64,
    pub federal_tax: f64,
    pub state_tax: f64,
    pub capital_gains_tax: f64,
    pub payroll_tax: f64,
    pub total_taxes: f64,
    pub total_assets: f64,
    pub mortgage_balance: f64,
    pub net_worth: f64,
    pub deficit: f64,
    /// Extra gross ordinary income that would have covered the deficit.
    pub additional_income_needed: f64,
    pub iterations: u32,
    pub converged: bool,
}

pub fn summarize(
    ledgers: &[YearLedger],
    config: &ProjectionConfig,
) -> Result<Vec<YearSummary>, CalcError> {
    let rules = TaxRules::from_config(config)?;
    let incremental = IncrementalIncomeCalculator::new(&rules.federal, rules.state.as_ref());

    ledgers
        .iter()
        .map(|ledger| -> Result<YearSummary, CalcError> {
            let totals = ledger.totals();
            let additional_income_needed = if totals.deficit > 0.0 {
                incremental.additional_income_needed(
                    totals.ordinary_income(),
                    totals.deficit,
                    rules.filing_status,
                )?
            } else {
                0.0
            };
            Ok(YearSummary {
                year: ledger.year(),
                income: totals.income,
                social_security: totals.social_security,
                expenses: totals.expenses,
                withdrawals: totals.total_withdrawals(),
                rmd_withdrawal: totals.rmd_withdrawal,
                roth_conversion: totals.roth_conversion,
                contributions: totals.total_contributions(),
                federal_tax: totals.federal_tax,
                state_tax: totals.state_tax,
                capital_gains_tax: totals.capital_gains_tax,
                payroll_tax: totals.social_security_tax + totals.medicare_tax,
                total_taxes: totals.total_taxes(),
                total_assets: totals.total_assets(),
                mortgage_balance: totals.mortgage_balance,
                net_worth: totals.net_worth(),
                deficit: totals.deficit,
                additional_income_needed,
                iterations: ledger.iterations(),
                converged: ledger.converged(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calc::{IncomeTax, StateJurisdiction};
    use crate::core::types::{Category, FilingStatus, FinancialEntry, Person, Plan};
    use crate::core::{GrowthAssumptions, run_projection};

    fn config() -> ProjectionConfig {
        ProjectionConfig {
            filing_status: FilingStatus::Single,
            state: StateJurisdiction::NoIncomeTax,
            ..ProjectionConfig::default()
        }
    }

    fn plan(entries: Vec<FinancialEntry>) -> Plan {
        Plan {
            persons: vec![Person::new("Ana", 1980)],
            entries,
            assumptions: GrowthAssumptions::new(),
        }
    }

    #[test]
    fn balanced_year_needs_no_additional_income() {
        let plan = plan(vec![
            FinancialEntry::new(Some("Ana"), Category::Income, "salary", 80_000.0, 2026, 2026),
            FinancialEntry::new(Some("Ana"), Category::Expense, "living", 30_000.0, 2026, 2026),
        ]);
        let ledgers = run_projection(&plan, config()).expect("project");
        let summary = summarize(&ledgers, &config()).expect("summary");

        assert_eq!(summary.len(), 1);
        let year = &summary[0];
        assert_eq!(year.year, 2026);
        assert_eq!(year.deficit, 0.0);
        assert_eq!(year.additional_income_needed, 0.0);
        assert!((year.total_taxes - (year.federal_tax + year.payroll_tax)).abs() < 1e-9);
        assert!(year.converged);
    }

    #[test]
    fn deficit_year_reports_gross_income_that_closes_it() {
        let plan = plan(vec![FinancialEntry::new(
            Some("Ana"),
            Category::Expense,
            "living",
            20_000.0,
            2026,
            2026,
        )]);
        let ledgers = run_projection(&plan, config()).expect("project");
        let summary = summarize(&ledgers, &config()).expect("summary");

        let year = &summary[0];
        assert!((year.deficit - 20_000.0).abs() < 1e-6);
        let federal = crate::core::calc::BracketTax::federal();
        let gross = year.additional_income_needed;
        let net = gross - federal.tax(gross, FilingStatus::Single).expect("tax");
        assert!((net - 20_000.0).abs() < 0.05, "net {net}");
    }

    #[test]
    fn summary_serializes_with_camel_case_keys() {
        let plan = plan(vec![FinancialEntry::new(
            Some("Ana"),
            Category::Income,
            "salary",
            10_000.0,
            2026,
            2026,
        )]);
        let ledgers = run_projection(&plan, config()).expect("project");
        let summary = summarize(&ledgers, &config()).expect("summary");
        let json = serde_json::to_value(&summary[0]).expect("json");
        assert!(json.get("additionalIncomeNeeded").is_some());
        assert!(json.get("netWorth").is_some());
    }
}
