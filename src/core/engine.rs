use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use tracing::{debug, info};

use super::calc::MortgageCalculator;
use super::config::ProjectionConfig;
use super::error::ProjectionError;
use super::ledger::{LedgerFields, YearLedger};
use super::strategy::{CompositeStrategy, Strategy};
use super::types::{Category, FinancialEntry, GrowthAssumptions, Person, Plan};

/// Calendar years an entry may start or end in.
const SUPPORTED_YEARS: RangeInclusive<i32> = 1900..=2200;

/// Walks a plan year by year and balances each year with the composite strategy.
#[derive(Debug, Clone)]
pub struct ProjectionEngine {
    config: ProjectionConfig,
    strategy: CompositeStrategy,
    mortgage: MortgageCalculator,
}

impl ProjectionEngine {
    pub fn new(config: ProjectionConfig) -> Result<Self, ProjectionError> {
        config.validate()?;
        let strategy = CompositeStrategy::new(&config)?;
        Ok(Self {
            config,
            strategy,
            mortgage: MortgageCalculator,
        })
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    pub fn project_plan(&self, plan: &Plan) -> Result<Vec<YearLedger>, ProjectionError> {
        self.project(&plan.entries, &plan.person_map(), &plan.assumptions)
    }

    /// One balanced ledger per year from the earliest entry start to the
    /// latest entry end, inclusive. No entries means no years.
    pub fn project(
        &self,
        entries: &[FinancialEntry],
        persons: &BTreeMap<String, Person>,
        assumptions: &GrowthAssumptions,
    ) -> Result<Vec<YearLedger>, ProjectionError> {
        validate_entries(entries, persons)?;
        let Some((first, last)) = year_span(entries) else {
            return Ok(Vec::new());
        };
        info!(
            first_year = first,
            last_year = last,
            persons = persons.len(),
            entries = entries.len(),
            "starting projection"
        );

        let mut ledgers: Vec<YearLedger> = Vec::with_capacity((last - first + 1) as usize);
        for year in first..=last {
            let mut current = self.seed_year(year, entries, persons, assumptions)?;
            let previous = ledgers.last();
            self.strategy.optimize(previous, &mut current)?;

            if let Some(detail) = current.consistency_violation(previous) {
                if self.config.validate {
                    return Err(ProjectionError::Inconsistent { year, detail });
                }
                debug!(year, %detail, "ledger inconsistency");
            }
            debug!(
                year,
                iterations = current.iterations(),
                net_worth = current.net_worth(),
                deficit = current.deficit(),
                "year projected"
            );
            ledgers.push(current);
        }
        Ok(ledgers)
    }

    /// Fresh ledger for `year` holding the compounded value of every active entry.
    fn seed_year(
        &self,
        year: i32,
        entries: &[FinancialEntry],
        persons: &BTreeMap<String, Person>,
        assumptions: &GrowthAssumptions,
    ) -> Result<YearLedger, ProjectionError> {
        let mut ledger = YearLedger::new(year, persons.values());

        for entry in entries.iter().filter(|entry| entry.is_active(year)) {
            let amount = match entry.category {
                Category::MortgagePrincipal => self.mortgage_balance(entry, year, assumptions)?,
                category => {
                    assumptions.compound(category, entry.value, years_since(entry.start_year, year))
                }
            };
            credit(&mut ledger, entry.owner.as_deref(), amount, |fields, amount| {
                seed_field(fields, entry.category, amount)
            });
        }

        let extra_payments = entries.iter().filter(|entry| {
            entry.category == Category::MortgageExtraPayment && entry.start_year <= year
        });
        for entry in extra_payments {
            let paid: f64 = (entry.start_year..=entry.end_year.min(year))
                .map(|y| {
                    let years = years_since(entry.start_year, y);
                    assumptions.compound(entry.category, entry.value, years)
                })
                .sum();
            credit(&mut ledger, entry.owner.as_deref(), paid, |fields, paid| {
                fields.mortgage_balance -= paid
            });
        }

        for (_, fields) in ledger.participants_mut() {
            fields.mortgage_balance = fields.mortgage_balance.max(0.0);
        }
        ledger.resync();
        Ok(ledger)
    }

    /// Closing balance after this year's payment, amortized over the entry's span.
    fn mortgage_balance(
        &self,
        entry: &FinancialEntry,
        year: i32,
        assumptions: &GrowthAssumptions,
    ) -> Result<f64, ProjectionError> {
        let periods = years_since(entry.start_year, entry.end_year) + 1;
        let paid = years_since(entry.start_year, year) + 1;
        let balance = self.mortgage.remaining_balance(
            entry.value,
            assumptions.rate(Category::MortgagePrincipal),
            periods,
            paid,
        )?;
        Ok(balance)
    }
}

pub fn run_projection(
    plan: &Plan,
    config: ProjectionConfig,
) -> Result<Vec<YearLedger>, ProjectionError> {
    ProjectionEngine::new(config)?.project_plan(plan)
}

fn validate_entries(
    entries: &[FinancialEntry],
    persons: &BTreeMap<String, Person>,
) -> Result<(), ProjectionError> {
    if !entries.is_empty() && persons.is_empty() {
        return Err(ProjectionError::NoPersons);
    }
    for entry in entries {
        let invalid = |reason: String| ProjectionError::InvalidEntry {
            description: entry.description.clone(),
            reason,
        };
        if !entry.value.is_finite() || entry.value < 0.0 {
            return Err(invalid(format!(
                "value must be a finite, non-negative amount (got {})",
                entry.value
            )));
        }
        for year in [entry.start_year, entry.end_year] {
            if !SUPPORTED_YEARS.contains(&year) {
                return Err(invalid(format!(
                    "year {year} is outside {}..={}",
                    SUPPORTED_YEARS.start(),
                    SUPPORTED_YEARS.end()
                )));
            }
        }
        if entry.start_year > entry.end_year {
            return Err(invalid(format!(
                "start year {} is after end year {}",
                entry.start_year, entry.end_year
            )));
        }
        if let Some(owner) = &entry.owner {
            if !persons.contains_key(owner) {
                return Err(ProjectionError::UnknownOwner {
                    description: entry.description.clone(),
                    owner: owner.clone(),
                });
            }
        }
    }
    Ok(())
}

fn year_span(entries: &[FinancialEntry]) -> Option<(i32, i32)> {
    let first = entries.iter().map(|entry| entry.start_year).min()?;
    let last = entries.iter().map(|entry| entry.end_year).max()?;
    Some((first, last))
}

fn years_since(start: i32, year: i32) -> u32 {
    u32::try_from(year.saturating_sub(start)).unwrap_or(0)
}

/// Applies `amount` to the owner, or in equal shares to everyone when unowned.
fn credit(
    ledger: &mut YearLedger,
    owner: Option<&str>,
    amount: f64,
    apply: impl Fn(&mut LedgerFields, f64),
) {
    match owner {
        Some(name) => {
            if let Some(individual) = ledger.individual_mut(name) {
                apply(individual.fields_mut(), amount);
            }
        }
        None => {
            let mut participants = ledger.participants_mut();
            let share = amount / participants.len() as f64;
            for (_, fields) in participants.iter_mut() {
                apply(&mut **fields, share);
            }
        }
    }
}

fn seed_field(fields: &mut LedgerFields, category: Category, amount: f64) {
    match category {
        Category::Income => fields.income += amount,
        Category::Expense => fields.expenses += amount,
        Category::TaxableAssets => fields.non_qualified_assets += amount,
        Category::QualifiedAssets => fields.qualified_assets += amount,
        Category::RothAssets => fields.roth_assets += amount,
        Category::CashAssets => fields.cash_assets += amount,
        Category::RealEstate => fields.real_estate += amount,
        Category::LifeInsurance => fields.life_insurance += amount,
        Category::SocialSecurity => fields.social_security += amount,
        Category::RothContribution => {
            fields.roth_contribution += amount;
            fields.roth_assets += amount;
        }
        Category::QualifiedContribution => {
            fields.qualified_contribution += amount;
            fields.qualified_assets += amount;
        }
        Category::NonQualifiedContribution => {
            fields.non_qualified_contribution += amount;
            fields.non_qualified_assets += amount;
        }
        Category::MortgagePrincipal => fields.mortgage_balance += amount,
        Category::MortgageExtraPayment => fields.expenses += amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calc::StateJurisdiction;
    use crate::core::config::RothConversionConfig;
    use crate::core::ledger::BALANCE_TOLERANCE;
    use crate::core::types::FilingStatus;

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}"
        );
    }

    fn config() -> ProjectionConfig {
        ProjectionConfig {
            filing_status: FilingStatus::MarriedJoint,
            state: StateJurisdiction::NoIncomeTax,
            roth: RothConversionConfig {
                enabled: false,
                ..RothConversionConfig::default()
            },
            validate: true,
            ..ProjectionConfig::default()
        }
    }

    fn persons(list: &[(&str, i32)]) -> BTreeMap<String, Person> {
        list.iter()
            .map(|(name, birth)| (name.to_string(), Person::new(*name, *birth)))
            .collect()
    }

    fn project(
        entries: &[FinancialEntry],
        persons: &BTreeMap<String, Person>,
        assumptions: &GrowthAssumptions,
    ) -> Result<Vec<YearLedger>, ProjectionError> {
        ProjectionEngine::new(config())
            .expect("engine")
            .project(entries, persons, assumptions)
    }

    #[test]
    fn empty_input_yields_no_years() {
        let ledgers = project(&[], &BTreeMap::new(), &GrowthAssumptions::new()).expect("project");
        assert!(ledgers.is_empty());
    }

    #[test]
    fn span_covers_earliest_start_to_latest_end() {
        let entries = [
            FinancialEntry::new(Some("Ana"), Category::Income, "salary", 80_000.0, 2026, 2028),
            FinancialEntry::new(Some("Ana"), Category::Expense, "living", 30_000.0, 2027, 2030),
        ];
        let ledgers = project(&entries, &persons(&[("Ana", 1980)]), &GrowthAssumptions::new())
            .expect("project");
        let years: Vec<i32> = ledgers.iter().map(YearLedger::year).collect();
        assert_eq!(years, vec![2026, 2027, 2028, 2029, 2030]);
    }

    #[test]
    fn entries_compound_from_their_own_start_year() {
        let entries = [
            FinancialEntry::new(Some("Ana"), Category::Expense, "living", 10_000.0, 2026, 2028),
            FinancialEntry::new(Some("Ana"), Category::Income, "salary", 50_000.0, 2026, 2028),
        ];
        let assumptions = GrowthAssumptions::new().with_rate(Category::Expense, 3.0);
        let ledgers = project(&entries, &persons(&[("Ana", 1980)]), &assumptions).expect("project");
        assert_approx_tol(ledgers[2].total_expenses(), 10_000.0 * 1.03 * 1.03, 1e-6);
        assert_approx_tol(ledgers[2].total_income(), 50_000.0, 1e-9);
    }

    #[test]
    fn household_entries_are_split_equally() {
        let entries = [FinancialEntry::new(None, Category::Income, "rental", 40_000.0, 2026, 2026)];
        let ledgers = project(
            &entries,
            &persons(&[("Ana", 1970), ("Ben", 1972)]),
            &GrowthAssumptions::new(),
        )
        .expect("project");
        let year = &ledgers[0];
        for name in ["Ana", "Ben"] {
            let income = year.individual(name).expect("person").fields().income;
            assert_approx_tol(income, 20_000.0, 1e-9);
        }
        assert_approx_tol(year.total_income(), 40_000.0, 1e-9);
    }

    #[test]
    fn rmd_reads_the_prior_year_closing_balance() {
        let entries = [
            FinancialEntry::new(Some("Ana"), Category::QualifiedAssets, "ira", 500_000.0, 2026, 2027),
            FinancialEntry::new(Some("Ana"), Category::Income, "pension", 200_000.0, 2026, 2027),
        ];
        let ledgers = project(&entries, &persons(&[("Ana", 1950)]), &GrowthAssumptions::new())
            .expect("project");
        let rmd = |i: usize| ledgers[i].individual("Ana").expect("ana").fields().rmd_withdrawal;
        assert_eq!(rmd(0), 0.0);
        assert_approx_tol(rmd(1), 500_000.0 / 22.9, 0.01);
    }

    #[test]
    fn mortgage_amortizes_over_entry_span_and_extra_payments_reduce_it() {
        let entries = [
            FinancialEntry::new(Some("Ana"), Category::MortgagePrincipal, "home", 300_000.0, 2026, 2055),
            FinancialEntry::new(Some("Ana"), Category::MortgageExtraPayment, "extra", 10_000.0, 2026, 2027),
            FinancialEntry::new(Some("Ana"), Category::Income, "salary", 150_000.0, 2026, 2028),
        ];
        let assumptions = GrowthAssumptions::new().with_rate(Category::MortgagePrincipal, 6.0);
        let ledgers = project(&entries, &persons(&[("Ana", 1980)]), &assumptions).expect("project");

        let calc = MortgageCalculator;
        let scheduled = |paid| {
            calc.remaining_balance(300_000.0, 0.06, 30, paid)
                .expect("balance")
        };
        let ana = |i: usize| ledgers[i].individual("Ana").expect("ana").fields().clone();
        assert_approx_tol(ana(0).mortgage_balance, scheduled(1) - 10_000.0, 1e-6);
        assert_approx_tol(ana(1).mortgage_balance, scheduled(2) - 20_000.0, 1e-6);
        assert_approx_tol(ana(2).mortgage_balance, scheduled(3) - 20_000.0, 1e-6);
        assert_approx_tol(ana(0).expenses, 10_000.0, 1e-9);
        assert_approx_tol(ana(2).expenses, 0.0, 1e-9);
    }

    #[test]
    fn contributions_feed_both_the_flow_and_the_balance() {
        let entries = [
            FinancialEntry::new(Some("Ana"), Category::Income, "salary", 100_000.0, 2026, 2026),
            FinancialEntry::new(Some("Ana"), Category::QualifiedContribution, "401k", 20_000.0, 2026, 2026),
        ];
        let ledgers = project(&entries, &persons(&[("Ana", 1980)]), &GrowthAssumptions::new())
            .expect("project");
        let totals = ledgers[0].totals();
        assert_approx_tol(totals.qualified_contribution, 20_000.0, 1e-9);
        assert_approx_tol(totals.qualified_assets, 20_000.0, 1e-9);
    }

    #[test]
    fn every_year_balances_in_a_retirement_plan() {
        let entries = [
            FinancialEntry::new(Some("Ana"), Category::QualifiedAssets, "ira", 800_000.0, 2026, 2035),
            FinancialEntry::new(Some("Ben"), Category::TaxableAssets, "brokerage", 200_000.0, 2026, 2035),
            FinancialEntry::new(None, Category::CashAssets, "savings", 30_000.0, 2026, 2035),
            FinancialEntry::new(Some("Ben"), Category::SocialSecurity, "benefit", 28_000.0, 2026, 2035),
            FinancialEntry::new(None, Category::Expense, "living", 90_000.0, 2026, 2035),
        ];
        let assumptions = GrowthAssumptions::new()
            .with_rate(Category::Expense, 2.5)
            .with_rate(Category::QualifiedAssets, 5.0);
        let config = ProjectionConfig {
            roth: RothConversionConfig::default(),
            state: StateJurisdiction::California,
            ..config()
        };
        let ledgers = ProjectionEngine::new(config)
            .expect("engine")
            .project(&entries, &persons(&[("Ana", 1954), ("Ben", 1956)]), &assumptions)
            .expect("project");

        assert_eq!(ledgers.len(), 10);
        for ledger in &ledgers {
            assert!(ledger.totals().cash_flow_gap().abs() <= BALANCE_TOLERANCE);
            assert!(ledger.converged(), "year {} did not converge", ledger.year());
        }
    }

    #[test]
    fn deficit_years_stay_consistent_after_taxable_and_qualified_draws() {
        let entries = [
            FinancialEntry::new(Some("Ana"), Category::QualifiedAssets, "ira", 30_000.0, 2026, 2027),
            FinancialEntry::new(Some("Ben"), Category::TaxableAssets, "brokerage", 10_000.0, 2026, 2027),
            FinancialEntry::new(None, Category::Expense, "living", 150_000.0, 2026, 2027),
        ];
        let config = ProjectionConfig {
            roth: RothConversionConfig::default(),
            state: StateJurisdiction::California,
            ..config()
        };
        let ledgers = ProjectionEngine::new(config)
            .expect("engine")
            .project(&entries, &persons(&[("Ana", 1956), ("Ben", 1958)]), &GrowthAssumptions::new())
            .expect("project");

        assert_eq!(ledgers.len(), 2);
        for ledger in &ledgers {
            let totals = ledger.totals();
            assert!(totals.federal_tax > 0.0);
            assert!(totals.capital_gains_tax > 0.0);
            assert_eq!(totals.roth_conversion, 0.0);
            let unfunded = totals.total_cash_outflows() - totals.total_cash_inflows();
            assert_approx_tol(totals.deficit, unfunded, BALANCE_TOLERANCE);
            assert_approx_tol(totals.deficit, 110_000.0 + totals.total_taxes(), BALANCE_TOLERANCE);
        }
    }

    #[test]
    fn invalid_entries_are_rejected_before_projection() {
        let people = persons(&[("Ana", 1980)]);
        let assumptions = GrowthAssumptions::new();

        let negative = [FinancialEntry::new(Some("Ana"), Category::Income, "salary", -1.0, 2026, 2026)];
        assert!(matches!(
            project(&negative, &people, &assumptions),
            Err(ProjectionError::InvalidEntry { .. })
        ));

        let reversed = [FinancialEntry::new(Some("Ana"), Category::Income, "salary", 1.0, 2027, 2026)];
        assert!(matches!(
            project(&reversed, &people, &assumptions),
            Err(ProjectionError::InvalidEntry { .. })
        ));

        let stranger = [FinancialEntry::new(Some("Zed"), Category::Income, "salary", 1.0, 2026, 2026)];
        assert!(matches!(
            project(&stranger, &people, &assumptions),
            Err(ProjectionError::UnknownOwner { .. })
        ));

        let unbounded = [FinancialEntry::new(
            Some("Ana"),
            Category::Income,
            "salary",
            1.0,
            i32::MIN,
            i32::MAX,
        )];
        assert!(matches!(
            project(&unbounded, &people, &assumptions),
            Err(ProjectionError::InvalidEntry { .. })
        ));

        let household = [FinancialEntry::new(None, Category::Income, "salary", 1.0, 2026, 2026)];
        assert_eq!(
            project(&household, &BTreeMap::new(), &assumptions),
            Err(ProjectionError::NoPersons)
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ProjectionConfig {
            max_iterations: 0,
            ..ProjectionConfig::default()
        };
        assert!(matches!(
            ProjectionEngine::new(config),
            Err(ProjectionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn plan_json_runs_end_to_end() {
        let plan: Plan = serde_json::from_str(
            r#"{
                "persons": [{"name": "Ana", "birthYear": 1960}],
                "entries": [
                    {"owner": "Ana", "category": "income", "description": "salary",
                     "value": 90000, "startYear": 2026, "endYear": 2027},
                    {"category": "expense", "description": "living",
                     "value": 50000, "startYear": 2026, "endYear": 2027}
                ],
                "assumptions": {"expense": 3.0}
            }"#,
        )
        .expect("plan json");
        let ledgers = run_projection(&plan, config()).expect("project");
        assert_eq!(ledgers.len(), 2);
        assert_approx_tol(ledgers[1].total_expenses(), 51_500.0, 1e-6);
        assert!(ledgers[0].totals().non_qualified_contribution > 0.0);
    }
}
