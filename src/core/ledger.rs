use std::collections::BTreeMap;
use std::ops::AddAssign;

use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

use super::types::Person;

/// Share of the Social Security benefit treated as ordinary income.
pub const SOCIAL_SECURITY_TAXABLE_SHARE: f64 = 0.85;
/// Cash identity tolerance, one currency unit.
pub const BALANCE_TOLERANCE: f64 = 1.0;
pub const CENT: f64 = 0.01;

/// One year of balances and flows, kept for the household and for each person.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerFields {
    pub income: f64,
    pub expenses: f64,
    pub qualified_assets: f64,
    pub non_qualified_assets: f64,
    pub roth_assets: f64,
    pub cash_assets: f64,
    pub real_estate: f64,
    pub life_insurance: f64,
    pub social_security: f64,
    pub mortgage_balance: f64,

    pub rmd_withdrawal: f64,
    pub qualified_withdrawal: f64,
    pub non_qualified_withdrawal: f64,
    pub roth_withdrawal: f64,
    pub cash_withdrawal: f64,
    pub roth_conversion: f64,

    pub roth_contribution: f64,
    pub qualified_contribution: f64,
    pub non_qualified_contribution: f64,
    /// Part of `non_qualified_contribution` that came from surplus cash.
    pub surplus_saved: f64,

    pub federal_tax: f64,
    pub state_tax: f64,
    pub capital_gains_tax: f64,
    pub social_security_tax: f64,
    pub medicare_tax: f64,

    pub deficit: f64,
}

impl LedgerFields {
    pub fn total_withdrawals(&self) -> f64 {
        self.rmd_withdrawal
            + self.qualified_withdrawal
            + self.non_qualified_withdrawal
            + self.roth_withdrawal
            + self.cash_withdrawal
            + self.roth_conversion
    }

    pub fn total_taxes(&self) -> f64 {
        self.federal_tax
            + self.state_tax
            + self.capital_gains_tax
            + self.social_security_tax
            + self.medicare_tax
    }

    pub fn total_contributions(&self) -> f64 {
        self.roth_contribution + self.qualified_contribution + self.non_qualified_contribution
    }

    pub fn total_assets(&self) -> f64 {
        self.qualified_assets
            + self.non_qualified_assets
            + self.roth_assets
            + self.cash_assets
            + self.real_estate
    }

    pub fn total_cash_inflows(&self) -> f64 {
        self.income + self.social_security + self.total_withdrawals()
    }

    pub fn total_cash_outflows(&self) -> f64 {
        self.expenses + self.total_taxes() + self.total_contributions()
    }

    pub fn net_worth(&self) -> f64 {
        self.total_assets() - self.mortgage_balance
    }

    /// Inflows minus outflows, before any unmet deficit is counted.
    pub fn surplus(&self) -> f64 {
        self.total_cash_inflows() - self.total_cash_outflows()
    }

    /// Residual of the cash identity; zero when the year is balanced.
    pub fn cash_flow_gap(&self) -> f64 {
        self.surplus() + self.deficit
    }

    /// Income subject to ordinary brackets, excluding capital gains.
    pub fn ordinary_income(&self) -> f64 {
        self.income
            + self.rmd_withdrawal
            + self.qualified_withdrawal
            + self.roth_conversion
            + SOCIAL_SECURITY_TAXABLE_SHARE * self.social_security
    }

    pub(crate) fn values(&self) -> [(&'static str, f64); 26] {
        [
            ("income", self.income),
            ("expenses", self.expenses),
            ("qualifiedAssets", self.qualified_assets),
            ("nonQualifiedAssets", self.non_qualified_assets),
            ("rothAssets", self.roth_assets),
            ("cashAssets", self.cash_assets),
            ("realEstate", self.real_estate),
            ("lifeInsurance", self.life_insurance),
            ("socialSecurity", self.social_security),
            ("mortgageBalance", self.mortgage_balance),
            ("rmdWithdrawal", self.rmd_withdrawal),
            ("qualifiedWithdrawal", self.qualified_withdrawal),
            ("nonQualifiedWithdrawal", self.non_qualified_withdrawal),
            ("rothWithdrawal", self.roth_withdrawal),
            ("cashWithdrawal", self.cash_withdrawal),
            ("rothConversion", self.roth_conversion),
            ("rothContribution", self.roth_contribution),
            ("qualifiedContribution", self.qualified_contribution),
            ("nonQualifiedContribution", self.non_qualified_contribution),
            ("surplusSaved", self.surplus_saved),
            ("federalTax", self.federal_tax),
            ("stateTax", self.state_tax),
            ("capitalGainsTax", self.capital_gains_tax),
            ("socialSecurityTax", self.social_security_tax),
            ("medicareTax", self.medicare_tax),
            ("deficit", self.deficit),
        ]
    }

    fn asset_balances(&self) -> [(&'static str, f64); 5] {
        [
            ("qualifiedAssets", self.qualified_assets),
            ("nonQualifiedAssets", self.non_qualified_assets),
            ("rothAssets", self.roth_assets),
            ("cashAssets", self.cash_assets),
            ("realEstate", self.real_estate),
        ]
    }
}

/// Computed totals, serialized next to the stored fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedTotals {
    pub total_withdrawals: f64,
    pub total_taxes: f64,
    pub total_contributions: f64,
    pub total_assets: f64,
    pub total_cash_inflows: f64,
    pub total_cash_outflows: f64,
    pub net_worth: f64,
}

impl From<&LedgerFields> for DerivedTotals {
    fn from(fields: &LedgerFields) -> Self {
        Self {
            total_withdrawals: fields.total_withdrawals(),
            total_taxes: fields.total_taxes(),
            total_contributions: fields.total_contributions(),
            total_assets: fields.total_assets(),
            total_cash_inflows: fields.total_cash_inflows(),
            total_cash_outflows: fields.total_cash_outflows(),
            net_worth: fields.net_worth(),
        }
    }
}

impl AddAssign<&LedgerFields> for LedgerFields {
    fn add_assign(&mut self, other: &LedgerFields) {
        self.income += other.income;
        self.expenses += other.expenses;
        self.qualified_assets += other.qualified_assets;
        self.non_qualified_assets += other.non_qualified_assets;
        self.roth_assets += other.roth_assets;
        self.cash_assets += other.cash_assets;
        self.real_estate += other.real_estate;
        self.life_insurance += other.life_insurance;
        self.social_security += other.social_security;
        self.mortgage_balance += other.mortgage_balance;
        self.rmd_withdrawal += other.rmd_withdrawal;
        self.qualified_withdrawal += other.qualified_withdrawal;
        self.non_qualified_withdrawal += other.non_qualified_withdrawal;
        self.roth_withdrawal += other.roth_withdrawal;
        self.cash_withdrawal += other.cash_withdrawal;
        self.roth_conversion += other.roth_conversion;
        self.roth_contribution += other.roth_contribution;
        self.qualified_contribution += other.qualified_contribution;
        self.non_qualified_contribution += other.non_qualified_contribution;
        self.surplus_saved += other.surplus_saved;
        self.federal_tax += other.federal_tax;
        self.state_tax += other.state_tax;
        self.capital_gains_tax += other.capital_gains_tax;
        self.social_security_tax += other.social_security_tax;
        self.medicare_tax += other.medicare_tax;
        self.deficit += other.deficit;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualLedger {
    name: String,
    birth_year: i32,
    age: u32,
    #[serde(flatten)]
    fields: LedgerFields,
}

impl IndividualLedger {
    pub fn new(person: &Person, year: i32) -> Self {
        Self {
            name: person.name.clone(),
            birth_year: person.birth_year,
            age: person.age_in(year),
            fields: LedgerFields::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn birth_year(&self) -> i32 {
        self.birth_year
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn fields(&self) -> &LedgerFields {
        &self.fields
    }

    pub(crate) fn fields_mut(&mut self) -> &mut LedgerFields {
        &mut self.fields
    }
}

/// Household snapshot for one simulated year.
#[derive(Debug, Clone, PartialEq)]
pub struct YearLedger {
    year: i32,
    totals: LedgerFields,
    individuals: BTreeMap<String, IndividualLedger>,
    iterations: u32,
    converged: bool,
}

impl YearLedger {
    pub fn new<'a>(year: i32, persons: impl IntoIterator<Item = &'a Person>) -> Self {
        let individuals = persons
            .into_iter()
            .map(|person| (person.name.clone(), IndividualLedger::new(person, year)))
            .collect();
        Self {
            year,
            totals: LedgerFields::default(),
            individuals,
            iterations: 0,
            converged: true,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn totals(&self) -> &LedgerFields {
        &self.totals
    }

    pub fn individual(&self, name: &str) -> Option<&IndividualLedger> {
        self.individuals.get(name)
    }

    pub fn individuals(&self) -> impl Iterator<Item = &IndividualLedger> {
        self.individuals.values()
    }

    pub fn individual_count(&self) -> usize {
        self.individuals.len()
    }

    /// Fixed-point passes the composite strategy ran on this year.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn total_income(&self) -> f64 {
        self.totals.income
    }

    pub fn total_expenses(&self) -> f64 {
        self.totals.expenses
    }

    pub fn total_withdrawals(&self) -> f64 {
        self.totals.total_withdrawals()
    }

    pub fn total_taxes(&self) -> f64 {
        self.totals.total_taxes()
    }

    pub fn total_assets(&self) -> f64 {
        self.totals.total_assets()
    }

    pub fn total_cash_inflows(&self) -> f64 {
        self.totals.total_cash_inflows()
    }

    pub fn total_cash_outflows(&self) -> f64 {
        self.totals.total_cash_outflows()
    }

    pub fn deficit(&self) -> f64 {
        self.totals.deficit
    }

    pub fn net_worth(&self) -> f64 {
        self.totals.net_worth()
    }

    #[cfg(test)]
    pub(crate) fn totals_mut(&mut self) -> &mut LedgerFields {
        &mut self.totals
    }

    pub(crate) fn individual_mut(&mut self, name: &str) -> Option<&mut IndividualLedger> {
        self.individuals.get_mut(name)
    }

    pub(crate) fn individuals_mut(&mut self) -> impl Iterator<Item = &mut IndividualLedger> {
        self.individuals.values_mut()
    }

    /// Mutable fields of every person with their age, or the household totals
    /// (with no age) when nobody is named.
    pub(crate) fn participants_mut(&mut self) -> Vec<(Option<u32>, &mut LedgerFields)> {
        if self.individuals.is_empty() {
            vec![(None, &mut self.totals)]
        } else {
            self.individuals
                .values_mut()
                .map(|individual| (Some(individual.age), &mut individual.fields))
                .collect()
        }
    }

    pub(crate) fn record_convergence(&mut self, iterations: u32, converged: bool) {
        self.iterations = iterations;
        self.converged = converged;
    }

    /// Rebuild household totals from the per-person ledgers.
    ///
    /// A household without individuals keeps its totals as written.
    pub(crate) fn resync(&mut self) {
        if self.individuals.is_empty() {
            return;
        }
        let mut totals = LedgerFields::default();
        for individual in self.individuals.values() {
            totals += &individual.fields;
        }
        self.totals = totals;
    }

    /// First broken ledger invariant, if any.
    ///
    /// Checks that totals match the per-person sums, that the cash identity
    /// balances, that no asset balance went negative, and that no RMD exceeds
    /// the previous year's closing qualified balance.
    pub fn consistency_violation(&self, previous: Option<&YearLedger>) -> Option<String> {
        if !self.individuals.is_empty() {
            let mut summed = LedgerFields::default();
            for individual in self.individuals.values() {
                summed += &individual.fields;
            }
            for ((name, total), (_, sum)) in self.totals.values().iter().zip(summed.values()) {
                if (total - sum).abs() > CENT.max(total.abs() * 1e-9) {
                    return Some(format!(
                        "household {name} {total:.2} differs from per-person sum {sum:.2}"
                    ));
                }
            }
        }

        let gap = self.totals.cash_flow_gap();
        if gap.abs() > BALANCE_TOLERANCE {
            return Some(format!(
                "cash inflows {:.2} + deficit {:.2} do not cover outflows {:.2} (gap {gap:.2})",
                self.totals.total_cash_inflows(),
                self.totals.deficit,
                self.totals.total_cash_outflows()
            ));
        }

        let ledgers = std::iter::once((None, &self.totals)).chain(
            self.individuals
                .values()
                .map(|individual| (Some(individual.name.as_str()), &individual.fields)),
        );
        for (owner, fields) in ledgers {
            for (name, balance) in fields.asset_balances() {
                if balance < -CENT {
                    let owner = owner.unwrap_or("household");
                    return Some(format!("{owner} {name} is negative ({balance:.2})"));
                }
            }
        }

        for individual in self.individuals.values() {
            let prior = previous
                .and_then(|ledger| ledger.individual(&individual.name))
                .map(|prior| prior.fields.qualified_assets)
                .unwrap_or(0.0);
            if individual.fields.rmd_withdrawal > prior + CENT {
                return Some(format!(
                    "{} RMD {:.2} exceeds prior qualified balance {prior:.2}",
                    individual.name, individual.fields.rmd_withdrawal
                ));
            }
        }
        None
    }
}

impl Serialize for YearLedger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("YearLedger", 6)?;
        state.serialize_field("year", &self.year)?;
        state.serialize_field("totals", &self.totals)?;
        state.serialize_field("derived", &DerivedTotals::from(&self.totals))?;
        state.serialize_field("individuals", &self.individuals)?;
        state.serialize_field("iterations", &self.iterations)?;
        state.serialize_field("converged", &self.converged)?;
        state.end()
    }
}
