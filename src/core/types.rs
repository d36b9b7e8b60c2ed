use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilingStatus {
    Single,
    MarriedJoint,
    MarriedSeparate,
    HeadOfHousehold,
}

impl FilingStatus {
    pub const ALL: [FilingStatus; 4] = [
        FilingStatus::Single,
        FilingStatus::MarriedJoint,
        FilingStatus::MarriedSeparate,
        FilingStatus::HeadOfHousehold,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            FilingStatus::Single => 0,
            FilingStatus::MarriedJoint => 1,
            FilingStatus::MarriedSeparate => 2,
            FilingStatus::HeadOfHousehold => 3,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Employment {
    Employee,
    SelfEmployed,
}

/// The fixed set of line-item categories a plan is built from.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Income,
    Expense,
    #[serde(alias = "non-qualified-assets")]
    TaxableAssets,
    QualifiedAssets,
    RothAssets,
    CashAssets,
    RealEstate,
    LifeInsurance,
    SocialSecurity,
    RothContribution,
    QualifiedContribution,
    NonQualifiedContribution,
    MortgagePrincipal,
    MortgageExtraPayment,
}

impl Category {
    pub const ALL: [Category; 14] = [
        Category::Income,
        Category::Expense,
        Category::TaxableAssets,
        Category::QualifiedAssets,
        Category::RothAssets,
        Category::CashAssets,
        Category::RealEstate,
        Category::LifeInsurance,
        Category::SocialSecurity,
        Category::RothContribution,
        Category::QualifiedContribution,
        Category::NonQualifiedContribution,
        Category::MortgagePrincipal,
        Category::MortgageExtraPayment,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub name: String,
    pub birth_year: i32,
}

impl Person {
    pub fn new(name: impl Into<String>, birth_year: i32) -> Self {
        Self {
            name: name.into(),
            birth_year,
        }
    }

    /// Age reached during `year`; zero for years before birth.
    pub fn age_in(&self, year: i32) -> u32 {
        u32::try_from(year.saturating_sub(self.birth_year)).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialEntry {
    #[serde(default)]
    pub owner: Option<String>,
    pub category: Category,
    #[serde(default)]
    pub description: String,
    pub value: f64,
    pub start_year: i32,
    pub end_year: i32,
}

impl FinancialEntry {
    pub fn new(
        owner: Option<&str>,
        category: Category,
        description: impl Into<String>,
        value: f64,
        start_year: i32,
        end_year: i32,
    ) -> Self {
        Self {
            owner: owner.map(str::to_string),
            category,
            description: description.into(),
            value,
            start_year,
            end_year,
        }
    }

    pub fn is_active(&self, year: i32) -> bool {
        (self.start_year..=self.end_year).contains(&year)
    }
}

/// Annual growth (or inflation) rate per category, in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrowthAssumptions {
    rates: BTreeMap<Category, f64>,
}

impl GrowthAssumptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, category: Category, percent: f64) -> Self {
        self.rates.insert(category, percent);
        self
    }

    pub fn percent(&self, category: Category) -> f64 {
        self.rates.get(&category).copied().unwrap_or(0.0)
    }

    pub fn rate(&self, category: Category) -> f64 {
        self.percent(category) / 100.0
    }

    /// Value of `base` after compounding `years` times at the category rate.
    pub fn compound(&self, category: Category, base: f64, years: u32) -> f64 {
        let years = i32::try_from(years).unwrap_or(i32::MAX);
        base * (1.0 + self.rate(category)).powi(years)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        self.rates.iter().map(|(category, rate)| (*category, *rate))
    }
}

/// Everything the projection driver consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Plan {
    pub persons: Vec<Person>,
    pub entries: Vec<FinancialEntry>,
    pub assumptions: GrowthAssumptions,
}

impl Plan {
    pub fn person_map(&self) -> BTreeMap<String, Person> {
        self.persons
            .iter()
            .map(|person| (person.name.clone(), person.clone()))
            .collect()
    }
}
