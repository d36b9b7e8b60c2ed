use super::calc::{
    BracketTax, CapitalGainsCalculator, DEFAULT_CAPITAL_GAINS_RATE, DEFAULT_COST_BASIS_FRACTION,
    FicaCalculator, FicaConfig, IncomeTax, StateJurisdiction,
};
use super::error::{CalcError, ProjectionError};
use super::ledger::BALANCE_TOLERANCE;
use super::types::{Employment, FilingStatus};

pub const DEFAULT_MAX_ITERATIONS: u32 = 20;
/// Age from which qualified assets may be drawn or converted without penalty.
pub const PENALTY_FREE_AGE: u32 = 59;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RothConversionConfig {
    pub enabled: bool,
    /// Fill the federal bracket taxed at this rate.
    pub target_rate: f64,
    /// Absolute taxable-income ceiling; overrides `target_rate` when set.
    pub threshold: Option<f64>,
    pub min_age: u32,
}

impl Default for RothConversionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_rate: 0.22,
            threshold: None,
            min_age: PENALTY_FREE_AGE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionConfig {
    pub filing_status: FilingStatus,
    pub state: StateJurisdiction,
    pub employment: Employment,
    pub fica: FicaConfig,
    pub cost_basis_fraction: f64,
    pub capital_gains_rate: f64,
    pub roth: RothConversionConfig,
    pub qualified_withdrawal_min_age: u32,
    pub max_iterations: u32,
    pub balance_tolerance: f64,
    /// Fail the projection when a year breaks a ledger invariant.
    pub validate: bool,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            filing_status: FilingStatus::Single,
            state: StateJurisdiction::default(),
            employment: Employment::Employee,
            fica: FicaConfig::default(),
            cost_basis_fraction: DEFAULT_COST_BASIS_FRACTION,
            capital_gains_rate: DEFAULT_CAPITAL_GAINS_RATE,
            roth: RothConversionConfig::default(),
            qualified_withdrawal_min_age: PENALTY_FREE_AGE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            balance_tolerance: BALANCE_TOLERANCE,
            validate: false,
        }
    }
}

impl ProjectionConfig {
    pub fn validate(&self) -> Result<(), ProjectionError> {
        if self.max_iterations == 0 {
            return Err(ProjectionError::InvalidConfig(
                "max iterations must be at least 1".to_string(),
            ));
        }
        if !self.balance_tolerance.is_finite() || self.balance_tolerance <= 0.0 {
            return Err(ProjectionError::InvalidConfig(
                "balance tolerance must be > 0".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.roth.target_rate) {
            return Err(ProjectionError::InvalidConfig(
                "roth target rate must be in [0, 1)".to_string(),
            ));
        }
        if let Some(threshold) = self.roth.threshold {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(ProjectionError::InvalidConfig(
                    "roth threshold must be >= 0".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Calculators shared by the tax-aware strategies.
#[derive(Debug)]
pub struct TaxRules {
    pub filing_status: FilingStatus,
    pub employment: Employment,
    pub federal: BracketTax,
    pub state: Box<dyn IncomeTax>,
    pub fica: FicaCalculator,
    pub capital_gains: CapitalGainsCalculator,
}

impl TaxRules {
    pub fn from_config(config: &ProjectionConfig) -> Result<Self, CalcError> {
        Ok(Self {
            filing_status: config.filing_status,
            employment: config.employment,
            federal: BracketTax::federal(),
            state: config.state.calculator(),
            fica: FicaCalculator::new(config.fica)?,
            capital_gains: CapitalGainsCalculator::new(
                config.cost_basis_fraction,
                config.capital_gains_rate,
            )?,
        })
    }
}
