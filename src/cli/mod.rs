use std::fs;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::info;

use crate::core::calc::{DEFAULT_SOCIAL_SECURITY_WAGE_BASE, FicaConfig, StateJurisdiction};
use crate::core::{
    DEFAULT_MAX_ITERATIONS, Employment, FilingStatus, PENALTY_FREE_AGE, Plan, ProjectionConfig,
    ProjectionEngine, RothConversionConfig, summarize,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliFilingStatus {
    Single,
    MarriedJoint,
    MarriedSeparate,
    HeadOfHousehold,
}

impl From<CliFilingStatus> for FilingStatus {
    fn from(value: CliFilingStatus) -> Self {
        match value {
            CliFilingStatus::Single => FilingStatus::Single,
            CliFilingStatus::MarriedJoint => FilingStatus::MarriedJoint,
            CliFilingStatus::MarriedSeparate => FilingStatus::MarriedSeparate,
            CliFilingStatus::HeadOfHousehold => FilingStatus::HeadOfHousehold,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliState {
    California,
    Oregon,
    #[value(name = "none")]
    NoIncomeTax,
}

impl From<CliState> for StateJurisdiction {
    fn from(value: CliState) -> Self {
        match value {
            CliState::California => StateJurisdiction::California,
            CliState::Oregon => StateJurisdiction::Oregon,
            CliState::NoIncomeTax => StateJurisdiction::NoIncomeTax,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliOutput {
    /// One headline row per year.
    Summary,
    /// Full household and per-person ledgers.
    Ledgers,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "nestegg",
    about = "Yearly household projection with tax-aware withdrawals and Roth conversions"
)]
pub struct Cli {
    #[arg(long, help = "JSON plan with persons, entries and growth assumptions")]
    pub plan: PathBuf,
    #[arg(long, value_enum, default_value_t = CliFilingStatus::Single)]
    pub filing_status: CliFilingStatus,
    #[arg(long, value_enum, default_value_t = CliState::California)]
    pub state: CliState,
    #[arg(long, help = "Pay both halves of Social Security and Medicare")]
    pub self_employed: bool,
    #[arg(long, help = "Fail when a projected year breaks a ledger invariant")]
    pub validate: bool,
    #[arg(long, help = "Disable Roth conversions")]
    pub no_roth: bool,
    #[arg(
        long,
        default_value_t = 22.0,
        help = "Fill the federal bracket taxed at this rate, in percent"
    )]
    pub roth_target_rate: f64,
    #[arg(long, help = "Taxable income ceiling for conversions; overrides the target rate")]
    pub roth_threshold: Option<f64>,
    #[arg(long, default_value_t = PENALTY_FREE_AGE)]
    pub roth_min_age: u32,
    #[arg(
        long,
        default_value_t = PENALTY_FREE_AGE,
        help = "Youngest age allowed to draw qualified assets for expenses"
    )]
    pub qualified_min_age: u32,
    #[arg(long, default_value_t = DEFAULT_SOCIAL_SECURITY_WAGE_BASE)]
    pub ss_wage_base: f64,
    #[arg(
        long,
        default_value_t = 25.0,
        help = "Share of taxable sale proceeds that is cost basis, in percent"
    )]
    pub cost_basis: f64,
    #[arg(long, default_value_t = 20.0, help = "Long-term capital gains rate in percent")]
    pub capital_gains_rate: f64,
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: u32,
    #[arg(long, value_enum, default_value_t = CliOutput::Summary)]
    pub output: CliOutput,
}

pub fn build_config(cli: &Cli) -> Result<ProjectionConfig, String> {
    if !(0.0..100.0).contains(&cli.roth_target_rate) {
        return Err("--roth-target-rate must be >= 0 and < 100".to_string());
    }

    if let Some(threshold) = cli.roth_threshold {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err("--roth-threshold must be >= 0".to_string());
        }
    }

    if !cli.ss_wage_base.is_finite() || cli.ss_wage_base <= 0.0 {
        return Err("--ss-wage-base must be > 0".to_string());
    }

    if !(0.0..=100.0).contains(&cli.cost_basis) {
        return Err("--cost-basis must be between 0 and 100".to_string());
    }

    if !(0.0..=100.0).contains(&cli.capital_gains_rate) {
        return Err("--capital-gains-rate must be between 0 and 100".to_string());
    }

    if cli.max_iterations == 0 {
        return Err("--max-iterations must be > 0".to_string());
    }

    let employment = if cli.self_employed {
        Employment::SelfEmployed
    } else {
        Employment::Employee
    };

    Ok(ProjectionConfig {
        filing_status: cli.filing_status.into(),
        state: cli.state.into(),
        employment,
        fica: FicaConfig {
            wage_base: cli.ss_wage_base,
            ..FicaConfig::default()
        },
        cost_basis_fraction: cli.cost_basis / 100.0,
        capital_gains_rate: cli.capital_gains_rate / 100.0,
        roth: RothConversionConfig {
            enabled: !cli.no_roth,
            target_rate: cli.roth_target_rate / 100.0,
            threshold: cli.roth_threshold,
            min_age: cli.roth_min_age,
        },
        qualified_withdrawal_min_age: cli.qualified_min_age,
        max_iterations: cli.max_iterations,
        validate: cli.validate,
        ..ProjectionConfig::default()
    })
}

pub fn parse_plan(json: &str) -> Result<Plan, String> {
    serde_json::from_str(json).map_err(|e| format!("invalid plan: {e}"))
}

/// Projects `plan` and renders the requested output as pretty JSON.
pub fn render(plan: &Plan, cli: &Cli) -> Result<String, String> {
    let config = build_config(cli)?;
    let engine = ProjectionEngine::new(config).map_err(|e| e.to_string())?;
    let ledgers = engine.project_plan(plan).map_err(|e| e.to_string())?;
    info!(years = ledgers.len(), "projection complete");

    let rendered = match cli.output {
        CliOutput::Summary => {
            let summary = summarize(&ledgers, engine.config()).map_err(|e| e.to_string())?;
            serde_json::to_string_pretty(&summary)
        }
        CliOutput::Ledgers => serde_json::to_string_pretty(&ledgers),
    };
    rendered.map_err(|e| format!("failed to serialize output: {e}"))
}

pub fn run(cli: &Cli) -> Result<String, String> {
    let raw = fs::read_to_string(&cli.plan)
        .map_err(|e| format!("failed to read {}: {e}", cli.plan.display()))?;
    let plan = parse_plan(&raw)?;
    render(&plan, cli)
}
