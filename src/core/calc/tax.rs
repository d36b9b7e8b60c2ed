use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::core::error::{CalcError, non_negative};
use crate::core::types::FilingStatus;

/// Progressive income tax for one jurisdiction.
pub trait IncomeTax: Debug + Send + Sync {
    fn jurisdiction(&self) -> &'static str;

    fn tax(&self, income: f64, status: FilingStatus) -> Result<f64, CalcError>;

    fn marginal_rate(&self, income: f64, status: FilingStatus) -> Result<f64, CalcError>;

    /// Pre-tax income whose after-tax remainder equals `net`.
    fn gross_up(&self, net: f64, status: FilingStatus) -> Result<f64, CalcError>;

    fn effective_rate(&self, income: f64, status: FilingStatus) -> Result<f64, CalcError> {
        let tax = self.tax(income, status)?;
        if income <= 0.0 {
            Ok(0.0)
        } else {
            Ok(tax / income)
        }
    }
}

/// Upper bounds with their marginal rates; `rates` carries one extra entry
/// for income above the last bound.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketSchedule {
    bounds: Vec<f64>,
    rates: Vec<f64>,
}

impl BracketSchedule {
    pub fn new(bounds: Vec<f64>, rates: Vec<f64>) -> Result<Self, String> {
        if rates.len() != bounds.len() + 1 {
            return Err(format!(
                "expected {} rates for {} bounds, got {}",
                bounds.len() + 1,
                bounds.len(),
                rates.len()
            ));
        }
        if bounds.iter().any(|b| !b.is_finite() || *b <= 0.0) {
            return Err("bracket bounds must be positive".to_string());
        }
        if bounds.windows(2).any(|w| w[1] <= w[0]) {
            return Err("bracket bounds must be strictly increasing".to_string());
        }
        if rates.iter().any(|r| !r.is_finite() || !(0.0..1.0).contains(r)) {
            return Err("bracket rates must be in [0, 1)".to_string());
        }
        Ok(Self { bounds, rates })
    }

    fn from_static(bounds: &[f64], rates: &[f64]) -> Self {
        Self {
            bounds: bounds.to_vec(),
            rates: rates.to_vec(),
        }
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    fn top_rate(&self) -> f64 {
        self.rates.last().copied().unwrap_or(0.0)
    }

    fn tax(&self, income: f64) -> f64 {
        let mut tax = 0.0;
        let mut lower = 0.0;
        for (bound, rate) in self.bounds.iter().zip(&self.rates) {
            if income <= *bound {
                return tax + (income - lower) * rate;
            }
            tax += (bound - lower) * rate;
            lower = *bound;
        }
        tax + (income - lower) * self.top_rate()
    }

    fn marginal_rate(&self, income: f64) -> f64 {
        self.bounds
            .iter()
            .zip(&self.rates)
            .find(|(bound, _)| income <= **bound)
            .map(|(_, rate)| *rate)
            .unwrap_or_else(|| self.top_rate())
    }

    fn gross_up(&self, net: f64) -> f64 {
        let mut cumulative = 0.0;
        let mut lower = 0.0;
        for (bound, rate) in self.bounds.iter().zip(&self.rates) {
            let bracket_tax = (bound - lower) * rate;
            let net_at_bound = bound - (cumulative + bracket_tax);
            if net <= net_at_bound {
                return (net + cumulative - lower * rate) / (1.0 - rate);
            }
            cumulative += bracket_tax;
            lower = *bound;
        }
        let rate = self.top_rate();
        (net + cumulative - lower * rate) / (1.0 - rate)
    }

    fn ceiling_for_rate(&self, rate: f64) -> Option<f64> {
        self.bounds
            .iter()
            .zip(&self.rates)
            .find(|(_, r)| (**r - rate).abs() < 1e-9)
            .map(|(bound, _)| *bound)
    }
}

/// Bracket-table income tax with one schedule per filing status.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketTax {
    jurisdiction: &'static str,
    schedules: [BracketSchedule; 4],
}

const FEDERAL_RATES: [f64; 7] = [0.10, 0.12, 0.22, 0.24, 0.32, 0.35, 0.37];
const FEDERAL_SINGLE: [f64; 6] = [11_925.0, 48_475.0, 103_350.0, 197_300.0, 250_525.0, 626_350.0];
const FEDERAL_JOINT: [f64; 6] = [23_850.0, 96_950.0, 206_700.0, 394_600.0, 501_050.0, 751_600.0];
const FEDERAL_SEPARATE: [f64; 6] =
    [11_925.0, 48_475.0, 103_350.0, 197_300.0, 250_525.0, 375_800.0];
const FEDERAL_HEAD: [f64; 6] = [17_000.0, 64_850.0, 103_350.0, 197_300.0, 250_500.0, 626_350.0];

const CALIFORNIA_RATES: [f64; 9] = [0.01, 0.02, 0.04, 0.06, 0.08, 0.093, 0.103, 0.113, 0.123];
const CALIFORNIA_SINGLE: [f64; 8] = [
    10_756.0, 25_499.0, 40_245.0, 55_866.0, 70_606.0, 360_659.0, 432_787.0, 721_314.0,
];
const CALIFORNIA_JOINT: [f64; 8] = [
    21_512.0, 50_998.0, 80_490.0, 111_732.0, 141_212.0, 721_318.0, 865_574.0, 1_442_628.0,
];
const CALIFORNIA_HEAD: [f64; 8] = [
    21_527.0, 51_000.0, 65_744.0, 81_364.0, 96_107.0, 490_493.0, 588_593.0, 980_987.0,
];

const OREGON_RATES: [f64; 4] = [0.0475, 0.0675, 0.0875, 0.099];
const OREGON_SINGLE: [f64; 3] = [4_300.0, 10_750.0, 125_000.0];
const OREGON_JOINT: [f64; 3] = [8_600.0, 21_500.0, 250_000.0];

impl BracketTax {
    pub fn new(
        jurisdiction: &'static str,
        schedules: [BracketSchedule; 4],
    ) -> Result<Self, CalcError> {
        let table = Self {
            jurisdiction,
            schedules,
        };
        table.validate()?;
        Ok(table)
    }

    /// Projected 2026 federal brackets.
    pub fn federal() -> Self {
        Self {
            jurisdiction: "federal",
            schedules: [
                BracketSchedule::from_static(&FEDERAL_SINGLE, &FEDERAL_RATES),
                BracketSchedule::from_static(&FEDERAL_JOINT, &FEDERAL_RATES),
                BracketSchedule::from_static(&FEDERAL_SEPARATE, &FEDERAL_RATES),
                BracketSchedule::from_static(&FEDERAL_HEAD, &FEDERAL_RATES),
            ],
        }
    }

    pub fn california() -> Self {
        Self {
            jurisdiction: "california",
            schedules: [
                BracketSchedule::from_static(&CALIFORNIA_SINGLE, &CALIFORNIA_RATES),
                BracketSchedule::from_static(&CALIFORNIA_JOINT, &CALIFORNIA_RATES),
                BracketSchedule::from_static(&CALIFORNIA_SINGLE, &CALIFORNIA_RATES),
                BracketSchedule::from_static(&CALIFORNIA_HEAD, &CALIFORNIA_RATES),
            ],
        }
    }

    pub fn oregon() -> Self {
        Self {
            jurisdiction: "oregon",
            schedules: [
                BracketSchedule::from_static(&OREGON_SINGLE, &OREGON_RATES),
                BracketSchedule::from_static(&OREGON_JOINT, &OREGON_RATES),
                BracketSchedule::from_static(&OREGON_SINGLE, &OREGON_RATES),
                BracketSchedule::from_static(&OREGON_JOINT, &OREGON_RATES),
            ],
        }
    }

    pub fn validate(&self) -> Result<(), CalcError> {
        for schedule in &self.schedules {
            BracketSchedule::new(schedule.bounds.clone(), schedule.rates.clone()).map_err(
                |reason| CalcError::InvalidBrackets {
                    jurisdiction: self.jurisdiction,
                    reason,
                },
            )?;
        }
        Ok(())
    }

    pub fn schedule(&self, status: FilingStatus) -> &BracketSchedule {
        &self.schedules[status.index()]
    }

    /// Upper bound of the bracket taxed at `rate`, if the table has one.
    pub fn bracket_ceiling(&self, status: FilingStatus, rate: f64) -> Option<f64> {
        self.schedule(status).ceiling_for_rate(rate)
    }
}

impl IncomeTax for BracketTax {
    fn jurisdiction(&self) -> &'static str {
        self.jurisdiction
    }

    fn tax(&self, income: f64, status: FilingStatus) -> Result<f64, CalcError> {
        let income = non_negative("taxable income", income)?;
        Ok(self.schedule(status).tax(income))
    }

    fn marginal_rate(&self, income: f64, status: FilingStatus) -> Result<f64, CalcError> {
        let income = non_negative("taxable income", income)?;
        Ok(self.schedule(status).marginal_rate(income))
    }

    fn gross_up(&self, net: f64, status: FilingStatus) -> Result<f64, CalcError> {
        let net = non_negative("net amount", net)?;
        Ok(self.schedule(status).gross_up(net))
    }
}

/// Jurisdiction without a personal income tax.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoIncomeTax;

impl IncomeTax for NoIncomeTax {
    fn jurisdiction(&self) -> &'static str {
        "none"
    }

    fn tax(&self, income: f64, _status: FilingStatus) -> Result<f64, CalcError> {
        non_negative("taxable income", income)?;
        Ok(0.0)
    }

    fn marginal_rate(&self, income: f64, _status: FilingStatus) -> Result<f64, CalcError> {
        non_negative("taxable income", income)?;
        Ok(0.0)
    }

    fn gross_up(&self, net: f64, _status: FilingStatus) -> Result<f64, CalcError> {
        non_negative("net amount", net)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StateJurisdiction {
    #[default]
    California,
    Oregon,
    #[serde(alias = "none")]
    NoIncomeTax,
}

impl StateJurisdiction {
    pub fn calculator(self) -> Box<dyn IncomeTax> {
        match self {
            StateJurisdiction::California => Box::new(BracketTax::california()),
            StateJurisdiction::Oregon => Box::new(BracketTax::oregon()),
            StateJurisdiction::NoIncomeTax => Box::new(NoIncomeTax),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const CENT: f64 = 0.01;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    fn calculators() -> Vec<Box<dyn IncomeTax>> {
        vec![
            Box::new(BracketTax::federal()),
            Box::new(BracketTax::california()),
            Box::new(BracketTax::oregon()),
            Box::new(NoIncomeTax),
        ]
    }

    #[test]
    fn builtin_tables_are_valid() {
        BracketTax::federal().validate().expect("federal");
        BracketTax::california().validate().expect("california");
        BracketTax::oregon().validate().expect("oregon");
    }

    #[test]
    fn federal_single_30k_spans_two_brackets() {
        let tax = BracketTax::federal()
            .tax(30_000.0, FilingStatus::Single)
            .expect("valid income");
        assert_approx(tax, 11_925.0 * 0.10 + (30_000.0 - 11_925.0) * 0.12);
    }

    #[test]
    fn income_above_last_bound_uses_top_rate() {
        let federal = BracketTax::federal();
        let at_bound = federal.tax(626_350.0, FilingStatus::Single).expect("tax");
        let above = federal.tax(726_350.0, FilingStatus::Single).expect("tax");
        assert_approx(above - at_bound, 100_000.0 * 0.37);
        assert_approx(
            federal
                .marginal_rate(1_000_000.0, FilingStatus::Single)
                .expect("rate"),
            0.37,
        );
    }

    #[test]
    fn zero_income_has_zero_tax_and_effective_rate() {
        for calc in calculators() {
            for status in FilingStatus::ALL {
                assert_approx(calc.tax(0.0, status).expect("tax"), 0.0);
                assert_approx(calc.effective_rate(0.0, status).expect("rate"), 0.0);
            }
        }
    }

    #[test]
    fn negative_income_is_rejected() {
        for calc in calculators() {
            assert!(calc.tax(-1.0, FilingStatus::Single).is_err());
            assert!(calc.gross_up(-1.0, FilingStatus::Single).is_err());
        }
    }

    #[test]
    fn bracket_ceiling_finds_22_percent_top() {
        let federal = BracketTax::federal();
        assert_eq!(
            federal.bracket_ceiling(FilingStatus::Single, 0.22),
            Some(103_350.0)
        );
        assert_eq!(
            federal.bracket_ceiling(FilingStatus::MarriedJoint, 0.22),
            Some(206_700.0)
        );
        assert_eq!(federal.bracket_ceiling(FilingStatus::Single, 0.37), None);
    }

    #[test]
    fn schedule_rejects_malformed_tables() {
        assert!(BracketSchedule::new(vec![10.0, 5.0], vec![0.1, 0.2, 0.3]).is_err());
        assert!(BracketSchedule::new(vec![10.0], vec![0.1]).is_err());
        assert!(BracketSchedule::new(vec![10.0], vec![0.1, 1.0]).is_err());
        assert!(BracketSchedule::new(vec![10.0, 20.0], vec![0.1, 0.2, 0.3]).is_ok());
    }

    #[test]
    fn custom_table_with_bad_schedule_is_rejected() {
        let bad = BracketSchedule {
            bounds: vec![100.0],
            rates: vec![0.1],
        };
        let good = BracketSchedule::new(vec![100.0], vec![0.1, 0.2]).expect("valid");
        let err = BracketTax::new("test", [bad, good.clone(), good.clone(), good])
            .expect_err("must reject");
        assert!(matches!(err, CalcError::InvalidBrackets { .. }));
    }

    #[test]
    fn no_income_tax_gross_up_is_identity() {
        assert_approx(
            NoIncomeTax
                .gross_up(42_000.0, FilingStatus::MarriedJoint)
                .expect("gross"),
            42_000.0,
        );
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(96))]

        #[test]
        fn prop_gross_up_round_trips_within_a_cent(net in 0u32..2_000_000, status_idx in 0usize..4) {
            let status = FilingStatus::ALL[status_idx];
            let net = net as f64;
            for calc in calculators() {
                let gross = calc.gross_up(net, status).expect("gross");
                let tax = calc.tax(gross, status).expect("tax");
                prop_assert!((gross - tax - net).abs() <= CENT, "{}: {gross} - {tax} != {net}", calc.jurisdiction());
            }
        }

        #[test]
        fn prop_tax_and_marginal_rate_are_monotone(a in 0u32..1_500_000, b in 0u32..1_500_000, status_idx in 0usize..4) {
            let status = FilingStatus::ALL[status_idx];
            let (lo, hi) = if a <= b { (a as f64, b as f64) } else { (b as f64, a as f64) };
            for calc in calculators() {
                prop_assert!(calc.tax(lo, status).expect("tax") <= calc.tax(hi, status).expect("tax") + 1e-9);
                prop_assert!(calc.marginal_rate(lo, status).expect("rate") <= calc.marginal_rate(hi, status).expect("rate"));
            }
        }
    }
}
