use crate::core::error::{CalcError, in_unit_range, non_negative};

pub const DEFAULT_COST_BASIS_FRACTION: f64 = 0.25;
pub const DEFAULT_CAPITAL_GAINS_RATE: f64 = 0.20;

/// Long-term gains under a flat assumed cost basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapitalGainsCalculator {
    cost_basis_fraction: f64,
    rate: f64,
}

impl CapitalGainsCalculator {
    pub fn new(cost_basis_fraction: f64, rate: f64) -> Result<Self, CalcError> {
        Ok(Self {
            cost_basis_fraction: in_unit_range("cost basis fraction", cost_basis_fraction)?,
            rate: in_unit_range("capital gains rate", rate)?,
        })
    }

    pub fn cost_basis_fraction(&self) -> f64 {
        self.cost_basis_fraction
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn gain(&self, proceeds: f64) -> Result<f64, CalcError> {
        let proceeds = non_negative("sale proceeds", proceeds)?;
        Ok(proceeds * (1.0 - self.cost_basis_fraction))
    }

    pub fn tax(&self, proceeds: f64) -> Result<f64, CalcError> {
        Ok(self.gain(proceeds)? * self.rate)
    }

    pub fn net_proceeds(&self, proceeds: f64) -> Result<f64, CalcError> {
        Ok(proceeds - self.tax(proceeds)?)
    }

    /// Gross sale needed to keep `net` after tax.
    pub fn calculate_total_sales_proceeds(&self, net: f64) -> Result<f64, CalcError> {
        let net = non_negative("net proceeds", net)?;
        let keep = 1.0 - (1.0 - self.cost_basis_fraction) * self.rate;
        if keep <= 0.0 {
            return Err(CalcError::OutOfRange {
                name: "capital gains rate",
                value: self.rate,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(net / keep)
    }
}

impl Default for CapitalGainsCalculator {
    fn default() -> Self {
        Self {
            cost_basis_fraction: DEFAULT_COST_BASIS_FRACTION,
            rate: DEFAULT_CAPITAL_GAINS_RATE,
        }
    }
}
