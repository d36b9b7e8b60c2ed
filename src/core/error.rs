use thiserror::Error;

/// Usage errors raised by the calculators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("{name} must be a finite, non-negative amount (got {value})")]
    NegativeAmount { name: &'static str, value: f64 },

    #[error("{name} must be between {min} and {max} (got {value})")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("mortgage term must be at least one period (got {0})")]
    InvalidTerm(u32),

    #[error("no uniform lifetime factor below age {min} (got age {age})")]
    AgeBelowTable { age: u32, min: u32 },

    #[error("invalid bracket table for {jurisdiction}: {reason}")]
    InvalidBrackets {
        jurisdiction: &'static str,
        reason: String,
    },
}

/// Errors surfaced by the projection driver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error(transparent)]
    Calc(#[from] CalcError),

    #[error("entry '{description}': {reason}")]
    InvalidEntry { description: String, reason: String },

    #[error("entry '{description}' is owned by unknown person '{owner}'")]
    UnknownOwner { description: String, owner: String },

    #[error("entries were supplied but the household has no persons")]
    NoPersons,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("year {year} failed consistency check: {detail}")]
    Inconsistent { year: i32, detail: String },
}

pub(crate) fn non_negative(name: &'static str, value: f64) -> Result<f64, CalcError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(CalcError::NegativeAmount { name, value })
    }
}

pub(crate) fn in_unit_range(name: &'static str, value: f64) -> Result<f64, CalcError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(CalcError::OutOfRange {
            name,
            value,
            min: 0.0,
            max: 1.0,
        })
    }
}
