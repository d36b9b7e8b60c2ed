use serde::Serialize;

use crate::core::error::{CalcError, non_negative};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationRow {
    pub period: u32,
    pub payment: f64,
    pub interest: f64,
    pub principal: f64,
    pub closing_balance: f64,
}

/// Fixed-payment amortization, one payment per period at `rate` per period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MortgageCalculator;

impl MortgageCalculator {
    pub fn payment(&self, principal: f64, rate: f64, periods: u32) -> Result<f64, CalcError> {
        let (principal, rate) = validate(principal, rate, periods)?;
        if rate == 0.0 {
            return Ok(principal / f64::from(periods));
        }
        let growth = (1.0 + rate).powi(periods_i32(periods));
        Ok(principal * rate * growth / (growth - 1.0))
    }

    /// Balance left after `paid` payments, floored at zero.
    pub fn remaining_balance(
        &self,
        principal: f64,
        rate: f64,
        periods: u32,
        paid: u32,
    ) -> Result<f64, CalcError> {
        let (principal, rate) = validate(principal, rate, periods)?;
        let paid = paid.min(periods);
        let balance = if rate == 0.0 {
            principal * f64::from(periods - paid) / f64::from(periods)
        } else {
            let full = (1.0 + rate).powi(periods_i32(periods));
            let done = (1.0 + rate).powi(periods_i32(paid));
            principal * (full - done) / (full - 1.0)
        };
        Ok(balance.max(0.0))
    }

    pub fn interest_portion(&self, balance: f64, rate: f64) -> Result<f64, CalcError> {
        Ok(non_negative("mortgage balance", balance)? * non_negative("mortgage rate", rate)?)
    }

    pub fn principal_portion(
        &self,
        payment: f64,
        balance: f64,
        rate: f64,
    ) -> Result<f64, CalcError> {
        let payment = non_negative("mortgage payment", payment)?;
        Ok((payment - self.interest_portion(balance, rate)?).max(0.0))
    }

    pub fn schedule(
        &self,
        principal: f64,
        rate: f64,
        periods: u32,
    ) -> Result<Vec<AmortizationRow>, CalcError> {
        let payment = self.payment(principal, rate, periods)?;
        let mut balance = principal;
        let mut rows = Vec::with_capacity(periods as usize);
        for period in 1..=periods {
            let interest = self.interest_portion(balance, rate)?;
            let principal_paid = (payment - interest).min(balance).max(0.0);
            balance = (balance - principal_paid).max(0.0);
            if period == periods && balance < 0.01 {
                balance = 0.0;
            }
            rows.push(AmortizationRow {
                period,
                payment,
                interest,
                principal: principal_paid,
                closing_balance: balance,
            });
        }
        Ok(rows)
    }
}

fn validate(principal: f64, rate: f64, periods: u32) -> Result<(f64, f64), CalcError> {
    if periods == 0 {
        return Err(CalcError::InvalidTerm(periods));
    }
    Ok((
        non_negative("mortgage principal", principal)?,
        non_negative("mortgage rate", rate)?,
    ))
}

fn periods_i32(periods: u32) -> i32 {
    i32::try_from(periods).unwrap_or(i32::MAX)
}
