use crate::core::error::{CalcError, non_negative};

pub const UNIFORM_TABLE_MIN_AGE: u32 = 72;
pub const UNIFORM_TABLE_MAX_AGE: u32 = 120;

/// IRS uniform lifetime table, one factor per age starting at 72.
const UNIFORM_LIFETIME: [f64; 49] = [
    27.4, 26.5, 25.5, 24.6, 23.7, 22.9, 22.0, 21.1, 20.2, 19.4, // 72-81
    18.5, 17.7, 16.8, 16.0, 15.2, 14.4, 13.7, 12.9, 12.2, 11.5, // 82-91
    10.8, 10.1, 9.5, 8.9, 8.4, 7.8, 7.3, 6.8, 6.4, 6.0, // 92-101
    5.6, 5.2, 4.9, 4.6, 4.3, 4.1, 3.9, 3.7, 3.5, 3.4, // 102-111
    3.3, 3.1, 3.0, 2.9, 2.8, 2.7, 2.5, 2.3, 2.0, // 112-120
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RmdCalculator;

impl RmdCalculator {
    /// Age at which distributions become mandatory for a birth year.
    pub fn start_age(&self, birth_year: i32) -> u32 {
        match birth_year {
            ..=1950 => 72,
            1951..=1959 => 73,
            _ => 75,
        }
    }

    /// Life expectancy factor, clamped at the top of the table.
    pub fn factor(&self, age: u32) -> Result<f64, CalcError> {
        if age < UNIFORM_TABLE_MIN_AGE {
            return Err(CalcError::AgeBelowTable {
                age,
                min: UNIFORM_TABLE_MIN_AGE,
            });
        }
        let index = (age.min(UNIFORM_TABLE_MAX_AGE) - UNIFORM_TABLE_MIN_AGE) as usize;
        Ok(UNIFORM_LIFETIME[index])
    }

    pub fn required_distribution(
        &self,
        prior_year_end_balance: f64,
        age: u32,
    ) -> Result<f64, CalcError> {
        let balance = non_negative("prior year qualified balance", prior_year_end_balance)?;
        if balance == 0.0 {
            return Ok(0.0);
        }
        Ok(balance / self.factor(age)?)
    }

    /// RMD owed in the year a person reaches `age`, zero before their start age.
    pub fn required_for_person(
        &self,
        birth_year: i32,
        age: u32,
        prior_year_end_balance: f64,
    ) -> Result<f64, CalcError> {
        if age < self.start_age(birth_year) {
            return Ok(0.0);
        }
        self.required_distribution(prior_year_end_balance, age)
    }
}
