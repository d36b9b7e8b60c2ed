use serde::{Deserialize, Serialize};

use crate::core::error::{CalcError, in_unit_range, non_negative};
use crate::core::types::{Employment, FilingStatus};

pub const DEFAULT_SOCIAL_SECURITY_WAGE_BASE: f64 = 168_600.0;
pub const ADDITIONAL_MEDICARE_RATE: f64 = 0.009;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FicaConfig {
    pub wage_base: f64,
    pub employee_social_security_rate: f64,
    pub self_employed_social_security_rate: f64,
    pub employee_medicare_rate: f64,
    pub self_employed_medicare_rate: f64,
    pub additional_medicare_rate: f64,
    pub single_threshold: f64,
    pub joint_threshold: f64,
    pub separate_threshold: f64,
}

impl Default for FicaConfig {
    fn default() -> Self {
        Self {
            wage_base: DEFAULT_SOCIAL_SECURITY_WAGE_BASE,
            employee_social_security_rate: 0.062,
            self_employed_social_security_rate: 0.124,
            employee_medicare_rate: 0.0145,
            self_employed_medicare_rate: 0.029,
            additional_medicare_rate: ADDITIONAL_MEDICARE_RATE,
            single_threshold: 200_000.0,
            joint_threshold: 250_000.0,
            separate_threshold: 125_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FicaCalculator {
    config: FicaConfig,
}

impl FicaCalculator {
    pub fn new(config: FicaConfig) -> Result<Self, CalcError> {
        non_negative("social security wage base", config.wage_base)?;
        in_unit_range("social security rate", config.employee_social_security_rate)?;
        in_unit_range(
            "self-employed social security rate",
            config.self_employed_social_security_rate,
        )?;
        in_unit_range("medicare rate", config.employee_medicare_rate)?;
        in_unit_range("self-employed medicare rate", config.self_employed_medicare_rate)?;
        in_unit_range("additional medicare rate", config.additional_medicare_rate)?;
        non_negative("single medicare threshold", config.single_threshold)?;
        non_negative("joint medicare threshold", config.joint_threshold)?;
        non_negative("separate medicare threshold", config.separate_threshold)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FicaConfig {
        &self.config
    }

    pub fn social_security_tax(
        &self,
        wages: f64,
        employment: Employment,
    ) -> Result<f64, CalcError> {
        let wages = non_negative("wages", wages)?;
        let rate = match employment {
            Employment::Employee => self.config.employee_social_security_rate,
            Employment::SelfEmployed => self.config.self_employed_social_security_rate,
        };
        Ok(wages.min(self.config.wage_base) * rate)
    }

    pub fn medicare_tax(&self, wages: f64, employment: Employment) -> Result<f64, CalcError> {
        let wages = non_negative("wages", wages)?;
        let rate = match employment {
            Employment::Employee => self.config.employee_medicare_rate,
            Employment::SelfEmployed => self.config.self_employed_medicare_rate,
        };
        Ok(wages * rate)
    }

    pub fn additional_medicare_threshold(&self, status: FilingStatus) -> f64 {
        match status {
            FilingStatus::Single | FilingStatus::HeadOfHousehold => self.config.single_threshold,
            FilingStatus::MarriedJoint => self.config.joint_threshold,
            FilingStatus::MarriedSeparate => self.config.separate_threshold,
        }
    }

    pub fn additional_medicare_tax(
        &self,
        wages: f64,
        status: FilingStatus,
    ) -> Result<f64, CalcError> {
        let wages = non_negative("wages", wages)?;
        let excess = (wages - self.additional_medicare_threshold(status)).max(0.0);
        Ok(excess * self.config.additional_medicare_rate)
    }
}

impl Default for FicaCalculator {
    fn default() -> Self {
        Self {
            config: FicaConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn social_security_caps_at_wage_base() {
        let fica = FicaCalculator::default();
        assert_approx(
            fica.social_security_tax(100_000.0, Employment::Employee)
                .expect("tax"),
            6_200.0,
        );
        assert_approx(
            fica.social_security_tax(250_000.0, Employment::Employee)
                .expect("tax"),
            168_600.0 * 0.062,
        );
        assert_approx(
            fica.social_security_tax(250_000.0, Employment::SelfEmployed)
                .expect("tax"),
            168_600.0 * 0.124,
        );
    }

    #[test]
    fn medicare_is_uncapped() {
        let fica = FicaCalculator::default();
        assert_approx(
            fica.medicare_tax(1_000_000.0, Employment::Employee)
                .expect("tax"),
            14_500.0,
        );
        assert_approx(
            fica.medicare_tax(100_000.0, Employment::SelfEmployed)
                .expect("tax"),
            2_900.0,
        );
    }

    #[test]
    fn additional_medicare_threshold_depends_on_filing_status() {
        let fica = FicaCalculator::default();
        let wages = 300_000.0;
        assert_approx(
            fica.additional_medicare_tax(wages, FilingStatus::Single)
                .expect("tax"),
            100_000.0 * 0.009,
        );
        assert_approx(
            fica.additional_medicare_tax(wages, FilingStatus::HeadOfHousehold)
                .expect("tax"),
            100_000.0 * 0.009,
        );
        assert_approx(
            fica.additional_medicare_tax(wages, FilingStatus::MarriedJoint)
                .expect("tax"),
            50_000.0 * 0.009,
        );
        assert_approx(
            fica.additional_medicare_tax(wages, FilingStatus::MarriedSeparate)
                .expect("tax"),
            175_000.0 * 0.009,
        );
        assert_approx(
            fica.additional_medicare_tax(150_000.0, FilingStatus::Single)
                .expect("tax"),
            0.0,
        );
    }

    #[test]
    fn custom_wage_base_is_honoured() {
        let fica = FicaCalculator::new(FicaConfig {
            wage_base: 100_000.0,
            ..FicaConfig::default()
        })
        .expect("valid config");
        assert_approx(
            fica.social_security_tax(150_000.0, Employment::Employee)
                .expect("tax"),
            6_200.0,
        );
    }

    #[test]
    fn rejects_negative_wages_and_bad_rates() {
        let fica = FicaCalculator::default();
        assert!(fica.social_security_tax(-1.0, Employment::Employee).is_err());
        assert!(fica.medicare_tax(-1.0, Employment::Employee).is_err());
        assert!(fica.additional_medicare_tax(-1.0, FilingStatus::Single).is_err());
        assert!(
            FicaCalculator::new(FicaConfig {
                employee_medicare_rate: 1.5,
                ..FicaConfig::default()
            })
            .is_err()
        );
    }
}
