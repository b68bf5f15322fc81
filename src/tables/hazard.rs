//! Secondary hazard (hx) table used in partner-pension blending

use serde::{Deserialize, Serialize};

use super::{ByGender, Gender};
use crate::FactorError;

/// Per-gender hx rates indexed by age starting at 0
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardTable {
    rates: ByGender<Vec<f64>>,
}

impl HazardTable {
    pub fn new(male: Vec<f64>, female: Vec<f64>) -> Self {
        Self {
            rates: ByGender::new(male, female),
        }
    }

    /// hx at an age, erroring outside the loaded range
    pub fn hx(&self, gender: Gender, age: u32) -> Result<f64, FactorError> {
        self.rates
            .get(gender)
            .get(age as usize)
            .copied()
            .ok_or(FactorError::AgeOutOfRange { age })
    }

    /// Average of hx at `age` and `age + 1`, the blending used by the
    /// undefined-partner products
    pub fn hx_avg(&self, gender: Gender, age: u32) -> Result<f64, FactorError> {
        Ok((self.hx(gender, age)? + self.hx(gender, age + 1)?) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hx_lookup_and_average() {
        let male: Vec<f64> = (0..=120).map(|x| 0.5 + 0.001 * x as f64).collect();
        let female: Vec<f64> = (0..=120).map(|x| 0.6 + 0.001 * x as f64).collect();
        let table = HazardTable::new(male, female);

        assert!((table.hx(Gender::Male, 60).unwrap() - 0.56).abs() < 1e-12);
        assert!((table.hx_avg(Gender::Female, 60).unwrap() - 0.6605).abs() < 1e-12);
        assert_eq!(
            table.hx(Gender::Male, 121).unwrap_err(),
            FactorError::AgeOutOfRange { age: 121 }
        );
    }
}
