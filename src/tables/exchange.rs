//! Benefit-exchange factors for the NPLLRU undefined-partner product
//!
//! Keyed by (gender, pension age, interest rate). A missing row is not an
//! error: the caller logs a warning and falls back to 1.0, matching the
//! factors already published from the legacy tables.

use serde::{Deserialize, Serialize};

use super::Gender;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRow {
    pub gender: Gender,
    pub pension_age: u32,
    /// Interest rate in percent the row was tabulated at
    #[serde(rename = "intrest")]
    pub rate: f64,
    pub hx: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangeTable {
    rows: Vec<ExchangeRow>,
}

impl ExchangeTable {
    pub fn new(rows: Vec<ExchangeRow>) -> Self {
        Self { rows }
    }

    /// Exact-key lookup, None when the combination was never tabulated
    pub fn factor(&self, gender: Gender, pension_age: u32, rate: f64) -> Option<f64> {
        self.rows
            .iter()
            .find(|row| row.gender == gender && row.pension_age == pension_age && row.rate == rate)
            .map(|row| row.hx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_key_lookup() {
        let table = ExchangeTable::new(vec![
            ExchangeRow {
                gender: Gender::Male,
                pension_age: 67,
                rate: 3.0,
                hx: 0.92,
            },
            ExchangeRow {
                gender: Gender::Female,
                pension_age: 67,
                rate: 3.0,
                hx: 0.95,
            },
        ]);

        assert_eq!(table.factor(Gender::Male, 67, 3.0), Some(0.92));
        assert_eq!(table.factor(Gender::Male, 67, 2.5), None);
        assert_eq!(table.factor(Gender::Male, 65, 3.0), None);
    }
}
