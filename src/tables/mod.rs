//! Loaded valuation tables: survival counts, hazard rates, adjustment
//! parameters, the optional benefit-exchange table, and the per-table
//! tariff parameters.
//!
//! Everything in this module is built once by the loading layer and is
//! read-only for the lifetime of the valuation context.

mod adjustments;
mod exchange;
mod generation;
mod hazard;
pub mod loader;
mod mortality;

pub use adjustments::{AdjustmentEntry, AdjustmentRegistry, InsuranceClass};
pub use exchange::{ExchangeRow, ExchangeTable};
pub use generation::QxSurface;
pub use hazard::HazardTable;
pub use mortality::{MortalityModel, SurvivalRow, MAX_AGE};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Youngest age covered by the factor tables.
pub const LOW_AGE: u32 = 15;

/// Upper age bound for the factor tables (exclusive).
pub const UP_AGE: u32 = 70;

/// Sex of an insured or beneficiary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    pub const BOTH: [Gender; 2] = [Gender::Male, Gender::Female];

    /// Single-letter table code
    pub fn code(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    /// Parse a table code, rejecting anything but "M" and "F"
    pub fn parse(code: &str) -> Result<Self, crate::FactorError> {
        match code {
            "M" => Ok(Gender::Male),
            "F" => Ok(Gender::Female),
            other => Err(crate::FactorError::UnknownSex(other.to_string())),
        }
    }

    /// The modeled partner is always of the opposite sex
    pub fn partner(&self) -> Gender {
        match self {
            Gender::Male => Gender::Female,
            Gender::Female => Gender::Male,
        }
    }

    /// Sign convention for the partner age difference: male insureds have a
    /// partner `delta` years younger, female insureds `delta` years older.
    pub fn age_gap_sign(&self) -> i32 {
        match self {
            Gender::Male => 1,
            Gender::Female => -1,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A value per gender
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ByGender<T> {
    pub male: T,
    pub female: T,
}

impl<T> ByGender<T> {
    pub fn new(male: T, female: T) -> Self {
        Self { male, female }
    }

    pub fn get(&self, gender: Gender) -> &T {
        match gender {
            Gender::Male => &self.male,
            Gender::Female => &self.female,
        }
    }
}

/// Scalar tariff parameters shared by all products of one table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TariffParams {
    /// Assumed age difference between insured and partner, in years
    pub delta: i32,
    /// Decimal precision used when a rounded present value is requested
    pub round_decimals: u32,
}

impl Default for TariffParams {
    fn default() -> Self {
        Self {
            delta: 3,
            round_decimals: 4,
        }
    }
}

/// The full set of tables a valuation context works from
#[derive(Debug, Clone)]
pub struct TableSet {
    pub mortality: MortalityModel,
    pub hazard: HazardTable,
    pub adjustments: AdjustmentRegistry,
    /// Benefit-exchange factors; only consulted by the NPLLRU product
    pub exchange: Option<ExchangeTable>,
    pub tariff: TariffParams,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Synthetic table set with linear lx columns and neutral adjustments,
    /// cheap to reason about by hand in product tests:
    /// male lx(x) = 1210 - 10x, female lx(x) = 1210 - 9x.
    pub(crate) fn linear_table_set() -> TableSet {
        let male_lx = (0..=MAX_AGE).map(|x| 1210.0 - 10.0 * x as f64).collect();
        let female_lx = (0..=MAX_AGE).map(|x| 1210.0 - 9.0 * x as f64).collect();
        let male_hx = (0..=MAX_AGE).map(|x| 0.5 + 0.001 * x as f64).collect();
        let female_hx = (0..=MAX_AGE).map(|x| 0.6 + 0.001 * x as f64).collect();

        TableSet {
            mortality: MortalityModel::flat(male_lx, female_lx).unwrap(),
            hazard: HazardTable::new(male_hx, female_hx),
            adjustments: AdjustmentRegistry::neutral(),
            exchange: Some(ExchangeTable::new(vec![
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
            ])),
            tariff: TariffParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_codes() {
        assert_eq!(Gender::Male.code(), "M");
        assert_eq!(Gender::parse("F").unwrap(), Gender::Female);
        assert!(Gender::parse("X").is_err());
        assert_eq!(Gender::Male.partner(), Gender::Female);
        assert_eq!(Gender::Female.age_gap_sign(), -1);
    }

    #[test]
    fn test_gender_serde_roundtrip() {
        let json = serde_json::to_string(&Gender::Male).unwrap();
        assert_eq!(json, "\"M\"");
        let back: Gender = serde_json::from_str("\"F\"").unwrap();
        assert_eq!(back, Gender::Female);
    }
}
