//! Per-gender, per-insurance-class correction parameters
//!
//! Each entry carries the age offsets (CX1, CX2 and, for partner products,
//! CX3) and the multiplicative corrections fnett, fcorr and fOTS applied to
//! the generated cash flows. One-year risk premiums deliberately reuse the
//! partner-class entries.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::Gender;
use crate::FactorError;

/// Insurance class an adjustment row applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InsuranceClass {
    #[serde(rename = "retire")]
    Retire,
    #[serde(rename = "partner")]
    Partner,
    #[serde(rename = "risk")]
    Risk,
}

impl InsuranceClass {
    pub fn code(&self) -> &'static str {
        match self {
            InsuranceClass::Retire => "retire",
            InsuranceClass::Partner => "partner",
            InsuranceClass::Risk => "risk",
        }
    }

    pub fn parse(code: &str) -> Result<Self, FactorError> {
        match code {
            "retire" => Ok(InsuranceClass::Retire),
            "partner" => Ok(InsuranceClass::Partner),
            "risk" => Ok(InsuranceClass::Risk),
            other => Err(FactorError::MalformedTable(format!(
                "unknown insurance class {other:?}"
            ))),
        }
    }
}

impl fmt::Display for InsuranceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One adjustment row
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AdjustmentEntry {
    /// Age offset applied to the insured for survival-probability anchors
    pub cx1: i32,
    /// Age offset applied to the insured for the annuity table anchor
    pub cx2: i32,
    /// Age offset applied to the beneficiary; partner products only
    pub cx3: Option<i32>,
    pub fnett: f64,
    pub fcorr: f64,
    #[serde(rename = "fOTS")]
    pub f_ots: f64,
}

impl AdjustmentEntry {
    /// Offsets and corrections that leave cash flows unchanged
    pub fn neutral() -> Self {
        Self {
            cx1: 0,
            cx2: 0,
            cx3: Some(0),
            fnett: 1.0,
            fcorr: 1.0,
            f_ots: 1.0,
        }
    }

    /// The combined multiplicative correction fnett * fcorr * fOTS
    pub fn combined_factor(&self) -> f64 {
        self.fnett * self.fcorr * self.f_ots
    }
}

/// All adjustment rows, keyed by gender and insurance class
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdjustmentRegistry {
    entries: HashMap<(Gender, InsuranceClass), AdjustmentEntry>,
}

impl AdjustmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with neutral entries for every combination; test scaffolding
    /// and sensitivity baselines
    pub fn neutral() -> Self {
        let mut registry = Self::new();
        for gender in Gender::BOTH {
            for class in [
                InsuranceClass::Retire,
                InsuranceClass::Partner,
                InsuranceClass::Risk,
            ] {
                registry.insert(gender, class, AdjustmentEntry::neutral());
            }
        }
        registry
    }

    pub fn insert(&mut self, gender: Gender, class: InsuranceClass, entry: AdjustmentEntry) {
        self.entries.insert((gender, class), entry);
    }

    pub fn remove(&mut self, gender: Gender, class: InsuranceClass) -> Option<AdjustmentEntry> {
        self.entries.remove(&(gender, class))
    }

    pub fn get(
        &self,
        gender: Gender,
        class: InsuranceClass,
    ) -> Result<&AdjustmentEntry, FactorError> {
        self.entries
            .get(&(gender, class))
            .ok_or(FactorError::MissingAdjustment { gender, class })
    }

    /// CX3 of the beneficiary's row; partner products require it
    pub fn cx3(&self, gender: Gender, class: InsuranceClass) -> Result<i32, FactorError> {
        self.get(gender, class)?
            .cx3
            .ok_or(FactorError::MissingPartnerOffset { gender, class })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_factor() {
        let entry = AdjustmentEntry {
            cx1: -1,
            cx2: -2,
            cx3: None,
            fnett: 0.98,
            fcorr: 1.02,
            f_ots: 1.01,
        };
        assert!((entry.combined_factor() - 0.98 * 1.02 * 1.01).abs() < 1e-12);
    }

    #[test]
    fn test_missing_combination_is_reported() {
        let registry = AdjustmentRegistry::new();
        assert_eq!(
            registry
                .get(Gender::Male, InsuranceClass::Partner)
                .unwrap_err(),
            FactorError::MissingAdjustment {
                gender: Gender::Male,
                class: InsuranceClass::Partner
            }
        );
    }

    #[test]
    fn test_missing_cx3_is_reported() {
        let mut registry = AdjustmentRegistry::new();
        let entry = AdjustmentEntry {
            cx3: None,
            ..AdjustmentEntry::neutral()
        };
        registry.insert(Gender::Female, InsuranceClass::Partner, entry);
        assert_eq!(
            registry
                .cx3(Gender::Female, InsuranceClass::Partner)
                .unwrap_err(),
            FactorError::MissingPartnerOffset {
                gender: Gender::Female,
                class: InsuranceClass::Partner
            }
        );
    }
}
