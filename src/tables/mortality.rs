//! Survival-count (lx) tables and the probabilities derived from them
//!
//! Two table flavours exist:
//! - Flat tables: one lx column per gender, indexed by age. The same column
//!   is valid whatever the current age of the insured.
//! - Generation tables: survival depends on both age and the year the cohort
//!   is observed. The two-dimensional qx surface is flattened at construction
//!   into one lx column per anchor age (see [`QxSurface`]), each normalized
//!   to 1 at its anchor.
//!
//! `npx`, `qx` and `nqx` are pure functions of the table and their inputs.

use serde::{Deserialize, Serialize};

use super::generation::{flatten_surface, QxSurface};
use super::{ByGender, Gender};
use crate::FactorError;

/// Highest age carried by the tables; older ages are clamped here.
pub const MAX_AGE: u32 = 120;

/// Per-gender survival-count tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MortalityModel {
    /// lx indexed by age 0..=MAX_AGE, same column for every current age
    Flat(ByGender<Vec<f64>>),
    /// One lx column per anchor age, `columns[anchor][t]` = lx at age
    /// `anchor + t` for the cohort observed at `anchor` in the calculation
    /// year, normalized to lx(anchor) = 1
    Generation(ByGender<Vec<Vec<f64>>>),
}

/// A survival column as seen from one current age
#[derive(Debug, Clone, Copy)]
pub struct SurvivalRow<'a> {
    start_age: u32,
    lx: &'a [f64],
}

impl<'a> SurvivalRow<'a> {
    pub fn start_age(&self) -> u32 {
        self.start_age
    }

    /// Number of tabulated ages in this row
    pub fn len(&self) -> usize {
        self.lx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lx.is_empty()
    }

    /// lx at an absolute age, None outside the tabulated range
    pub fn lx(&self, age: u32) -> Option<f64> {
        age.checked_sub(self.start_age)
            .and_then(|i| self.lx.get(i as usize))
            .copied()
    }
}

fn validate_flat_column(gender: Gender, lx: &[f64]) -> Result<(), FactorError> {
    if lx.len() != (MAX_AGE + 1) as usize {
        return Err(FactorError::MalformedTable(format!(
            "lx column for {gender} has {} rows, expected {}",
            lx.len(),
            MAX_AGE + 1
        )));
    }
    if let Some(age) = lx.iter().position(|v| *v < 0.0) {
        return Err(FactorError::MalformedTable(format!(
            "lx column for {gender} is negative at age {age}"
        )));
    }
    for (age, pair) in lx.windows(2).enumerate() {
        if pair[1] > pair[0] {
            return Err(FactorError::MalformedTable(format!(
                "lx column for {gender} is not non-increasing at age {age}"
            )));
        }
    }
    Ok(())
}

impl MortalityModel {
    /// Build a flat table from one lx column per gender
    pub fn flat(male: Vec<f64>, female: Vec<f64>) -> Result<Self, FactorError> {
        validate_flat_column(Gender::Male, &male)?;
        validate_flat_column(Gender::Female, &female)?;
        Ok(MortalityModel::Flat(ByGender::new(male, female)))
    }

    /// Flatten a generation qx surface into per-anchor lx columns for the
    /// given calculation year
    pub fn generation(
        male: &QxSurface,
        female: &QxSurface,
        calc_year: i32,
    ) -> Result<Self, FactorError> {
        Ok(MortalityModel::Generation(ByGender::new(
            flatten_surface(male, calc_year)?,
            flatten_surface(female, calc_year)?,
        )))
    }

    /// The survival column for a person of `current_age`. Ages above
    /// MAX_AGE are clamped to MAX_AGE.
    pub fn row(&self, gender: Gender, current_age: u32) -> SurvivalRow<'_> {
        let clamped = current_age.min(MAX_AGE);
        match self {
            MortalityModel::Flat(columns) => SurvivalRow {
                start_age: 0,
                lx: columns.get(gender),
            },
            MortalityModel::Generation(columns) => SurvivalRow {
                start_age: clamped,
                lx: &columns.get(gender)[clamped as usize],
            },
        }
    }

    /// Survival columns for both genders at one current age
    pub fn rows_at(&self, current_age: u32) -> ByGender<SurvivalRow<'_>> {
        ByGender::new(
            self.row(Gender::Male, current_age),
            self.row(Gender::Female, current_age),
        )
    }

    /// Probability that a person of `age` survives `nyears` more years
    pub fn npx(&self, age: u32, sex: Gender, nyears: u32) -> Result<f64, FactorError> {
        let current_age = age.min(MAX_AGE);
        let future_age = (age + nyears).min(MAX_AGE);
        let row = self.row(sex, current_age);
        let denom = row
            .lx(current_age)
            .ok_or(FactorError::AgeOutOfRange { age: current_age })?;
        if denom == 0.0 {
            return Err(FactorError::ZeroSurvivors { age: current_age });
        }
        let numer = row
            .lx(future_age)
            .ok_or(FactorError::AgeOutOfRange { age: future_age })?;
        Ok(numer / denom)
    }

    /// Probability that a person of `age` dies within one year
    pub fn qx(&self, age: u32, sex: Gender) -> Result<f64, FactorError> {
        Ok(1.0 - self.npx(age, sex, 1)?)
    }

    /// Probability of death in the interval (nyears - 1, nyears]
    pub fn nqx(&self, age: u32, sex: Gender, nyears: u32) -> Result<f64, FactorError> {
        if nyears == 0 {
            return Ok(0.0);
        }
        Ok(self.npx(age, sex, nyears - 1)? - self.npx(age, sex, nyears)?)
    }
}
