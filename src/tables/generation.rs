//! Flattening of generation mortality surfaces
//!
//! A generation table gives one-year death probabilities qx(age, year) on a
//! two-dimensional surface. For a cohort observed at anchor age `a` in the
//! calculation year, the relevant probabilities run down the diagonal
//! qx(a, y0), qx(a+1, y0+1), ... . Flattening turns each diagonal into a
//! survival column normalized to lx(a) = 1, so downstream code can treat
//! generation tables exactly like flat ones, one column per anchor age.

use serde::{Deserialize, Serialize};

use super::mortality::MAX_AGE;
use crate::FactorError;

/// A qx surface: `rates[age][k]` is the one-year death probability at `age`
/// in year `start_year + k`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QxSurface {
    start_year: i32,
    rates: Vec<Vec<f64>>,
}

impl QxSurface {
    /// Validates shape (one row per age 0..=MAX_AGE, uniform year count) and
    /// that every rate is a probability.
    pub fn new(start_year: i32, rates: Vec<Vec<f64>>) -> Result<Self, FactorError> {
        if rates.len() != (MAX_AGE + 1) as usize {
            return Err(FactorError::MalformedTable(format!(
                "qx surface has {} age rows, expected {}",
                rates.len(),
                MAX_AGE + 1
            )));
        }
        let years = rates[0].len();
        for (age, row) in rates.iter().enumerate() {
            if row.len() != years {
                return Err(FactorError::MalformedTable(format!(
                    "qx surface row for age {age} has {} years, expected {years}",
                    row.len()
                )));
            }
            if let Some(q) = row.iter().find(|q| !(0.0..=1.0).contains(*q)) {
                return Err(FactorError::MalformedTable(format!(
                    "qx surface has out-of-range rate {q} at age {age}"
                )));
            }
        }
        if years == 0 {
            return Err(FactorError::MalformedTable(
                "qx surface has no year columns".to_string(),
            ));
        }
        Ok(Self { start_year, rates })
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    fn years(&self) -> usize {
        self.rates[0].len()
    }
}

/// Flatten a surface into one lx column per anchor age for `calc_year`.
///
/// Column `a` holds lx for ages a, a+1, ... along the cohort diagonal that
/// starts at (a, calc_year), with lx(a) = 1. Columns are truncated where the
/// surface runs out of years.
pub fn flatten_surface(surface: &QxSurface, calc_year: i32) -> Result<Vec<Vec<f64>>, FactorError> {
    let skip = calc_year - surface.start_year;
    if skip < 0 {
        return Err(FactorError::CalcYearBeforeTable {
            calc_year,
            start_year: surface.start_year,
        });
    }
    let skip = skip as usize;
    if skip >= surface.years() {
        return Err(FactorError::MalformedTable(format!(
            "qx surface ends before calculation year {calc_year}"
        )));
    }
    let years_available = surface.years() - skip;

    let mut columns = Vec::with_capacity((MAX_AGE + 1) as usize);
    for anchor in 0..=MAX_AGE as usize {
        let len = (MAX_AGE as usize + 1 - anchor).min(years_available);
        let mut lx = Vec::with_capacity(len);
        lx.push(1.0);
        for j in 1..len {
            let q = surface.rates[anchor + j - 1][skip + j - 1];
            let prev = lx[j - 1];
            lx.push(prev * (1.0 - q));
        }
        columns.push(lx);
    }
    Ok(columns)
}
