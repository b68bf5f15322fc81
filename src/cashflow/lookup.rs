//! Interest-rate-indexed lookup table for the undefined-partner products
//!
//! Building the table prices the averaged beneficiary annuity at every age
//! in the supported range, so it is memoized against the single most
//! recently used interest rate. The cache is correctness-relevant, not just
//! a speed-up: undefined-partner cash flows before pension age are defined
//! in terms of these rows, so a rebuild must be exact and deterministic for
//! a given rate.

use serde::{Deserialize, Serialize};

use super::products::{beneficiary_annuity, Product};
use super::series::PaymentSeries;
use crate::tables::{ByGender, Gender, InsuranceClass, TableSet, LOW_AGE, UP_AGE};
use crate::valuation::{present_value, InterestPath};
use crate::FactorError;

/// Derived quantities for one (gender, age)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupRow {
    pub age: u32,
    /// Present value of the averaged beneficiary annuity at this age
    pub ay_avg: f64,
    /// Hazard averaged between this age and the next
    pub hx_avg: f64,
    /// Partner-class CX1 offset
    pub cx1: i32,
    /// Combined partner-class correction fnett * fcorr * fOTS
    pub factor: f64,
    /// ay_avg * hx_avg * factor, the value the pre-pension cash flows weight
    /// by the yearly death probability
    pub cf: f64,
}

/// Lookup rows for every (gender, age in [LOW_AGE, UP_AGE)) at one rate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupTable {
    rate: f64,
    rows: ByGender<Vec<LookupRow>>,
}

impl LookupTable {
    /// Build the full table for one interest rate (percent)
    pub fn build(tables: &TableSet, rate: f64) -> Result<Self, FactorError> {
        Ok(Self {
            rate,
            rows: ByGender::new(
                Self::build_column(tables, rate, Gender::Male)?,
                Self::build_column(tables, rate, Gender::Female)?,
            ),
        })
    }

    fn build_column(
        tables: &TableSet,
        rate: f64,
        gender: Gender,
    ) -> Result<Vec<LookupRow>, FactorError> {
        let adj = tables.adjustments.get(gender, InsuranceClass::Partner)?;
        let factor = adj.combined_factor();
        let mut rows = Vec::with_capacity((UP_AGE - LOW_AGE) as usize);
        for age in LOW_AGE..UP_AGE {
            let payments = beneficiary_annuity(tables, age, gender)?;
            let series = PaymentSeries::new(Product::BeneficiaryAnnuity, payments);
            let ay_avg = present_value(&series, &InterestPath::Flat(rate), None)?;
            let hx_avg = tables.hazard.hx_avg(gender, age)?;
            rows.push(LookupRow {
                age,
                ay_avg,
                hx_avg,
                cx1: adj.cx1,
                factor,
                cf: ay_avg * hx_avg * factor,
            });
        }
        Ok(rows)
    }

    /// Interest rate (percent) the table was built at
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Row for one (gender, age), None outside [LOW_AGE, UP_AGE)
    pub fn row(&self, gender: Gender, age: u32) -> Option<&LookupRow> {
        let index = age.checked_sub(LOW_AGE)? as usize;
        self.rows.get(gender).get(index)
    }
}

/// Single-slot cache over [`LookupTable`], keyed by interest rate.
///
/// A request at the cached rate reuses the table; any other rate discards
/// and rebuilds it. The rebuild count is observable for tests.
#[derive(Debug, Clone, Default)]
pub struct LookupCache {
    slot: Option<LookupTable>,
    rebuilds: u64,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lookup table for `rate`, rebuilding only on a rate change
    pub fn table(&mut self, tables: &TableSet, rate: f64) -> Result<&LookupTable, FactorError> {
        match self.slot.take() {
            Some(table) if table.rate == rate => Ok(self.slot.insert(table)),
            _ => {
                let table = LookupTable::build(tables, rate)?;
                self.rebuilds += 1;
                Ok(self.slot.insert(table))
            }
        }
    }

    /// Build the table for `rate` up front so later requests at that rate
    /// are read-only
    pub fn prewarm(&mut self, tables: &TableSet, rate: f64) -> Result<(), FactorError> {
        self.table(tables, rate).map(|_| ())
    }

    /// Number of table builds so far
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::fixtures::linear_table_set;

    #[test]
    fn test_build_covers_supported_age_range() {
        let tables = linear_table_set();
        let table = LookupTable::build(&tables, 3.0).unwrap();

        assert!(table.row(Gender::Male, LOW_AGE - 1).is_none());
        assert!(table.row(Gender::Female, UP_AGE).is_none());
        let row = table.row(Gender::Male, 60).unwrap();
        assert_eq!(row.age, 60);

        // cf is the product of its parts
        assert!((row.cf - row.ay_avg * row.hx_avg * row.factor).abs() < 1e-12);
        // Neutral adjustments: factor 1, cx1 0
        assert_eq!(row.cx1, 0);
        assert_eq!(row.factor, 1.0);
        // Fixture hazard for males: 0.5 + 0.001 * age
        assert!((row.hx_avg - 0.5605).abs() < 1e-12);
    }

    #[test]
    fn test_ay_avg_matches_direct_pricing() {
        let tables = linear_table_set();
        let table = LookupTable::build(&tables, 3.0).unwrap();

        let payments = beneficiary_annuity(&tables, 60, Gender::Male).unwrap();
        let series = PaymentSeries::new(Product::BeneficiaryAnnuity, payments);
        let direct = present_value(&series, &InterestPath::Flat(3.0), None).unwrap();
        assert!((table.row(Gender::Male, 60).unwrap().ay_avg - direct).abs() < 1e-12);
    }

    #[test]
    fn test_cache_rebuilds_only_on_rate_change() {
        let tables = linear_table_set();
        let mut cache = LookupCache::new();
        assert_eq!(cache.rebuilds(), 0);

        let first = cache.table(&tables, 3.0).unwrap().row(Gender::Male, 60).unwrap().cf;
        assert_eq!(cache.rebuilds(), 1);

        // Same rate: no rebuild, identical rows
        let again = cache.table(&tables, 3.0).unwrap().row(Gender::Male, 60).unwrap().cf;
        assert_eq!(cache.rebuilds(), 1);
        assert_eq!(first, again);

        // New rate: exactly one rebuild
        cache.table(&tables, 4.0).unwrap();
        assert_eq!(cache.rebuilds(), 2);

        // Back to the original rate: the single slot was discarded
        let rebuilt = cache.table(&tables, 3.0).unwrap().row(Gender::Male, 60).unwrap().cf;
        assert_eq!(cache.rebuilds(), 3);
        assert_eq!(first, rebuilt);
    }
}
