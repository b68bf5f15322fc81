//! Valuation context: the loaded tables plus the two explicit caches
//!
//! The context owns the read-only [`TableSet`] for its whole lifetime. All
//! mutable state is confined to two explicit cache objects: the
//! interest-rate-keyed lookup cache and the (interest, pension age)-keyed
//! factor-table cache. Both have observable rebuild counters, so cache
//! behavior is testable without hidden fields.

use crate::cashflow::{CashFlowGenerator, LookupCache, PaymentSeries, Product};
use crate::tables::{Gender, TableSet};
use crate::valuation::batch::{BatchConfig, BatchDriver, FactorTable};
use crate::valuation::discount::{present_value, InterestPath};
use crate::FactorError;

/// Single-slot cache for the batch factor table, keyed by interest rate and
/// pension age
#[derive(Debug, Clone, Default)]
struct FactorCache {
    slot: Option<FactorTable>,
    rebuilds: u64,
}

/// Owns the tables and drives per-policy and batch valuations
#[derive(Debug, Clone)]
pub struct ValuationContext {
    tables: TableSet,
    lookup: LookupCache,
    factors: FactorCache,
}

impl ValuationContext {
    pub fn new(tables: TableSet) -> Self {
        Self {
            tables,
            lookup: LookupCache::new(),
            factors: FactorCache::default(),
        }
    }

    pub fn tables(&self) -> &TableSet {
        &self.tables
    }

    /// Expected payment series for one product
    pub fn cash_flows(
        &mut self,
        product: Product,
        age: u32,
        sex: Gender,
        pension_age: u32,
        interest: Option<f64>,
    ) -> Result<PaymentSeries, FactorError> {
        CashFlowGenerator::new(&self.tables, &mut self.lookup)
            .cash_flows(product, age, sex, pension_age, interest)
    }

    /// Present value under the context's tariff; `rounded` applies the
    /// tariff's decimal precision
    pub fn present_value(
        &self,
        series: &PaymentSeries,
        path: &InterestPath,
        rounded: bool,
    ) -> Result<f64, FactorError> {
        let decimals = rounded.then_some(self.tables.tariff.round_decimals);
        present_value(series, path, decimals)
    }

    /// Single-premium value of the averaged beneficiary annuity
    pub fn ay_avg(
        &mut self,
        age: u32,
        sex: Gender,
        interest: f64,
        rounded: bool,
    ) -> Result<f64, FactorError> {
        let series = self.cash_flows(Product::BeneficiaryAnnuity, age, sex, age, None)?;
        self.present_value(&series, &InterestPath::Flat(interest), rounded)
    }

    /// Cash flows and present value in one step
    pub fn factor(
        &mut self,
        product: Product,
        age: u32,
        sex: Gender,
        pension_age: u32,
        interest: f64,
        rounded: bool,
    ) -> Result<f64, FactorError> {
        let series = self.cash_flows(product, age, sex, pension_age, Some(interest))?;
        self.present_value(&series, &InterestPath::Flat(interest), rounded)
    }

    /// The full batch factor table, recomputed only when the interest rate
    /// or pension age changes
    pub fn factor_table(&mut self, interest: f64, pension_age: u32) -> &FactorTable {
        match self.factors.slot.take() {
            Some(table) if table.interest == interest && table.pension_age == pension_age => {
                self.factors.slot.insert(table)
            }
            _ => {
                let table =
                    BatchDriver::new(&self.tables).run(&BatchConfig::new(interest, pension_age));
                self.factors.rebuilds += 1;
                self.factors.slot.insert(table)
            }
        }
    }

    /// Number of lookup-table builds so far
    pub fn lookup_rebuilds(&self) -> u64 {
        self.lookup.rebuilds()
    }

    /// Number of batch factor-table builds so far
    pub fn factor_rebuilds(&self) -> u64 {
        self.factors.rebuilds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::fixtures::linear_table_set;

    #[test]
    fn test_factor_table_cached_by_rate_and_pension_age() {
        let mut context = ValuationContext::new(linear_table_set());

        let rows = context.factor_table(3.0, 67).rows.len();
        assert!(rows > 0);
        assert_eq!(context.factor_rebuilds(), 1);

        context.factor_table(3.0, 67);
        assert_eq!(context.factor_rebuilds(), 1);

        context.factor_table(4.0, 67);
        assert_eq!(context.factor_rebuilds(), 2);

        context.factor_table(4.0, 65);
        assert_eq!(context.factor_rebuilds(), 3);
    }

    #[test]
    fn test_lookup_cache_shared_across_calls() {
        let mut context = ValuationContext::new(linear_table_set());

        context
            .cash_flows(Product::UndefinedPartner, 60, Gender::Male, 63, Some(3.0))
            .unwrap();
        context
            .cash_flows(Product::UndefinedPartnerExchangeable, 61, Gender::Female, 63, Some(3.0))
            .unwrap();
        assert_eq!(context.lookup_rebuilds(), 1);

        context
            .cash_flows(Product::UndefinedPartner, 60, Gender::Male, 63, Some(2.0))
            .unwrap();
        assert_eq!(context.lookup_rebuilds(), 2);
    }

    #[test]
    fn test_present_value_rounding_uses_tariff_precision() {
        let mut context = ValuationContext::new(linear_table_set());
        let series = context
            .cash_flows(Product::RetirementPension, 60, Gender::Male, 65, None)
            .unwrap();

        let full = context
            .present_value(&series, &InterestPath::Flat(3.0), false)
            .unwrap();
        let rounded = context
            .present_value(&series, &InterestPath::Flat(3.0), true)
            .unwrap();
        // Fixture tariff rounds to 4 decimals
        assert!((full - rounded).abs() < 5e-5);
        assert_eq!(rounded, (full * 1e4).round() / 1e4);
    }

    #[test]
    fn test_ay_avg_matches_factor_pipeline() {
        let mut context = ValuationContext::new(linear_table_set());
        let direct = context.ay_avg(60, Gender::Male, 3.0, false).unwrap();
        let via_factor = context
            .factor(Product::BeneficiaryAnnuity, 60, Gender::Male, 60, 3.0, false)
            .unwrap();
        assert_eq!(direct, via_factor);
    }
}
