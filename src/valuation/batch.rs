//! Batch generation of the factor table
//!
//! Enumerates (product, sex, age) combinations and values each one. Every
//! combination is independent and referentially transparent, so the parallel
//! runner hands each worker its own copy of the pre-warmed lookup cache. A
//! failing combination is recorded on its own row and never aborts the rest
//! of the batch.

use log::warn;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cashflow::{CashFlowGenerator, LookupCache, PaymentSeries, Product};
use crate::tables::{Gender, TableSet, LOW_AGE, UP_AGE};
use crate::valuation::discount::{present_value, InterestPath};

/// Products included in a standard factor run. NPLLRU is only generated on
/// request, matching the published table layout.
pub const DEFAULT_PRODUCTS: [Product; 7] = [
    Product::RetirementPension,
    Product::DefinedPartner,
    Product::UndefinedPartner,
    Product::UndefinedPartnerExchangeable,
    Product::DefinedRisk,
    Product::UndefinedRisk,
    Product::BeneficiaryAnnuity,
];

/// One factor run: which products, over which ages, at what assumptions
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub products: Vec<Product>,
    /// Flat interest rate in percent
    pub interest: f64,
    pub pension_age: u32,
    /// Insured ages, half-open
    pub age_range: (u32, u32),
    /// Keep the generated payment series on each row for audit output
    pub keep_cashflows: bool,
}

impl BatchConfig {
    pub fn new(interest: f64, pension_age: u32) -> Self {
        Self {
            products: DEFAULT_PRODUCTS.to_vec(),
            interest,
            pension_age,
            age_range: (LOW_AGE, UP_AGE),
            keep_cashflows: false,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::new(3.0, 67)
    }
}

/// One valued combination. Exactly one of `factor` and `error` is set; the
/// serialized names match the legacy factor workbook columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorRow {
    #[serde(rename = "insurance_id")]
    pub product: Product,
    #[serde(rename = "sex_insured")]
    pub sex: Gender,
    #[serde(rename = "age_insured")]
    pub age: u32,
    #[serde(rename = "tar")]
    pub factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cashflows: Option<PaymentSeries>,
}

/// Factor table for one (interest, pension age) assumption pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorTable {
    pub interest: f64,
    pub pension_age: u32,
    pub rows: Vec<FactorRow>,
}

impl FactorTable {
    /// Factor for one combination, None when absent or failed
    pub fn get(&self, product: Product, sex: Gender, age: u32) -> Option<f64> {
        self.rows
            .iter()
            .find(|row| row.product == product && row.sex == sex && row.age == age)
            .and_then(|row| row.factor)
    }

    /// Rows that failed, for reporting
    pub fn failures(&self) -> impl Iterator<Item = &FactorRow> {
        self.rows.iter().filter(|row| row.error.is_some())
    }
}

/// Drives factor-table generation over the cartesian combination grid
pub struct BatchDriver<'a> {
    tables: &'a TableSet,
}

impl<'a> BatchDriver<'a> {
    pub fn new(tables: &'a TableSet) -> Self {
        Self { tables }
    }

    fn combinations(config: &BatchConfig) -> Vec<(Product, Gender, u32)> {
        let (low, high) = config.age_range;
        let mut combos =
            Vec::with_capacity(config.products.len() * 2 * (high.saturating_sub(low)) as usize);
        for &product in &config.products {
            for gender in Gender::BOTH {
                for age in low..high {
                    combos.push((product, gender, age));
                }
            }
        }
        combos
    }

    /// Lookup cache shared read-only by the workers, built once up front.
    /// A failed build is only logged: the undefined-partner rows will then
    /// report the error individually while the rest of the batch proceeds.
    fn prewarmed_cache(&self, config: &BatchConfig) -> LookupCache {
        let mut cache = LookupCache::new();
        if config.products.iter().any(|p| p.exchange_mode().is_some()) {
            if let Err(error) = cache.prewarm(self.tables, config.interest) {
                warn!("lookup-table prewarm failed: {error}");
            }
        }
        cache
    }

    fn evaluate(
        tables: &TableSet,
        cache: &mut LookupCache,
        config: &BatchConfig,
        product: Product,
        sex: Gender,
        age: u32,
    ) -> FactorRow {
        let valued = CashFlowGenerator::new(tables, cache)
            .cash_flows(product, age, sex, config.pension_age, Some(config.interest))
            .and_then(|series| {
                let factor =
                    present_value(&series, &InterestPath::Flat(config.interest), None)?;
                Ok((series, factor))
            });

        match valued {
            Ok((series, factor)) => FactorRow {
                product,
                sex,
                age,
                factor: Some(factor),
                error: None,
                cashflows: config.keep_cashflows.then_some(series),
            },
            Err(error) => {
                warn!("factor {product}/{sex}/{age} failed: {error}");
                FactorRow {
                    product,
                    sex,
                    age,
                    factor: None,
                    error: Some(error.to_string()),
                    cashflows: None,
                }
            }
        }
    }

    /// Value every combination sequentially
    pub fn run(&self, config: &BatchConfig) -> FactorTable {
        let mut cache = self.prewarmed_cache(config);
        let rows = Self::combinations(config)
            .into_iter()
            .map(|(product, sex, age)| {
                Self::evaluate(self.tables, &mut cache, config, product, sex, age)
            })
            .collect();
        FactorTable {
            interest: config.interest,
            pension_age: config.pension_age,
            rows,
        }
    }

    /// Value every combination across worker threads. Each worker gets its
    /// own copy of the pre-warmed cache, so no rebuild is shared.
    pub fn run_parallel(&self, config: &BatchConfig) -> FactorTable {
        let cache = self.prewarmed_cache(config);
        let rows = Self::combinations(config)
            .par_iter()
            .map(|&(product, sex, age)| {
                let mut local = cache.clone();
                Self::evaluate(self.tables, &mut local, config, product, sex, age)
            })
            .collect();
        FactorTable {
            interest: config.interest,
            pension_age: config.pension_age,
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::fixtures::linear_table_set;
    use crate::tables::InsuranceClass;

    fn small_config() -> BatchConfig {
        BatchConfig {
            age_range: (60, 63),
            ..BatchConfig::new(3.0, 67)
        }
    }

    #[test]
    fn test_run_covers_the_combination_grid() {
        let tables = linear_table_set();
        let table = BatchDriver::new(&tables).run(&small_config());

        assert_eq!(table.rows.len(), 7 * 2 * 3);
        assert_eq!(table.failures().count(), 0);
        assert!(table.get(Product::RetirementPension, Gender::Male, 60).is_some());
        assert!(table.get(Product::RetirementPension, Gender::Male, 63).is_none());
    }

    #[test]
    fn test_parallel_run_matches_sequential() {
        let tables = linear_table_set();
        let config = small_config();
        let sequential = BatchDriver::new(&tables).run(&config);
        let parallel = BatchDriver::new(&tables).run_parallel(&config);

        assert_eq!(sequential.rows.len(), parallel.rows.len());
        for (a, b) in sequential.rows.iter().zip(&parallel.rows) {
            assert_eq!(a.product, b.product);
            assert_eq!(a.sex, b.sex);
            assert_eq!(a.age, b.age);
            assert_eq!(a.factor, b.factor);
        }
    }

    #[test]
    fn test_failing_combination_does_not_abort_batch() {
        let mut tables = linear_table_set();
        tables
            .adjustments
            .remove(Gender::Female, InsuranceClass::Retire);
        let table = BatchDriver::new(&tables).run(&small_config());

        // Female retirement rows fail and say why
        let failed: Vec<_> = table.failures().collect();
        assert_eq!(failed.len(), 3);
        assert!(failed
            .iter()
            .all(|row| row.product == Product::RetirementPension && row.sex == Gender::Female));
        assert!(failed[0].error.as_deref().unwrap().contains("retire"));

        // Everything else still valued
        assert!(table.get(Product::RetirementPension, Gender::Male, 60).is_some());
        assert!(table.get(Product::DefinedPartner, Gender::Female, 60).is_some());
    }

    #[test]
    fn test_keep_cashflows_for_audit() {
        let tables = linear_table_set();
        let config = BatchConfig {
            keep_cashflows: true,
            ..small_config()
        };
        let table = BatchDriver::new(&tables).run(&config);
        assert!(table.rows.iter().all(|row| row.cashflows.is_some()));
    }
}
