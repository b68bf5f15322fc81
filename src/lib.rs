//! Actuarial valuation factors for pension and insurance products
//!
//! This library provides:
//! - Survival/death probabilities on flat and generation mortality tables
//! - Expected cash-flow generation for the fixed product set (retirement
//!   pension, defined/undefined partner pension, one-year risk premiums,
//!   beneficiary annuity)
//! - Present-value discounting with per-product timing conventions
//! - Batch factor-table generation with per-combination failure isolation

pub mod cashflow;
pub mod error;
pub mod tables;
pub mod valuation;

// Re-export commonly used types
pub use cashflow::{CashFlowGenerator, LookupCache, PaymentSeries, Product};
pub use error::FactorError;
pub use tables::{
    AdjustmentRegistry, Gender, HazardTable, MortalityModel, TableSet, TariffParams, LOW_AGE,
    MAX_AGE, UP_AGE,
};
pub use valuation::{BatchConfig, BatchDriver, FactorTable, InterestPath, ValuationContext};
