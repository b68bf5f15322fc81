//! Discounting, the valuation context and the batch driver

mod batch;
mod context;
mod discount;

pub use batch::{BatchConfig, BatchDriver, FactorRow, FactorTable, DEFAULT_PRODUCTS};
pub use context::ValuationContext;
pub use discount::{present_value, InterestPath};
