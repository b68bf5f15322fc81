//! Cash-flow generation: payment series, annuity primitives, the product
//! generators and the undefined-partner lookup cache

pub mod annuity;
mod lookup;
mod products;
mod series;

pub use lookup::{LookupCache, LookupRow, LookupTable};
pub use products::{
    beneficiary_annuity, defined_partner, defined_risk, retirement_pension, undefined_partner,
    undefined_risk, CashFlowGenerator, ExchangeMode, Product, DEFAULT_INTEREST,
};
pub use series::PaymentSeries;
