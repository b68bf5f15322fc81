//! Error taxonomy for the factor engine
//!
//! Everything here propagates synchronously to the caller of the generating
//! or valuing operation. Computation is pure, so nothing is retried. The one
//! deliberate non-error is the NPLLRU benefit-exchange miss, which is logged
//! and defaulted to 1.0 for compatibility with published factor tables.

use thiserror::Error;

use crate::cashflow::Product;
use crate::tables::{Gender, InsuranceClass};

/// All failures the core can produce.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FactorError {
    /// A table lookup landed outside the loaded age range.
    #[error("no table entry at age {age}")]
    AgeOutOfRange { age: u32 },

    /// Survival ratio with a zero denominator (cohort extinct at that age).
    #[error("zero survivors at age {age}: survival ratio is undefined")]
    ZeroSurvivors { age: u32 },

    /// Deferral period must leave at least one payable year.
    #[error("deferral period {defer} exceeds the {rows} available table rows")]
    DeferralExceedsTable { defer: usize, rows: usize },

    /// An age offset (CX or partner age difference) produced a negative age.
    #[error("age offset produces negative age ({0})")]
    NegativeAge(i64),

    /// Deferral periods are measured from the insured's age forward.
    #[error("pension age {pension_age} precedes insured age {age}")]
    PensionAgePrecedesAge { age: u32, pension_age: u32 },

    #[error("unknown sex code {0:?}: expected \"M\" or \"F\"")]
    UnknownSex(String),

    #[error("unknown insurance id {0:?}")]
    UnknownProduct(String),

    /// No adjustment row loaded for this gender and insurance class.
    #[error("no adjustment parameters for {gender}/{class}")]
    MissingAdjustment {
        gender: Gender,
        class: InsuranceClass,
    },

    /// Partner products need the CX3 offset on the beneficiary's row.
    #[error("adjustment row for {gender}/{class} has no CX3 offset")]
    MissingPartnerOffset {
        gender: Gender,
        class: InsuranceClass,
    },

    /// Undefined-partner cash flows are defined in terms of the lookup table,
    /// which only covers the supported age range.
    #[error("lookup table has no row for {gender} at age {age}")]
    MissingLookupRow { gender: Gender, age: u32 },

    #[error("interest path contains no rates")]
    EmptyInterestPath,

    /// Undefined-partner discounting switches convention at pension age, so
    /// the series must carry its age/pension-age anchors.
    #[error("{product} series is missing the age/pension-age anchors required for discounting")]
    MissingSeriesAnchors { product: Product },

    /// Generation tables can only be evaluated from their first table year on.
    #[error("calculation year {calc_year} precedes the first table year {start_year}")]
    CalcYearBeforeTable { calc_year: i32, start_year: i32 },

    /// Structural table validation at load time.
    #[error("malformed table: {0}")]
    MalformedTable(String),
}
