//! Product-specific cash-flow generation
//!
//! Each product is a pure function of (age, sex, pension age) over the loaded
//! tables; the undefined-partner variants additionally depend on the
//! interest-rate-indexed lookup table. [`CashFlowGenerator`] is the dispatch
//! over the closed product set, so an unsupported product is a parse-time
//! error rather than a failed table lookup.

use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use super::annuity::{deferred_annuity, prae_to_continuous};
use super::lookup::{LookupCache, LookupTable};
use super::series::{add, mul, scale, sub, PaymentSeries};
use crate::tables::{Gender, InsuranceClass, TableSet};
use crate::FactorError;

/// Interest assumption (percent) used when an undefined-partner request does
/// not supply one
pub const DEFAULT_INTEREST: f64 = 3.0;

/// The closed set of supported products, serialized as the legacy insurance
/// ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Product {
    /// OPLL: retirement pension on the insured's own life
    #[serde(rename = "OPLL")]
    RetirementPension,
    /// NPLL-B: partner pension with a known beneficiary
    #[serde(rename = "NPLL-B")]
    DefinedPartner,
    /// NPLL-O: undefined partner, benefit not exchangeable
    #[serde(rename = "NPLL-O")]
    UndefinedPartner,
    /// NPLLRS: undefined partner, benefit exchangeable at pension age
    #[serde(rename = "NPLLRS")]
    UndefinedPartnerExchangeable,
    /// NPLLRU: undefined partner, exchange factor from the benefit-exchange
    /// table
    #[serde(rename = "NPLLRU")]
    UndefinedPartnerTabulated,
    /// NPTL-B: one-year risk premium, defined partner
    #[serde(rename = "NPTL-B")]
    DefinedRisk,
    /// NPTL-O: one-year risk premium, undefined partner
    #[serde(rename = "NPTL-O")]
    UndefinedRisk,
    /// ay_avg: immediate annuity on the averaged beneficiary
    #[serde(rename = "ay_avg")]
    BeneficiaryAnnuity,
}

/// How the undefined-partner benefit converts at pension age
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeMode {
    /// Factor read from the hazard table at pension age
    NonExchangeable,
    /// Benefit exchangeable one-to-one: factor 1.0
    Exchangeable,
    /// Factor from the benefit-exchange table, 1.0 with a warning if absent
    Tabulated,
}

impl Product {
    pub const ALL: [Product; 8] = [
        Product::RetirementPension,
        Product::DefinedPartner,
        Product::UndefinedPartner,
        Product::UndefinedPartnerExchangeable,
        Product::UndefinedPartnerTabulated,
        Product::DefinedRisk,
        Product::UndefinedRisk,
        Product::BeneficiaryAnnuity,
    ];

    /// Legacy insurance id
    pub fn code(&self) -> &'static str {
        match self {
            Product::RetirementPension => "OPLL",
            Product::DefinedPartner => "NPLL-B",
            Product::UndefinedPartner => "NPLL-O",
            Product::UndefinedPartnerExchangeable => "NPLLRS",
            Product::UndefinedPartnerTabulated => "NPLLRU",
            Product::DefinedRisk => "NPTL-B",
            Product::UndefinedRisk => "NPTL-O",
            Product::BeneficiaryAnnuity => "ay_avg",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, FactorError> {
        Self::ALL
            .into_iter()
            .find(|p| p.code() == code)
            .ok_or_else(|| FactorError::UnknownProduct(code.to_string()))
    }

    /// Exchange mode for the undefined-partner variants, None otherwise
    pub fn exchange_mode(&self) -> Option<ExchangeMode> {
        match self {
            Product::UndefinedPartner => Some(ExchangeMode::NonExchangeable),
            Product::UndefinedPartnerExchangeable => Some(ExchangeMode::Exchangeable),
            Product::UndefinedPartnerTabulated => Some(ExchangeMode::Tabulated),
            _ => None,
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

fn offset_age(age: u32, offset: i32) -> Result<u32, FactorError> {
    let shifted = age as i64 + offset as i64;
    u32::try_from(shifted).map_err(|_| FactorError::NegativeAge(shifted))
}

/// Age of the modeled beneficiary: the insured's age shifted by the partner
/// age difference (sign depends on the insured's sex) and the CX3 offset
fn beneficiary_age(tables: &TableSet, age: u32, sex: Gender) -> Result<(Gender, u32), FactorError> {
    let partner_sex = sex.partner();
    let cx3 = tables.adjustments.cx3(partner_sex, InsuranceClass::Partner)?;
    let shifted =
        age as i64 - (sex.age_gap_sign() * tables.tariff.delta) as i64 + cx3 as i64;
    let partner_age =
        u32::try_from(shifted).map_err(|_| FactorError::NegativeAge(shifted))?;
    Ok((partner_sex, partner_age))
}

fn deferral_years(age: u32, pension_age: u32) -> Result<u32, FactorError> {
    pension_age
        .checked_sub(age)
        .ok_or(FactorError::PensionAgePrecedesAge { age, pension_age })
}

/// Expected payments of the retirement pension (OPLL).
///
/// Deferred annuity on the insured's own row anchored at age + CX2, with the
/// deferral-period survival re-based from the CX2 anchor to the CX1 anchor.
pub fn retirement_pension(
    tables: &TableSet,
    age: u32,
    sex: Gender,
    pension_age: u32,
    postnumerando: bool,
) -> Result<Vec<f64>, FactorError> {
    let adj = tables.adjustments.get(sex, InsuranceClass::Retire)?;
    let anchor1 = offset_age(age, adj.cx1)?;
    let anchor2 = offset_age(age, adj.cx2)?;
    let nyears = deferral_years(age, pension_age)?;

    let row = tables.mortality.row(sex, anchor2);
    let defer = nyears as usize + postnumerando as usize;
    let cf = deferred_annuity(&row, anchor2, defer)?;

    let numer = tables.mortality.npx(anchor1, sex, nyears)?;
    let denom = tables.mortality.npx(anchor2, sex, nyears)?;
    if denom == 0.0 {
        return Err(FactorError::ZeroSurvivors {
            age: anchor2 + nyears,
        });
    }

    let cf = prae_to_continuous(scale(&cf, numer / denom));
    Ok(scale(&cf, adj.combined_factor()))
}

/// Expected payments of the partner pension with a known beneficiary
/// (NPLL-B).
///
/// Combines the beneficiary's single-life annuity, the joint-life annuity
/// and two deferred joint annuities re-based between the CX1 and CX2
/// anchors: `ay - ax*ay + (f1 - f2 * r1 * r2)`.
pub fn defined_partner(
    tables: &TableSet,
    age: u32,
    sex: Gender,
    pension_age: u32,
) -> Result<Vec<f64>, FactorError> {
    let adj = tables.adjustments.get(sex, InsuranceClass::Partner)?;
    let (partner_sex, partner_age) = beneficiary_age(tables, age, sex)?;
    let nyears = deferral_years(age, pension_age)?;
    let defer = nyears as usize;

    let anchor1 = offset_age(age, adj.cx1)?;
    let anchor2 = offset_age(age, adj.cx2)?;
    let row_insured1 = tables.mortality.row(sex, anchor1);
    let row_insured2 = tables.mortality.row(sex, anchor2);
    let row_partner = tables.mortality.row(partner_sex, partner_age);

    let ay = deferred_annuity(&row_partner, partner_age, 0)?;
    let ax = deferred_annuity(&row_insured1, anchor1, 0)?;
    let axy = mul(&ax, &ay);

    let ay_deferred = deferred_annuity(&row_partner, partner_age, defer)?;
    let f1 = mul(
        &deferred_annuity(&row_insured1, anchor1, defer)?,
        &ay_deferred,
    );
    let f2 = mul(
        &deferred_annuity(&row_insured2, anchor2, defer)?,
        &ay_deferred,
    );

    let pension_anchor1 = offset_age(pension_age, adj.cx1)?;
    let pension_anchor2 = offset_age(pension_age, adj.cx2)?;
    let lx_at = |row: &crate::tables::SurvivalRow<'_>, at: u32| {
        row.lx(at).ok_or(FactorError::AgeOutOfRange { age: at })
    };
    let denom1 = lx_at(&row_insured1, anchor1)?;
    let denom2 = lx_at(&row_insured2, pension_anchor2)?;
    if denom1 == 0.0 {
        return Err(FactorError::ZeroSurvivors { age: anchor1 });
    }
    if denom2 == 0.0 {
        return Err(FactorError::ZeroSurvivors {
            age: pension_anchor2,
        });
    }
    let r1 = lx_at(&row_insured1, pension_anchor1)? / denom1;
    let r2 = lx_at(&row_insured2, anchor2)? / denom2;

    let combined = add(&sub(&ay, &axy), &sub(&f1, &scale(&f2, r1 * r2)));
    Ok(scale(&combined, adj.combined_factor()))
}

/// Expected payments of the undefined-partner pension (NPLL-O / NPLLRS /
/// NPLLRU depending on `mode`).
///
/// Before pension age each year pays the lookup-table row weighted by the
/// probability of dying in exactly that year; from pension age on the series
/// continues with the defined-partner cash flow at pension age, scaled by
/// the exchange factor and the survival probability to pension age.
pub fn undefined_partner(
    tables: &TableSet,
    lookup: &LookupTable,
    mode: ExchangeMode,
    age: u32,
    sex: Gender,
    pension_age: u32,
) -> Result<Vec<f64>, FactorError> {
    let nyears = deferral_years(age, pension_age)?;

    let hx_at_pension_age = match mode {
        ExchangeMode::Exchangeable => 1.0,
        ExchangeMode::Tabulated => {
            let tabulated = tables
                .exchange
                .as_ref()
                .and_then(|t| t.factor(sex, pension_age, lookup.rate()));
            match tabulated {
                Some(hx) => hx,
                None => {
                    // Legacy fallback, kept for compatibility with published
                    // factors
                    warn!(
                        "no benefit-exchange entry for {sex}/{pension_age} at {}%; using 1.0",
                        lookup.rate()
                    );
                    1.0
                }
            }
        }
        ExchangeMode::NonExchangeable => tables.hazard.hx(sex, pension_age)?,
    };

    let mut payments = Vec::with_capacity(nyears as usize);
    for k in 0..nyears {
        let row = lookup
            .row(sex, age + k)
            .ok_or(FactorError::MissingLookupRow {
                gender: sex,
                age: age + k,
            })?;
        let anchor = offset_age(age, row.cx1)?;
        let nq = tables.mortality.nqx(anchor, sex, k + 1)?;
        payments.push(row.cf * nq);
    }

    let adj = tables.adjustments.get(sex, InsuranceClass::Partner)?;
    let anchor1 = offset_age(age, adj.cx1)?;
    let survival = tables.mortality.npx(anchor1, sex, nyears)?;
    let tail = defined_partner(tables, pension_age, sex, pension_age)?;
    payments.extend(tail.iter().map(|v| hx_at_pension_age * survival * v));
    Ok(payments)
}

/// Expected payments of the averaged beneficiary annuity (ay_avg): the mean
/// of two immediate annuities at consecutive beneficiary ages, continuous
pub fn beneficiary_annuity(
    tables: &TableSet,
    age: u32,
    sex: Gender,
) -> Result<Vec<f64>, FactorError> {
    let (partner_sex, partner_age) = beneficiary_age(tables, age, sex)?;
    let row = tables.mortality.row(partner_sex, partner_age);
    let first = deferred_annuity(&row, partner_age, 0)?;
    let second = deferred_annuity(&row, partner_age + 1, 0)?;
    Ok(prae_to_continuous(scale(&add(&first, &second), 0.5)))
}

/// Expected cost of the one-year risk premium with a defined partner
/// (NPTL-B). Risk premiums reuse the partner-class adjustments.
pub fn defined_risk(tables: &TableSet, age: u32, sex: Gender) -> Result<Vec<f64>, FactorError> {
    let adj = tables.adjustments.get(sex, InsuranceClass::Partner)?;
    let cf = beneficiary_annuity(tables, age, sex)?;
    let qx = tables.mortality.qx(offset_age(age, adj.cx1)?, sex)?;
    Ok(scale(&cf, qx * adj.combined_factor()))
}

/// Expected cost of the one-year risk premium with an undefined partner
/// (NPTL-O): the defined premium blended by the averaged hazard
pub fn undefined_risk(tables: &TableSet, age: u32, sex: Gender) -> Result<Vec<f64>, FactorError> {
    let hx_avg = tables.hazard.hx_avg(sex, age)?;
    Ok(scale(&defined_risk(tables, age, sex)?, hx_avg))
}

/// Dispatch over the closed product set.
///
/// Owns no tables: borrows the read-only table set and the mutable
/// single-slot lookup cache the undefined-partner variants need.
pub struct CashFlowGenerator<'a> {
    tables: &'a TableSet,
    lookup: &'a mut LookupCache,
}

impl<'a> CashFlowGenerator<'a> {
    pub fn new(tables: &'a TableSet, lookup: &'a mut LookupCache) -> Self {
        Self { tables, lookup }
    }

    /// Generate the expected payment series for one product.
    ///
    /// `interest` is only consulted by the undefined-partner variants; when
    /// absent it defaults to [`DEFAULT_INTEREST`] with a warning.
    pub fn cash_flows(
        &mut self,
        product: Product,
        age: u32,
        sex: Gender,
        pension_age: u32,
        interest: Option<f64>,
    ) -> Result<PaymentSeries, FactorError> {
        let payments = match product {
            Product::RetirementPension => {
                retirement_pension(self.tables, age, sex, pension_age, false)?
            }
            Product::DefinedPartner => defined_partner(self.tables, age, sex, pension_age)?,
            Product::DefinedRisk => defined_risk(self.tables, age, sex)?,
            Product::UndefinedRisk => undefined_risk(self.tables, age, sex)?,
            Product::BeneficiaryAnnuity => beneficiary_annuity(self.tables, age, sex)?,
            Product::UndefinedPartner
            | Product::UndefinedPartnerExchangeable
            | Product::UndefinedPartnerTabulated => {
                return self.undefined_partner_series(product, age, sex, pension_age, interest)
            }
        };
        Ok(PaymentSeries::new(product, payments))
    }

    fn undefined_partner_series(
        &mut self,
        product: Product,
        age: u32,
        sex: Gender,
        pension_age: u32,
        interest: Option<f64>,
    ) -> Result<PaymentSeries, FactorError> {
        let mode = match product {
            Product::UndefinedPartner => ExchangeMode::NonExchangeable,
            Product::UndefinedPartnerExchangeable => ExchangeMode::Exchangeable,
            _ => ExchangeMode::Tabulated,
        };
        let rate = interest.unwrap_or_else(|| {
            warn!(
                "undefined-partner cash flows require an interest rate; using {DEFAULT_INTEREST}%"
            );
            DEFAULT_INTEREST
        });
        let lookup = self.lookup.table(self.tables, rate)?;
        let payments = undefined_partner(self.tables, lookup, mode, age, sex, pension_age)?;
        Ok(PaymentSeries::anchored(product, payments, age, pension_age))
    }
}
