//! Expected-payment series produced by the cash-flow generators
//!
//! Payments are indexed by policy-year offset starting at 0, contiguous and
//! gap-free. The serialized field names match the legacy export layout
//! (`insurance_id`, `payments`, `age`, `pension_age`) so factor workbooks
//! round-trip unchanged.

use serde::{Deserialize, Serialize};

use super::Product;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSeries {
    #[serde(rename = "insurance_id")]
    pub product: Product,
    pub payments: Vec<f64>,
    /// Anchor age the series was generated at; undefined-partner products
    /// only, where discounting needs it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pension_age: Option<u32>,
}

impl PaymentSeries {
    pub fn new(product: Product, payments: Vec<f64>) -> Self {
        Self {
            product,
            payments,
            age: None,
            pension_age: None,
        }
    }

    /// Series carrying the age/pension-age anchors the split discounting
    /// convention requires
    pub fn anchored(product: Product, payments: Vec<f64>, age: u32, pension_age: u32) -> Self {
        Self {
            product,
            payments,
            age: Some(age),
            pension_age: Some(pension_age),
        }
    }

    pub fn len(&self) -> usize {
        self.payments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }

    /// Undiscounted total of the expected payments
    pub fn total(&self) -> f64 {
        self.payments.iter().sum()
    }
}

// Element-wise combinators for payment vectors. Series of different lengths
// are combined as if the shorter one continued with zeros, which is how
// annuity series behave past the end of their table.

pub(crate) fn add(a: &[f64], b: &[f64]) -> Vec<f64> {
    combine(a, b, |x, y| x + y)
}

pub(crate) fn sub(a: &[f64], b: &[f64]) -> Vec<f64> {
    combine(a, b, |x, y| x - y)
}

pub(crate) fn mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    combine(a, b, |x, y| x * y)
}

pub(crate) fn scale(a: &[f64], k: f64) -> Vec<f64> {
    a.iter().map(|x| x * k).collect()
}

fn combine(a: &[f64], b: &[f64], op: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    (0..a.len().max(b.len()))
        .map(|i| {
            op(
                a.get(i).copied().unwrap_or(0.0),
                b.get(i).copied().unwrap_or(0.0),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combinators_zero_extend() {
        let a = [1.0, 2.0, 3.0];
        let b = [10.0, 20.0];
        assert_eq!(add(&a, &b), vec![11.0, 22.0, 3.0]);
        assert_eq!(sub(&b, &a), vec![9.0, 18.0, -3.0]);
        assert_eq!(mul(&a, &b), vec![10.0, 40.0, 0.0]);
        assert_eq!(scale(&b, 0.5), vec![5.0, 10.0]);
    }

    #[test]
    fn test_series_total() {
        let series = PaymentSeries::new(Product::RetirementPension, vec![100.0, -10.0, 500.0]);
        assert_eq!(series.total(), 590.0);
        assert!(series.age.is_none());
    }

    #[test]
    fn test_serde_uses_legacy_field_names() {
        let series = PaymentSeries::anchored(Product::UndefinedPartner, vec![0.5], 60, 67);
        let json = serde_json::to_string(&series).unwrap();
        assert!(json.contains("\"insurance_id\":\"NPLL-O\""));
        assert!(json.contains("\"pension_age\":67"));
    }
}
