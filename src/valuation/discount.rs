//! Present-value discounting of payment series
//!
//! The discount factor for year t is `1 / (1 + rate/100)` raised to a
//! product-dependent exponent:
//! - OPLL, NPLL-B, ay_avg: t (annual payments, already continuous-converted)
//! - NPTL-B, NPTL-O: t + 0.5 (mid-year risk payment)
//! - NPLL-O, NPLLRS, NPLLRU: t + 0.5 while t is at or before pension age,
//!   plain t afterwards. The series must carry its age/pension-age anchors.

use serde::{Deserialize, Serialize};

use crate::cashflow::{PaymentSeries, Product};
use crate::FactorError;

/// Interest assumption: a single rate or a per-year curve, both in percent.
/// A curve shorter than the series is right-padded with its last rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InterestPath {
    Flat(f64),
    Curve(Vec<f64>),
}

impl InterestPath {
    /// One rate per year for a series of `n` payments
    pub fn broadcast(&self, n: usize) -> Result<Vec<f64>, FactorError> {
        match self {
            InterestPath::Flat(rate) => Ok(vec![*rate; n]),
            InterestPath::Curve(rates) => {
                let last = rates.last().copied().ok_or(FactorError::EmptyInterestPath)?;
                Ok((0..n)
                    .map(|t| rates.get(t).copied().unwrap_or(last))
                    .collect())
            }
        }
    }
}

impl From<f64> for InterestPath {
    fn from(rate: f64) -> Self {
        InterestPath::Flat(rate)
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// Present value of a payment series, optionally rounded to `round_decimals`
pub fn present_value(
    series: &PaymentSeries,
    path: &InterestPath,
    round_decimals: Option<u32>,
) -> Result<f64, FactorError> {
    let rates = path.broadcast(series.len())?;

    // Years at or before this horizon discount mid-year; None means the
    // product has a single convention for the whole series
    let mid_year_horizon = match series.product {
        Product::UndefinedPartner
        | Product::UndefinedPartnerExchangeable
        | Product::UndefinedPartnerTabulated => {
            let (Some(age), Some(pension_age)) = (series.age, series.pension_age) else {
                return Err(FactorError::MissingSeriesAnchors {
                    product: series.product,
                });
            };
            Some(pension_age.saturating_sub(age) as f64)
        }
        _ => None,
    };
    let mid_year_all = matches!(series.product, Product::DefinedRisk | Product::UndefinedRisk);

    let mut total = 0.0;
    for (t, (payment, rate)) in series.payments.iter().zip(&rates).enumerate() {
        let year = t as f64;
        let exponent = match mid_year_horizon {
            Some(horizon) if year <= horizon => year + 0.5,
            Some(_) => year,
            None if mid_year_all => year + 0.5,
            None => year,
        };
        total += payment * (1.0 / (1.0 + rate / 100.0)).powf(exponent);
    }

    Ok(match round_decimals {
        Some(decimals) => round_to(total, decimals),
        None => total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn annual_series(payments: Vec<f64>) -> PaymentSeries {
        PaymentSeries::new(Product::RetirementPension, payments)
    }

    #[test]
    fn test_zero_rate_is_plain_sum() {
        let series = annual_series(vec![100.0, -10.0, 500.0, -200.0]);
        let pv = present_value(&series, &InterestPath::Flat(0.0), None).unwrap();
        assert_eq!(pv, series.total());
    }

    #[test]
    fn test_reference_discounting_values() {
        let series = annual_series(vec![100.0, -10.0, 500.0, -200.0]);

        let pv = present_value(&series, &InterestPath::Flat(3.0), None).unwrap();
        assert_relative_eq!(pv, 378.5608848322, epsilon = 1e-9);

        let pv = present_value(&series, &InterestPath::Flat(5.0), None).unwrap();
        assert_relative_eq!(pv, 371.2234099989, epsilon = 1e-9);
    }

    #[test]
    fn test_reference_discounting_values_rounded() {
        let series = annual_series(vec![100.0, -10.0, 500.0, -200.0]);

        let pv = present_value(&series, &InterestPath::Flat(3.0), Some(4)).unwrap();
        assert_eq!(pv, 378.5609);
        let pv = present_value(&series, &InterestPath::Flat(5.0), Some(4)).unwrap();
        assert_eq!(pv, 371.2234);
    }

    #[test]
    fn test_risk_products_discount_mid_year() {
        let series = PaymentSeries::new(Product::DefinedRisk, vec![1.0, 1.0]);
        let pv = present_value(&series, &InterestPath::Flat(3.0), None).unwrap();
        let v: f64 = 1.0 / 1.03;
        assert_relative_eq!(pv, v.powf(0.5) + v.powf(1.5), epsilon = 1e-12);
    }

    #[test]
    fn test_undefined_partner_switches_convention_at_pension_age() {
        let series = PaymentSeries::anchored(
            Product::UndefinedPartnerExchangeable,
            vec![1.0; 5],
            60,
            62,
        );
        let pv = present_value(&series, &InterestPath::Flat(3.0), None).unwrap();

        let v: f64 = 1.0 / 1.03;
        // Years 0..=2 are at or before the pension-age horizon: mid-year
        let expected = v.powf(0.5) + v.powf(1.5) + v.powf(2.5) + v.powf(3.0) + v.powf(4.0);
        assert_relative_eq!(pv, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_undefined_partner_requires_anchors() {
        let series = PaymentSeries::new(Product::UndefinedPartner, vec![1.0]);
        assert_eq!(
            present_value(&series, &InterestPath::Flat(3.0), None).unwrap_err(),
            FactorError::MissingSeriesAnchors {
                product: Product::UndefinedPartner
            }
        );
    }

    #[test]
    fn test_curve_is_right_padded() {
        let series = annual_series(vec![1.0; 4]);
        let curve = InterestPath::Curve(vec![2.0, 3.0]);
        assert_eq!(curve.broadcast(4).unwrap(), vec![2.0, 3.0, 3.0, 3.0]);

        let pv = present_value(&series, &curve, None).unwrap();
        let expected = 1.0
            + 1.0 / 1.03
            + (1.0f64 / 1.03).powi(2)
            + (1.0f64 / 1.03).powi(3);
        // Year 0 discounts with exponent 0 whatever its rate
        assert_relative_eq!(pv, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_curve_is_rejected() {
        let curve = InterestPath::Curve(Vec::new());
        assert_eq!(
            curve.broadcast(3).unwrap_err(),
            FactorError::EmptyInterestPath
        );
    }

    #[test]
    fn test_rounding_helper() {
        assert_eq!(round_to(1.23456, 4), 1.2346);
        assert_eq!(round_to(-1.23455, 2), -1.23);
    }
}
