//! Shared annuity primitives
//!
//! Every product variant is assembled from two building blocks: the deferred
//! lifetime annuity on a survival row, and the conversion from payment at the
//! start of each year to a continuous (mid-period) approximation.

use crate::tables::SurvivalRow;
use crate::FactorError;

/// Expected payments of a (deferred) lifetime annuity of 1 per year.
///
/// The series has one entry per tabulated age in `row`: 0 for the deferral
/// years, then `lx(anchor + t) / lx(anchor)`, with years past the end of the
/// table paying 0.
pub fn deferred_annuity(
    row: &SurvivalRow<'_>,
    anchor_age: u32,
    defer: usize,
) -> Result<Vec<f64>, FactorError> {
    let nrows = row.len();
    if defer >= nrows {
        return Err(FactorError::DeferralExceedsTable {
            defer,
            rows: nrows,
        });
    }
    let denom = row
        .lx(anchor_age)
        .ok_or(FactorError::AgeOutOfRange { age: anchor_age })?;
    if denom == 0.0 {
        return Err(FactorError::ZeroSurvivors { age: anchor_age });
    }
    Ok((0..nrows)
        .map(|t| {
            if t < defer {
                0.0
            } else {
                row.lx(anchor_age + t as u32).unwrap_or(0.0) / denom
            }
        })
        .collect())
}

/// Convert a pre-numerando series to the continuous-payment approximation.
///
/// Averaging the series with its one-period-delayed copy halves the first
/// strictly positive entry and leaves the rest unchanged. A series with no
/// positive entry is returned as-is.
pub fn prae_to_continuous(mut payments: Vec<f64>) -> Vec<f64> {
    if let Some(first) = payments.iter_mut().find(|v| **v > 0.0) {
        *first /= 2.0;
    }
    payments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{Gender, MortalityModel, MAX_AGE};

    fn model() -> MortalityModel {
        let lx: Vec<f64> = (0..=MAX_AGE).map(|x| 1210.0 - 10.0 * x as f64).collect();
        MortalityModel::flat(lx.clone(), lx).unwrap()
    }

    #[test]
    fn test_deferred_annuity_values() {
        let model = model();
        let row = model.row(Gender::Male, 30);
        let cf = deferred_annuity(&row, 30, 5).unwrap();

        assert_eq!(cf.len(), 121);
        assert_eq!(&cf[..5], &[0.0; 5]);
        // lx(30) = 910, lx(35) = 860
        assert!((cf[5] - 860.0 / 910.0).abs() < 1e-12);
        // Past the table end the annuity pays nothing
        assert!((cf[90] - 10.0 / 910.0).abs() < 1e-12);
        assert_eq!(cf[91], 0.0);
        assert_eq!(cf[120], 0.0);
    }

    #[test]
    fn test_undeferred_annuity_starts_at_one() {
        let model = model();
        let row = model.row(Gender::Female, 60);
        let cf = deferred_annuity(&row, 60, 0).unwrap();
        assert_eq!(cf[0], 1.0);
    }

    #[test]
    fn test_deferral_exceeding_table_is_rejected() {
        let model = model();
        let row = model.row(Gender::Male, 30);
        let err = deferred_annuity(&row, 30, 121).unwrap_err();
        assert_eq!(
            err,
            FactorError::DeferralExceedsTable {
                defer: 121,
                rows: 121
            }
        );
    }

    #[test]
    fn test_prae_to_continuous_halves_first_positive() {
        assert_eq!(
            prae_to_continuous(vec![0.0, 0.0, 2.0, 4.0]),
            vec![0.0, 0.0, 1.0, 4.0]
        );
        // First *positive* entry, not first nonzero
        assert_eq!(
            prae_to_continuous(vec![-1.0, 2.0, 3.0]),
            vec![-1.0, 1.0, 3.0]
        );
        // Nothing positive: unchanged
        assert_eq!(prae_to_continuous(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }
}
