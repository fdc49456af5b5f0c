//! Weighted center-of-gravity bearing estimation.

use crate::error::{Error, Result};

/// Compute the weighted center of gravity of `angles` under `weights`.
///
/// When `angles` is `None` each sample's position (0, 1, 2, ...) is used as
/// its angle, which turns the result into a centroid over observation order;
/// [`temporal_centroid`] names that use explicitly.
///
/// Returns `Ok(None)` for an empty weight vector. Angles are shifted by their
/// mean before the weighted sum, which keeps precision when the angles are
/// large compared to their spread.
///
/// # Errors
///
/// - [`Error::LengthMismatch`] if `angles` and `weights` differ in length.
/// - [`Error::DivisionByZero`] if the weights sum to zero.
pub fn center_of_gravity(weights: &[f64], angles: Option<&[f64]>) -> Result<Option<f64>> {
    if weights.is_empty() {
        return Ok(None);
    }

    let positions: Vec<f64>;
    let angles = match angles {
        Some(angles) if angles.len() != weights.len() => {
            return Err(Error::LengthMismatch {
                weights: weights.len(),
                angles: angles.len(),
            });
        }
        Some(angles) => angles,
        None => {
            positions = (0..weights.len()).map(|i| i as f64).collect();
            &positions
        }
    };

    let total: f64 = weights.iter().sum();
    if total == 0.0 {
        return Err(Error::DivisionByZero);
    }

    let mid = angles.iter().sum::<f64>() / angles.len() as f64;
    let moment: f64 = weights
        .iter()
        .zip(angles)
        .map(|(w, a)| w * (a - mid))
        .sum();

    Ok(Some(mid + moment / total))
}

/// Center of gravity over sample positions.
pub fn temporal_centroid(weights: &[f64]) -> Result<Option<f64>> {
    center_of_gravity(weights, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cog(weights: &[f64], angles: &[f64]) -> f64 {
        center_of_gravity(weights, Some(angles)).unwrap().unwrap()
    }

    #[test]
    fn test_uniform_weights_give_mean() {
        assert_eq!(cog(&[1.0, 1.0, 1.0], &[0.0, 10.0, 20.0]), 10.0);
    }

    #[test]
    fn test_single_weight_picks_angle() {
        assert_eq!(cog(&[1.0, 0.0, 0.0], &[0.0, 10.0, 20.0]), 0.0);
        assert_eq!(cog(&[0.0, 0.0, 3.0], &[0.0, 10.0, 20.0]), 20.0);
    }

    #[test]
    fn test_weighted() {
        let bearing = cog(&[1.0, 3.0], &[100.0, 200.0]);
        assert!((bearing - 175.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_power_weights() {
        // Raw dBm weights are all negative; the sign cancels out.
        let bearing = cog(&[-40.0, -40.0], &[30.0, 50.0]);
        assert!((bearing - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_large_angles_keep_precision() {
        let base = 1.0e12;
        let bearing = cog(&[1.0, 1.0, 2.0], &[base, base + 1.0, base + 2.0]);
        assert_eq!(bearing, base + 1.25);
    }

    #[test]
    fn test_positions_when_no_angles() {
        let bearing = center_of_gravity(&[1.0, 1.0, 1.0, 1.0, 1.0], None)
            .unwrap()
            .unwrap();
        assert_eq!(bearing, 2.0);
        assert_eq!(temporal_centroid(&[0.0, 0.0, 5.0]).unwrap(), Some(2.0));
    }

    #[test]
    fn test_empty_weights() {
        assert_eq!(center_of_gravity(&[], None).unwrap(), None);
        assert_eq!(center_of_gravity(&[], Some(&[][..])).unwrap(), None);
    }

    #[test]
    fn test_length_mismatch() {
        let result = center_of_gravity(&[1.0, 1.0], Some(&[0.0, 10.0, 20.0][..]));
        assert!(matches!(
            result,
            Err(Error::LengthMismatch {
                weights: 2,
                angles: 3
            })
        ));
    }

    #[test]
    fn test_zero_weights() {
        let result = center_of_gravity(&[0.0, 0.0], Some(&[10.0, 20.0][..]));
        assert!(matches!(result, Err(Error::DivisionByZero)));

        let result = center_of_gravity(&[1.0, -1.0], None);
        assert!(matches!(result, Err(Error::DivisionByZero)));
    }
}
