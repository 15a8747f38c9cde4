//! Ordinary least-squares line fits.

use crate::errors::{StratoError, StratoResult};

/// Result of fitting `y = intercept + slope * x`
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Value of the fitted line at `x`
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fit a straight line through `(xs, ys)` by ordinary least squares.
///
/// # Errors
///
/// Returns [`StratoError::InsufficientData`] with fewer than two points or
/// when every `x` is identical.
///
/// # Panics
///
/// Panics if `xs` and `ys` have different lengths.
///
/// # Example
/// ```
/// use strato_core::utils::regression::linear_fit;
///
/// let fit = linear_fit(&[0.0, 1.0, 2.0], &[1.0, 3.0, 5.0]).unwrap();
/// assert!((fit.slope - 2.0).abs() < 1e-12);
/// assert!((fit.intercept - 1.0).abs() < 1e-12);
/// ```
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> StratoResult<LinearFit> {
    assert_eq!(xs.len(), ys.len(), "xs must have same length as ys");
    let n = xs.len();
    if n < 2 {
        return Err(StratoError::InsufficientData {
            needed: 2,
            found: n,
            detail: "linear regression".to_string(),
        });
    }

    let x_mean = xs.iter().sum::<f64>() / n as f64;
    let y_mean = ys.iter().sum::<f64>() / n as f64;

    let (sxy, sxx) = xs
        .iter()
        .zip(ys)
        .fold((0.0, 0.0), |(sxy, sxx), (&x, &y)| {
            let dx = x - x_mean;
            (sxy + dx * (y - y_mean), sxx + dx * dx)
        });

    if sxx == 0.0 {
        return Err(StratoError::InsufficientData {
            needed: 2,
            found: 1,
            detail: "linear regression needs at least two distinct x values".to_string(),
        });
    }

    let slope = sxy / sxx;
    Ok(LinearFit {
        slope,
        intercept: y_mean - slope * x_mean,
    })
}

/// Fit `ys` against the equally spaced index `0, 1, 2, ...`
pub fn index_fit(ys: &[f64]) -> StratoResult<LinearFit> {
    let xs: Vec<f64> = (0..ys.len()).map(|i| i as f64).collect();
    linear_fit(&xs, ys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exact_line() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys: Vec<f64> = xs.iter().map(|x| 0.5 - 3.0 * x).collect();
        let fit = linear_fit(&xs, &ys).unwrap();
        assert_relative_eq!(fit.slope, -3.0, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, 0.5, epsilon = 1e-12);
        assert_relative_eq!(fit.predict(10.0), -29.5, epsilon = 1e-12);
    }

    #[test]
    fn test_noisy_line() {
        // alternating noise around y = 2x
        let ys = [0.1, 1.9, 4.1, 5.9];
        let fit = index_fit(&ys).unwrap();
        assert_relative_eq!(fit.slope, 1.96, epsilon = 1e-12);
    }

    #[test]
    fn test_single_point() {
        match index_fit(&[1.0]) {
            Err(StratoError::InsufficientData { needed, found, .. }) => {
                assert_eq!(needed, 2);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_constant_x() {
        assert!(linear_fit(&[1.0, 1.0], &[0.0, 1.0]).is_err());
    }

    #[test]
    #[should_panic(expected = "xs must have same length as ys")]
    fn test_length_mismatch_panics() {
        let _ = linear_fit(&[0.0, 1.0], &[0.0]);
    }
}
