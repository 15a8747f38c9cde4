//! One-dimensional linear interpolation on monotonic grids.
//!
//! Interpolation never extrapolates: targets outside the donor coordinate
//! range yield NaN.

use crate::coordinate::{Coordinate, Dim};
use crate::errors::{StratoError, StratoResult};
use crate::field::Field;
use ndarray::{ArrayD, Axis, IxDyn, Zip};
use num::Float;

/// Linearly interpolate `ys(xs)` at `x`.
///
/// `xs` must be strictly monotonic, either ascending or descending.
/// Returns NaN when `x` lies outside `[min(xs), max(xs)]` or is itself NaN.
///
/// # Example
/// ```
/// use strato_core::interpolate::interp1d;
///
/// let xs: [f64; 3] = [1000.0, 500.0, 100.0];
/// let ys = [290.0, 250.0, 210.0];
/// assert_eq!(interp1d(&xs, &ys, 750.0), 270.0);
/// assert!(interp1d(&xs, &ys, 50.0).is_nan());
/// ```
pub fn interp1d<F: Float>(xs: &[F], ys: &[F], x: F) -> F {
    assert_eq!(xs.len(), ys.len(), "xs and ys must have the same length");
    let n = xs.len();
    if n == 0 || x.is_nan() {
        return F::nan();
    }
    if n == 1 {
        return if x == xs[0] { ys[0] } else { F::nan() };
    }

    let ascending = xs[0] < xs[n - 1];
    let (lo, hi) = if ascending {
        (xs[0], xs[n - 1])
    } else {
        (xs[n - 1], xs[0])
    };
    if x < lo || x > hi {
        return F::nan();
    }

    // First index whose coordinate is past `x` in the direction of the grid
    let upper = if ascending {
        xs.partition_point(|&v| v < x)
    } else {
        xs.partition_point(|&v| v > x)
    };
    if upper < n && xs[upper] == x {
        return ys[upper];
    }
    let upper = upper.clamp(1, n - 1);
    let lower = upper - 1;

    let fac = (x - xs[lower]) / (xs[upper] - xs[lower]);
    ys[lower] + (ys[upper] - ys[lower]) * fac
}

/// Interpolate `data` along `axis` from the `xs` grid onto `targets`
pub fn interp_axis(data: &ArrayD<f64>, axis: usize, xs: &[f64], targets: &[f64]) -> ArrayD<f64> {
    let mut shape = data.shape().to_vec();
    shape[axis] = targets.len();
    let mut out = ArrayD::from_elem(IxDyn(&shape), f64::NAN);

    Zip::from(out.lanes_mut(Axis(axis)))
        .and(data.lanes(Axis(axis)))
        .for_each(|mut out_lane, lane| {
            let ys = lane.to_vec();
            for (o, &t) in out_lane.iter_mut().zip(targets) {
                *o = interp1d(xs, &ys, t);
            }
        });
    out
}

fn interp_field(field: &Field, dim: Dim, targets: &[f64]) -> StratoResult<Field> {
    let i = field.axis_index(dim)?;
    let target_coord = Coordinate::Values(targets.to_vec());
    target_coord.ensure_monotonic(dim.name())?;
    if targets.is_empty() {
        return Err(StratoError::EmptySelection {
            axis: dim.name().to_string(),
            detail: "no interpolation targets".to_string(),
        });
    }
    let data = interp_axis(field.data(), i, field.values(dim)?, targets);
    field.replace_axis(dim, target_coord, data)
}

/// Interpolate a field onto new pressure levels.
///
/// Interpolation is linear in pressure (not log-pressure). Levels outside the
/// field's own range become NaN.
pub fn interp_plev(field: &Field, levels: &[f64]) -> StratoResult<Field> {
    field.ensure_hpa()?;
    interp_field(field, Dim::Plev, levels)
}

/// Interpolate a field onto new latitudes
pub fn interp_lat(field: &Field, lats: &[f64]) -> StratoResult<Field> {
    interp_field(field, Dim::Lat, lats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_interp1d_ascending() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [0.0, 10.0, 40.0];
        assert_eq!(interp1d(&xs, &ys, 0.5), 5.0);
        assert_eq!(interp1d(&xs, &ys, 1.5), 25.0);
        assert_eq!(interp1d(&xs, &ys, 0.0), 0.0);
        assert_eq!(interp1d(&xs, &ys, 2.0), 40.0);
    }

    #[test]
    fn test_interp1d_descending() {
        let xs = [2.0, 1.0, 0.0];
        let ys = [40.0, 10.0, 0.0];
        assert_eq!(interp1d(&xs, &ys, 0.5), 5.0);
        assert_eq!(interp1d(&xs, &ys, 1.5), 25.0);
        assert_eq!(interp1d(&xs, &ys, 2.0), 40.0);
    }

    #[test]
    fn test_interp1d_no_extrapolation() {
        let xs = [0.0, 1.0];
        let ys = [0.0, 1.0];
        assert!(interp1d(&xs, &ys, -0.1).is_nan());
        assert!(interp1d(&xs, &ys, 1.1).is_nan());
        assert!(interp1d(&xs, &ys, f64::NAN).is_nan());
        assert!(interp1d(&[3.0], &[7.0], 2.0).is_nan());
        assert_eq!(interp1d(&[3.0], &[7.0], 3.0), 7.0);
    }

    #[test]
    fn test_interp1d_f32() {
        let xs = [0.0f32, 4.0];
        let ys = [0.0f32, 8.0];
        assert_eq!(interp1d(&xs, &ys, 1.0f32), 2.0f32);
    }

    #[test]
    fn test_interp_axis() {
        // two rows, interpolate along columns
        let data = array![[0.0, 10.0, 20.0], [1.0, 2.0, 3.0]].into_dyn();
        let out = interp_axis(&data, 1, &[0.0, 1.0, 2.0], &[0.5, 2.5]);
        assert_eq!(out.shape(), &[2, 2]);
        assert_eq!(out[[0, 0]], 5.0);
        assert_eq!(out[[1, 0]], 1.5);
        assert!(out[[0, 1]].is_nan());
    }

    #[test]
    fn test_interp_lat_field() {
        let field = Field::new(
            "ta",
            "test",
            vec![(Dim::Lat, Coordinate::Values(vec![-90.0, 0.0, 90.0]))],
            array![200.0, 300.0, 200.0].into_dyn(),
        )
        .unwrap();
        let out = interp_lat(&field, &[-45.0, 45.0]).unwrap();
        assert_eq!(out.values(Dim::Lat).unwrap(), &[-45.0, 45.0]);
        assert_eq!(out.data()[[0]], 250.0);
        assert_eq!(out.data()[[1]], 250.0);
    }
}
