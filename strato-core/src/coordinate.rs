//! Canonical axes and their coordinate vectors.
//!
//! Every [`Field`](crate::field::Field) is addressed through the four canonical
//! axes in [`Dim`]. Source-specific names (`valid_time`, `lv_HYBL1`, ...) only
//! exist on a [`RawDataset`](crate::harmonize::RawDataset) before harmonisation.

use crate::errors::{StratoError, StratoResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical axis of a temperature field.
///
/// The declaration order is the storage order of a [`Field`](crate::field::Field):
/// time first, longitude last.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dim {
    Time,
    Plev,
    Lat,
    Lon,
}

impl Dim {
    /// All axes in storage order
    pub const ALL: [Dim; 4] = [Dim::Time, Dim::Plev, Dim::Lat, Dim::Lon];

    /// Canonical name of the axis
    pub fn name(&self) -> &'static str {
        match self {
            Dim::Time => "time",
            Dim::Plev => "plev",
            Dim::Lat => "lat",
            Dim::Lon => "lon",
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Direction of a strictly monotonic coordinate
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ordered coordinate vector attached to one axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Coordinate {
    /// Numeric coordinate (latitude, longitude, pressure)
    Values(Vec<f64>),
    /// Calendar time stamps
    Times(Vec<NaiveDate>),
}

impl Coordinate {
    pub fn len(&self) -> usize {
        match self {
            Coordinate::Values(v) => v.len(),
            Coordinate::Times(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric values, if this is a numeric coordinate
    pub fn values(&self) -> Option<&[f64]> {
        match self {
            Coordinate::Values(v) => Some(v),
            Coordinate::Times(_) => None,
        }
    }

    /// Time stamps, if this is a time coordinate
    pub fn times(&self) -> Option<&[NaiveDate]> {
        match self {
            Coordinate::Times(t) => Some(t),
            Coordinate::Values(_) => None,
        }
    }

    /// Direction of the coordinate.
    ///
    /// Returns `None` for coordinates with fewer than two points or that are not
    /// strictly monotonic.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Coordinate::Values(v) => direction_of(v),
            Coordinate::Times(t) => direction_of(t),
        }
    }

    /// Check that the coordinate is strictly monotonic and has no NaN entries
    pub fn ensure_monotonic(&self, name: &str) -> StratoResult<()> {
        if let Coordinate::Values(v) = self {
            if v.iter().any(|x| x.is_nan()) {
                return Err(StratoError::NonMonotonic(name.to_string()));
            }
        }
        if self.len() < 2 || self.direction().is_some() {
            Ok(())
        } else {
            Err(StratoError::NonMonotonic(name.to_string()))
        }
    }

    /// Subset of the coordinate at the given positions
    pub fn select(&self, indices: &[usize]) -> Coordinate {
        match self {
            Coordinate::Values(v) => Coordinate::Values(indices.iter().map(|&i| v[i]).collect()),
            Coordinate::Times(t) => Coordinate::Times(indices.iter().map(|&i| t[i]).collect()),
        }
    }
}

fn direction_of<T: PartialOrd>(values: &[T]) -> Option<Direction> {
    if values.len() < 2 {
        return None;
    }
    if values.windows(2).all(|w| w[0] < w[1]) {
        Some(Direction::Ascending)
    } else if values.windows(2).all(|w| w[0] > w[1]) {
        Some(Direction::Descending)
    } else {
        None
    }
}

/// Units of the vertical coordinate
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PressureUnits {
    /// Pascals (CMIP6 `plev`)
    Pa,
    /// Hectopascals, the canonical unit
    #[default]
    HPa,
    /// Model hybrid-level index; needs a nominal pressure table before use
    Hybrid,
}

impl fmt::Display for PressureUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PressureUnits::Pa => "Pa",
            PressureUnits::HPa => "hPa",
            PressureUnits::Hybrid => "hybrid level",
        };
        write!(f, "{}", s)
    }
}

/// Longitude convention of a field
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LonConvention {
    /// Longitudes in `[0, 360)`
    ZeroTo360,
    /// Longitudes in `[-180, 180)`
    PlusMinus180,
}

impl LonConvention {
    /// Guess the convention from longitude values.
    ///
    /// Any negative longitude implies `PlusMinus180`, otherwise `ZeroTo360`.
    pub fn detect(lons: &[f64]) -> Self {
        if lons.iter().any(|&l| l < 0.0) {
            LonConvention::PlusMinus180
        } else {
            LonConvention::ZeroTo360
        }
    }

    /// Express a longitude in this convention
    pub fn wrap(&self, lon: f64) -> f64 {
        match self {
            LonConvention::ZeroTo360 => lon.rem_euclid(360.0),
            LonConvention::PlusMinus180 => (lon + 180.0).rem_euclid(360.0) - 180.0,
        }
    }
}

/// Round a value to a fixed number of decimal places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction() {
        let asc = Coordinate::Values(vec![-90.0, 0.0, 90.0]);
        let desc = Coordinate::Values(vec![1000.0, 500.0, 1.0]);
        let flat = Coordinate::Values(vec![1.0, 1.0]);

        assert_eq!(asc.direction(), Some(Direction::Ascending));
        assert_eq!(desc.direction(), Some(Direction::Descending));
        assert_eq!(flat.direction(), None);
        assert!(flat.ensure_monotonic("lat").is_err());
        assert!(Coordinate::Values(vec![5.0]).ensure_monotonic("lat").is_ok());
    }

    #[test]
    fn test_nan_coordinate_rejected() {
        let coord = Coordinate::Values(vec![0.0, f64::NAN, 2.0]);
        assert!(matches!(
            coord.ensure_monotonic("lat"),
            Err(StratoError::NonMonotonic(_))
        ));
    }

    #[test]
    fn test_times_direction() {
        let times = Coordinate::Times(vec![
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2000, 2, 1).unwrap(),
        ]);
        assert_eq!(times.direction(), Some(Direction::Ascending));
        assert!(times.values().is_none());
    }

    #[test]
    fn test_lon_wrap() {
        assert_eq!(LonConvention::detect(&[0.0, 90.0, 270.0]), LonConvention::ZeroTo360);
        assert_eq!(LonConvention::detect(&[-90.0, 90.0]), LonConvention::PlusMinus180);

        assert_eq!(LonConvention::PlusMinus180.wrap(270.0), -90.0);
        assert_eq!(LonConvention::PlusMinus180.wrap(180.0), -180.0);
        assert_eq!(LonConvention::ZeroTo360.wrap(-90.0), 270.0);
        assert_eq!(LonConvention::ZeroTo360.wrap(360.0), 0.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(998.499_999, 2), 998.5);
        assert_eq!(round_to(0.004, 2), 0.0);
    }
}
