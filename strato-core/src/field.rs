//! Labelled multi-dimensional temperature fields.
//!
//! A [`Field`] couples an n-dimensional array with one [`Coordinate`] per axis.
//! Axes are always stored in canonical [`Dim`] order (time, plev, lat, lon) for
//! whichever axes are present, so two fields with the same set of axes can be
//! combined element by element once their coordinates agree.
//!
//! Fields are values: every operation borrows its input and returns a new field.
//!
//! # Examples
//!
//! ```rust
//! use ndarray::{ArrayD, IxDyn};
//! use strato_core::coordinate::{Coordinate, Dim};
//! use strato_core::field::Field;
//!
//! let field = Field::new(
//!     "ta",
//!     "example",
//!     vec![
//!         (Dim::Lat, Coordinate::Values(vec![-45.0, 45.0])),
//!         (Dim::Plev, Coordinate::Values(vec![1000.0, 500.0, 100.0])),
//!     ],
//!     ArrayD::zeros(IxDyn(&[2, 3])),
//! )
//! .unwrap();
//!
//! // Stored in canonical order regardless of the input order
//! assert_eq!(field.dims(), &[Dim::Plev, Dim::Lat]);
//! assert_eq!(field.shape(), &[3, 2]);
//! ```

use crate::coordinate::{Coordinate, Dim, LonConvention, PressureUnits};
use crate::errors::{StratoError, StratoResult};
use chrono::NaiveDate;
use ndarray::{ArrayD, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Tolerance used when matching rounded coordinate values
pub(crate) const COORD_TOLERANCE: f64 = 1e-9;

/// A temperature (or other scalar) field on named canonical axes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Field {
    /// Variable name, `ta` after harmonisation
    variable: String,
    /// Provenance of the data (model or reanalysis name)
    source: String,
    dims: Vec<Dim>,
    coords: Vec<Coordinate>,
    data: ArrayD<f64>,
    plev_units: PressureUnits,
    lon_convention: Option<LonConvention>,
}

impl Field {
    /// Create a new field.
    ///
    /// `axes` may be given in any order; the data is transposed into canonical
    /// order. Fails if an axis is repeated, if the number of axes or their
    /// lengths do not match `data`, if a time axis is not given as time stamps
    /// (or a spatial axis as numbers), or if any coordinate is not strictly
    /// monotonic.
    pub fn new(
        variable: &str,
        source: &str,
        axes: Vec<(Dim, Coordinate)>,
        data: ArrayD<f64>,
    ) -> StratoResult<Self> {
        if axes.len() != data.ndim() {
            return Err(StratoError::ShapeMismatch(format!(
                "{} axes given for a {}-dimensional array",
                axes.len(),
                data.ndim()
            )));
        }

        for (k, (dim, coord)) in axes.iter().enumerate() {
            if axes[..k].iter().any(|(d, _)| d == dim) {
                return Err(StratoError::ShapeMismatch(format!(
                    "axis '{}' given more than once",
                    dim
                )));
            }
            if data.shape()[k] != coord.len() {
                return Err(StratoError::ShapeMismatch(format!(
                    "axis '{}' has {} coordinates but the data has extent {}",
                    dim,
                    coord.len(),
                    data.shape()[k]
                )));
            }
            let kind_ok = match dim {
                Dim::Time => coord.times().is_some(),
                _ => coord.values().is_some(),
            };
            if !kind_ok {
                return Err(StratoError::ShapeMismatch(format!(
                    "axis '{}' has the wrong coordinate type",
                    dim
                )));
            }
            coord.ensure_monotonic(dim.name())?;
        }

        let mut order: Vec<usize> = (0..axes.len()).collect();
        order.sort_by_key(|&k| axes[k].0);

        let data = data
            .permuted_axes(order.clone())
            .as_standard_layout()
            .into_owned();
        let dims: Vec<Dim> = order.iter().map(|&k| axes[k].0).collect();
        let coords: Vec<Coordinate> = order.iter().map(|&k| axes[k].1.clone()).collect();

        let lon_convention = dims
            .iter()
            .position(|d| *d == Dim::Lon)
            .and_then(|i| coords[i].values())
            .map(LonConvention::detect);

        Ok(Self {
            variable: variable.to_string(),
            source: source.to_string(),
            dims,
            coords,
            data,
            plev_units: PressureUnits::HPa,
            lon_convention,
        })
    }

    /// Build a field sharing this field's metadata. The caller guarantees
    /// that `dims`, `coords` and `data` are consistent.
    pub(crate) fn with_parts(
        &self,
        dims: Vec<Dim>,
        coords: Vec<Coordinate>,
        data: ArrayD<f64>,
    ) -> Field {
        let lon_convention = if dims.contains(&Dim::Lon) {
            self.lon_convention
        } else {
            None
        };
        Field {
            variable: self.variable.clone(),
            source: self.source.clone(),
            dims,
            coords,
            data,
            plev_units: self.plev_units,
            lon_convention,
        }
    }

    /// Same axes and coordinates, new values
    pub(crate) fn with_data(&self, data: ArrayD<f64>) -> Field {
        debug_assert_eq!(data.shape(), self.data.shape());
        self.with_parts(self.dims.clone(), self.coords.clone(), data)
    }

    /// Replace one axis' coordinate and the data along it
    pub(crate) fn replace_axis(
        &self,
        dim: Dim,
        coord: Coordinate,
        data: ArrayD<f64>,
    ) -> StratoResult<Field> {
        let i = self.axis_index(dim)?;
        debug_assert_eq!(data.shape()[i], coord.len());
        let mut coords = self.coords.clone();
        coords[i] = coord;
        Ok(self.with_parts(self.dims.clone(), coords, data))
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn dims(&self) -> &[Dim] {
        &self.dims
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn into_data(self) -> ArrayD<f64> {
        self.data
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn plev_units(&self) -> PressureUnits {
        self.plev_units
    }

    /// Tag the units of the vertical coordinate.
    ///
    /// This only changes the metadata. Use
    /// [`harmonize`](crate::harmonize::harmonize) to convert values.
    pub fn with_plev_units(mut self, units: PressureUnits) -> Self {
        self.plev_units = units;
        self
    }

    pub fn lon_convention(&self) -> Option<LonConvention> {
        self.lon_convention
    }

    pub fn has_dim(&self, dim: Dim) -> bool {
        self.dims.contains(&dim)
    }

    /// Position of `dim` in the data array
    pub fn axis_index(&self, dim: Dim) -> StratoResult<usize> {
        self.dims
            .iter()
            .position(|d| *d == dim)
            .ok_or_else(|| StratoError::MissingAxis {
                axis: dim.name().to_string(),
                source_name: self.source.clone(),
            })
    }

    pub fn coordinate(&self, dim: Dim) -> StratoResult<&Coordinate> {
        Ok(&self.coords[self.axis_index(dim)?])
    }

    /// Numeric coordinate values of a spatial axis
    pub fn values(&self, dim: Dim) -> StratoResult<&[f64]> {
        self.coordinate(dim)?
            .values()
            .ok_or_else(|| StratoError::ShapeMismatch(format!("axis '{}' is not numeric", dim)))
    }

    /// Time stamps of the time axis
    pub fn times(&self) -> StratoResult<&[NaiveDate]> {
        self.coordinate(Dim::Time)?
            .times()
            .ok_or_else(|| StratoError::ShapeMismatch("time axis holds no dates".to_string()))
    }

    /// Fail unless the vertical coordinate (if any) is in hectopascals
    pub fn ensure_hpa(&self) -> StratoResult<()> {
        if self.has_dim(Dim::Plev) && self.plev_units != PressureUnits::HPa {
            return Err(StratoError::UnitMismatch {
                expected: PressureUnits::HPa.to_string(),
                found: self.plev_units.to_string(),
            });
        }
        Ok(())
    }

    /// Keep the given positions along `dim`, in the given order
    pub fn select_indices(&self, dim: Dim, indices: &[usize]) -> StratoResult<Field> {
        let i = self.axis_index(dim)?;
        if indices.is_empty() {
            return Err(StratoError::EmptySelection {
                axis: dim.name().to_string(),
                detail: format!("no points selected from {}", self.source),
            });
        }
        let coord = self.coords[i].select(indices);
        let data = self.data.select(Axis(i), indices);
        self.replace_axis(dim, coord, data)
    }

    /// Select coordinates within the closed interval spanned by `a` and `b`.
    ///
    /// The bounds may be given in either order and the coordinate may be
    /// ascending or descending; the original order of the points is kept.
    pub fn select_range(&self, dim: Dim, a: f64, b: f64) -> StratoResult<Field> {
        let values = self.values(dim)?;
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let indices: Vec<usize> = values
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v >= lo - COORD_TOLERANCE && v <= hi + COORD_TOLERANCE)
            .map(|(k, _)| k)
            .collect();
        if indices.is_empty() {
            return Err(StratoError::EmptySelection {
                axis: dim.name().to_string(),
                detail: format!("no {} values in [{}, {}] for {}", dim, lo, hi, self.source),
            });
        }
        self.select_indices(dim, &indices)
    }

    /// Select time steps between `start` and `end` inclusive
    pub fn select_period(&self, start: NaiveDate, end: NaiveDate) -> StratoResult<Field> {
        let indices: Vec<usize> = self
            .times()?
            .iter()
            .enumerate()
            .filter(|(_, t)| **t >= start && **t <= end)
            .map(|(k, _)| k)
            .collect();
        if indices.is_empty() {
            return Err(StratoError::EmptySelection {
                axis: Dim::Time.name().to_string(),
                detail: format!("no time steps between {} and {} for {}", start, end, self.source),
            });
        }
        self.select_indices(Dim::Time, &indices)
    }

    /// Keep only the time steps whose stamp appears in `times`
    pub fn select_times(&self, times: &[NaiveDate]) -> StratoResult<Field> {
        let indices: Vec<usize> = self
            .times()?
            .iter()
            .enumerate()
            .filter(|(_, t)| times.contains(*t))
            .map(|(k, _)| k)
            .collect();
        self.select_indices(Dim::Time, &indices)
    }

    /// Keep the time steps for which `keep` returns true
    pub fn select_times_where<F>(&self, keep: F) -> StratoResult<Field>
    where
        F: Fn(&NaiveDate) -> bool,
    {
        let indices: Vec<usize> = self
            .times()?
            .iter()
            .enumerate()
            .filter(|(_, t)| keep(*t))
            .map(|(k, _)| k)
            .collect();
        self.select_indices(Dim::Time, &indices)
    }

    /// Reorder the field so that `dim` is ascending
    pub fn sort_by(&self, dim: Dim) -> StratoResult<Field> {
        let i = self.axis_index(dim)?;
        let mut order: Vec<usize> = (0..self.coords[i].len()).collect();
        match &self.coords[i] {
            Coordinate::Values(v) => {
                order.sort_by(|&a, &b| v[a].partial_cmp(&v[b]).unwrap_or(Ordering::Equal))
            }
            Coordinate::Times(t) => order.sort_by_key(|&k| t[k]),
        }
        if order.iter().enumerate().all(|(k, &o)| k == o) {
            return Ok(self.clone());
        }
        self.select_indices(dim, &order)
    }

    /// Re-express longitudes in another convention, keeping them ascending
    pub fn with_lon_convention(&self, convention: LonConvention) -> StratoResult<Field> {
        let i = self.axis_index(Dim::Lon)?;
        let wrapped: Vec<f64> = self
            .values(Dim::Lon)?
            .iter()
            .map(|&l| convention.wrap(l))
            .collect();
        let mut coords = self.coords.clone();
        coords[i] = Coordinate::Values(wrapped);

        let mut field = self.with_parts(self.dims.clone(), coords, self.data.clone());
        field = field.sort_by(Dim::Lon)?;
        field.coords[i].ensure_monotonic(Dim::Lon.name())?;
        field.lon_convention = Some(convention);
        Ok(field)
    }

    /// Collapse `dim` by applying `reducer` to every 1D lane along it
    pub fn reduce<F>(&self, dim: Dim, reducer: F) -> StratoResult<Field>
    where
        F: Fn(ArrayView1<f64>) -> f64,
    {
        let i = self.axis_index(dim)?;
        let data = self.data.map_axis(Axis(i), reducer);
        let mut dims = self.dims.clone();
        let mut coords = self.coords.clone();
        dims.remove(i);
        coords.remove(i);
        Ok(self.with_parts(dims, coords, data))
    }

    /// Apply `f` to every value
    pub fn map<F>(&self, f: F) -> Field
    where
        F: Fn(f64) -> f64,
    {
        self.with_parts(self.dims.clone(), self.coords.clone(), self.data.mapv(f))
    }

    /// Mean of all non-missing values, NaN if every value is missing
    pub fn nan_mean(&self) -> f64 {
        nan_mean(self.data.iter())
    }
}

/// Mean of the non-NaN values, NaN if there are none
pub fn nan_mean<'a, I>(values: I) -> f64
where
    I: IntoIterator<Item = &'a f64>,
{
    let (sum, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}
