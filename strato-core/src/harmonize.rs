//! Mapping raw source datasets onto canonical fields.

use crate::convention::SourceConvention;
use crate::coordinate::{round_to, Coordinate, Dim, PressureUnits};
use crate::errors::{StratoError, StratoResult};
use crate::field::Field;
use log::debug;
use ndarray::{ArrayD, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One variable of a raw dataset, with the source's own dimension names
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawVariable {
    pub dims: Vec<String>,
    pub data: ArrayD<f64>,
}

/// A dataset as delivered by a source, before any renaming.
///
/// Coordinates and variables are keyed by the source's names
/// (`valid_time`, `lv_HYBL1`, `TMP_GDS4_HYBL_S123`, ...).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawDataset {
    pub name: String,
    pub coords: BTreeMap<String, Coordinate>,
    pub variables: BTreeMap<String, RawVariable>,
}

impl RawDataset {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_coord(mut self, name: &str, coord: Coordinate) -> Self {
        self.coords.insert(name.to_string(), coord);
        self
    }

    pub fn with_variable(mut self, name: &str, dims: &[&str], data: ArrayD<f64>) -> Self {
        self.variables.insert(
            name.to_string(),
            RawVariable {
                dims: dims.iter().map(|d| d.to_string()).collect(),
                data,
            },
        );
        self
    }
}

/// Convert pressures from Pa to hPa, rounded to two decimal places.
///
/// ```
/// use strato_core::harmonize::pa_to_hpa;
///
/// assert_eq!(pa_to_hpa(&[100000.0, 50000.0, 10000.0]), vec![1000.0, 500.0, 100.0]);
/// ```
pub fn pa_to_hpa(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| round_to(v * 0.01, 2)).collect()
}

fn canonical_dim(name: &str, convention: &SourceConvention) -> Option<Dim> {
    let names = &convention.names;
    if name == names.time {
        Some(Dim::Time)
    } else if name == names.plev {
        Some(Dim::Plev)
    } else if name == names.lat {
        Some(Dim::Lat)
    } else if name == names.lon {
        Some(Dim::Lon)
    } else {
        None
    }
}

/// Vertical coordinate in hPa
fn plev_in_hpa(coord: &Coordinate, convention: &SourceConvention) -> StratoResult<Coordinate> {
    let values = coord.values().ok_or_else(|| {
        StratoError::ShapeMismatch(format!("'{}' is not numeric", convention.names.plev))
    })?;

    if let Some(levels) = &convention.level_substitution {
        if levels.len() != values.len() {
            return Err(StratoError::ShapeMismatch(format!(
                "{} has {} levels but the substitution table has {}",
                convention.name,
                values.len(),
                levels.len()
            )));
        }
        return Ok(Coordinate::Values(levels.clone()));
    }

    match convention.plev_units {
        PressureUnits::Pa => Ok(Coordinate::Values(pa_to_hpa(values))),
        PressureUnits::HPa => Ok(coord.clone()),
        PressureUnits::Hybrid => Err(StratoError::UnitMismatch {
            expected: PressureUnits::HPa.to_string(),
            found: PressureUnits::Hybrid.to_string(),
        }),
    }
}

/// Positions that put a time coordinate in ascending order
fn ascending_order(coord: &Coordinate) -> Vec<usize> {
    let mut order: Vec<usize> = (0..coord.len()).collect();
    if let Some(times) = coord.times() {
        order.sort_by_key(|&k| times[k]);
    }
    order
}

/// Build the canonical temperature field of a raw dataset.
///
/// The source's axis and variable names are replaced by the canonical ones,
/// the data is transposed into canonical order, pressure levels are
/// converted to hPa (or replaced by the convention's nominal levels) and the
/// time axis is sorted when the convention asks for it. Extra dimensions of
/// length one are dropped.
///
/// Latitude, pressure and time must be present; longitude is optional.
///
/// # Errors
///
/// * [`StratoError::MissingVariable`] if the temperature variable is absent
/// * [`StratoError::MissingAxis`] if a required axis or its coordinate is absent
/// * [`StratoError::ShapeMismatch`] for unknown dimensions longer than one
pub fn harmonize(raw: &RawDataset, convention: &SourceConvention) -> StratoResult<Field> {
    let names = &convention.names;
    let variable = raw
        .variables
        .get(&names.ta)
        .ok_or_else(|| StratoError::MissingVariable {
            variable: names.ta.clone(),
            source_name: raw.name.clone(),
        })?;
    if variable.dims.len() != variable.data.ndim() {
        return Err(StratoError::ShapeMismatch(format!(
            "'{}' lists {} dimensions for a {}-dimensional array",
            names.ta,
            variable.dims.len(),
            variable.data.ndim()
        )));
    }

    let mut data = variable.data.clone();
    let mut axes: Vec<(Dim, Coordinate)> = Vec::with_capacity(4);
    // walk backwards so dropping a singleton does not shift later positions
    let mut kept: Vec<(usize, Dim, &str)> = Vec::new();
    for (k, name) in variable.dims.iter().enumerate().rev() {
        match canonical_dim(name, convention) {
            Some(dim) => kept.push((k, dim, name.as_str())),
            None if data.shape()[k] == 1 => {
                debug!("{}: dropping singleton dimension '{}'", raw.name, name);
                data = data.index_axis_move(Axis(k), 0);
            }
            None => {
                return Err(StratoError::ShapeMismatch(format!(
                    "unknown dimension '{}' of length {} in {}",
                    name,
                    data.shape()[k],
                    raw.name
                )))
            }
        }
    }
    kept.reverse();

    for required in [Dim::Lat, Dim::Plev, Dim::Time] {
        if !kept.iter().any(|(_, dim, _)| *dim == required) {
            let axis = match required {
                Dim::Lat => &names.lat,
                Dim::Plev => &names.plev,
                _ => &names.time,
            };
            return Err(StratoError::MissingAxis {
                axis: axis.clone(),
                source_name: raw.name.clone(),
            });
        }
    }

    for (position, (_, dim, name)) in kept.iter().enumerate() {
        let coord = raw
            .coords
            .get(*name)
            .ok_or_else(|| StratoError::MissingAxis {
                axis: name.to_string(),
                source_name: raw.name.clone(),
            })?;
        let coord = match dim {
            Dim::Plev => plev_in_hpa(coord, convention)?,
            Dim::Time if convention.sort_time => {
                let order = ascending_order(coord);
                data = data.select(Axis(position), &order);
                coord.select(&order)
            }
            _ => coord.clone(),
        };
        axes.push((*dim, coord));
    }

    debug!(
        "harmonised {} with the {} convention: {:?}",
        raw.name,
        convention.name,
        axes.iter().map(|(d, c)| (d.name(), c.len())).collect::<Vec<_>>()
    );
    Field::new("ta", &raw.name, axes, data)
}
