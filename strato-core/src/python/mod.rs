//! Python bindings for the numerical core
//!
//! Only plain numpy arrays and dicts cross the boundary. Errors are raised
//! as `ValueError`.

use crate::aggregate::{latitude_weights, weighted_nan_mean};
use crate::convention::SourceConvention;
use crate::coordinate::{Coordinate, Dim};
use crate::errors::StratoError;
use crate::field::{nan_mean, Field};
use crate::harmonize::pa_to_hpa;
use crate::interpolate;
use crate::season::SeasonYear;
use crate::trend::{decadal_trend, detrend_series};
use chrono::NaiveDate;
use ndarray::{Array1, Axis};
use numpy::{PyArray1, PyReadonlyArray1, PyReadonlyArrayDyn, ToPyArray};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

pub fn to_py_err(e: StratoError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn same_length(a: &[f64], b: &[f64], what: &str) -> PyResult<()> {
    if a.len() != b.len() {
        return Err(PyValueError::new_err(format!(
            "{} must have the same length ({} != {})",
            what,
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

/// Convert pressures from Pa to hPa, rounded to two decimals
#[pyfunction]
#[pyo3(name = "pa_to_hpa")]
fn py_pa_to_hpa<'py>(
    py: Python<'py>,
    values: PyReadonlyArray1<'py, f64>,
) -> Bound<'py, PyArray1<f64>> {
    pa_to_hpa(&values.as_array().to_vec()).to_pyarray_bound(py)
}

/// Area weight (cosine) of each latitude
#[pyfunction]
#[pyo3(name = "latitude_weights")]
fn py_latitude_weights<'py>(
    py: Python<'py>,
    lats: PyReadonlyArray1<'py, f64>,
) -> Bound<'py, PyArray1<f64>> {
    latitude_weights(&lats.as_array().to_vec()).to_pyarray_bound(py)
}

/// Cosine-latitude weighted mean of a `lat` vector or a `lat x lon` array,
/// skipping NaN. Longitudes are averaged first.
#[pyfunction]
#[pyo3(name = "area_weighted_mean")]
fn py_area_weighted_mean(
    values: PyReadonlyArrayDyn<'_, f64>,
    lats: PyReadonlyArray1<'_, f64>,
) -> PyResult<f64> {
    let values = values.as_array();
    let lats = lats.as_array().to_vec();
    let per_lat: Array1<f64> = match values.ndim() {
        1 => values.iter().copied().collect(),
        2 => values
            .map_axis(Axis(1), |lane| nan_mean(lane.iter()))
            .iter()
            .copied()
            .collect(),
        n => {
            return Err(PyValueError::new_err(format!(
                "expected a lat or lat x lon array, got {} dimensions",
                n
            )))
        }
    };
    same_length(&per_lat.to_vec(), &lats, "values and lats")?;
    Ok(weighted_nan_mean(per_lat.view(), &latitude_weights(&lats)))
}

/// Remove the linear trend of a series, keeping its mean
#[pyfunction]
#[pyo3(name = "detrend")]
fn py_detrend<'py>(
    py: Python<'py>,
    values: PyReadonlyArray1<'py, f64>,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let detrended = detrend_series(&values.as_array().to_vec()).map_err(to_py_err)?;
    Ok(detrended.to_pyarray_bound(py))
}

fn time_stamps(years: &[i32], months: Option<&[u32]>) -> PyResult<Vec<NaiveDate>> {
    let months = match months {
        Some(months) if months.len() != years.len() => {
            return Err(PyValueError::new_err(format!(
                "years and months must have the same length ({} != {})",
                years.len(),
                months.len()
            )))
        }
        Some(months) => months.to_vec(),
        None => vec![1; years.len()],
    };
    years
        .iter()
        .zip(months)
        .map(|(&y, m)| {
            NaiveDate::from_ymd_opt(y, m, 1)
                .ok_or_else(|| PyValueError::new_err(format!("invalid date {}-{}", y, m)))
        })
        .collect()
}

/// Linear trend per decade of a yearly or monthly series.
///
/// `years` (and `months` for monthly data) date each value; monthly data is
/// averaged per calendar year before the fit.
#[pyfunction]
#[pyo3(name = "decadal_trend", signature = (values, years, months=None))]
fn py_decadal_trend(
    values: PyReadonlyArray1<'_, f64>,
    years: Vec<i32>,
    months: Option<Vec<u32>>,
) -> PyResult<f64> {
    let values = values.as_array().to_owned();
    let times = time_stamps(&years, months.as_deref())?;
    let field = Field::new(
        "series",
        "python",
        vec![(Dim::Time, Coordinate::Times(times))],
        values.into_dyn(),
    )
    .map_err(to_py_err)?;
    let trend = decadal_trend(&field, SeasonYear::Calendar).map_err(to_py_err)?;
    Ok(trend.data().iter().next().copied().unwrap_or(f64::NAN))
}

/// Linear interpolation without extrapolation (NaN outside the grid)
#[pyfunction]
#[pyo3(name = "interp1d")]
fn py_interp1d<'py>(
    py: Python<'py>,
    xs: PyReadonlyArray1<'py, f64>,
    ys: PyReadonlyArray1<'py, f64>,
    targets: PyReadonlyArray1<'py, f64>,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let xs = xs.as_array().to_vec();
    let ys = ys.as_array().to_vec();
    same_length(&xs, &ys, "xs and ys")?;
    let out: Vec<f64> = targets
        .as_array()
        .iter()
        .map(|&t| interpolate::interp1d(&xs, &ys, t))
        .collect();
    Ok(out.to_pyarray_bound(py))
}

/// Built-in naming convention of a source (`ERA-5`, `MERRA-2`, `JRA-55`, `CMIP6`) as a dict
#[pyfunction]
#[pyo3(name = "source_convention")]
fn py_source_convention(py: Python<'_>, name: &str) -> PyResult<PyObject> {
    let convention = SourceConvention::from_name(name).map_err(to_py_err)?;
    pythonize::pythonize(py, &convention).map_err(|e| PyValueError::new_err(e.to_string()))
}

#[pymodule]
pub fn core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_pa_to_hpa, m)?)?;
    m.add_function(wrap_pyfunction!(py_latitude_weights, m)?)?;
    m.add_function(wrap_pyfunction!(py_area_weighted_mean, m)?)?;
    m.add_function(wrap_pyfunction!(py_detrend, m)?)?;
    m.add_function(wrap_pyfunction!(py_decadal_trend, m)?)?;
    m.add_function(wrap_pyfunction!(py_interp1d, m)?)?;
    m.add_function(wrap_pyfunction!(py_source_convention, m)?)?;
    Ok(())
}
