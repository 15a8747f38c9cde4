//! Linear detrending and decadal trends along the time axis.

use crate::aggregate::{select_season, yearly_mean};
use crate::coordinate::Dim;
use crate::errors::{StratoError, StratoResult};
use crate::field::{nan_mean, Field};
use crate::season::{Season, SeasonYear, SeasonalFields};
use crate::utils::regression::{linear_fit, LinearFit};
use chrono::Datelike;
use log::{debug, warn};
use ndarray::{ArrayView1, Axis, Zip};

/// Fit a line against the time-step index using only the non-missing values
fn lane_fit(lane: ArrayView1<f64>) -> Option<LinearFit> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = lane
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .map(|(k, &v)| (k as f64, v))
        .unzip();
    linear_fit(&xs, &ys).ok()
}

/// Trend of one series of yearly values, per decade.
///
/// Missing values are skipped; the remaining values keep their position in
/// the series.
pub fn decadal_slope(yearly: &[f64]) -> StratoResult<f64> {
    let fit = lane_fit(ArrayView1::from(yearly)).ok_or_else(|| StratoError::InsufficientData {
        needed: 2,
        found: yearly.iter().filter(|v| !v.is_nan()).count(),
        detail: "yearly values for a trend".to_string(),
    })?;
    Ok(fit.slope * 10.0)
}

/// Detrend a single series, see [`detrend`]
pub fn detrend_series(values: &[f64]) -> StratoResult<Vec<f64>> {
    let fit = lane_fit(ArrayView1::from(values)).ok_or_else(|| StratoError::InsufficientData {
        needed: 2,
        found: values.iter().filter(|v| !v.is_nan()).count(),
        detail: "values to detrend".to_string(),
    })?;
    let mean = nan_mean(values);
    Ok(values
        .iter()
        .enumerate()
        .map(|(k, v)| v - (fit.predict(k as f64) - mean))
        .collect())
}

/// Remove every pressure level that has a missing value anywhere.
///
/// # Errors
///
/// [`StratoError::InsufficientData`] if no level is complete.
pub fn drop_incomplete_levels(field: &Field) -> StratoResult<Field> {
    let p = field.axis_index(Dim::Plev)?;
    let keep: Vec<usize> = field
        .data()
        .axis_iter(Axis(p))
        .enumerate()
        .filter(|(_, level)| level.iter().all(|v| !v.is_nan()))
        .map(|(k, _)| k)
        .collect();

    let dropped = field.shape()[p] - keep.len();
    if dropped > 0 {
        debug!(
            "{}: dropping {} pressure levels with missing values",
            field.source(),
            dropped
        );
    }
    if keep.is_empty() {
        return Err(StratoError::InsufficientData {
            needed: 1,
            found: 0,
            detail: format!("complete pressure levels in {}", field.source()),
        });
    }
    field.select_indices(Dim::Plev, &keep)
}

fn complete_levels(field: &Field) -> StratoResult<Field> {
    if field.has_dim(Dim::Plev) {
        drop_incomplete_levels(field)
    } else {
        Ok(field.clone())
    }
}

/// Remove the linear trend of every time series, keeping its mean.
///
/// Each series along the time axis is fitted against the time-step index
/// `0..n` and replaced by `y - fit + mean(y)`. Pressure levels with missing
/// values are dropped first. The result has the same mean as the input and
/// no remaining linear trend, so detrending twice changes nothing.
///
/// # Errors
///
/// [`StratoError::InsufficientData`] if there are fewer than two time steps.
pub fn detrend(field: &Field) -> StratoResult<Field> {
    let field = complete_levels(field)?;
    let t = field.axis_index(Dim::Time)?;
    let n = field.shape()[t];
    if n < 2 {
        return Err(StratoError::InsufficientData {
            needed: 2,
            found: n,
            detail: format!("detrending {}", field.source()),
        });
    }

    let mut data = field.data().clone();
    Zip::from(data.lanes_mut(Axis(t)))
        .and(field.data().lanes(Axis(t)))
        .for_each(|mut out, lane| {
            // lanes with fewer than two values are left as they are
            if let Ok(values) = detrend_series(&lane.to_vec()) {
                out.assign(&ArrayView1::from(values.as_slice()));
            }
        });
    Ok(field.with_data(data))
}

/// Linear trend per decade.
///
/// Pressure levels with missing values are dropped. The field is then
/// averaged to one value per year (using `convention` to assign December),
/// and each series is fitted against the year index
/// `0..k` and the slope is scaled by ten. Missing years are not filled in:
/// the fit treats the available years as consecutive and a warning is
/// logged.
///
/// # Errors
///
/// [`StratoError::InsufficientData`] if fewer than two years are present.
pub fn decadal_trend(field: &Field, convention: SeasonYear) -> StratoResult<Field> {
    let yearly = yearly_mean(&complete_levels(field)?, convention)?;
    let years: Vec<i32> = yearly.times()?.iter().map(|t| t.year()).collect();
    if years.len() < 2 {
        return Err(StratoError::InsufficientData {
            needed: 2,
            found: years.len(),
            detail: format!("years for the trend of {}", field.source()),
        });
    }

    let gaps: Vec<i32> = years
        .windows(2)
        .filter(|w| w[1] - w[0] > 1)
        .map(|w| w[0] + 1)
        .collect();
    if !gaps.is_empty() {
        warn!(
            "{}: trend over {}-{} skips missing years starting at {:?}",
            field.source(),
            years[0],
            years[years.len() - 1],
            gaps
        );
    }

    yearly.reduce(Dim::Time, |lane| {
        decadal_slope(&lane.to_vec()).unwrap_or(f64::NAN)
    })
}

/// Decadal trend of each season separately.
///
/// Levels with a missing value in any month are dropped from every season.
/// Seasons without any time step are absent from the result.
pub fn seasonal_trend(field: &Field, convention: SeasonYear) -> StratoResult<SeasonalFields> {
    let field = complete_levels(field)?;
    let mut trends = SeasonalFields::new();
    for season in Season::ALL {
        let subset = match select_season(&field, season) {
            Ok(subset) => subset,
            Err(StratoError::EmptySelection { .. }) => continue,
            Err(e) => return Err(e),
        };
        trends.insert(season, decadal_trend(&subset, convention)?);
    }
    Ok(trends)
}
