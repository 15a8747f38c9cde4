//! Climatological reductions and pairwise differences.
//!
//! All reductions skip missing (NaN) values. A reduction over a lane that is
//! entirely missing yields NaN.

use crate::coordinate::{round_to, Coordinate, Dim};
use crate::errors::{StratoError, StratoResult};
use crate::field::{nan_mean, Field, COORD_TOLERANCE};
use crate::interpolate::{interp_lat, interp_plev};
use crate::season::{group_indices, Season, SeasonYear, SeasonalFields};
use chrono::{Datelike, NaiveDate};
use log::debug;
use ndarray::{stack, Array1, ArrayD, ArrayView1, Axis};
use std::collections::{BTreeMap, BTreeSet};

/// Decimal places pressure levels are rounded to before being matched
pub const LEVEL_DECIMALS: i32 = 2;

/// Area weight of each latitude row: `cos(latitude)`
pub fn latitude_weights(lats: &[f64]) -> Array1<f64> {
    lats.iter().map(|lat| lat.to_radians().cos()).collect()
}

/// `sum(v * w) / sum(w)` over the non-missing values of `lane`
pub fn weighted_nan_mean(lane: ArrayView1<f64>, weights: &Array1<f64>) -> f64 {
    let (num, den) = lane
        .iter()
        .zip(weights.iter())
        .filter(|(v, _)| !v.is_nan())
        .fold((0.0, 0.0), |(num, den), (v, w)| (num + v * w, den + w));
    if den == 0.0 {
        f64::NAN
    } else {
        num / den
    }
}

/// Unweighted mean over longitude
pub fn zonal_mean(field: &Field) -> StratoResult<Field> {
    field.reduce(Dim::Lon, |lane| nan_mean(lane.iter()))
}

/// Area-weighted mean over latitude.
///
/// Each latitude row is weighted by `cos(latitude)`. With `include_lon` the
/// longitude axis (if present) is averaged first, giving the area mean over
/// the horizontal domain.
///
/// # Example
/// ```
/// use ndarray::array;
/// use strato_core::aggregate::area_weighted_mean;
/// use strato_core::coordinate::{Coordinate, Dim};
/// use strato_core::field::Field;
///
/// let field = Field::new(
///     "ta",
///     "example",
///     vec![(Dim::Lat, Coordinate::Values(vec![0.0, 60.0]))],
///     array![300.0, 240.0].into_dyn(),
/// )
/// .unwrap();
/// let mean = area_weighted_mean(&field, true).unwrap();
/// // (300 * 1 + 240 * 0.5) / 1.5
/// assert!((mean.data()[[]] - 280.0).abs() < 1e-9);
/// ```
pub fn area_weighted_mean(field: &Field, include_lon: bool) -> StratoResult<Field> {
    field.ensure_hpa()?;
    let field = if include_lon && field.has_dim(Dim::Lon) {
        zonal_mean(field)?
    } else {
        field.clone()
    };
    let weights = latitude_weights(field.values(Dim::Lat)?);
    field.reduce(Dim::Lat, |lane| weighted_nan_mean(lane, &weights))
}

/// Mean over the whole time axis (annual climatology)
pub fn time_mean(field: &Field) -> StratoResult<Field> {
    field.ensure_hpa()?;
    field.reduce(Dim::Time, |lane| nan_mean(lane.iter()))
}

fn year_start(year: i32) -> StratoResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| StratoError::ShapeMismatch(format!("year {} is out of range", year)))
}

/// Average each group of time steps into a single time step stamped by `stamp`
fn group_mean<K, F>(
    field: &Field,
    groups: &BTreeMap<K, Vec<usize>>,
    stamp: F,
) -> StratoResult<Field>
where
    F: Fn(&K) -> StratoResult<NaiveDate>,
{
    let t = field.axis_index(Dim::Time)?;
    if groups.is_empty() {
        return Err(StratoError::EmptySelection {
            axis: Dim::Time.name().to_string(),
            detail: format!("no time steps to group in {}", field.source()),
        });
    }

    let mut stamps = Vec::with_capacity(groups.len());
    let mut means: Vec<ArrayD<f64>> = Vec::with_capacity(groups.len());
    for (key, indices) in groups {
        let subset = field.data().select(Axis(t), indices);
        means.push(subset.map_axis(Axis(t), |lane| nan_mean(lane.iter())));
        stamps.push(stamp(key)?);
    }

    let views: Vec<_> = means.iter().map(|m| m.view()).collect();
    let data = stack(Axis(t), &views).map_err(|e| StratoError::ShapeMismatch(e.to_string()))?;
    field.replace_axis(Dim::Time, Coordinate::Times(stamps), data)
}

/// One time step per year, each the mean of that year's time steps.
///
/// Years are assigned with `convention` and stamped at January 1st.
pub fn yearly_mean(field: &Field, convention: SeasonYear) -> StratoResult<Field> {
    field.ensure_hpa()?;
    let groups = group_indices(field.times()?, |t| convention.year_of(t));
    group_mean(field, &groups, |year| year_start(*year))
}

/// Mean field for each calendar month present, keyed 1 (January) to 12
pub fn monthly_climatology(field: &Field) -> StratoResult<BTreeMap<u32, Field>> {
    let groups = group_indices(field.times()?, |t| t.month());
    groups
        .iter()
        .map(|(month, indices)| -> StratoResult<(u32, Field)> {
            let subset = field.select_indices(Dim::Time, indices)?;
            Ok((*month, time_mean(&subset)?))
        })
        .collect()
}

/// Keep the time steps falling in `season`
pub fn select_season(field: &Field, season: Season) -> StratoResult<Field> {
    field.select_times_where(|t| Season::of(t) == season)
}

/// Seasonal climatology.
///
/// Time steps are grouped by calendar month into DJF, MAM, JJA and SON
/// regardless of year, then averaged. Seasons without any time step are
/// absent from the result.
pub fn seasonal_mean(field: &Field) -> StratoResult<SeasonalFields> {
    let groups = group_indices(field.times()?, Season::of);
    groups
        .iter()
        .map(|(season, indices)| -> StratoResult<(Season, Field)> {
            let subset = field.select_indices(Dim::Time, indices)?;
            debug!(
                "{}: {} time steps in {}",
                field.source(),
                indices.len(),
                season
            );
            Ok((*season, time_mean(&subset)?))
        })
        .collect()
}

fn matches_level(value: f64, levels: &[f64]) -> bool {
    let rounded = round_to(value, LEVEL_DECIMALS);
    levels.iter().any(|l| (l - rounded).abs() < COORD_TOLERANCE)
}

/// Pressure levels present in both fields, rounded to [`LEVEL_DECIMALS`], ascending
pub fn common_levels(a: &Field, b: &Field) -> StratoResult<Vec<f64>> {
    let b_levels: Vec<f64> = b
        .values(Dim::Plev)?
        .iter()
        .map(|&v| round_to(v, LEVEL_DECIMALS))
        .collect();
    let mut levels: Vec<f64> = a
        .values(Dim::Plev)?
        .iter()
        .map(|&v| round_to(v, LEVEL_DECIMALS))
        .filter(|&v| matches_level(v, &b_levels))
        .collect();
    levels.sort_by(|x, y| x.total_cmp(y));
    levels.dedup();
    Ok(levels)
}

/// Time stamps present in both fields, ascending
pub fn common_times(a: &Field, b: &Field) -> StratoResult<Vec<NaiveDate>> {
    let b_times: BTreeSet<NaiveDate> = b.times()?.iter().copied().collect();
    let common: BTreeSet<NaiveDate> = a
        .times()?
        .iter()
        .copied()
        .filter(|t| b_times.contains(t))
        .collect();
    Ok(common.into_iter().collect())
}

/// Keep the pressure levels matching `levels` after rounding.
///
/// The kept coordinate values are replaced by their rounded form so that
/// fields from different sources line up exactly.
pub fn select_levels(field: &Field, levels: &[f64]) -> StratoResult<Field> {
    let values = field.values(Dim::Plev)?;
    let indices: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|&(_, &v)| matches_level(v, levels))
        .map(|(k, _)| k)
        .collect();
    let selected = field.select_indices(Dim::Plev, &indices)?;

    let rounded = Coordinate::Values(
        selected
            .values(Dim::Plev)?
            .iter()
            .map(|&v| round_to(v, LEVEL_DECIMALS))
            .collect(),
    );
    rounded.ensure_monotonic(Dim::Plev.name())?;
    let data = selected.data().clone();
    selected.replace_axis(Dim::Plev, rounded, data)
}

fn ensure_same_axes(model: &Field, reference: &Field) -> StratoResult<()> {
    for field in [model, reference] {
        if field.has_dim(Dim::Lon) {
            return Err(StratoError::UnreducedAxis(Dim::Lon.name().to_string()));
        }
        field.ensure_hpa()?;
    }
    if model.dims() != reference.dims() {
        return Err(StratoError::ShapeMismatch(format!(
            "cannot compare {} (axes {:?}) with {} (axes {:?})",
            model.source(),
            model.dims(),
            reference.source(),
            reference.dims()
        )));
    }
    Ok(())
}

/// Difference `model - reference` on the model's grid.
///
/// Both fields must already be reduced over longitude. Only pressure levels
/// present in both fields are kept, time steps are restricted to those
/// present in both, and the reference is linearly interpolated onto the
/// model's latitudes.
pub fn difference(model: &Field, reference: &Field) -> StratoResult<Field> {
    ensure_same_axes(model, reference)?;

    let mut model = model.clone();
    let mut reference = reference.clone();

    if model.has_dim(Dim::Plev) {
        let levels = common_levels(&model, &reference)?;
        if levels.is_empty() {
            return Err(StratoError::EmptySelection {
                axis: Dim::Plev.name().to_string(),
                detail: format!(
                    "{} and {} share no pressure levels",
                    model.source(),
                    reference.source()
                ),
            });
        }
        debug!("comparing on {} common levels", levels.len());
        model = select_levels(&model, &levels)?;
        reference = select_levels(&reference, &levels)?;
        reference = interp_plev(&reference, model.values(Dim::Plev)?)?;
    }

    if model.has_dim(Dim::Time) {
        let times = common_times(&model, &reference)?;
        model = model.select_times(&times)?.sort_by(Dim::Time)?;
        reference = reference.select_times(&times)?.sort_by(Dim::Time)?;
    }

    if model.has_dim(Dim::Lat) {
        reference = interp_lat(&reference, model.values(Dim::Lat)?)?;
    }

    if model.shape() != reference.shape() {
        return Err(StratoError::ShapeMismatch(format!(
            "aligned shapes differ: {:?} vs {:?}",
            model.shape(),
            reference.shape()
        )));
    }

    let data = model.data() - reference.data();
    let source = format!("{} - {}", model.source(), reference.source());
    Ok(model.with_data(data).with_source(&source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, IxDyn};

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn monthly_series(source: &str, years: i32, value: impl Fn(usize) -> f64) -> Field {
        let times: Vec<NaiveDate> = (0..years)
            .flat_map(|y| (1..=12).map(move |m| date(2000 + y, m)))
            .collect();
        let data: Vec<f64> = (0..times.len()).map(value).collect();
        Field::new(
            "ta",
            source,
            vec![(Dim::Time, Coordinate::Times(times))],
            ArrayD::from_shape_vec(IxDyn(&[data.len()]), data).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_weighted_mean_two_rows() {
        let field = Field::new(
            "ta",
            "test",
            vec![(Dim::Lat, Coordinate::Values(vec![0.0, 60.0]))],
            array![10.0, 20.0].into_dyn(),
        )
        .unwrap();
        let mean = area_weighted_mean(&field, false).unwrap();
        let w1 = 60f64.to_radians().cos();
        let expected = (10.0 + 20.0 * w1) / (1.0 + w1);
        assert_relative_eq!(mean.data()[[]], expected, epsilon = 1e-12);
        // not a plain mean
        assert!((mean.data()[[]] - 15.0).abs() > 1e-3);
    }

    #[test]
    fn test_weighted_mean_single_row_is_plain() {
        let field = Field::new(
            "ta",
            "test",
            vec![(Dim::Lat, Coordinate::Values(vec![45.0]))],
            array![7.0].into_dyn(),
        )
        .unwrap();
        let mean = area_weighted_mean(&field, false).unwrap();
        assert_relative_eq!(mean.data()[[]], 7.0);
    }

    #[test]
    fn test_weighted_mean_skips_missing() {
        let field = Field::new(
            "ta",
            "test",
            vec![(Dim::Lat, Coordinate::Values(vec![0.0, 30.0, 60.0]))],
            array![10.0, f64::NAN, 20.0].into_dyn(),
        )
        .unwrap();
        let mean = area_weighted_mean(&field, false).unwrap();
        let w1 = 60f64.to_radians().cos();
        assert_relative_eq!(
            mean.data()[[]],
            (10.0 + 20.0 * w1) / (1.0 + w1),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_area_mean_with_longitude() {
        // lat x lon, longitude mean first then weighted latitude mean
        let field = Field::new(
            "ta",
            "test",
            vec![
                (Dim::Lat, Coordinate::Values(vec![0.0, 60.0])),
                (Dim::Lon, Coordinate::Values(vec![0.0, 180.0])),
            ],
            array![[8.0, 12.0], [18.0, 22.0]].into_dyn(),
        )
        .unwrap();
        let mean = area_weighted_mean(&field, true).unwrap();
        assert!(mean.dims().is_empty());
        let w1 = 60f64.to_radians().cos();
        assert_relative_eq!(
            mean.data()[[]],
            (10.0 + 20.0 * w1) / (1.0 + w1),
            epsilon = 1e-12
        );

        let per_lon = area_weighted_mean(&field, false).unwrap();
        assert_eq!(per_lon.dims(), &[Dim::Lon]);
    }

    #[test]
    fn test_zonal_mean() {
        let field = Field::new(
            "ta",
            "test",
            vec![
                (Dim::Lat, Coordinate::Values(vec![0.0, 60.0])),
                (Dim::Lon, Coordinate::Values(vec![0.0, 120.0, 240.0])),
            ],
            array![[1.0, 2.0, 3.0], [4.0, f64::NAN, 8.0]].into_dyn(),
        )
        .unwrap();
        let zm = zonal_mean(&field).unwrap();
        assert_eq!(zm.dims(), &[Dim::Lat]);
        assert_eq!(zm.data()[[0]], 2.0);
        assert_eq!(zm.data()[[1]], 6.0);
        assert!(zm.lon_convention().is_none());
    }

    #[test]
    fn test_yearly_mean() {
        let field = monthly_series("test", 2, |i| if i < 12 { 1.0 } else { 3.0 });
        let yearly = yearly_mean(&field, SeasonYear::Calendar).unwrap();
        assert_eq!(yearly.times().unwrap(), &[date(2000, 1), date(2001, 1)]);
        assert_eq!(yearly.data()[[0]], 1.0);
        assert_eq!(yearly.data()[[1]], 3.0);
    }

    #[test]
    fn test_yearly_mean_december_forward() {
        let field = monthly_series("test", 2, |i| i as f64);
        let yearly = yearly_mean(&field, SeasonYear::DecemberForward).unwrap();
        // 2000: Jan-Nov, 2001: Dec 2000 + Jan-Nov 2001, 2002: Dec 2001
        assert_eq!(yearly.times().unwrap().len(), 3);
        assert_relative_eq!(yearly.data()[[0]], 5.0);
        assert_relative_eq!(yearly.data()[[1]], 16.5);
        assert_relative_eq!(yearly.data()[[2]], 23.0);
    }

    #[test]
    fn test_monthly_climatology() {
        let field = monthly_series("test", 2, |i| i as f64);
        let climatology = monthly_climatology(&field).unwrap();
        assert_eq!(climatology.len(), 12);
        assert_eq!(climatology[&1].data()[[]], 6.0);
        assert_eq!(climatology[&12].data()[[]], 17.0);
    }

    #[test]
    fn test_seasonal_mean_two_years() {
        let field = monthly_series("test", 2, |i| i as f64);
        let seasonal = seasonal_mean(&field).unwrap();
        assert_eq!(seasonal.keys().copied().collect::<Vec<_>>(), Season::ALL);

        // DJF: Jan, Feb, Dec of both years -> indices 0, 1, 11, 12, 13, 23
        let djf = (0.0 + 1.0 + 11.0 + 12.0 + 13.0 + 23.0) / 6.0;
        assert_relative_eq!(seasonal[&Season::Djf].data()[[]], djf);
        // JJA: indices 5, 6, 7, 17, 18, 19
        assert_relative_eq!(seasonal[&Season::Jja].data()[[]], 12.0);
    }

    #[test]
    fn test_select_season() {
        let field = monthly_series("test", 2, |i| i as f64);
        let son = select_season(&field, Season::Son).unwrap();
        assert_eq!(son.times().unwrap().len(), 6);
        assert!(son.times().unwrap().iter().all(|t| (9..=11).contains(&t.month())));
    }

    fn plev_field(source: &str, levels: Vec<f64>, offset: f64) -> Field {
        let data: Vec<f64> = levels.iter().map(|l| l + offset).collect();
        Field::new(
            "ta",
            source,
            vec![(Dim::Plev, Coordinate::Values(levels))],
            ArrayD::from_shape_vec(IxDyn(&[data.len()]), data).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_common_levels() {
        let a = plev_field("a", vec![1000.0, 500.0, 100.0, 10.0], 0.0);
        let b = plev_field("b", vec![1000.0, 500.0, 50.0, 10.0], 0.0);
        assert_eq!(common_levels(&a, &b).unwrap(), vec![10.0, 500.0, 1000.0]);
    }

    #[test]
    fn test_common_levels_rounding() {
        let a = plev_field("a", vec![998.499_999, 500.0], 0.0);
        let b = plev_field("b", vec![998.5, 500.001], 0.0);
        assert_eq!(common_levels(&a, &b).unwrap(), vec![500.0, 998.5]);
    }

    #[test]
    fn test_difference_on_level_intersection() {
        let model = plev_field("model", vec![1000.0, 500.0, 100.0, 10.0], 1.0);
        let reference = plev_field("reanalysis", vec![10.0, 50.0, 500.0, 1000.0], 0.0);
        let diff = difference(&model, &reference).unwrap();
        assert_eq!(diff.values(Dim::Plev).unwrap(), &[1000.0, 500.0, 10.0]);
        for v in diff.data().iter() {
            assert_relative_eq!(*v, 1.0);
        }
        assert_eq!(diff.source(), "model - reanalysis");
    }

    #[test]
    fn test_difference_no_common_levels() {
        let model = plev_field("model", vec![1000.0, 500.0], 0.0);
        let reference = plev_field("reanalysis", vec![100.0, 10.0], 0.0);
        assert!(matches!(
            difference(&model, &reference),
            Err(StratoError::EmptySelection { .. })
        ));
    }

    #[test]
    fn test_difference_requires_zonal_reduction() {
        let field = Field::new(
            "ta",
            "model",
            vec![(Dim::Lon, Coordinate::Values(vec![0.0, 180.0]))],
            array![1.0, 2.0].into_dyn(),
        )
        .unwrap();
        assert!(matches!(
            difference(&field, &field),
            Err(StratoError::UnreducedAxis(_))
        ));
    }

    #[test]
    fn test_difference_interpolates_latitude() {
        let model = Field::new(
            "ta",
            "model",
            vec![(Dim::Lat, Coordinate::Values(vec![-45.0, 45.0]))],
            array![0.0, 0.0].into_dyn(),
        )
        .unwrap();
        let reference = Field::new(
            "ta",
            "reanalysis",
            vec![(Dim::Lat, Coordinate::Values(vec![90.0, 0.0, -90.0]))],
            array![10.0, 20.0, 30.0].into_dyn(),
        )
        .unwrap();
        let diff = difference(&model, &reference).unwrap();
        assert_relative_eq!(diff.data()[[0]], -25.0);
        assert_relative_eq!(diff.data()[[1]], -15.0);
    }

    #[test]
    fn test_difference_rejects_pascals() {
        let model = plev_field("model", vec![100000.0, 50000.0], 0.0)
            .with_plev_units(crate::coordinate::PressureUnits::Pa);
        let reference = plev_field("reanalysis", vec![1000.0, 500.0], 0.0);
        assert!(matches!(
            difference(&model, &reference),
            Err(StratoError::UnitMismatch { .. })
        ));
    }
}
