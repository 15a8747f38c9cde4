//! Single-number summaries of the polar and tropical stratosphere.

use serde::{Deserialize, Serialize};
use strato_core::aggregate::{area_weighted_mean, seasonal_mean, time_mean, zonal_mean};
use strato_core::coordinate::Dim;
use strato_core::errors::{StratoError, StratoResult};
use strato_core::field::Field;
use strato_core::season::Season;
use strato_core::trend::detrend;

/// Winter polar temperatures, 500-1 hPa
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarMetrics {
    /// DJF mean over 60N-90N
    pub north_djf: f64,
    /// JJA mean over 60S-90S
    pub south_jja: f64,
}

/// Annual-mean tropical temperatures over 30S-30N
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TropicalMetrics {
    /// Tropopause layer, 200-10 hPa
    pub cold_point: f64,
    /// 10-1 hPa
    pub upper_stratosphere: f64,
}

fn zonal_climatology_input(field: &Field, detrended: bool) -> StratoResult<Field> {
    let field = if field.has_dim(Dim::Lon) {
        zonal_mean(field)?
    } else {
        field.clone()
    };
    if detrended {
        detrend(&field)
    } else {
        Ok(field)
    }
}

/// Area-weighted mean over a latitude band and pressure layer, then over levels
fn layer_mean(field: &Field, lats: (f64, f64), plevs: (f64, f64)) -> StratoResult<f64> {
    let band = field
        .select_range(Dim::Lat, lats.0, lats.1)?
        .select_range(Dim::Plev, plevs.0, plevs.1)?;
    Ok(area_weighted_mean(&band, false)?.nan_mean())
}

/// Polar-night temperatures of a (time, plev, lat[, lon]) field
pub fn polar_metrics(field: &Field, detrended: bool) -> StratoResult<PolarMetrics> {
    let field = field.select_range(Dim::Plev, 500.0, 1.0)?;
    let seasons = seasonal_mean(&zonal_climatology_input(&field, detrended)?)?;
    let season = |s: Season| {
        seasons.get(&s).ok_or_else(|| StratoError::EmptySelection {
            axis: Dim::Time.name().to_string(),
            detail: format!("no {} time steps in {}", s, field.source()),
        })
    };

    Ok(PolarMetrics {
        north_djf: layer_mean(season(Season::Djf)?, (60.0, 90.0), (500.0, 1.0))?,
        south_jja: layer_mean(season(Season::Jja)?, (-90.0, -60.0), (500.0, 1.0))?,
    })
}

/// Tropical tropopause and upper stratosphere temperatures of a
/// (time, plev, lat[, lon]) field
pub fn tropical_metrics(field: &Field, detrended: bool) -> StratoResult<TropicalMetrics> {
    let field = field
        .select_range(Dim::Plev, 200.0, 1.0)?
        .select_range(Dim::Lat, -30.0, 30.0)?;
    let annual = time_mean(&zonal_climatology_input(&field, detrended)?)?;

    Ok(TropicalMetrics {
        cold_point: layer_mean(&annual, (-30.0, 30.0), (200.0, 10.0))?,
        upper_stratosphere: layer_mean(&annual, (-30.0, 30.0), (10.0, 1.0))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use ndarray::{ArrayD, IxDyn};
    use strato_core::coordinate::Coordinate;

    /// 230 K everywhere except 190 K in the polar night of each hemisphere
    /// and 200 K below 10 hPa in the tropics
    fn idealised(years: i32) -> Field {
        let times: Vec<NaiveDate> = (2000..2000 + years)
            .flat_map(|y| (1..=12).map(move |m| NaiveDate::from_ymd_opt(y, m, 1).unwrap()))
            .collect();
        let levels = vec![1000.0, 500.0, 100.0, 50.0, 10.0, 5.0, 1.0];
        let lats: Vec<f64> = vec![-80.0, -70.0, -10.0, 0.0, 10.0, 70.0, 80.0];

        let mut values = Vec::new();
        for t in &times {
            let season = Season::of(t);
            for p in &levels {
                for lat in &lats {
                    let polar_night = (season == Season::Djf && *lat > 60.0)
                        || (season == Season::Jja && *lat < -60.0);
                    let value = if polar_night {
                        190.0
                    } else if lat.abs() < 30.0 && *p > 10.0 {
                        200.0
                    } else {
                        230.0
                    };
                    values.push(value);
                }
            }
        }
        let shape = [times.len(), levels.len(), lats.len()];
        Field::new(
            "ta",
            "idealised",
            vec![
                (Dim::Time, Coordinate::Times(times)),
                (Dim::Plev, Coordinate::Values(levels)),
                (Dim::Lat, Coordinate::Values(lats)),
            ],
            ArrayD::from_shape_vec(IxDyn(&shape), values).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_polar_metrics() {
        let metrics = polar_metrics(&idealised(3), false).unwrap();
        assert_relative_eq!(metrics.north_djf, 190.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.south_jja, 190.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tropical_metrics() {
        let metrics = tropical_metrics(&idealised(2), false).unwrap();
        // 200-10 hPa holds 100 and 50 hPa at 200 K and 10 hPa at 230 K
        assert_relative_eq!(metrics.cold_point, 210.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.upper_stratosphere, 230.0, epsilon = 1e-9);

        // no trend to remove, so detrending changes nothing
        let detrended = tropical_metrics(&idealised(2), true).unwrap();
        assert_relative_eq!(detrended.cold_point, 210.0, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_season() {
        let summer_only = idealised(2)
            .select_times_where(|t| Season::of(t) == Season::Jja)
            .unwrap();
        assert!(matches!(
            polar_metrics(&summer_only, false),
            Err(StratoError::EmptySelection { .. })
        ));
    }
}
