//! Zonal-mean climatologies and trends of a model next to a reanalysis
//!
//! Both fields are restricted to the configured period and pressure range,
//! averaged over longitude and then reduced annually and per season. Every
//! reduction is paired with `model - reanalysis` on the model's grid.

use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strato_core::aggregate::{difference, seasonal_mean, time_mean, zonal_mean};
use strato_core::config::AnalysisConfig;
use strato_core::coordinate::Dim;
use strato_core::errors::StratoResult;
use strato_core::field::Field;
use strato_core::season::{Season, SeasonalFields};
use strato_core::trend::{decadal_trend, detrend, seasonal_trend};

/// One reduction of both sources and their difference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub model: Field,
    pub reanalysis: Field,
    pub difference: Field,
}

impl Comparison {
    pub fn new(model: Field, reanalysis: Field) -> StratoResult<Self> {
        let difference = difference(&model, &reanalysis)?;
        Ok(Self {
            model,
            reanalysis,
            difference,
        })
    }
}

/// Annual and seasonal comparisons of one quantity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonSet {
    pub annual: Comparison,
    /// Only seasons present in both sources
    pub seasonal: BTreeMap<Season, Comparison>,
}

fn pair_seasons(
    model: SeasonalFields,
    mut reanalysis: SeasonalFields,
) -> StratoResult<BTreeMap<Season, Comparison>> {
    let mut paired = BTreeMap::new();
    for (season, model_field) in model {
        if let Some(reanalysis_field) = reanalysis.remove(&season) {
            paired.insert(season, Comparison::new(model_field, reanalysis_field)?);
        }
    }
    Ok(paired)
}

/// Restrict a field to the configured period and pressure range
pub fn prepare(field: &Field, config: &AnalysisConfig) -> StratoResult<Field> {
    let (start, end) = config.period()?;
    field
        .select_period(start, end)?
        .select_range(Dim::Plev, config.plev_max, config.plev_min)
}

fn prepared_zonal_mean(field: &Field, config: &AnalysisConfig) -> StratoResult<Field> {
    let field = prepare(field, config)?;
    if field.has_dim(Dim::Lon) {
        zonal_mean(&field)
    } else {
        Ok(field)
    }
}

/// Decadal trends of the zonal mean, annually and per season
pub fn compare_trends(
    model: &Field,
    reanalysis: &Field,
    config: &AnalysisConfig,
) -> StratoResult<ComparisonSet> {
    info!(
        "comparing trends of {} with {}",
        model.source(),
        reanalysis.source()
    );
    let model = prepared_zonal_mean(model, config)?;
    let reanalysis = prepared_zonal_mean(reanalysis, config)?;

    let annual = Comparison::new(
        decadal_trend(&model, config.season_year)?,
        decadal_trend(&reanalysis, config.season_year)?,
    )?;
    let seasonal = pair_seasons(
        seasonal_trend(&model, config.season_year)?,
        seasonal_trend(&reanalysis, config.season_year)?,
    )?;
    Ok(ComparisonSet { annual, seasonal })
}

/// Annual and seasonal zonal-mean climatologies, optionally of detrended data
pub fn compare_climatology(
    model: &Field,
    reanalysis: &Field,
    config: &AnalysisConfig,
    detrended: bool,
) -> StratoResult<ComparisonSet> {
    info!(
        "comparing climatology of {} with {}",
        model.source(),
        reanalysis.source()
    );
    let mut model = prepared_zonal_mean(model, config)?;
    let mut reanalysis = prepared_zonal_mean(reanalysis, config)?;
    if detrended {
        model = detrend(&model)?;
        reanalysis = detrend(&reanalysis)?;
    }

    let annual = Comparison::new(time_mean(&model)?, time_mean(&reanalysis)?)?;
    let seasonal = pair_seasons(seasonal_mean(&model)?, seasonal_mean(&reanalysis)?)?;
    Ok(ComparisonSet { annual, seasonal })
}
