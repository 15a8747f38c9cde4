//! The per-model comparison loop
//!
//! Reanalyses are loaded and harmonised once, then every configured model is
//! fetched, harmonised and compared against each of them. A model (or
//! reanalysis) that cannot be processed is recorded in the report and
//! skipped.

use crate::comparison::{compare_climatology, compare_trends, prepare, ComparisonSet};
use crate::summary::{polar_metrics, tropical_metrics, PolarMetrics, TropicalMetrics};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strato_core::batch::{run_batch, BatchReport};
use strato_core::config::AnalysisConfig;
use strato_core::convention::SourceConvention;
use strato_core::errors::{StratoError, StratoResult};
use strato_core::field::Field;
use strato_core::harmonize::harmonize;
use strato_core::loader::FieldSource;

/// Summary numbers of one reanalysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceMetrics {
    pub polar: PolarMetrics,
    pub tropical: TropicalMetrics,
}

/// Everything computed for one model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDiagnostics {
    pub model: String,
    pub high_top: bool,
    pub polar: PolarMetrics,
    pub tropical: TropicalMetrics,
    /// Trend comparisons keyed by reanalysis name
    pub trends: BTreeMap<String, ComparisonSet>,
    /// Detrended climatology comparisons keyed by reanalysis name
    pub climatology: BTreeMap<String, ComparisonSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub reanalyses: BatchReport<ReferenceMetrics>,
    pub models: BatchReport<ModelDiagnostics>,
}

/// Harmonised reanalyses restricted to the configured period and levels
fn load_references(
    source: &dyn FieldSource,
    config: &AnalysisConfig,
) -> StratoResult<(BatchReport<ReferenceMetrics>, Vec<(String, Field)>)> {
    let mut references = Vec::new();
    let report = run_batch(
        config.reanalysis_conventions()?,
        |(entry, _)| entry.name.clone(),
        |(entry, convention)| {
            let raw = source.load_reanalysis(&entry.path, &convention.names.ta)?;
            let field = harmonize(&raw, &convention)?.with_source(&entry.name);
            let field = prepare(&field, config)?;
            let metrics = ReferenceMetrics {
                polar: polar_metrics(&field, true)?,
                tropical: tropical_metrics(&field, true)?,
            };
            references.push((entry.name.clone(), field));
            Ok(metrics)
        },
    );
    Ok((report, references))
}

fn diagnose_model(
    source: &dyn FieldSource,
    config: &AnalysisConfig,
    references: &[(String, Field)],
    model: &str,
) -> StratoResult<ModelDiagnostics> {
    let raw = source.load(&config.query_for(model))?;
    let field = harmonize(&raw, &SourceConvention::cmip6())?.with_source(model);
    let field = prepare(&field, config)?;

    let mut trends = BTreeMap::new();
    let mut climatology = BTreeMap::new();
    for (name, reference) in references {
        trends.insert(name.clone(), compare_trends(&field, reference, config)?);
        climatology.insert(
            name.clone(),
            compare_climatology(&field, reference, config, true)?,
        );
    }

    Ok(ModelDiagnostics {
        model: model.to_string(),
        high_top: config.is_high_top(model),
        polar: polar_metrics(&field, true)?,
        tropical: tropical_metrics(&field, true)?,
        trends,
        climatology,
    })
}

/// Compare every configured model with every configured reanalysis.
///
/// # Errors
///
/// Fails only if the configuration is invalid or no reanalysis could be
/// loaded; per-dataset failures end up in the report.
pub fn run_model_comparisons(
    source: &dyn FieldSource,
    config: &AnalysisConfig,
) -> StratoResult<ComparisonReport> {
    config.validate()?;
    let (reanalyses, references) = load_references(source, config)?;
    if references.is_empty() {
        return Err(StratoError::Loader(
            "none of the configured reanalyses could be loaded".to_string(),
        ));
    }
    info!(
        "comparing {} models with {} reanalyses",
        config.all_models().len(),
        references.len()
    );

    let models = run_batch(
        config.all_models(),
        |model| model.to_string(),
        |model| diagnose_model(source, config, &references, model),
    );
    info!(
        "{} of {} models compared",
        models.succeeded().len(),
        models.len()
    );
    Ok(ComparisonReport { reanalyses, models })
}
