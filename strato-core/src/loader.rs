//! Where raw datasets come from.
//!
//! Fetching from the model archive and decoding reanalysis files happen
//! behind the [`FieldSource`] trait; the numerical core only ever sees
//! [`RawDataset`]s.

use crate::errors::{StratoError, StratoResult};
use crate::harmonize::RawDataset;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Search parameters identifying one model dataset in the archive catalogue
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogQuery {
    pub source_id: String,
    pub variable_id: String,
    pub experiment_id: String,
    pub member_id: String,
    pub table_id: String,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            source_id: "GISS-E2-1-G".to_string(),
            variable_id: "ta".to_string(),
            experiment_id: "historical".to_string(),
            member_id: "r1i1p1f1".to_string(),
            table_id: "Amon".to_string(),
        }
    }
}

impl CatalogQuery {
    pub fn for_model(source_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            ..Default::default()
        }
    }

    /// Dotted identifier of the dataset, e.g. `historical.GISS-E2-1-G.r1i1p1f1.Amon.ta`
    pub fn key(&self) -> String {
        format!(
            "{}.{}.{}.{}.{}",
            self.experiment_id, self.source_id, self.member_id, self.table_id, self.variable_id
        )
    }
}

/// A provider of raw datasets, queried one dataset at a time
pub trait FieldSource {
    /// Fetch a model dataset from the archive catalogue
    fn load(&self, request: &CatalogQuery) -> StratoResult<RawDataset>;

    /// Read a reanalysis dataset and check that it holds `variable`
    fn load_reanalysis(&self, path: &Path, variable: &str) -> StratoResult<RawDataset>;
}

/// A [`FieldSource`] serving datasets registered up front
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
    models: BTreeMap<String, RawDataset>,
    reanalyses: BTreeMap<PathBuf, RawDataset>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_model(&mut self, query: &CatalogQuery, dataset: RawDataset) {
        self.models.insert(query.key(), dataset);
    }

    pub fn insert_reanalysis(&mut self, path: impl Into<PathBuf>, dataset: RawDataset) {
        self.reanalyses.insert(path.into(), dataset);
    }

    pub fn with_model(mut self, query: &CatalogQuery, dataset: RawDataset) -> Self {
        self.insert_model(query, dataset);
        self
    }

    pub fn with_reanalysis(mut self, path: impl Into<PathBuf>, dataset: RawDataset) -> Self {
        self.insert_reanalysis(path, dataset);
        self
    }
}

impl FieldSource for InMemorySource {
    fn load(&self, request: &CatalogQuery) -> StratoResult<RawDataset> {
        let key = request.key();
        debug!("loading {}", key);
        self.models
            .get(&key)
            .cloned()
            .ok_or_else(|| StratoError::Loader(format!("no dataset matches {}", key)))
    }

    fn load_reanalysis(&self, path: &Path, variable: &str) -> StratoResult<RawDataset> {
        debug!("loading {} from {}", variable, path.display());
        let dataset = self
            .reanalyses
            .get(path)
            .ok_or_else(|| StratoError::Loader(format!("no dataset at {}", path.display())))?;
        if !dataset.variables.contains_key(variable) {
            return Err(StratoError::MissingVariable {
                variable: variable.to_string(),
                source_name: dataset.name.clone(),
            });
        }
        Ok(dataset.clone())
    }
}
