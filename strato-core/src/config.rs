//! Analysis configuration
//!
//! Everything that varies between runs of the comparison: the period, the
//! models to fetch, the reanalyses to compare against and the pressure range
//! of interest. Read from TOML; every field has a default.

use crate::convention::{ConventionRef, SourceConvention};
use crate::errors::{StratoError, StratoResult};
use crate::loader::CatalogQuery;
use crate::season::SeasonYear;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A reanalysis to compare models against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReanalysisEntry {
    /// Name used in reports, e.g. `ERA-5`
    pub name: String,
    /// Location of the merged temperature file
    pub path: PathBuf,
    /// Built-in convention name or a full convention
    pub convention: ConventionRef,
}

/// Settings for a model versus reanalysis comparison
///
/// # Example
///
/// ```
/// use strato_core::config::AnalysisConfig;
///
/// let config = AnalysisConfig::from_toml_str(
///     r#"
/// start_year = 1990
/// models_high_top = ["CESM2-WACCM"]
/// models_low_top = []
/// "#,
/// )
/// .unwrap();
/// assert_eq!(config.start_year, 1990);
/// assert_eq!(config.end_year, 2014);
/// assert_eq!(config.all_models(), vec!["CESM2-WACCM"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    // === Period ===
    /// First year of the analysis period (inclusive).
    ///
    /// Default: 1980, the start of the satellite-era reanalyses
    pub start_year: i32,

    /// Last year of the analysis period (inclusive).
    ///
    /// Default: 2014, the end of the CMIP6 historical experiment
    pub end_year: i32,

    /// Year that December time steps are counted towards.
    ///
    /// Default: the calendar year
    pub season_year: SeasonYear,

    // === Models ===
    /// Models with a well-resolved stratosphere (lid above ~1 hPa)
    pub models_high_top: Vec<String>,

    /// Models with a low lid
    pub models_low_top: Vec<String>,

    /// Default: `historical`
    pub experiment_id: String,

    /// Default: `r1i1p1f1`
    pub member_id: String,

    /// Default: `Amon`
    pub table_id: String,

    /// Default: `ta`
    pub variable_id: String,

    // === Vertical range (hPa) ===
    /// Default: 1000 hPa
    pub plev_max: f64,

    /// Default: 1 hPa
    pub plev_min: f64,

    // === Reference data ===
    pub reanalyses: Vec<ReanalysisEntry>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            start_year: 1980,
            end_year: 2014,
            season_year: SeasonYear::default(),
            models_high_top: to_strings(&[
                "CESM2-WACCM",
                "ACCESS-CM2",
                "AWI-CM-1-1-MR",
                "GISS-E2-1-G",
                "GISS-E2-1-H",
                "IITM-ESM",
                "MIROC6",
                "MPI-ESM1-2-HR",
                "MPI-ESM1-2-LR",
                "MRI-ESM2-0",
                "E3SM-1-1",
                "EC-Earth3",
                "EC-Earth3-CC",
                "EC-Earth3-Veg",
                "INM-CM5-0",
                "IPSL-CM6A-LR",
                "KACE-1-0-G",
            ]),
            models_low_top: to_strings(&[
                "ACCESS-ESM1-5",
                "BCC-CSM2-MR",
                "CAMS-CSM1-0",
                "CanESM5",
                "CAS-ESM2-0",
                "CESM2",
                "CIESM",
                "CMCC-CM2-SR5",
                "CMCC-ESM2",
                "EC-Earth3-Veg-LR",
                "FGOALS-f3-L",
                "FGOALS-g3",
                "FIO-ESM-2-0",
                "GFDL-CM4",
                "GFDL-ESM4",
                "INM-CM4-8",
                "KIOST-ESM",
                "MIROC-ES2L",
                "NESM3",
                "NorESM2-LM",
                "NorESM2-MM",
                "TaiESM1",
            ]),
            experiment_id: "historical".to_string(),
            member_id: "r1i1p1f1".to_string(),
            table_id: "Amon".to_string(),
            variable_id: "ta".to_string(),
            plev_max: 1000.0,
            plev_min: 1.0,
            reanalyses: vec![
                ReanalysisEntry {
                    name: "ERA-5".to_string(),
                    path: PathBuf::from("ERA-5/ERA-5_T.nc"),
                    convention: ConventionRef::Named("ERA-5".to_string()),
                },
                ReanalysisEntry {
                    name: "MERRA-2".to_string(),
                    path: PathBuf::from("MERRA2/MERRA2_T.nc"),
                    convention: ConventionRef::Named("MERRA-2".to_string()),
                },
                ReanalysisEntry {
                    name: "JRA-55".to_string(),
                    path: PathBuf::from("JRA-55/JRA-55_T.nc"),
                    convention: ConventionRef::Named("JRA-55".to_string()),
                },
            ],
        }
    }
}

fn to_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

impl AnalysisConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> StratoResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> StratoResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            StratoError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> StratoResult<()> {
        if self.start_year > self.end_year {
            return Err(StratoError::Config(format!(
                "start_year {} is after end_year {}",
                self.start_year, self.end_year
            )));
        }
        if !(self.plev_min > 0.0 && self.plev_min < self.plev_max) {
            return Err(StratoError::Config(format!(
                "pressure range [{}, {}] hPa is invalid",
                self.plev_min, self.plev_max
            )));
        }
        for entry in &self.reanalyses {
            entry.convention.resolve()?;
        }
        Ok(())
    }

    /// First and last day of the analysis period
    pub fn period(&self) -> StratoResult<(NaiveDate, NaiveDate)> {
        let start = NaiveDate::from_ymd_opt(self.start_year, 1, 1);
        let end = NaiveDate::from_ymd_opt(self.end_year, 12, 31);
        match (start, end) {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(StratoError::Config(format!(
                "years {}-{} are out of range",
                self.start_year, self.end_year
            ))),
        }
    }

    /// Catalogue query for one model with this configuration's facets
    pub fn query_for(&self, source_id: &str) -> CatalogQuery {
        CatalogQuery {
            source_id: source_id.to_string(),
            variable_id: self.variable_id.clone(),
            experiment_id: self.experiment_id.clone(),
            member_id: self.member_id.clone(),
            table_id: self.table_id.clone(),
        }
    }

    /// High-top models followed by low-top models
    pub fn all_models(&self) -> Vec<&str> {
        self.models_high_top
            .iter()
            .chain(&self.models_low_top)
            .map(String::as_str)
            .collect()
    }

    pub fn is_high_top(&self, model: &str) -> bool {
        self.models_high_top.iter().any(|m| m == model)
    }

    /// Resolved convention of every configured reanalysis
    pub fn reanalysis_conventions(&self) -> StratoResult<Vec<(&ReanalysisEntry, SourceConvention)>> {
        self.reanalyses
            .iter()
            .map(|entry| -> StratoResult<_> { Ok((entry, entry.convention.resolve()?)) })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.models_high_top.len(), 17);
        assert_eq!(config.models_low_top.len(), 22);
        assert!(config.is_high_top("CESM2-WACCM"));
        assert!(!config.is_high_top("CanESM5"));
        assert_eq!(config.all_models().len(), 39);
    }

    #[test]
    fn test_period() {
        let config = AnalysisConfig::default();
        let (start, end) = config.period().unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(1980, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2014, 12, 31).unwrap());
    }

    #[test]
    fn test_query_for() {
        let config = AnalysisConfig {
            member_id: "r2i1p1f1".to_string(),
            ..Default::default()
        };
        let query = config.query_for("MIROC6");
        assert_eq!(query.key(), "historical.MIROC6.r2i1p1f1.Amon.ta");
    }

    #[test]
    fn test_custom_reanalysis_from_toml() {
        let text = r#"
season_year = "december_forward"

[[reanalyses]]
name = "ERA-5"
path = "/data/era5.nc"
convention = "era5"

[[reanalyses]]
name = "NCEP"
path = "/data/ncep.nc"

[reanalyses.convention]
name = "NCEP"
plev_units = "HPa"

[reanalyses.convention.names]
lat = "lat"
lon = "lon"
plev = "level"
time = "time"
ta = "air"
"#;
        let config = AnalysisConfig::from_toml_str(text).unwrap();
        assert_eq!(config.season_year, SeasonYear::DecemberForward);
        let conventions = config.reanalysis_conventions().unwrap();
        assert_eq!(conventions.len(), 2);
        assert_eq!(conventions[0].1.names.time, "valid_time");
        assert_eq!(conventions[1].1.names.ta, "air");
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = AnalysisConfig {
            season_year: SeasonYear::DecemberForward,
            ..Default::default()
        };
        config.reanalyses.push(ReanalysisEntry {
            name: "JRA-55 (inline)".to_string(),
            path: PathBuf::from("/data/jra55.nc"),
            convention: ConventionRef::Custom(SourceConvention::jra55()),
        });

        let text = toml::to_string(&config).unwrap();
        let parsed = AnalysisConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);

        let defaults = toml::to_string(&AnalysisConfig::default()).unwrap();
        assert_eq!(
            AnalysisConfig::from_toml_str(&defaults).unwrap(),
            AnalysisConfig::default()
        );
    }

    #[test]
    fn test_invalid_configs() {
        assert!(matches!(
            AnalysisConfig::from_toml_str("start_year = 2020\nend_year = 2000"),
            Err(StratoError::Config(_))
        ));
        assert!(AnalysisConfig::from_toml_str("plev_min = 0.0").is_err());
        assert!(AnalysisConfig::from_toml_str("start_year = 'soon'").is_err());

        let text = r#"
[[reanalyses]]
name = "X"
path = "x.nc"
convention = "unknown"
"#;
        assert!(AnalysisConfig::from_toml_str(text).is_err());
    }
}
