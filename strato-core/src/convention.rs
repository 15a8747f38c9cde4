//! Naming and unit conventions of the supported data sources.
//!
//! A [`SourceConvention`] records what a source calls each canonical axis and
//! its temperature variable, how the vertical coordinate is stored and any
//! fix-ups needed before the data can be compared with other sources.

use crate::coordinate::PressureUnits;
use crate::errors::{StratoError, StratoResult};
use serde::{Deserialize, Serialize};

/// Nominal pressures (hPa) of the 57 archived JRA-55 hybrid levels, surface
/// upwards
pub const JRA55_LEVELS: [f64; 57] = [
    998.5, 995.5, 991.499, 985.498, 976.996, 965.994, 952.991, 936.986, 917.982, 896.978, 873.47,
    846.961, 817.954, 786.946, 754.44, 720.429, 684.417, 647.412, 609.901, 571.895, 533.887,
    495.879, 458.376, 421.872, 386.368, 351.863, 318.866, 287.361, 257.364, 228.857, 201.86,
    176.864, 153.869, 132.875, 113.881, 96.89, 81.643, 67.638, 55.15, 44.666, 36.081, 29.145,
    23.53, 18.989, 15.32, 12.351, 9.971, 8.049, 6.493, 5.24, 4.222, 3.383, 2.684, 2.089, 1.584,
    1.16, 0.805,
];

/// Names a source uses for the canonical axes and the temperature variable
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameMap {
    pub lat: String,
    pub lon: String,
    pub plev: String,
    pub time: String,
    pub ta: String,
}

impl NameMap {
    pub fn new(lat: &str, lon: &str, plev: &str, time: &str, ta: &str) -> Self {
        Self {
            lat: lat.to_string(),
            lon: lon.to_string(),
            plev: plev.to_string(),
            time: time.to_string(),
            ta: ta.to_string(),
        }
    }
}

/// How to turn a source's raw dataset into a canonical field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceConvention {
    /// Display name, also used as the provenance of harmonised fields
    pub name: String,
    pub names: NameMap,
    /// Units the vertical coordinate is stored in
    #[serde(default)]
    pub plev_units: PressureUnits,
    /// Nominal pressures (hPa) replacing the stored level coordinate
    #[serde(default)]
    pub level_substitution: Option<Vec<f64>>,
    /// Sort the time axis ascending before use
    #[serde(default)]
    pub sort_time: bool,
}

impl SourceConvention {
    pub fn era5() -> Self {
        Self {
            name: "ERA-5".to_string(),
            names: NameMap::new("latitude", "longitude", "pressure_level", "valid_time", "t"),
            plev_units: PressureUnits::HPa,
            level_substitution: None,
            sort_time: false,
        }
    }

    pub fn merra2() -> Self {
        Self {
            name: "MERRA-2".to_string(),
            names: NameMap::new("lat", "lon", "lev", "time", "T"),
            plev_units: PressureUnits::HPa,
            level_substitution: None,
            sort_time: true,
        }
    }

    pub fn jra55() -> Self {
        Self {
            name: "JRA-55".to_string(),
            names: NameMap::new(
                "g4_lat_2",
                "g4_lon_3",
                "lv_HYBL1",
                "initial_time0_hours",
                "TMP_GDS4_HYBL_S123",
            ),
            plev_units: PressureUnits::Hybrid,
            level_substitution: Some(JRA55_LEVELS.to_vec()),
            sort_time: false,
        }
    }

    /// Model output from the CMIP6 archive, levels in Pa
    pub fn cmip6() -> Self {
        Self {
            name: "CMIP6".to_string(),
            names: NameMap::new("lat", "lon", "plev", "time", "ta"),
            plev_units: PressureUnits::Pa,
            level_substitution: None,
            sort_time: false,
        }
    }

    /// Built-in convention by name.
    ///
    /// Matching ignores case, `-` and `_`, so `"ERA-5"`, `"era5"` and
    /// `"Era_5"` are all accepted.
    pub fn from_name(name: &str) -> StratoResult<Self> {
        let key: String = name
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "era5" => Ok(Self::era5()),
            "merra2" => Ok(Self::merra2()),
            "jra55" => Ok(Self::jra55()),
            "cmip6" => Ok(Self::cmip6()),
            _ => Err(StratoError::Config(format!(
                "unknown source convention '{}'",
                name
            ))),
        }
    }

    /// The built-in reanalysis conventions
    pub fn reanalyses() -> Vec<Self> {
        vec![Self::era5(), Self::merra2(), Self::jra55()]
    }
}

/// A convention given either by built-in name or spelled out in full
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConventionRef {
    Named(String),
    Custom(SourceConvention),
}

impl ConventionRef {
    pub fn resolve(&self) -> StratoResult<SourceConvention> {
        match self {
            ConventionRef::Named(name) => SourceConvention::from_name(name),
            ConventionRef::Custom(convention) => Ok(convention.clone()),
        }
    }
}
