//! Meteorological seasons and calendar grouping of time steps.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::StratoError;
use crate::field::Field;

/// Meteorological season.
///
/// Ordered DJF, MAM, JJA, SON.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Season {
    #[serde(rename = "DJF")]
    Djf,
    #[serde(rename = "MAM")]
    Mam,
    #[serde(rename = "JJA")]
    Jja,
    #[serde(rename = "SON")]
    Son,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Djf, Season::Mam, Season::Jja, Season::Son];

    /// Season containing a calendar month (1 = January)
    ///
    /// # Panics
    ///
    /// Panics if `month` is not in `1..=12`
    pub fn from_month(month: u32) -> Season {
        match month {
            12 | 1 | 2 => Season::Djf,
            3..=5 => Season::Mam,
            6..=8 => Season::Jja,
            9..=11 => Season::Son,
            _ => panic!("invalid month {}", month),
        }
    }

    pub fn of(date: &NaiveDate) -> Season {
        Season::from_month(date.month())
    }

    pub fn label(&self) -> &'static str {
        match self {
            Season::Djf => "DJF",
            Season::Mam => "MAM",
            Season::Jja => "JJA",
            Season::Son => "SON",
        }
    }

    pub fn months(&self) -> [u32; 3] {
        match self {
            Season::Djf => [12, 1, 2],
            Season::Mam => [3, 4, 5],
            Season::Jja => [6, 7, 8],
            Season::Son => [9, 10, 11],
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Season {
    type Err = StratoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DJF" => Ok(Season::Djf),
            "MAM" => Ok(Season::Mam),
            "JJA" => Ok(Season::Jja),
            "SON" => Ok(Season::Son),
            other => Err(StratoError::Config(format!("unknown season '{}'", other))),
        }
    }
}

/// Which year a time step counts towards when grouping by year.
///
/// This only matters for December: with `Calendar` a December time step
/// belongs to its own calendar year (so the DJF season of year Y holds
/// January/February Y and December Y); with `DecemberForward` it belongs to
/// the following year (DJF of year Y holds December Y-1, January Y and
/// February Y).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonYear {
    #[default]
    Calendar,
    DecemberForward,
}

impl SeasonYear {
    /// Grouping year of a time step
    pub fn year_of(&self, date: &NaiveDate) -> i32 {
        match self {
            SeasonYear::Calendar => date.year(),
            SeasonYear::DecemberForward if date.month() == 12 => date.year() + 1,
            SeasonYear::DecemberForward => date.year(),
        }
    }
}

/// One field per season, in DJF, MAM, JJA, SON order
pub type SeasonalFields = BTreeMap<Season, Field>;

/// Group positions of `times` by a key, keys in ascending order
pub fn group_indices<K, F>(times: &[NaiveDate], key: F) -> BTreeMap<K, Vec<usize>>
where
    K: Ord,
    F: Fn(&NaiveDate) -> K,
{
    let mut groups: BTreeMap<K, Vec<usize>> = BTreeMap::new();
    for (k, t) in times.iter().enumerate() {
        groups.entry(key(t)).or_default().push(k);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn test_from_month() {
        assert_eq!(Season::from_month(12), Season::Djf);
        assert_eq!(Season::from_month(1), Season::Djf);
        assert_eq!(Season::from_month(5), Season::Mam);
        assert_eq!(Season::from_month(8), Season::Jja);
        assert_eq!(Season::from_month(11), Season::Son);
        for season in Season::ALL {
            for m in season.months() {
                assert_eq!(Season::from_month(m), season);
            }
        }
    }

    #[test]
    #[should_panic(expected = "invalid month")]
    fn test_from_month_invalid() {
        Season::from_month(13);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("djf".parse::<Season>().unwrap(), Season::Djf);
        assert_eq!(Season::Son.to_string(), "SON");
        assert!("XYZ".parse::<Season>().is_err());
    }

    #[test]
    fn test_season_year() {
        assert_eq!(SeasonYear::Calendar.year_of(&date(2000, 12)), 2000);
        assert_eq!(SeasonYear::DecemberForward.year_of(&date(2000, 12)), 2001);
        assert_eq!(SeasonYear::DecemberForward.year_of(&date(2001, 1)), 2001);
    }

    #[test]
    fn test_group_indices() {
        let times = vec![date(2000, 1), date(2000, 6), date(2001, 1)];
        let groups = group_indices(&times, |t| t.year());
        assert_eq!(groups[&2000], vec![0, 1]);
        assert_eq!(groups[&2001], vec![2]);
    }

    #[test]
    fn test_serde_labels() {
        let json = serde_json::to_string(&Season::Jja).unwrap();
        assert_eq!(json, "\"JJA\"");
        let year: SeasonYear = serde_json::from_str("\"december_forward\"").unwrap();
        assert_eq!(year, SeasonYear::DecemberForward);
    }
}
