//! Pipeline configuration.
//!
//! Values come from an optional JSON file, then environment variables, then
//! command-line flags, each layer overriding the previous one:
//!
//! ```json
//! {
//!   "reset_limit": 5000,
//!   "top_stations": 10,
//!   "months": [5, 6],
//!   "since": "2020-05-02",
//!   "until": "2020-06-27",
//!   "skip_weeks": [17, 26],
//!   "measure": "total"
//! }
//! ```

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::analyzers::types::Measure;
use crate::parser::WeeklySelection;

pub const RESET_LIMIT_VAR: &str = "TURNSTILE_RESET_LIMIT";
pub const TOP_STATIONS_VAR: &str = "TURNSTILE_TOP_STATIONS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Largest delta accepted as genuine traffic for one interval.
    pub reset_limit: u64,
    pub top_stations: usize,
    /// Months (1 = January) whose weekly files are loaded. Empty loads all.
    pub months: Vec<u32>,
    /// Earliest weekly file date loaded, inclusive.
    pub since: Option<NaiveDate>,
    /// Latest weekly file date loaded, inclusive.
    pub until: Option<NaiveDate>,
    /// ISO weeks left out of weekly totals.
    pub skip_weeks: Vec<u32>,
    pub measure: Measure,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            reset_limit: 5000,
            top_stations: 10,
            months: Vec::new(),
            since: None,
            until: None,
            skip_weeks: Vec::new(),
            measure: Measure::Total,
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`. Missing keys keep their
    /// defaults.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
        let config: PipelineConfig =
            serde_json::from_str(&content).with_context(|| format!("parsing config {path}"))?;
        Ok(config)
    }

    /// Applies `TURNSTILE_*` overrides from an environment listing such as
    /// `std::env::vars()`. Other variables are ignored.
    pub fn with_env_overrides<I, K, V>(mut self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let value = value.as_ref().trim();
            match key.as_ref() {
                RESET_LIMIT_VAR => {
                    self.reset_limit = value
                        .parse()
                        .with_context(|| format!("{RESET_LIMIT_VAR}='{value}'"))?;
                }
                TOP_STATIONS_VAR => {
                    self.top_stations = value
                        .parse()
                        .with_context(|| format!("{TOP_STATIONS_VAR}='{value}'"))?;
                }
                _ => {}
            }
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.reset_limit == 0 {
            bail!("reset_limit must be positive");
        }
        if let Some(month) = self.months.iter().find(|m| !(1..=12).contains(*m)) {
            bail!("month {month} is outside 1..=12");
        }
        if let (Some(since), Some(until)) = (self.since, self.until) {
            if since > until {
                bail!("since {since} is after until {until}");
            }
        }
        Ok(())
    }

    /// Weekly files this config loads from an input directory.
    pub fn selection(&self) -> WeeklySelection {
        WeeklySelection {
            months: self.months.clone(),
            since: self.since,
            until: self.until,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert_eq!(config.reset_limit, 5000);
        assert_eq!(config.top_stations, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let path = temp_path("turnstile_traffic_test_config.json");
        fs::write(&path, r#"{ "reset_limit": 8000, "months": [5, 6], "measure": "entries" }"#)
            .unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.reset_limit, 8000);
        assert_eq!(config.months, vec![5, 6]);
        assert_eq!(config.measure, Measure::Entries);
        assert_eq!(config.top_stations, 10);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(PipelineConfig::load("/nonexistent/turnstile.json").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars = vec![
            ("TURNSTILE_RESET_LIMIT", " 12000 "),
            ("TURNSTILE_TOP_STATIONS", "5"),
            ("HOME", "/root"),
        ];
        let config = PipelineConfig::default().with_env_overrides(vars).unwrap();
        assert_eq!(config.reset_limit, 12000);
        assert_eq!(config.top_stations, 5);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let vars = vec![("TURNSTILE_RESET_LIMIT", "lots")];
        assert!(PipelineConfig::default().with_env_overrides(vars).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_limit_and_bad_month() {
        let zero = PipelineConfig {
            reset_limit: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let bad_month = PipelineConfig {
            months: vec![5, 13],
            ..Default::default()
        };
        assert!(bad_month.validate().is_err());
    }

    #[test]
    fn test_date_window_from_file() {
        let path = temp_path("turnstile_traffic_test_window.json");
        fs::write(&path, r#"{ "since": "2020-05-02", "until": "2020-05-30" }"#).unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert!(config.validate().is_ok());
        let selection = config.selection();
        assert_eq!(selection.since, NaiveDate::from_ymd_opt(2020, 5, 2));
        assert!(selection.contains(NaiveDate::from_ymd_opt(2020, 5, 30).unwrap()));
        assert!(!selection.contains(NaiveDate::from_ymd_opt(2020, 6, 6).unwrap()));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        let config = PipelineConfig {
            since: NaiveDate::from_ymd_opt(2020, 6, 1),
            until: NaiveDate::from_ymd_opt(2020, 5, 1),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
