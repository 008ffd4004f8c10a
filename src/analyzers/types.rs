//! Data types used by the aggregation pipeline.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::analyzers::timebin::TimeBin;
use crate::readings::HourlyTraffic;

/// Which corrected value an aggregate sums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    Entries,
    Exits,
    #[default]
    Total,
}

impl Measure {
    pub fn value(self, row: &HourlyTraffic) -> Option<u64> {
        match self {
            Measure::Entries => row.entries,
            Measure::Exits => row.exits,
            Measure::Total => row.total(),
        }
    }
}

impl FromStr for Measure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "entries" => Ok(Measure::Entries),
            "exits" => Ok(Measure::Exits),
            "total" => Ok(Measure::Total),
            other => Err(format!("unknown measure '{other}' (entries, exits, total)")),
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Measure::Entries => "entries",
            Measure::Exits => "exits",
            Measure::Total => "total",
        };
        f.write_str(name)
    }
}

/// Restricts an aggregate to weekdays (Mon–Fri) or weekends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DayFilter {
    #[default]
    All,
    Weekday,
    Weekend,
}

impl DayFilter {
    pub fn matches(self, date: NaiveDate) -> bool {
        let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        match self {
            DayFilter::All => true,
            DayFilter::Weekday => !weekend,
            DayFilter::Weekend => weekend,
        }
    }
}

impl FromStr for DayFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(DayFilter::All),
            "weekday" | "weekdays" => Ok(DayFilter::Weekday),
            "weekend" | "weekends" => Ok(DayFilter::Weekend),
            other => Err(format!("unknown day filter '{other}' (all, weekday, weekend)")),
        }
    }
}

/// Total traffic of one station over the whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationTotal {
    pub station: String,
    pub total_traffic: u64,
}

/// One station's row of a [`Heatmap`]: the mean daily traffic per time bin.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapRow {
    pub station: String,
    pub values: [Option<f64>; TimeBin::COUNT],
}

/// Stations by time bin pivot, ordered by station name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Heatmap {
    pub rows: Vec<HeatmapRow>,
}

impl Heatmap {
    pub fn row(&self, station: &str) -> Option<&HeatmapRow> {
        self.rows.iter().find(|r| r.station == station)
    }
}

/// Mean daily traffic of a station on one day of the week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayOfWeekAverage {
    pub station: String,
    /// Days since Monday, 0..=6.
    pub day_index: u32,
    pub day_of_week: String,
    pub days: usize,
    pub average: f64,
    pub stddev: f64,
}

/// Traffic summed over one week of one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyTotal {
    pub year: i32,
    pub week: u32,
    pub total: u64,
}
