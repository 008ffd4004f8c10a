use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::analyzers::aggregate::{
    day_of_week_averages, time_bin_heatmap, top_stations, weekly_totals,
};
use crate::analyzers::types::{DayFilter, DayOfWeekAverage, Heatmap, StationTotal, WeeklyTotal};
use crate::config::PipelineConfig;
use crate::correct::correct_all;
use crate::deltas::compute_deltas;
use crate::median::ReferenceMedians;
use crate::output::{write_heatmap, write_json, write_records};
use crate::readings::{CounterReading, HourlyTraffic};
use crate::stats::CorrectionStats;

/// Corrected traffic for a batch of counter readings, with a tally of the
/// corrections made.
pub struct CleanedTraffic {
    pub traffic: Vec<HourlyTraffic>,
    pub corrections: CorrectionStats,
    pub medians: usize,
}

/// Differences counters, computes slot medians and corrects every interval.
#[tracing::instrument(skip(readings), fields(readings = readings.len()))]
pub fn clean(readings: &[CounterReading], reset_limit: u64) -> CleanedTraffic {
    let deltas = compute_deltas(readings);
    let medians = ReferenceMedians::from_readings(&deltas);
    let corrections = CorrectionStats::from_readings(&deltas, &medians, reset_limit);
    let traffic = correct_all(&deltas, &medians, reset_limit);

    info!(
        intervals = traffic.len(),
        unknown = corrections.unknown,
        median_substituted = corrections.median_substituted,
        sign_inverted = corrections.sign_inverted,
        "Turnstile readings cleaned"
    );

    CleanedTraffic {
        traffic,
        corrections,
        medians: medians.len(),
    }
}

/// Headline numbers of a report, written as `summary.json`.
#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub schema_version: u8,
    pub generated_at: DateTime<Utc>,
    pub reset_limit: u64,
    pub counter_readings: usize,
    pub intervals: usize,
    pub stations: usize,
    pub reference_slots: usize,
    pub corrections: CorrectionStats,
    pub unknown_pct: f64,
    pub top_stations: Vec<StationTotal>,
}

pub struct TrafficReport {
    pub summary: ReportSummary,
    pub traffic: Vec<HourlyTraffic>,
    pub top_stations: Vec<StationTotal>,
    pub weekday_heatmap: Heatmap,
    pub weekend_heatmap: Heatmap,
    pub day_of_week: Vec<DayOfWeekAverage>,
    pub weekly: Vec<WeeklyTotal>,
}

/// Runs the whole pipeline over already-loaded counter readings.
///
/// Heatmaps and day-of-week averages cover the busiest
/// `config.top_stations` stations; weekly totals cover every station.
pub fn build_report(readings: &[CounterReading], config: &PipelineConfig) -> Result<TrafficReport> {
    config.validate()?;

    let cleaned = clean(readings, config.reset_limit);
    let traffic = cleaned.traffic;

    let top = top_stations(&traffic, config.top_stations);
    let selection: Vec<String> = top.iter().map(|s| s.station.clone()).collect();

    let weekday_heatmap =
        time_bin_heatmap(&traffic, &selection, DayFilter::Weekday, config.measure);
    let weekend_heatmap =
        time_bin_heatmap(&traffic, &selection, DayFilter::Weekend, config.measure);
    let day_of_week = day_of_week_averages(&traffic, &selection, config.measure);
    let weekly = weekly_totals(&traffic, config.measure, &config.skip_weeks);

    let stations = traffic
        .iter()
        .map(|t| t.station.as_str())
        .collect::<HashSet<_>>()
        .len();

    let summary = ReportSummary {
        schema_version: 1,
        generated_at: Utc::now(),
        reset_limit: config.reset_limit,
        counter_readings: readings.len(),
        intervals: traffic.len(),
        stations,
        reference_slots: cleaned.medians,
        unknown_pct: cleaned.corrections.unknown_pct(),
        corrections: cleaned.corrections,
        top_stations: top.clone(),
    };

    Ok(TrafficReport {
        summary,
        traffic,
        top_stations: top,
        weekday_heatmap,
        weekend_heatmap,
        day_of_week,
        weekly,
    })
}

/// Writes every table of `report` into `dir`, creating it if needed.
#[tracing::instrument(skip_all, fields(dir = %dir.display()))]
pub fn write_report(dir: &Path, report: &TrafficReport) -> Result<()> {
    fs::create_dir_all(dir)?;

    write_records(dir.join("hourly_traffic.csv"), &report.traffic)?;
    write_records(dir.join("top_stations.csv"), &report.top_stations)?;
    write_heatmap(dir.join("heatmap_weekday.csv"), &report.weekday_heatmap)?;
    write_heatmap(dir.join("heatmap_weekend.csv"), &report.weekend_heatmap)?;
    write_records(dir.join("day_of_week.csv"), &report.day_of_week)?;
    write_records(dir.join("weekly_totals.csv"), &report.weekly)?;
    write_json(dir.join("summary.json"), &report.summary)?;

    info!(intervals = report.traffic.len(), "Report written");
    Ok(())
}
