use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

use crate::analyzers::timebin::TimeBin;
use crate::analyzers::types::{
    DayFilter, DayOfWeekAverage, Heatmap, HeatmapRow, Measure, StationTotal, WeeklyTotal,
};
use crate::analyzers::utility::{mean, stddev};
use crate::readings::HourlyTraffic;

/// Axis labels for days of the week, Monday first.
pub const DAY_NAMES: [&str; 7] = ["Mon", "Tues", "Wed", "Thur", "Fri", "Sat", "Sun"];

// Unknown values are left out of every sum below. A group whose values are
// all unknown still exists and sums to 0. Sums saturate at u64::MAX.

fn selected(stations: &[String], station: &str) -> bool {
    stations.is_empty() || stations.iter().any(|s| s == station)
}

/// Ranks stations by total traffic, busiest first. Ties are broken by
/// station name. Returns at most `n` stations.
pub fn top_stations(traffic: &[HourlyTraffic], n: usize) -> Vec<StationTotal> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for row in traffic {
        let total = totals.entry(row.station.as_str()).or_insert(0);
        *total = total.saturating_add(row.total().unwrap_or(0));
    }

    let mut ranked: Vec<StationTotal> = totals
        .into_iter()
        .map(|(station, total_traffic)| StationTotal {
            station: station.to_string(),
            total_traffic,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.total_traffic
            .cmp(&a.total_traffic)
            .then_with(|| a.station.cmp(&b.station))
    });
    ranked.truncate(n);
    ranked
}

/// Average traffic per station and 3-hour time bin.
///
/// Traffic is first summed per station, date and bin, then those daily sums
/// are averaged per station and bin. An empty `stations` keeps every
/// station. A bin with no data for a station is `None`.
pub fn time_bin_heatmap(
    traffic: &[HourlyTraffic],
    stations: &[String],
    filter: DayFilter,
    measure: Measure,
) -> Heatmap {
    let mut bin_sums: BTreeMap<(&str, NaiveDate, TimeBin), u64> = BTreeMap::new();
    for row in traffic {
        let date = row.timestamp.date();
        if !selected(stations, &row.station) || !filter.matches(date) {
            continue;
        }
        let key = (row.station.as_str(), date, TimeBin::of(row.timestamp.time()));
        let sum = bin_sums.entry(key).or_insert(0);
        *sum = sum.saturating_add(measure.value(row).unwrap_or(0));
    }

    let mut cells: BTreeMap<&str, [Vec<u64>; TimeBin::COUNT]> = BTreeMap::new();
    for ((station, _, bin), sum) in bin_sums {
        cells.entry(station).or_default()[bin.index()].push(sum);
    }

    let rows = cells
        .into_iter()
        .map(|(station, bins)| HeatmapRow {
            station: station.to_string(),
            values: bins.map(|sums| mean(&sums)),
        })
        .collect();

    Heatmap { rows }
}

/// Average daily traffic per station and day of week.
///
/// Traffic is summed per station and date, then averaged over all dates
/// falling on the same weekday.
pub fn day_of_week_averages(
    traffic: &[HourlyTraffic],
    stations: &[String],
    measure: Measure,
) -> Vec<DayOfWeekAverage> {
    let mut daily: BTreeMap<(&str, NaiveDate), u64> = BTreeMap::new();
    for row in traffic.iter().filter(|r| selected(stations, &r.station)) {
        let sum = daily
            .entry((row.station.as_str(), row.timestamp.date()))
            .or_insert(0);
        *sum = sum.saturating_add(measure.value(row).unwrap_or(0));
    }

    let mut by_weekday: BTreeMap<(&str, u32), Vec<u64>> = BTreeMap::new();
    for ((station, date), sum) in daily {
        by_weekday
            .entry((station, date.weekday().num_days_from_monday()))
            .or_default()
            .push(sum);
    }

    by_weekday
        .into_iter()
        .filter_map(|((station, day_index), sums)| {
            let average = mean(&sums)?;
            Some(DayOfWeekAverage {
                station: station.to_string(),
                day_index,
                day_of_week: DAY_NAMES[day_index as usize].to_string(),
                days: sums.len(),
                average,
                stddev: stddev(&sums, average),
            })
        })
        .collect()
}

/// Traffic summed per ISO week and calendar year, ordered by year then
/// week. Weeks listed in `skip_weeks` are dropped, typically partial weeks
/// at the edges of a sampling window.
pub fn weekly_totals(traffic: &[HourlyTraffic], measure: Measure, skip_weeks: &[u32]) -> Vec<WeeklyTotal> {
    let mut totals: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    for row in traffic {
        let date = row.timestamp.date();
        let week = date.iso_week().week();
        if skip_weeks.contains(&week) {
            continue;
        }
        let total = totals.entry((date.year(), week)).or_insert(0);
        *total = total.saturating_add(measure.value(row).unwrap_or(0));
    }

    totals
        .into_iter()
        .map(|((year, week), total)| WeeklyTotal { year, week, total })
        .collect()
}
