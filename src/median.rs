//! Reference medians per turnstile, day of week and time of day.
//!
//! A reading that looks like a counter reset is replaced with the typical
//! delta seen for the same turnstile in the same weekly slot.

use chrono::{Datelike, NaiveTime};
use std::collections::HashMap;
use tracing::debug;

use crate::correct::TrafficKind;
use crate::readings::{TurnstileId, TurnstileReading};

/// A turnstile's recurring weekly reporting slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub turnstile: TurnstileId,
    /// Days since Monday, 0..=6.
    pub weekday: u32,
    pub time: NaiveTime,
}

impl SlotKey {
    pub fn of(reading: &TurnstileReading) -> Self {
        SlotKey {
            turnstile: reading.turnstile.clone(),
            weekday: reading.timestamp.weekday().num_days_from_monday(),
            time: reading.timestamp.time(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlotMedian {
    entries: i64,
    exits: i64,
}

#[derive(Debug, Default)]
pub struct ReferenceMedians {
    slots: HashMap<SlotKey, SlotMedian>,
}

impl ReferenceMedians {
    /// Groups raw deltas by slot and keeps the median of each group.
    #[tracing::instrument(skip_all, fields(readings = readings.len()))]
    pub fn from_readings(readings: &[TurnstileReading]) -> Self {
        let mut series: HashMap<SlotKey, (Vec<i64>, Vec<i64>)> = HashMap::new();

        for reading in readings {
            let (entries, exits) = series.entry(SlotKey::of(reading)).or_default();
            entries.push(reading.entries_delta);
            exits.push(reading.exits_delta);
        }

        let slots: HashMap<_, _> = series
            .into_iter()
            .map(|(key, (mut entries, mut exits))| {
                let median = SlotMedian {
                    entries: median(&mut entries),
                    exits: median(&mut exits),
                };
                (key, median)
            })
            .collect();

        debug!(slots = slots.len(), "Reference medians computed");
        ReferenceMedians { slots }
    }

    pub fn get(&self, reading: &TurnstileReading, kind: TrafficKind) -> Option<i64> {
        self.slots.get(&SlotKey::of(reading)).map(|m| match kind {
            TrafficKind::Entries => m.entries,
            TrafficKind::Exits => m.exits,
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Median of a non-empty series. Even-length series average the two middle
/// values, truncated toward zero. Sorts `values` in place.
fn median(values: &mut [i64]) -> i64 {
    if values.is_empty() {
        return 0;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        ((values[mid - 1] as i128 + values[mid] as i128) / 2) as i64
    }
}
