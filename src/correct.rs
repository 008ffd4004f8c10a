//! Correction of raw turnstile deltas.
//!
//! Two hardware defects show up in the published counters: some turnstiles
//! count backwards for stretches of time, and counters occasionally reset or
//! roll over, which turns one interval's delta into garbage. [`correct`]
//! compensates for both and never fails; a value it cannot repair comes back
//! as unknown so a single bad turnstile never aborts a batch.

use crate::median::ReferenceMedians;
use crate::readings::{HourlyTraffic, TurnstileReading};

/// A non-negative traffic count, or `None` when the reading is implausible
/// and no trustworthy fallback exists.
pub type CorrectedReading = Option<u64>;

/// Which counter of a reading to correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficKind {
    Entries,
    Exits,
}

impl TrafficKind {
    pub fn delta(self, reading: &TurnstileReading) -> i64 {
        match self {
            TrafficKind::Entries => reading.entries_delta,
            TrafficKind::Exits => reading.exits_delta,
        }
    }
}

/// Turns one raw delta into a plausible traffic count.
///
/// 1. A negative delta is an inverted sign, so its magnitude is used.
/// 2. A value above `reset_limit` is treated as a counter reset and replaced
///    by the magnitude of `reference_median`.
/// 3. If the median is above `reset_limit` too, the result is unknown.
///
/// The result is always `None` or `Some(v)` with `v <= reset_limit`.
pub fn correct(raw_delta: i64, reference_median: i64, reset_limit: u64) -> CorrectedReading {
    let mut traffic = raw_delta.unsigned_abs();

    if traffic > reset_limit {
        traffic = reference_median.unsigned_abs();
    }

    if traffic > reset_limit {
        return None;
    }

    Some(traffic)
}

/// Corrects one counter of `reading` against its slot median.
///
/// A reading without a median falls back to 0, so an oversized delta
/// becomes 0 rather than unknown.
pub fn correct_reading(
    reading: &TurnstileReading,
    medians: &ReferenceMedians,
    kind: TrafficKind,
    reset_limit: u64,
) -> CorrectedReading {
    let median = medians.get(reading, kind).unwrap_or(0);
    correct(kind.delta(reading), median, reset_limit)
}

/// Corrects entries and exits of every reading, preserving order.
#[tracing::instrument(skip(readings, medians), fields(readings = readings.len()))]
pub fn correct_all(
    readings: &[TurnstileReading],
    medians: &ReferenceMedians,
    reset_limit: u64,
) -> Vec<HourlyTraffic> {
    readings
        .iter()
        .map(|reading| {
            HourlyTraffic::new(
                reading,
                correct_reading(reading, medians, TrafficKind::Entries, reset_limit),
                correct_reading(reading, medians, TrafficKind::Exits, reset_limit),
            )
        })
        .collect()
}
