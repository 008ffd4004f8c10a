//! Cumulative counters to per-interval deltas.

use std::collections::BTreeMap;
use tracing::debug;

use crate::readings::{CounterReading, TurnstileId, TurnstileReading};

/// Differences consecutive readings of each turnstile.
///
/// Readings are grouped per turnstile and ordered by timestamp. A repeated
/// timestamp (the `RECOVR AUD` rows the MTA publishes next to `REGULAR`
/// ones) keeps only its first occurrence. The first reading of a turnstile
/// has nothing to subtract from and yields no delta. Output is ordered by
/// turnstile, then timestamp.
#[tracing::instrument(skip_all, fields(readings = readings.len()))]
pub fn compute_deltas(readings: &[CounterReading]) -> Vec<TurnstileReading> {
    let mut by_turnstile: BTreeMap<&TurnstileId, Vec<&CounterReading>> = BTreeMap::new();
    for reading in readings {
        by_turnstile.entry(&reading.turnstile).or_default().push(reading);
    }

    let turnstiles = by_turnstile.len();
    let mut duplicates = 0;
    let mut deltas = Vec::with_capacity(readings.len().saturating_sub(turnstiles));

    for (turnstile, mut series) in by_turnstile {
        // stable: the first of two equal timestamps survives dedup
        series.sort_by_key(|r| r.timestamp);
        let before = series.len();
        series.dedup_by_key(|r| r.timestamp);
        duplicates += before - series.len();

        for pair in series.windows(2) {
            let (previous, current) = (pair[0], pair[1]);
            deltas.push(TurnstileReading {
                turnstile: turnstile.clone(),
                timestamp: current.timestamp,
                entries_delta: current.entries.saturating_sub(previous.entries),
                exits_delta: current.exits.saturating_sub(previous.exits),
            });
        }
    }

    debug!(
        turnstiles,
        duplicates,
        deltas = deltas.len(),
        "Counter deltas computed"
    );
    deltas
}
