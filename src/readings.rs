//! Record types that flow through the cleaning pipeline.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Identifies one physical turnstile.
///
/// The MTA publishes turnstiles as a control area (`C/A`), a remote unit,
/// and a subunit channel position (`SCP`). The station name is part of the
/// key because the same `C/A`/`UNIT`/`SCP` triple has been reused across
/// station renames.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TurnstileId {
    pub control_area: String,
    pub unit: String,
    pub scp: String,
    pub station: String,
}

/// One cumulative counter reading, as published in the weekly files.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterReading {
    pub turnstile: TurnstileId,
    pub line_names: String,
    pub division: String,
    pub timestamp: NaiveDateTime,
    pub description: String,
    pub entries: i64,
    pub exits: i64,
}

/// Traffic through one turnstile over one reporting interval, before
/// correction. Deltas are signed: hardware occasionally counts backwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnstileReading {
    pub turnstile: TurnstileId,
    pub timestamp: NaiveDateTime,
    pub entries_delta: i64,
    pub exits_delta: i64,
}

impl TurnstileReading {
    pub fn station(&self) -> &str {
        &self.turnstile.station
    }
}

/// Corrected traffic for one turnstile interval.
///
/// `None` marks a value that could not be corrected. Kept flat so it can
/// be written straight to CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyTraffic {
    pub station: String,
    pub control_area: String,
    pub unit: String,
    pub scp: String,
    pub timestamp: NaiveDateTime,
    pub entries: Option<u64>,
    pub exits: Option<u64>,
}

impl HourlyTraffic {
    pub fn new(reading: &TurnstileReading, entries: Option<u64>, exits: Option<u64>) -> Self {
        HourlyTraffic {
            station: reading.station().to_string(),
            control_area: reading.turnstile.control_area.clone(),
            unit: reading.turnstile.unit.clone(),
            scp: reading.turnstile.scp.clone(),
            timestamp: reading.timestamp,
            entries,
            exits,
        }
    }

    /// Entries plus exits. Unknown if either side is unknown or the sum
    /// does not fit in a `u64`.
    pub fn total(&self) -> Option<u64> {
        self.entries?.checked_add(self.exits?)
    }
}
