use serde::Serialize;

use crate::correct::TrafficKind;
use crate::median::ReferenceMedians;
use crate::readings::TurnstileReading;

/// Counts of what the corrector did to a batch of readings.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CorrectionStats {
    pub values: usize,
    pub sign_inverted: usize,
    pub median_substituted: usize,
    pub unknown: usize,
}

impl CorrectionStats {
    /// Tallies entries and exits of every reading the same way
    /// [`crate::correct::correct_reading`] treats them.
    pub fn from_readings(
        readings: &[TurnstileReading],
        medians: &ReferenceMedians,
        reset_limit: u64,
    ) -> Self {
        let mut s = CorrectionStats::default();

        for reading in readings {
            for kind in [TrafficKind::Entries, TrafficKind::Exits] {
                let median = medians.get(reading, kind).unwrap_or(0);
                s.record(kind.delta(reading), median, reset_limit);
            }
        }

        s
    }

    pub fn record(&mut self, raw_delta: i64, reference_median: i64, reset_limit: u64) {
        self.values += 1;

        if raw_delta < 0 {
            self.sign_inverted += 1;
        }

        if raw_delta.unsigned_abs() > reset_limit {
            if reference_median.unsigned_abs() > reset_limit {
                self.unknown += 1;
            } else {
                self.median_substituted += 1;
            }
        }
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn unknown_pct(&self) -> f64 {
        Self::pct(self.unknown, self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correct::correct_all;
    use crate::readings::TurnstileId;
    use chrono::NaiveDate;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(CorrectionStats::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(CorrectionStats::pct(50, 100), 50.0);
        assert_eq!(CorrectionStats::pct(1, 4), 25.0);
    }

    #[test]
    fn test_record_classifies_each_branch() {
        let mut stats = CorrectionStats::default();
        stats.record(3000, 2000, 5000);
        stats.record(-3000, 2000, 5000);
        stats.record(8000, 1200, 5000);
        stats.record(8000, 6000, 5000);

        assert_eq!(stats.values, 4);
        assert_eq!(stats.sign_inverted, 1);
        assert_eq!(stats.median_substituted, 1);
        assert_eq!(stats.unknown, 1);
        assert_eq!(stats.unknown_pct(), 25.0);
    }

    #[test]
    fn test_unknown_count_matches_corrector() {
        let turnstile = TurnstileId {
            control_area: "H009".to_string(),
            unit: "R235".to_string(),
            scp: "00-03-04".to_string(),
            station: "BEDFORD AV".to_string(),
        };
        let readings: Vec<TurnstileReading> = [(4, 9000, -50), (11, 8000, 60), (5, 100, 70000)]
            .into_iter()
            .map(|(day, entries, exits)| TurnstileReading {
                turnstile: turnstile.clone(),
                timestamp: NaiveDate::from_ymd_opt(2020, 5, day)
                    .unwrap()
                    .and_hms_opt(16, 0, 0)
                    .unwrap(),
                entries_delta: entries,
                exits_delta: exits,
            })
            .collect();
        let medians = ReferenceMedians::from_readings(&readings);

        let stats = CorrectionStats::from_readings(&readings, &medians, 5000);
        let traffic = correct_all(&readings, &medians, 5000);
        let unknown = traffic.iter().filter(|t| t.entries.is_none()).count()
            + traffic.iter().filter(|t| t.exits.is_none()).count();

        assert_eq!(stats.values, 6);
        assert_eq!(stats.sign_inverted, 1);
        assert_eq!(stats.unknown, unknown);
        assert_eq!(stats.unknown, 3);
    }
}
