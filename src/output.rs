//! Output formatting and persistence for corrected traffic and aggregates.
//!
//! Supports pretty-printing, JSON files and CSV tables.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Debug;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

use crate::analyzers::timebin::TimeBin;
use crate::analyzers::types::Heatmap;

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty<T: Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes rows to a CSV file with a header, replacing any existing file.
pub fn write_records<T: Serialize, P: AsRef<Path>>(path: P, rows: &[T]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    debug!(path = %path.display(), rows = rows.len(), "CSV written");
    Ok(())
}

/// Writes a heatmap as a station by time-bin CSV table. Bins without data
/// are left empty.
pub fn write_heatmap<P: AsRef<Path>>(path: P, heatmap: &Heatmap) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let mut header = vec!["station"];
    header.extend(TimeBin::all().map(TimeBin::label));
    writer.write_record(&header)?;

    for row in &heatmap.rows {
        let mut record = vec![row.station.clone()];
        record.extend(
            row.values
                .iter()
                .map(|v| v.map(|v| format!("{v:.2}")).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;

    debug!(path = %path.display(), stations = heatmap.rows.len(), "Heatmap written");
    Ok(())
}

/// Writes a value as pretty-printed JSON.
pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::{HeatmapRow, StationTotal};
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn station(name: &str, total: u64) -> StationTotal {
        StationTotal {
            station: name.to_string(),
            total_traffic: total,
        }
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&station("59 ST", 1));
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&station("59 ST", 1)).unwrap();
    }

    #[test]
    fn test_write_records_overwrites() {
        let path = temp_path("turnstile_traffic_test_records.csv");
        write_records(&path, &[station("A", 1), station("B", 2)]).unwrap();
        write_records(&path, &[station("C", 3)]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "station,total_traffic\nC,3\n");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_heatmap_leaves_missing_bins_empty() {
        let path = temp_path("turnstile_traffic_test_heatmap.csv");
        let mut values = [None; TimeBin::COUNT];
        values[2] = Some(1234.5);
        let heatmap = Heatmap {
            rows: vec![HeatmapRow {
                station: "FULTON ST".to_string(),
                values,
            }],
        };

        write_heatmap(&path, &heatmap).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("station,12:00am - 3:00am,3:00am - 6:00am"));
        assert_eq!(lines[1], "FULTON ST,,,1234.50,,,,,");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_json() {
        let path = temp_path("turnstile_traffic_test_summary.json");
        write_json(&path, &station("A", 7)).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["total_traffic"], 7);

        fs::remove_file(&path).unwrap();
    }
}
