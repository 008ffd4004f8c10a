//! Loader for the MTA weekly turnstile files.
//!
//! Files are plain CSV with the header
//! `C/A,UNIT,SCP,STATION,LINENAME,DIVISION,DATE,TIME,DESC,ENTRIES,EXITS`,
//! published once a week as `turnstile_YYMMDD.txt`. Gzip-compressed copies
//! (`.gz`) are read transparently.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, NaiveTime};
use csv::{ReaderBuilder, Trim};
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::readings::{CounterReading, TurnstileId};

const FILE_PREFIX: &str = "turnstile_";

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "C/A")]
    control_area: String,
    #[serde(rename = "UNIT")]
    unit: String,
    #[serde(rename = "SCP")]
    scp: String,
    #[serde(rename = "STATION")]
    station: String,
    #[serde(rename = "LINENAME")]
    line_names: String,
    #[serde(rename = "DIVISION")]
    division: String,
    #[serde(rename = "DATE")]
    date: String,
    #[serde(rename = "TIME")]
    time: String,
    #[serde(rename = "DESC")]
    description: String,
    #[serde(rename = "ENTRIES")]
    entries: i64,
    #[serde(rename = "EXITS")]
    exits: i64,
}

impl RawRow {
    fn into_reading(self) -> Result<CounterReading> {
        let date = NaiveDate::parse_from_str(&self.date, "%m/%d/%Y")
            .with_context(|| format!("invalid DATE '{}'", self.date))?;
        let time = NaiveTime::parse_from_str(&self.time, "%H:%M:%S")
            .with_context(|| format!("invalid TIME '{}'", self.time))?;

        Ok(CounterReading {
            turnstile: TurnstileId {
                control_area: self.control_area,
                unit: self.unit,
                scp: self.scp,
                station: self.station,
            },
            line_names: self.line_names,
            division: self.division,
            timestamp: date.and_time(time),
            description: self.description,
            entries: self.entries,
            exits: self.exits,
        })
    }
}

/// Parses turnstile CSV from any reader.
///
/// # Errors
///
/// Returns an error naming the line if a row is malformed.
pub fn parse_readings<R: Read>(reader: R) -> Result<Vec<CounterReading>> {
    // The published files pad the EXITS header with spaces.
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let mut readings = Vec::new();

    for result in rdr.deserialize::<RawRow>() {
        let row = result.context("malformed turnstile row")?;
        let line = readings.len() + 2;
        let reading = row
            .into_reading()
            .with_context(|| format!("turnstile row on line {line}"))?;
        readings.push(reading);
    }

    Ok(readings)
}

/// Loads one turnstile file, decompressing it when the name ends in `.gz`.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_file(path: &Path) -> Result<Vec<CounterReading>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;

    let reader: Box<dyn Read> = if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let readings =
        parse_readings(reader).with_context(|| format!("reading {}", path.display()))?;
    debug!(rows = readings.len(), "Turnstile file loaded");
    Ok(readings)
}

/// Loads and concatenates several weekly files in the given order.
pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<CounterReading>> {
    let mut readings = Vec::new();
    for path in paths {
        readings.extend(load_file(path.as_ref())?);
    }
    info!(files = paths.len(), rows = readings.len(), "Turnstile data loaded");
    Ok(readings)
}

/// Formats a date the way weekly file names carry it: `YYMMDD`.
pub fn mta_date_stamp(date: NaiveDate) -> String {
    date.format("%y%m%d").to_string()
}

/// Publication date encoded in a weekly file name, if it is one.
pub fn weekly_file_date(file_name: &str) -> Option<NaiveDate> {
    let rest = file_name.strip_prefix(FILE_PREFIX)?;
    let stamp = rest
        .strip_suffix(".txt.gz")
        .or_else(|| rest.strip_suffix(".txt"))?;
    if stamp.len() != 6 {
        return None;
    }
    let date = NaiveDate::parse_from_str(stamp, "%y%m%d").ok()?;
    // Only the canonical zero-padded spelling names a weekly file.
    (mta_date_stamp(date) == stamp).then_some(date)
}

/// Which weekly files to pick up from a directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeeklySelection {
    /// Months (1 = January) to keep. Empty keeps every month.
    pub months: Vec<u32>,
    /// Earliest publication date kept, inclusive.
    pub since: Option<NaiveDate>,
    /// Latest publication date kept, inclusive.
    pub until: Option<NaiveDate>,
}

impl WeeklySelection {
    pub fn contains(&self, date: NaiveDate) -> bool {
        (self.months.is_empty() || self.months.contains(&date.month()))
            && self.since.is_none_or(|since| date >= since)
            && self.until.is_none_or(|until| date <= until)
    }
}

/// Lists the weekly files in `dir` whose publication date falls in
/// `selection`, sorted by date.
pub fn discover_weekly_files(dir: &Path, selection: &WeeklySelection) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(date) = entry.file_name().to_str().and_then(weekly_file_date) else {
            continue;
        };
        if selection.contains(date) {
            files.push((date, entry.path()));
        }
    }

    files.sort();
    debug!(
        dir = %dir.display(),
        since = ?selection.since.map(mta_date_stamp),
        until = ?selection.until.map(mta_date_stamp),
        files = files.len(),
        "Weekly files discovered"
    );
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::env;
    use std::io::Write;

    const SAMPLE: &str = "\
C/A,UNIT,SCP,STATION,LINENAME,DIVISION,DATE,TIME,DESC,ENTRIES,EXITS
A002,R051,02-00-00,59 ST,NQR456W,BMT,05/02/2020,00:00:00,REGULAR,0007420381,0002520724
A002,R051,02-00-00,59 ST,NQR456W,BMT,05/02/2020,04:00:00,REGULAR,0007420382,0002520726
";

    fn temp_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_parse_padded_published_format() {
        let readings = parse_readings(SAMPLE.as_bytes()).unwrap();

        assert_eq!(readings.len(), 2);
        let first = &readings[0];
        assert_eq!(first.turnstile.control_area, "A002");
        assert_eq!(first.turnstile.station, "59 ST");
        assert_eq!(first.line_names, "NQR456W");
        assert_eq!(first.entries, 7_420_381);
        assert_eq!(first.exits, 2_520_724);
        assert_eq!(
            readings[1].timestamp,
            NaiveDate::from_ymd_opt(2020, 5, 2)
                .unwrap()
                .and_hms_opt(4, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        let bad = "C/A,UNIT,SCP,STATION,LINENAME,DIVISION,DATE,TIME,DESC,ENTRIES,EXITS\n\
                   A002,R051,02-00-00,59 ST,NQR456W,BMT,2020-05-02,00:00:00,REGULAR,1,2\n";
        let err = parse_readings(bad.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn test_parse_rejects_non_numeric_counter() {
        let bad = "C/A,UNIT,SCP,STATION,LINENAME,DIVISION,DATE,TIME,DESC,ENTRIES,EXITS\n\
                   A002,R051,02-00-00,59 ST,NQR456W,BMT,05/02/2020,00:00:00,REGULAR,abc,2\n";
        assert!(parse_readings(bad.as_bytes()).is_err());
    }

    #[test]
    fn test_load_gzip_file() {
        let dir = temp_dir("turnstile_traffic_test_gzip");
        let path = dir.join("turnstile_200502.txt.gz");

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(SAMPLE.as_bytes()).unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        let readings = load_file(&path).unwrap();
        assert_eq!(readings.len(), 2);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = load_file(Path::new("/nonexistent/turnstile_200502.txt")).unwrap_err();
        assert!(err.to_string().contains("turnstile_200502.txt"));
    }

    #[test]
    fn test_mta_date_stamp() {
        let date = NaiveDate::from_ymd_opt(2020, 5, 2).unwrap();
        assert_eq!(mta_date_stamp(date), "200502");
    }

    #[test]
    fn test_weekly_file_name_from_stamp() {
        let date = NaiveDate::from_ymd_opt(2019, 1, 5).unwrap();
        let name = format!("{FILE_PREFIX}{}.txt", mta_date_stamp(date));
        assert_eq!(name, "turnstile_190105.txt");
        assert_eq!(weekly_file_date(&name), Some(date));
    }

    #[test]
    fn test_weekly_file_date() {
        assert_eq!(
            weekly_file_date("turnstile_200502.txt"),
            NaiveDate::from_ymd_opt(2020, 5, 2)
        );
        assert_eq!(
            weekly_file_date("turnstile_191228.txt.gz"),
            NaiveDate::from_ymd_opt(2019, 12, 28)
        );
        assert_eq!(weekly_file_date("turnstile_200502.csv"), None);
        assert_eq!(weekly_file_date("notes.txt"), None);
        assert_eq!(weekly_file_date("turnstile_201399.txt"), None);
    }

    #[test]
    fn test_discover_filters_months_and_sorts() {
        let dir = temp_dir("turnstile_traffic_test_discover");
        for name in [
            "turnstile_200613.txt",
            "turnstile_200502.txt",
            "turnstile_200718.txt",
            "readme.md",
        ] {
            fs::write(dir.join(name), "").unwrap();
        }

        let selection = WeeklySelection {
            months: vec![5, 6],
            ..Default::default()
        };
        let files = discover_weekly_files(&dir, &selection).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["turnstile_200502.txt", "turnstile_200613.txt"]);

        let all = discover_weekly_files(&dir, &WeeklySelection::default()).unwrap();
        assert_eq!(all.len(), 3);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_discover_excludes_files_outside_date_range() {
        let dir = temp_dir("turnstile_traffic_test_discover_range");
        for name in [
            "turnstile_200425.txt",
            "turnstile_200502.txt",
            "turnstile_200509.txt.gz",
            "turnstile_200516.txt",
            "turnstile_200523.txt",
        ] {
            fs::write(dir.join(name), "").unwrap();
        }

        let names = |selection: &WeeklySelection| -> Vec<String> {
            discover_weekly_files(&dir, selection)
                .unwrap()
                .iter()
                .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
                .collect()
        };

        let window = WeeklySelection {
            since: NaiveDate::from_ymd_opt(2020, 5, 2),
            until: NaiveDate::from_ymd_opt(2020, 5, 16),
            ..Default::default()
        };
        assert_eq!(
            names(&window),
            vec![
                "turnstile_200502.txt",
                "turnstile_200509.txt.gz",
                "turnstile_200516.txt"
            ]
        );

        let open_ended = WeeklySelection {
            since: NaiveDate::from_ymd_opt(2020, 5, 10),
            ..Default::default()
        };
        assert_eq!(
            names(&open_ended),
            vec!["turnstile_200516.txt", "turnstile_200523.txt"]
        );

        // Months and the date window both apply.
        let april_window = WeeklySelection {
            months: vec![4],
            until: NaiveDate::from_ymd_opt(2020, 5, 31),
            ..Default::default()
        };
        assert_eq!(names(&april_window), vec!["turnstile_200425.txt"]);

        fs::remove_dir_all(&dir).unwrap();
    }
}
