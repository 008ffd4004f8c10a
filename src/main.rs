//! CLI entry point for the turnstile traffic tool.
//!
//! Provides subcommands for cleaning MTA turnstile counter files, ranking
//! stations, building time-of-day and day-of-week tables, and writing a
//! full report.

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use turnstile_traffic::analyzers::aggregate::{
    day_of_week_averages, time_bin_heatmap, top_stations, weekly_totals,
};
use turnstile_traffic::analyzers::report::{build_report, clean, write_report};
use turnstile_traffic::analyzers::types::{DayFilter, Measure};
use turnstile_traffic::{
    config::PipelineConfig,
    correct::correct,
    output::{print_json, print_pretty, write_heatmap, write_records},
    parser::{discover_weekly_files, load_files},
    readings::HourlyTraffic,
};

#[derive(Parser)]
#[command(name = "turnstile_traffic")]
#[command(about = "Clean and aggregate MTA turnstile counts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Turnstile files to load (plain or .gz)
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Directory of weekly turnstile_YYMMDD.txt files
    #[arg(short = 'd', long)]
    input_dir: Option<PathBuf>,

    /// Only load weekly files published in these months (1-12)
    #[arg(short, long, value_delimiter = ',')]
    months: Vec<u32>,

    /// Only load weekly files published on or after this date (YYYY-MM-DD)
    #[arg(long)]
    since: Option<NaiveDate>,

    /// Only load weekly files published on or before this date (YYYY-MM-DD)
    #[arg(long)]
    until: Option<NaiveDate>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<String>,

    /// Largest delta accepted as genuine traffic for one interval
    #[arg(long)]
    reset_limit: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Correct counter deltas and write hourly traffic per turnstile
    Clean {
        #[command(flatten)]
        input: InputArgs,

        /// CSV file to write corrected traffic to
        #[arg(short, long, default_value = "hourly_traffic.csv")]
        output: PathBuf,
    },
    /// Rank stations by total traffic
    TopStations {
        #[command(flatten)]
        input: InputArgs,

        /// Number of stations to keep (defaults to the configured value)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        #[arg(short, long, default_value = "top_stations.csv")]
        output: PathBuf,
    },
    /// Average traffic per station and 3-hour time bin
    Heatmap {
        #[command(flatten)]
        input: InputArgs,

        /// Stations to include (defaults to the busiest stations)
        #[arg(short, long = "station")]
        stations: Vec<String>,

        /// all, weekday or weekend
        #[arg(long, default_value = "all")]
        day_filter: DayFilter,

        /// entries, exits or total
        #[arg(long)]
        measure: Option<Measure>,

        #[arg(short, long, default_value = "heatmap.csv")]
        output: PathBuf,
    },
    /// Average daily traffic per station and day of week
    DayOfWeek {
        #[command(flatten)]
        input: InputArgs,

        /// Stations to include (defaults to the busiest stations)
        #[arg(short, long = "station")]
        stations: Vec<String>,

        /// entries, exits or total
        #[arg(long)]
        measure: Option<Measure>,

        #[arg(short, long, default_value = "day_of_week.csv")]
        output: PathBuf,
    },
    /// Total traffic per week and year
    Weekly {
        #[command(flatten)]
        input: InputArgs,

        /// ISO weeks to leave out, e.g. partial weeks at the window edges
        #[arg(long = "skip-week", value_delimiter = ',')]
        skip_weeks: Vec<u32>,

        /// entries, exits or total
        #[arg(long)]
        measure: Option<Measure>,

        #[arg(short, long, default_value = "weekly_totals.csv")]
        output: PathBuf,
    },
    /// Run the whole pipeline and write every table to a directory
    Report {
        #[command(flatten)]
        input: InputArgs,

        #[arg(short, long, default_value = "report")]
        output_dir: PathBuf,
    },
    /// Correct a single raw delta
    Correct {
        #[arg(allow_negative_numbers = true)]
        raw_delta: i64,

        #[arg(allow_negative_numbers = true)]
        reference_median: i64,

        #[arg(long, default_value_t = 5000)]
        reset_limit: u64,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/turnstile_traffic.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("turnstile_traffic.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Clean { input, output } => {
            let (_, traffic) = load_traffic(&input)?;
            write_records(&output, &traffic)?;
            info!(rows = traffic.len(), output = %output.display(), "Hourly traffic written");
        }
        Commands::TopStations {
            input,
            count,
            output,
        } => {
            let (config, traffic) = load_traffic(&input)?;
            let top = top_stations(&traffic, count.unwrap_or(config.top_stations));
            for (rank, station) in top.iter().enumerate() {
                info!(
                    rank = rank + 1,
                    station = %station.station,
                    total_traffic = station.total_traffic,
                    "Station"
                );
            }
            write_records(&output, &top)?;
        }
        Commands::Heatmap {
            input,
            stations,
            day_filter,
            measure,
            output,
        } => {
            let (config, traffic) = load_traffic(&input)?;
            let stations = station_selection(stations, &traffic, &config);
            let measure = measure.unwrap_or(config.measure);
            let heatmap = time_bin_heatmap(&traffic, &stations, day_filter, measure);
            print_pretty(&heatmap);
            write_heatmap(&output, &heatmap)?;
            info!(
                stations = heatmap.rows.len(),
                measure = %measure,
                output = %output.display(),
                "Heatmap written"
            );
        }
        Commands::DayOfWeek {
            input,
            stations,
            measure,
            output,
        } => {
            let (config, traffic) = load_traffic(&input)?;
            let stations = station_selection(stations, &traffic, &config);
            let averages =
                day_of_week_averages(&traffic, &stations, measure.unwrap_or(config.measure));
            write_records(&output, &averages)?;
            info!(rows = averages.len(), output = %output.display(), "Day-of-week averages written");
        }
        Commands::Weekly {
            input,
            skip_weeks,
            measure,
            output,
        } => {
            let (config, traffic) = load_traffic(&input)?;
            let skip_weeks = if skip_weeks.is_empty() {
                config.skip_weeks.clone()
            } else {
                skip_weeks
            };
            let weekly = weekly_totals(&traffic, measure.unwrap_or(config.measure), &skip_weeks);
            write_records(&output, &weekly)?;
            info!(rows = weekly.len(), output = %output.display(), "Weekly totals written");
        }
        Commands::Report { input, output_dir } => {
            let config = resolve_config(&input)?;
            let paths = resolve_inputs(&input, &config)?;
            let readings = load_files(&paths)?;
            let report = build_report(&readings, &config)?;
            print_json(&report.summary)?;
            write_report(&output_dir, &report)?;
        }
        Commands::Correct {
            raw_delta,
            reference_median,
            reset_limit,
        } => {
            if reset_limit == 0 {
                bail!("reset limit must be positive");
            }
            match correct(raw_delta, reference_median, reset_limit) {
                Some(traffic) => info!(raw_delta, reference_median, traffic, "Corrected"),
                None => warn!(raw_delta, reference_median, "Reading is unknown"),
            }
        }
    }

    Ok(())
}

/// Layers config file, environment and flags, in that order.
fn resolve_config(input: &InputArgs) -> Result<PipelineConfig> {
    let config = match &input.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let mut config = config.with_env_overrides(std::env::vars())?;

    if let Some(reset_limit) = input.reset_limit {
        config.reset_limit = reset_limit;
    }
    if !input.months.is_empty() {
        config.months = input.months.clone();
    }
    if input.since.is_some() {
        config.since = input.since;
    }
    if input.until.is_some() {
        config.until = input.until;
    }

    config.validate()?;
    Ok(config)
}

/// Explicit files first, then weekly files discovered in `--input-dir`.
fn resolve_inputs(input: &InputArgs, config: &PipelineConfig) -> Result<Vec<PathBuf>> {
    let mut paths = input.files.clone();
    if let Some(dir) = &input.input_dir {
        paths.extend(discover_weekly_files(dir, &config.selection())?);
    }
    if paths.is_empty() {
        bail!("no input files: pass FILE arguments or --input-dir");
    }
    Ok(paths)
}

#[tracing::instrument(skip_all)]
fn load_traffic(input: &InputArgs) -> Result<(PipelineConfig, Vec<HourlyTraffic>)> {
    let config = resolve_config(input)?;
    let paths = resolve_inputs(input, &config)?;
    let readings = load_files(&paths)?;
    let cleaned = clean(&readings, config.reset_limit);
    Ok((config, cleaned.traffic))
}

fn station_selection(
    stations: Vec<String>,
    traffic: &[HourlyTraffic],
    config: &PipelineConfig,
) -> Vec<String> {
    if !stations.is_empty() {
        return stations;
    }
    top_stations(traffic, config.top_stations)
        .into_iter()
        .map(|s| s.station)
        .collect()
}
