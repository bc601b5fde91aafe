//! CLI entry point for the location visit counter.
//!
//! Streams a location history export, counts on how many distinct days each
//! plus-code cell was visited, and prints the cells by visit count followed
//! by the number of days processed.

use anyhow::Result;
use clap::Parser;
use location_visits::config::{
    DEFAULT_ACCURACY_THRESHOLD, DEFAULT_CELL_PRECISION, DEFAULT_INPUT, Settings,
};
use location_visits::output::{append_record, print_json};
use location_visits::pipeline::run_file;
use location_visits::reader::DEFAULT_READ_AHEAD;
use location_visits::windows::WINDOW_DURATION_MS;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "location_visits")]
#[command(about = "Count per-cell daily visits in a location history export", long_about = None)]
struct Cli {
    /// Location history JSON with a top-level `locations` array
    #[arg(value_name = "FILE", default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Drop records whose accuracy is at or above this value
    #[arg(short, long, default_value_t = DEFAULT_ACCURACY_THRESHOLD)]
    accuracy: f64,

    /// Plus code length used as the cell size (even, 2 to 10)
    #[arg(short, long, default_value_t = DEFAULT_CELL_PRECISION)]
    precision: usize,

    /// Window duration in milliseconds
    #[arg(short, long, default_value_t = WINDOW_DURATION_MS)]
    window_ms: i64,

    /// Number of records parsed ahead of the pipeline
    #[arg(short, long, default_value_t = DEFAULT_READ_AHEAD)]
    read_ahead: usize,

    /// Optional: CSV file to append a run summary row to
    #[arg(short, long)]
    summary: Option<PathBuf>,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            input: self.input.clone(),
            window_ms: self.window_ms,
            accuracy_threshold: self.accuracy,
            cell_precision: self.precision,
            read_ahead: self.read_ahead,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/location_visits.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("location_visits.log"));

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
    let settings = cli.settings();

    let mut stdout = std::io::stdout();
    let summary = run_file(&settings, &mut stdout).await?;

    print_json(&summary)?;
    if let Some(path) = &cli.summary {
        append_record(path, &summary)?;
        info!(path = %path.display(), "Run summary appended");
    }

    Ok(())
}
