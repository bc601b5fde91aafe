//! Report formatting and run-summary persistence.
//!
//! Report lines go to the writer handed in by the caller (stdout in the
//! binary); summaries are logged or appended to a CSV history file.

use anyhow::Result;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::stats::RunSummary;
use crate::windows::CellVisits;

/// Cells ordered by ascending visit count, ties broken by cell code.
pub fn sorted_visits(visits: &CellVisits) -> Vec<(&str, u64)> {
    let mut sorted: Vec<_> = visits.iter().map(|(cell, n)| (cell.as_str(), *n)).collect();
    sorted.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    sorted
}

/// Writes one `<cell>: <count>` line per visited cell.
pub fn write_cell_visits<W: Write + ?Sized>(out: &mut W, visits: &CellVisits) -> Result<()> {
    for (cell, count) in sorted_visits(visits) {
        writeln!(out, "{cell}: {count}")?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_days<W: Write + ?Sized>(out: &mut W, days: u64) -> Result<()> {
    writeln!(out, "Processed {days} days")?;
    out.flush()?;
    Ok(())
}

/// Logs a run summary as pretty-printed JSON.
pub fn print_json(summary: &RunSummary) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

/// Appends a [`RunSummary`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &Path, summary: &RunSummary) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending run summary");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    writer.serialize(summary)?;
    writer.flush()?;

    Ok(())
}
