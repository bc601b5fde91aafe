//! Wiring of the visit-counting pipeline.
//!
//! ```text
//! records -> valid -> accurate -> project -> finite -> day windows
//!         -> tap(push day boundary) -> cell visits -> on_end(close) -> tap(report)
//!
//! day boundaries -> running count -> tap(log)
//! ```
//!
//! Both chains run cooperatively on the calling task; the first error from
//! either one ends the run.
//!
//! The running day count is only logged. Stdout gets the cell lines and a
//! single `Processed N days` line once both chains are done.

use anyhow::Result;
use std::io::Write;
use tracing::info;

use crate::chain::{Chain, Source};
use crate::config::Settings;
use crate::handoff;
use crate::output;
use crate::reader::RecordStream;
use crate::records::{self, LocationSample, RawRecord};
use crate::stats::RunSummary;
use crate::windows::{CellVisitCounter, DayBoundary, DayCounter, DayWindows, WindowAccumulator};

/// Reads the configured input and writes the visit report to `out`.
pub async fn run_file<W>(settings: &Settings, out: &mut W) -> Result<RunSummary>
where
    W: Write + Send + ?Sized,
{
    settings.validate()?;
    let records = RecordStream::open(&settings.input, settings.read_ahead)?;
    run(records, settings, out).await
}

/// Runs both chains over `source`, writing cell lines as soon as the main
/// chain finishes and the day count once both have.
#[tracing::instrument(
    skip_all,
    fields(
        input = %settings.input.display(),
        window_ms = settings.window_ms,
        precision = settings.cell_precision,
    )
)]
pub async fn run<S, W>(source: S, settings: &Settings, out: &mut W) -> Result<RunSummary>
where
    S: Source<Item = RawRecord>,
    W: Write + Send + ?Sized,
{
    let threshold = settings.accuracy_threshold;
    let (day_events, day_receiver) = handoff::channel::<DayBoundary>();
    let closer = day_events.clone();

    let main_chain = Chain::new(source)
        .filter(records::is_valid_record)
        .filter(move |record| records::is_accurate(record, threshold))
        .map(records::parse_location)
        .filter(LocationSample::is_finite)
        .bufferize(DayWindows::new(settings.window_ms, settings.cell_precision))
        .tap(move |_: &WindowAccumulator| day_events.push(DayBoundary))
        .bufferize(CellVisitCounter)
        .on_end(move || closer.end())
        .tap(|visits| output::write_cell_visits(&mut *out, visits));

    let day_chain = Chain::new(day_receiver)
        .bufferize(DayCounter)
        .tap(|days| {
            info!(days = *days, "Processed days so far");
            Ok(())
        });

    let (visits, days) = tokio::try_join!(main_chain.last(), day_chain.last())?;
    let visits = visits.unwrap_or_default();
    let days = days.unwrap_or(0);

    output::write_days(out, days)?;

    let summary = RunSummary::new(&settings.input.display().to_string(), &visits, days);
    info!(
        days = summary.days,
        distinct_cells = summary.distinct_cells,
        total_visits = summary.total_visits,
        cells_per_day = summary.cells_per_day(),
        "Run complete"
    );
    Ok(summary)
}
