//! Day windows and the reductions built on them.
//!
//! Three [`Buffer`] implementations drive the pipeline:
//!
//! - [`DayWindows`] groups consecutive samples into fixed-duration windows and
//!   flushes a [`WindowAccumulator`] each time the window key changes.
//! - [`CellVisitCounter`] merges every flushed window into a global
//!   cell -> visit count map, one visit per window per cell.
//! - [`DayCounter`] turns [`DayBoundary`] events into a running total.

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::chain::Buffer;
use crate::plus_code;
use crate::records::LocationSample;

/// Length of one window: a day.
pub const WINDOW_DURATION_MS: i64 = 86_400_000;

/// Global visit counts keyed by cell code.
pub type CellVisits = HashMap<String, u64>;

/// Signal that one window was flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBoundary;

/// Index of the window containing `epoch_millis`.
pub fn window_key(epoch_millis: f64, window_ms: i64) -> i64 {
    (epoch_millis / window_ms as f64).floor() as i64
}

/// Cell code of a sample, failing if the coordinates cannot be encoded.
pub fn cell_code(sample: &LocationSample, precision: usize) -> Result<String> {
    plus_code::encode(sample.lat_degrees(), sample.lng_degrees(), precision).with_context(|| {
        format!(
            "cannot encode cell for lat={} lng={} at precision {}",
            sample.lat, sample.lng, precision
        )
    })
}

/// State of the window currently being accumulated.
///
/// A window key of `0` means "no window seen yet". Samples that genuinely
/// fall into the first day of the epoch are indistinguishable from that
/// state, so a window 0 -> 1 transition never flushes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowAccumulator {
    pub prev_window_key: i64,
    pub window_key: i64,
    pub count: u64,
    pub visited_cells: HashSet<String>,
    /// Cell of the sample that opened the next window; it seeds the
    /// accumulator that follows a flush.
    carry: Option<String>,
}

impl WindowAccumulator {
    pub fn closes_window(&self) -> bool {
        self.prev_window_key != 0 && self.prev_window_key != self.window_key
    }

    /// Key of the window whose samples this accumulator holds.
    pub fn key(&self) -> i64 {
        if self.carry.is_some() {
            self.prev_window_key
        } else {
            self.window_key
        }
    }
}

/// Groups samples into windows of `window_ms`, collecting visited cells.
pub struct DayWindows {
    window_ms: i64,
    precision: usize,
}

impl DayWindows {
    pub fn new(window_ms: i64, precision: usize) -> Self {
        Self {
            window_ms,
            precision,
        }
    }
}

impl Buffer<LocationSample> for DayWindows {
    type Acc = WindowAccumulator;

    fn initial(&self) -> WindowAccumulator {
        WindowAccumulator::default()
    }

    fn reduce(
        &mut self,
        mut acc: WindowAccumulator,
        sample: LocationSample,
    ) -> Result<WindowAccumulator> {
        let cell = cell_code(&sample, self.precision)?;

        acc.prev_window_key = acc.window_key;
        acc.window_key = window_key(sample.epoch_millis, self.window_ms);

        if acc.closes_window() {
            debug!(
                window_key = acc.prev_window_key,
                samples = acc.count,
                cells = acc.visited_cells.len(),
                "Window closed"
            );
            acc.carry = Some(cell);
        } else {
            acc.count += 1;
            acc.visited_cells.insert(cell);
        }
        Ok(acc)
    }

    fn should_flush(&self, acc: &WindowAccumulator) -> bool {
        acc.closes_window()
    }

    fn next_initial(&self, acc: &WindowAccumulator) -> WindowAccumulator {
        match &acc.carry {
            Some(cell) => WindowAccumulator {
                prev_window_key: acc.window_key,
                window_key: acc.window_key,
                count: 1,
                visited_cells: HashSet::from([cell.clone()]),
                carry: None,
            },
            None => self.initial(),
        }
    }

    fn carries_input(&self, acc: &WindowAccumulator) -> bool {
        acc.count > 0
    }
}

/// Credits every cell of a flushed window with one visit.
#[derive(Debug, Default)]
pub struct CellVisitCounter;

impl Buffer<WindowAccumulator> for CellVisitCounter {
    type Acc = CellVisits;

    fn initial(&self) -> CellVisits {
        CellVisits::new()
    }

    fn reduce(&mut self, mut acc: CellVisits, window: WindowAccumulator) -> Result<CellVisits> {
        for cell in window.visited_cells {
            *acc.entry(cell).or_insert(0) += 1;
        }
        Ok(acc)
    }
}

/// Counts day boundaries, emitting the running total after each one.
#[derive(Debug, Default)]
pub struct DayCounter;

impl Buffer<DayBoundary> for DayCounter {
    type Acc = u64;

    fn initial(&self) -> u64 {
        0
    }

    fn reduce(&mut self, acc: u64, _event: DayBoundary) -> Result<u64> {
        Ok(acc + 1)
    }

    fn should_flush(&self, _acc: &u64) -> bool {
        true
    }

    fn next_initial(&self, acc: &u64) -> u64 {
        *acc
    }
}
