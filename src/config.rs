use anyhow::{Result, bail};
use std::path::PathBuf;

use crate::plus_code;
use crate::reader::DEFAULT_READ_AHEAD;
use crate::windows::WINDOW_DURATION_MS;

pub const DEFAULT_INPUT: &str = "./data/Records.json";
pub const DEFAULT_ACCURACY_THRESHOLD: f64 = 50.0;
pub const DEFAULT_CELL_PRECISION: usize = 8;

/// Knobs of a pipeline run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Location export to read.
    pub input: PathBuf,
    pub window_ms: i64,
    /// Records with `accuracy` at or above this are dropped.
    pub accuracy_threshold: f64,
    /// Plus code length used as the cell size.
    pub cell_precision: usize,
    /// Records parsed ahead of the pipeline.
    pub read_ahead: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            window_ms: WINDOW_DURATION_MS,
            accuracy_threshold: DEFAULT_ACCURACY_THRESHOLD,
            cell_precision: DEFAULT_CELL_PRECISION,
            read_ahead: DEFAULT_READ_AHEAD,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.window_ms <= 0 {
            bail!("window duration must be positive, got {} ms", self.window_ms);
        }
        if self.read_ahead == 0 {
            bail!("read-ahead must be at least one record");
        }
        if !plus_code::is_supported_length(self.cell_precision) {
            bail!(
                "cell precision must be an even number between 2 and 10, got {}",
                self.cell_precision
            );
        }
        Ok(())
    }
}
