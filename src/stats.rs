use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::windows::CellVisits;

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RunSummary {
    pub timestamp: DateTime<Utc>,
    pub input: String,
    pub days: u64,
    pub distinct_cells: usize,
    pub total_visits: u64,
}

impl RunSummary {
    pub fn new(input: &str, visits: &CellVisits, days: u64) -> Self {
        RunSummary {
            timestamp: Utc::now(),
            input: input.to_string(),
            days,
            distinct_cells: visits.len(),
            total_visits: visits.values().sum(),
        }
    }

    /// Average number of distinct cells visited per day.
    pub fn cells_per_day(&self) -> f64 {
        if self.days == 0 {
            0.0
        } else {
            self.total_visits as f64 / self.days as f64
        }
    }
}
