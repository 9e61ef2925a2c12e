//! Conversion from upstream JSON payloads into internal entities.
//!
//! Everything here is pure. A malformed envelope fails the whole payload;
//! a malformed record only fails itself and is reported in
//! [`Batch::rejected`] so the caller can decide whether to log or abort.

mod predictions;
mod stations;

pub use predictions::{normalize_predictions, parse_cars, parse_minutes};
pub use stations::{StationTimes, normalize_station_times, normalize_stations, parse_time_of_day};

use crate::error::ParseError;

/// Records that converted, and the errors of those that did not.
#[derive(Debug)]
pub struct Batch<T> {
    pub records: Vec<T>,
    pub rejected: Vec<ParseError>,
}

impl<T> Default for Batch<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

impl<T> Batch<T> {
    fn push(&mut self, result: Result<T, ParseError>) {
        match result {
            Ok(record) => self.records.push(record),
            Err(e) => self.rejected.push(e),
        }
    }
}

/// Treats missing, null and blank upstream strings alike.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
