//! Output formatting for query results.
//!
//! JSON on stdout, or a one-line board entry per train.

use anyhow::Result;
use serde::Serialize;
use std::io::Write;

use crate::model::{MINUTES_ARRIVING, MINUTES_UNKNOWN, PredictionRecord};

/// Writes `value` as pretty-printed JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize + ?Sized>(mut writer: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    Ok(())
}

/// Prints `value` as pretty-printed JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    write_json(std::io::stdout().lock(), value)
}

/// One-line board entry, e.g. `RD  Glenmont  8 cars  3 min`.
pub fn board_line(record: &PredictionRecord) -> String {
    let minutes = match record.minutes {
        MINUTES_ARRIVING => "ARR".to_string(),
        MINUTES_UNKNOWN => "--".to_string(),
        m => format!("{m} min"),
    };
    format!(
        "{}  {}  {} cars  {}",
        record.line_code, record.destination, record.car_count, minutes
    )
}
