//! Daily operating window derived from station schedules.

mod aggregator;
mod window;

pub use aggregator::{Gate, ScheduleAggregator};
pub use window::{OperatingWindow, compute_operating_window, current_window, resolve_day};
