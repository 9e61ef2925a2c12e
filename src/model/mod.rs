//! Internal entities shared by the normalizer, repositories and poller.

mod line;
mod prediction;
mod station;

pub use line::Line;
pub use prediction::{CARS_UNKNOWN, MINUTES_ARRIVING, MINUTES_UNKNOWN, PredictionRecord};
pub use station::{Address, DaySchedule, Station, WeekSchedule};
pub(crate) use station::weekday_name;
