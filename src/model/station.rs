use chrono::{NaiveTime, Weekday};
use serde::Serialize;

use super::Line;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Address {
    pub city: String,
    pub state: String,
    pub street: String,
    pub zip: String,
}

/// Reference data for one station.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub code: String,
    pub name: String,
    pub address: Address,
    pub latitude: f32,
    pub longitude: f32,
    pub line_codes: Vec<Line>,
    /// Station codes reachable as the destination of a first or last train.
    pub destinations: Vec<String>,
    pub schedule: WeekSchedule,
}

/// Opening time and last departure for one weekday. Either may be unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    #[serde(serialize_with = "serialize_weekday")]
    pub day: Weekday,
    pub opening_time: Option<NaiveTime>,
    pub last_train: Option<NaiveTime>,
}

impl DaySchedule {
    pub fn empty(day: Weekday) -> Self {
        Self {
            day,
            opening_time: None,
            last_train: None,
        }
    }

    /// Opening and last departure, if both are known.
    pub fn bounds(&self) -> Option<(NaiveTime, NaiveTime)> {
        Some((self.opening_time?, self.last_train?))
    }
}

fn serialize_weekday<S: serde::Serializer>(day: &Weekday, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(weekday_name(*day))
}

pub(crate) fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Exactly one [`DaySchedule`] per weekday, indexed Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WeekSchedule([DaySchedule; 7]);

impl Default for WeekSchedule {
    fn default() -> Self {
        Self(WeekSchedule::DAYS.map(DaySchedule::empty))
    }
}

impl WeekSchedule {
    pub const DAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub fn day(&self, day: Weekday) -> &DaySchedule {
        &self.0[day.num_days_from_monday() as usize]
    }

    pub fn set(&mut self, entry: DaySchedule) {
        self.0[entry.day.num_days_from_monday() as usize] = entry;
    }

    pub fn iter(&self) -> impl Iterator<Item = &DaySchedule> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0
            .iter()
            .all(|d| d.opening_time.is_none() && d.last_train.is_none())
    }
}
