use chrono::{NaiveTime, TimeDelta, Weekday};
use serde::Deserialize;
use std::collections::HashMap;

use super::{Batch, non_empty};
use crate::error::ParseError;
use crate::model::{Address, DaySchedule, Line, Station, WeekSchedule};

#[derive(Debug, Deserialize)]
struct StationList {
    #[serde(rename = "Stations")]
    stations: Vec<StationData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AddressData {
    city: Option<String>,
    state: Option<String>,
    street: Option<String>,
    zip: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StationData {
    code: Option<String>,
    name: Option<String>,
    #[serde(default)]
    address: Option<AddressData>,
    #[serde(rename = "Lat", default)]
    latitude: f32,
    #[serde(rename = "Lon", default)]
    longitude: f32,
    line_code1: Option<String>,
    line_code2: Option<String>,
    line_code3: Option<String>,
    line_code4: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StationTimeList {
    #[serde(rename = "StationTimes")]
    station_times: Vec<StationTimesData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StationTimesData {
    monday: Option<DayData>,
    tuesday: Option<DayData>,
    wednesday: Option<DayData>,
    thursday: Option<DayData>,
    friday: Option<DayData>,
    saturday: Option<DayData>,
    sunday: Option<DayData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DayData {
    opening_time: Option<String>,
    #[serde(default)]
    first_trains: Vec<TrainTime>,
    #[serde(default)]
    last_trains: Vec<TrainTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TrainTime {
    #[serde(alias = "LeavingTime")]
    time: Option<String>,
    destination_station: Option<String>,
}

/// A station's weekly schedule and the destinations its trains run to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationTimes {
    pub schedule: WeekSchedule,
    pub destinations: Vec<String>,
}

/// Parses an upstream `HH:MM` time of day.
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, ParseError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| ParseError::InvalidTime(raw.to_string()))
}

/// Normalizes one station's times payload into seven day entries.
pub fn normalize_station_times(payload: &[u8]) -> Result<StationTimes, ParseError> {
    let list: StationTimeList = serde_json::from_slice(payload)?;
    let [entry] = <[StationTimesData; 1]>::try_from(list.station_times)
        .map_err(|entries| ParseError::ScheduleEntries(entries.len()))?;

    let days = [
        (Weekday::Mon, entry.monday),
        (Weekday::Tue, entry.tuesday),
        (Weekday::Wed, entry.wednesday),
        (Weekday::Thu, entry.thursday),
        (Weekday::Fri, entry.friday),
        (Weekday::Sat, entry.saturday),
        (Weekday::Sun, entry.sunday),
    ];

    let mut times = StationTimes::default();
    for (day, data) in days {
        let data = data.unwrap_or_default();
        for train in data.first_trains.iter().chain(&data.last_trains) {
            if let Some(code) = non_empty(train.destination_station.clone()) {
                if !times.destinations.contains(&code) {
                    times.destinations.push(code);
                }
            }
        }
        times.schedule.set(data.into_day_schedule(day)?);
    }
    Ok(times)
}

impl DayData {
    fn into_day_schedule(self, day: Weekday) -> Result<DaySchedule, ParseError> {
        let opening_time = non_empty(self.opening_time)
            .map(|t| parse_time_of_day(&t))
            .transpose()?;

        let mut last_train: Option<NaiveTime> = None;
        for train in self.last_trains {
            let Some(raw) = non_empty(train.time) else {
                continue;
            };
            let time = parse_time_of_day(&raw)?;
            let later = match (last_train, opening_time) {
                (None, _) => true,
                (Some(current), Some(open)) => {
                    service_offset(open, time) > service_offset(open, current)
                }
                (Some(current), None) => time > current,
            };
            if later {
                last_train = Some(time);
            }
        }

        Ok(DaySchedule {
            day,
            opening_time,
            last_train,
        })
    }
}

/// Time elapsed since `open`, treating times not after `open` as next-day.
fn service_offset(open: NaiveTime, time: NaiveTime) -> TimeDelta {
    let delta = time - open;
    if delta <= TimeDelta::zero() {
        delta + TimeDelta::days(1)
    } else {
        delta
    }
}

/// Normalizes the station list, attaching schedules from `schedules` by
/// station code. Stations without an entry get an empty schedule.
pub fn normalize_stations(
    payload: &[u8],
    schedules: &HashMap<String, StationTimes>,
) -> Result<Batch<Station>, ParseError> {
    let list: StationList = serde_json::from_slice(payload)?;

    let mut batch = Batch::default();
    for data in list.stations {
        batch.push(data.into_station(schedules));
    }
    Ok(batch)
}

impl StationData {
    fn into_station(
        self,
        schedules: &HashMap<String, StationTimes>,
    ) -> Result<Station, ParseError> {
        let code = non_empty(self.code).ok_or(ParseError::MissingField("Code"))?;

        let mut line_codes = Vec::with_capacity(4);
        for raw in [self.line_code1, self.line_code2, self.line_code3, self.line_code4]
            .into_iter()
            .filter_map(non_empty)
        {
            let line = raw.parse::<Line>()?;
            if !line_codes.contains(&line) {
                line_codes.push(line);
            }
        }
        if line_codes.is_empty() {
            return Err(ParseError::MissingField("LineCode1"));
        }

        let address = self.address.unwrap_or_default();
        let times = schedules.get(&code).cloned().unwrap_or_default();

        Ok(Station {
            name: self.name.unwrap_or_default(),
            address: Address {
                city: address.city.unwrap_or_default(),
                state: address.state.unwrap_or_default(),
                street: address.street.unwrap_or_default(),
                zip: address.zip.unwrap_or_default(),
            },
            latitude: self.latitude,
            longitude: self.longitude,
            line_codes,
            destinations: times.destinations,
            schedule: times.schedule,
            code,
        })
    }
}
