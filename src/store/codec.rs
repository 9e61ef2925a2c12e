//! Typed records to and from stored attribute maps.
//!
//! Decoding fails with [`StoreError::Decode`] on any missing or mistyped
//! attribute rather than producing a partially filled record.

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::NaiveTime;
use std::collections::HashMap;

use super::Item;
use super::attr::{get_l, get_n, get_s, get_string_list, list_of_s, n, s};
use crate::error::StoreError;
use crate::model::{Address, DaySchedule, Line, PredictionRecord, Station, WeekSchedule};
use crate::model::weekday_name;

pub const LOCATION_CODE: &str = "locationCode";
pub const CREATED_EPOCH_MS: &str = "createdEpochMs";
pub const LINE_CODE: &str = "lineCode";
pub const DESTINATION: &str = "destination";
pub const STATION_CODE: &str = "code";
pub const ID: &str = "id";

pub fn prediction_to_item(record: &PredictionRecord) -> Item {
    HashMap::from([
        ("carCount".to_string(), n(record.car_count)),
        (DESTINATION.to_string(), s(&record.destination)),
        ("destinationCode".to_string(), s(&record.destination_code)),
        ("destinationName".to_string(), s(&record.destination_name)),
        ("group".to_string(), s(&record.group)),
        (LINE_CODE.to_string(), s(record.line_code.code())),
        (LOCATION_CODE.to_string(), s(&record.location_code)),
        ("locationName".to_string(), s(&record.location_name)),
        ("minutes".to_string(), n(record.minutes)),
        (CREATED_EPOCH_MS.to_string(), n(record.created_epoch_ms)),
        (ID.to_string(), s(&record.id)),
    ])
}

pub fn prediction_from_item(item: &Item) -> Result<PredictionRecord, StoreError> {
    Ok(PredictionRecord {
        car_count: get_n(item, "carCount")?,
        destination: get_s(item, DESTINATION)?,
        destination_code: get_s(item, "destinationCode")?,
        destination_name: get_s(item, "destinationName")?,
        group: get_s(item, "group")?,
        line_code: decode_line(&get_s(item, LINE_CODE)?, LINE_CODE)?,
        location_code: get_s(item, LOCATION_CODE)?,
        location_name: get_s(item, "locationName")?,
        minutes: get_n(item, "minutes")?,
        created_epoch_ms: get_n(item, CREATED_EPOCH_MS)?,
        id: get_s(item, ID)?,
    })
}

pub fn station_to_item(station: &Station) -> Item {
    let schedule = station
        .schedule
        .iter()
        .map(|day| {
            AttributeValue::M(HashMap::from([
                ("day".to_string(), s(weekday_name(day.day))),
                ("openingTime".to_string(), s(format_time(day.opening_time))),
                ("lastTrain".to_string(), s(format_time(day.last_train))),
            ]))
        })
        .collect();

    HashMap::from([
        (STATION_CODE.to_string(), s(&station.code)),
        ("name".to_string(), s(&station.name)),
        ("city".to_string(), s(&station.address.city)),
        ("state".to_string(), s(&station.address.state)),
        ("street".to_string(), s(&station.address.street)),
        ("zip".to_string(), s(&station.address.zip)),
        ("latitude".to_string(), n(station.latitude)),
        ("longitude".to_string(), n(station.longitude)),
        (
            "lineCodes".to_string(),
            list_of_s(station.line_codes.iter().map(Line::code)),
        ),
        (
            "destinations".to_string(),
            list_of_s(station.destinations.iter().cloned()),
        ),
        ("schedule".to_string(), AttributeValue::L(schedule)),
    ])
}

pub fn station_from_item(item: &Item) -> Result<Station, StoreError> {
    let line_codes = get_string_list(item, "lineCodes")?
        .iter()
        .map(|code| decode_line(code, "lineCodes"))
        .collect::<Result<Vec<_>, _>>()?;

    let mut schedule = WeekSchedule::default();
    if item.contains_key("schedule") {
        for entry in get_l(item, "schedule")? {
            schedule.set(decode_day(entry)?);
        }
    }

    Ok(Station {
        code: get_s(item, STATION_CODE)?,
        name: get_s(item, "name")?,
        address: Address {
            city: get_s(item, "city")?,
            state: get_s(item, "state")?,
            street: get_s(item, "street")?,
            zip: get_s(item, "zip")?,
        },
        latitude: get_n(item, "latitude")?,
        longitude: get_n(item, "longitude")?,
        line_codes,
        destinations: get_string_list(item, "destinations")?,
        schedule,
    })
}

fn decode_line(code: &str, attribute: &str) -> Result<Line, StoreError> {
    code.parse()
        .map_err(|e: crate::error::ParseError| StoreError::decode(attribute, e.to_string()))
}

fn decode_day(entry: &AttributeValue) -> Result<DaySchedule, StoreError> {
    let map = entry
        .as_m()
        .map_err(|_| StoreError::decode("schedule", "expected a map per day"))?;

    let name = get_s(map, "day")?;
    let day = WeekSchedule::DAYS
        .into_iter()
        .find(|d| weekday_name(*d) == name)
        .ok_or_else(|| StoreError::decode("day", format!("unknown weekday '{name}'")))?;

    Ok(DaySchedule {
        day,
        opening_time: decode_time(&get_s(map, "openingTime")?, "openingTime")?,
        last_train: decode_time(&get_s(map, "lastTrain")?, "lastTrain")?,
    })
}

fn format_time(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_default()
}

fn decode_time(raw: &str, attribute: &str) -> Result<Option<NaiveTime>, StoreError> {
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map(Some)
        .map_err(|e| StoreError::decode(attribute, format!("'{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn record() -> PredictionRecord {
        PredictionRecord {
            car_count: 8,
            destination: "Shady Grove".into(),
            destination_code: "A15".into(),
            destination_name: "Shady Grove".into(),
            group: "2".into(),
            line_code: Line::Red,
            location_code: "A01".into(),
            location_name: "Metro Center".into(),
            minutes: -1,
            created_epoch_ms: 1_709_553_600_000,
            id: "2f1c".into(),
        }
    }

    #[test]
    fn test_prediction_keys_are_typed() {
        let item = prediction_to_item(&record());
        assert_eq!(item[LOCATION_CODE], AttributeValue::S("A01".into()));
        assert_eq!(
            item[CREATED_EPOCH_MS],
            AttributeValue::N("1709553600000".into())
        );
        assert_eq!(item[LINE_CODE], AttributeValue::S("RD".into()));
        assert_eq!(prediction_from_item(&item).unwrap(), record());
    }

    #[test]
    fn test_prediction_with_mistyped_attribute_fails_decode() {
        let mut item = prediction_to_item(&record());
        item.insert("minutes".into(), AttributeValue::S("BRD".into()));
        match prediction_from_item(&item) {
            Err(StoreError::Decode { attribute, .. }) => assert_eq!(attribute, "minutes"),
            other => panic!("expected decode error, got {other:?}"),
        }

        let mut item = prediction_to_item(&record());
        item.insert(LINE_CODE.into(), AttributeValue::S("No".into()));
        assert!(prediction_from_item(&item).is_err());
    }

    #[test]
    fn test_station_schedule_survives_storage() {
        let mut schedule = WeekSchedule::default();
        schedule.set(DaySchedule {
            day: Weekday::Sat,
            opening_time: NaiveTime::from_hms_opt(7, 0, 0),
            last_train: NaiveTime::from_hms_opt(1, 5, 0),
        });
        schedule.set(DaySchedule {
            day: Weekday::Sun,
            opening_time: NaiveTime::from_hms_opt(7, 0, 0),
            last_train: None,
        });
        let station = Station {
            code: "A01".into(),
            name: "Metro Center".into(),
            address: Address {
                city: "Washington".into(),
                state: "DC".into(),
                street: "607 13th St. NW".into(),
                zip: "20005".into(),
            },
            latitude: 38.898_3,
            longitude: -77.028_1,
            line_codes: vec![Line::Red],
            destinations: vec!["A15".into(), "B11".into()],
            schedule,
        };

        let item = station_to_item(&station);
        assert_eq!(station_from_item(&item).unwrap(), station);
    }

    #[test]
    fn test_station_without_schedule_reads_empty_week() {
        let mut item = station_to_item(&Station {
            code: "C01".into(),
            name: "Metro Center".into(),
            address: Address::default(),
            latitude: 0.0,
            longitude: 0.0,
            line_codes: vec![Line::Blue, Line::Orange],
            destinations: vec![],
            schedule: WeekSchedule::default(),
        });
        item.remove("schedule");
        item.remove("destinations");
        let station = station_from_item(&item).unwrap();
        assert!(station.schedule.is_empty());
        assert!(station.destinations.is_empty());
    }
}
