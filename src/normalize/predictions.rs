use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::{Batch, non_empty};
use crate::error::ParseError;
use crate::model::{CARS_UNKNOWN, Line, MINUTES_ARRIVING, MINUTES_UNKNOWN, PredictionRecord};

#[derive(Debug, Deserialize)]
struct TrainList {
    #[serde(rename = "Trains")]
    trains: Vec<Train>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Train {
    car: Option<String>,
    destination: Option<String>,
    destination_code: Option<String>,
    destination_name: Option<String>,
    group: Option<String>,
    line: Option<String>,
    location_code: Option<String>,
    location_name: Option<String>,
    min: Option<String>,
}

/// Parses a minutes-until-arrival value.
///
/// `ARR` and `BRD` become [`MINUTES_ARRIVING`]; anything else that is not a
/// number in `i8` range becomes [`MINUTES_UNKNOWN`].
pub fn parse_minutes(raw: &str) -> i8 {
    match raw.trim() {
        "ARR" | "BRD" => MINUTES_ARRIVING,
        other => other.parse().unwrap_or(MINUTES_UNKNOWN),
    }
}

/// Parses a car count, mapping non-numeric values to [`CARS_UNKNOWN`].
pub fn parse_cars(raw: &str) -> i8 {
    raw.trim().parse().unwrap_or(CARS_UNKNOWN)
}

/// Normalizes a live prediction payload captured at `now`.
///
/// Accepted records get consecutive creation timestamps starting at `now`
/// in payload order, so no two records of one batch share a sort key.
pub fn normalize_predictions(
    payload: &[u8],
    now: DateTime<Utc>,
) -> Result<Batch<PredictionRecord>, ParseError> {
    let list: TrainList = serde_json::from_slice(payload)?;
    let base_ms = now.timestamp_millis();

    let mut batch = Batch::default();
    for train in list.trains {
        let created_epoch_ms = base_ms + batch.records.len() as i64;
        batch.push(train.into_record(created_epoch_ms));
    }
    Ok(batch)
}

impl Train {
    fn into_record(self, created_epoch_ms: i64) -> Result<PredictionRecord, ParseError> {
        let location_code =
            non_empty(self.location_code).ok_or(ParseError::MissingField("LocationCode"))?;
        let line_code = non_empty(self.line)
            .ok_or(ParseError::MissingField("Line"))?
            .parse::<Line>()?;

        Ok(PredictionRecord {
            car_count: self.car.as_deref().map_or(CARS_UNKNOWN, parse_cars),
            destination: self.destination.unwrap_or_default(),
            destination_code: self.destination_code.unwrap_or_default(),
            destination_name: self.destination_name.unwrap_or_default(),
            group: self.group.unwrap_or_default(),
            line_code,
            location_code,
            location_name: self.location_name.unwrap_or_default(),
            minutes: self.min.as_deref().map_or(MINUTES_UNKNOWN, parse_minutes),
            created_epoch_ms,
            id: Uuid::new_v4().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_minutes_sentinels() {
        assert_eq!(parse_minutes("7"), 7);
        assert_eq!(parse_minutes(" 12 "), 12);
        assert_eq!(parse_minutes("ARR"), MINUTES_ARRIVING);
        assert_eq!(parse_minutes("BRD"), MINUTES_ARRIVING);
        assert_eq!(parse_minutes("---"), MINUTES_UNKNOWN);
        assert_eq!(parse_minutes(""), MINUTES_UNKNOWN);
        assert_eq!(parse_minutes("999"), MINUTES_UNKNOWN);
    }

    #[test]
    fn test_car_count_sentinel() {
        assert_eq!(parse_cars("8"), 8);
        assert_eq!(parse_cars("-"), CARS_UNKNOWN);
        assert_eq!(parse_cars(""), CARS_UNKNOWN);
    }

    #[test]
    fn test_sentinels_do_not_abort_batch() {
        let payload = br#"{"Trains": [
            {"Car": "-", "Destination": "Glenmont", "DestinationCode": "B11",
             "DestinationName": "Glenmont", "Group": "1", "Line": "RD",
             "LocationCode": "A01", "LocationName": "Metro Center", "Min": "BRD"},
            {"Car": "6", "Destination": "Shady Grove", "DestinationCode": "A15",
             "DestinationName": "Shady Grove", "Group": "2", "Line": "RD",
             "LocationCode": "A01", "LocationName": "Metro Center", "Min": "---"}
        ]}"#;
        let batch = normalize_predictions(payload, now()).unwrap();
        assert!(batch.rejected.is_empty());
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0].car_count, CARS_UNKNOWN);
        assert_eq!(batch.records[0].minutes, MINUTES_ARRIVING);
        assert_eq!(batch.records[1].car_count, 6);
        assert_eq!(batch.records[1].minutes, MINUTES_UNKNOWN);
    }

    #[test]
    fn test_bad_records_are_rejected_individually() {
        let payload = br#"{"Trains": [
            {"Car": null, "Destination": "No Passenger", "DestinationCode": null,
             "DestinationName": "No Passenger", "Group": "1", "Line": "No",
             "LocationCode": "E01", "LocationName": "Mt Vernon Sq", "Min": ""},
            {"Car": "8", "Destination": "Largo", "Group": "1", "Line": "SV",
             "LocationCode": null, "Min": "3"},
            {"Car": "8", "Destination": "Largo", "DestinationCode": "G05",
             "DestinationName": "Downtown Largo", "Group": "1", "Line": "SV",
             "LocationCode": "C05", "LocationName": "Rosslyn", "Min": "3"}
        ]}"#;
        let batch = normalize_predictions(payload, now()).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.rejected.len(), 2);
        assert!(matches!(batch.rejected[0], ParseError::UnknownLine(_)));
        assert!(matches!(
            batch.rejected[1],
            ParseError::MissingField("LocationCode")
        ));

        let record = &batch.records[0];
        assert_eq!(record.line_code, Line::Silver);
        assert_eq!(record.location_code, "C05");
        assert_eq!(record.destination_name, "Downtown Largo");
        assert_eq!(record.minutes, 3);
        assert_eq!(record.created_epoch_ms, now().timestamp_millis());
    }

    #[test]
    fn test_timestamps_follow_payload_order() {
        let payload = br#"{"Trains": [
            {"Line": "BL", "LocationCode": "C05", "Min": "1"},
            {"Line": "OR", "LocationCode": "C05", "Min": "4"},
            {"Line": "SV", "LocationCode": "C05", "Min": "9"}
        ]}"#;
        let batch = normalize_predictions(payload, now()).unwrap();
        let stamps: Vec<_> = batch.records.iter().map(|r| r.created_epoch_ms).collect();
        let base = now().timestamp_millis();
        assert_eq!(stamps, vec![base, base + 1, base + 2]);
        assert_ne!(batch.records[0].id, batch.records[1].id);
    }

    #[test]
    fn test_malformed_envelope_fails_batch() {
        assert!(matches!(
            normalize_predictions(b"{\"Stations\": []}", now()),
            Err(ParseError::Envelope(_))
        ));
        assert!(normalize_predictions(b"<html>", now()).is_err());
    }

    #[test]
    fn test_empty_train_list() {
        let batch = normalize_predictions(br#"{"Trains": []}"#, now()).unwrap();
        assert!(batch.records.is_empty());
        assert!(batch.rejected.is_empty());
    }
}
