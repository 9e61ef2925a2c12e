//! Error taxonomy for ingestion, storage and queries.

use chrono::Weekday;
use thiserror::Error;

/// The upstream transit API could not be reached or answered with a failure.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upstream returned status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("invalid url '{0}'")]
    InvalidUrl(String),
}

/// A payload, or a single record inside it, does not match the upstream schema.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed payload: {0}")]
    Envelope(#[from] serde_json::Error),
    #[error("record is missing required field '{0}'")]
    MissingField(&'static str),
    #[error("unknown line code '{0}'")]
    UnknownLine(String),
    #[error("invalid time of day '{0}'")]
    InvalidTime(String),
    #[error("expected exactly one station times entry, got {0}")]
    ScheduleEntries(usize),
}

/// Failure at the storage boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("failed to decode attribute '{attribute}': {reason}")]
    Decode { attribute: String, reason: String },
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    #[error("a different item with the same key already exists in '{0}'")]
    Conflict(String),
}

impl StoreError {
    pub fn decode(attribute: &str, reason: impl Into<String>) -> Self {
        StoreError::Decode {
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }
}

/// A prediction query could not be built or executed.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("location code is required")]
    MissingLocation,
    #[error("unknown line code '{0}'")]
    UnknownLine(String),
    #[error(transparent)]
    Backend(#[from] StoreError),
}

/// The operating window could not be derived from the station schedules.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("no stations to derive an operating window from")]
    NoStations,
    #[error("station {station} has no complete schedule for {day}")]
    MissingDay { station: String, day: Weekday },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_status() {
        let err = FetchError::Status {
            status: 503,
            url: "https://api.example/trains".into(),
        };
        assert_eq!(
            err.to_string(),
            "upstream returned status 503 for https://api.example/trains"
        );
    }

    #[test]
    fn error_display_missing_day() {
        let err = ScheduleError::MissingDay {
            station: "A01".into(),
            day: Weekday::Mon,
        };
        assert_eq!(err.to_string(), "station A01 has no complete schedule for Mon");
    }

    #[test]
    fn query_error_wraps_store_error() {
        let err: QueryError = StoreError::Backend("throttled".into()).into();
        assert!(matches!(err, QueryError::Backend(StoreError::Backend(_))));
        assert_eq!(err.to_string(), "storage backend error: throttled");
    }

    #[test]
    fn parse_error_from_json_error() {
        let result: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: ParseError = result.unwrap_err().into();
        assert!(matches!(err, ParseError::Envelope(_)));
    }
}
