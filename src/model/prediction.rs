use serde::Serialize;

use super::Line;

/// Minutes value for a train that is boarding (`BRD`) or arriving (`ARR`).
pub const MINUTES_ARRIVING: i8 = 0;
/// Minutes value for any other non-numeric or out-of-range upstream value.
pub const MINUTES_UNKNOWN: i8 = -1;
/// Car count for a non-numeric upstream value such as `-`.
pub const CARS_UNKNOWN: i8 = 0;

/// One upstream train prediction captured during one poll cycle.
///
/// Partitioned by `location_code`, ordered by `created_epoch_ms`. Records
/// are append-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub car_count: i8,
    pub destination: String,
    pub destination_code: String,
    pub destination_name: String,
    pub group: String,
    pub line_code: Line,
    pub location_code: String,
    pub location_name: String,
    pub minutes: i8,
    pub created_epoch_ms: i64,
    pub id: String,
}
