use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{QueryError, StoreError};
use crate::model::{Line, PredictionRecord};
use crate::store::attr::{n, s};
use crate::store::codec::{
    CREATED_EPOCH_MS, DESTINATION, ID, LINE_CODE, LOCATION_CODE, prediction_from_item,
    prediction_to_item,
};
use crate::store::{Condition, KeyQuery, Store};

/// How far back a query looks from its reference instant.
pub const RECENCY_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Line, location and direction predicate for a prediction query.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionQuery {
    pub location_code: String,
    pub line: Option<Line>,
    /// Matched against the record's `destination`.
    pub direction: Option<String>,
}

impl PredictionQuery {
    /// Validates raw inputs. Blank optional predicates are treated as absent.
    pub fn new(
        location_code: &str,
        line: Option<&str>,
        direction: Option<&str>,
    ) -> Result<Self, QueryError> {
        let location_code = location_code.trim();
        if location_code.is_empty() {
            return Err(QueryError::MissingLocation);
        }
        let line = line
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| l.parse::<Line>().map_err(|_| QueryError::UnknownLine(l.to_string())))
            .transpose()?;
        let direction = direction
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(Self {
            location_code: location_code.to_string(),
            line,
            direction,
        })
    }

    /// Partition `location_code`, sort key within `(now - RECENCY_WINDOW, now]`,
    /// and an equality filter per present predicate.
    pub fn to_key_query(&self, now: DateTime<Utc>) -> KeyQuery {
        let to = now.timestamp_millis();
        // A record exactly one window old is already out.
        let from = to - RECENCY_WINDOW.as_millis() as i64 + 1;

        let mut query = KeyQuery::partition(LOCATION_CODE, s(&self.location_code))
            .sort_between(CREATED_EPOCH_MS, n(from), n(to));
        if let Some(line) = self.line {
            query = query.filter_eq(LINE_CODE, s(line.code()));
        }
        if let Some(direction) = &self.direction {
            query = query.filter_eq(DESTINATION, s(direction));
        }
        query
    }
}

/// Append-only store of [`PredictionRecord`]s keyed by
/// (location code, creation time).
#[derive(Clone)]
pub struct PredictionRepository {
    store: Arc<dyn Store>,
    table: String,
}

impl PredictionRepository {
    pub fn new(store: Arc<dyn Store>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    /// Appends `record`. Writing the same record again is a no-op; a
    /// different record under the same (location, creation time) key is
    /// refused with [`StoreError::Conflict`] instead of overwriting it.
    pub async fn persist(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        let identity = Condition {
            attribute: ID.to_string(),
            value: s(&record.id),
        };
        self.store
            .put_new(&self.table, LOCATION_CODE, &identity, prediction_to_item(record))
            .await
    }

    /// Records matching `query` created within the recency window ending at
    /// `now`, oldest first. An empty result is not an error.
    #[tracing::instrument(skip(self, now), fields(location = %query.location_code))]
    pub async fn query_predictions(
        &self,
        query: &PredictionQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<PredictionRecord>, QueryError> {
        let key_query = query.to_key_query(now);
        debug!(?key_query, "Querying predictions");

        let items = self.store.query(&self.table, &key_query).await?;
        let records = items
            .iter()
            .map(prediction_from_item)
            .collect::<Result<Vec<_>, _>>()?;

        info!(result_len = records.len(), "Predictions found");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration as TimeDelta, TimeZone};

    #[test]
    fn test_query_validation() {
        assert!(matches!(
            PredictionQuery::new("  ", Some("RD"), None),
            Err(QueryError::MissingLocation)
        ));
        assert!(matches!(
            PredictionQuery::new("A01", Some("PK"), None),
            Err(QueryError::UnknownLine(_))
        ));

        let query = PredictionQuery::new(" A01 ", Some(""), Some(" Shady Grove ")).unwrap();
        assert_eq!(query.location_code, "A01");
        assert_eq!(query.line, None);
        assert_eq!(query.direction.as_deref(), Some("Shady Grove"));
    }

    #[test]
    fn test_key_query_bounds() {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();
        let query = PredictionQuery::new("A01", Some("RD"), Some("Glenmont")).unwrap();
        let key_query = query.to_key_query(now);

        let range = key_query.sort_range.as_ref().unwrap();
        assert_eq!(range.attribute, CREATED_EPOCH_MS);
        assert_eq!(range.to, n(now.timestamp_millis()));
        assert_eq!(range.from, n(now.timestamp_millis() - 600_000 + 1));
        assert_eq!(key_query.filters.len(), 2);
        assert_eq!(key_query.filters[0].value, s("RD"));
        assert_eq!(key_query.filters[1].attribute, DESTINATION);
    }

    fn record(created: DateTime<Utc>) -> PredictionRecord {
        PredictionRecord {
            car_count: 6,
            destination: "Glenmont".into(),
            destination_code: "B11".into(),
            destination_name: "Glenmont".into(),
            group: "1".into(),
            line_code: Line::Red,
            location_code: "A01".into(),
            location_name: "Metro Center".into(),
            minutes: 2,
            created_epoch_ms: created.timestamp_millis(),
            id: created.timestamp_millis().to_string(),
        }
    }

    #[tokio::test]
    async fn test_record_exactly_one_window_old_is_excluded() {
        let store = Arc::new(MemoryStore::new().with_table("trains", LOCATION_CODE, Some(CREATED_EPOCH_MS)));
        let repo = PredictionRepository::new(store, "trains");
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();

        let edge = now - TimeDelta::minutes(10);
        for created in [edge, edge + TimeDelta::milliseconds(1), now] {
            repo.persist(&record(created)).await.unwrap();
        }

        let query = PredictionQuery::new("A01", None, None).unwrap();
        let found: Vec<i64> = repo
            .query_predictions(&query, now)
            .await
            .unwrap()
            .iter()
            .map(|r| r.created_epoch_ms)
            .collect();
        assert_eq!(
            found,
            vec![edge.timestamp_millis() + 1, now.timestamp_millis()]
        );
    }

    #[tokio::test]
    async fn test_persist_refuses_to_overwrite_another_record() {
        let store = Arc::new(MemoryStore::new().with_table("trains", LOCATION_CODE, Some(CREATED_EPOCH_MS)));
        let repo = PredictionRepository::new(store.clone(), "trains");
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();

        let first = record(now);
        repo.persist(&first).await.unwrap();
        repo.persist(&first).await.unwrap();

        let mut other = record(now);
        other.id = "another-cycle".into();
        other.destination = "Shady Grove".into();
        assert!(matches!(
            repo.persist(&other).await,
            Err(StoreError::Conflict(_))
        ));

        let query = PredictionQuery::new("A01", None, None).unwrap();
        let found = repo.query_predictions(&query, now).await.unwrap();
        assert_eq!(found, vec![first]);
    }
}
