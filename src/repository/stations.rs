use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::error::StoreError;
use crate::model::Station;
use crate::store::Store;
use crate::store::codec::{station_from_item, station_to_item};

/// Station reference data, keyed by station code.
#[derive(Clone)]
pub struct StationRepository {
    store: Arc<dyn Store>,
    table: String,
}

impl StationRepository {
    pub fn new(store: Arc<dyn Store>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    pub async fn save(&self, station: &Station) -> Result<(), StoreError> {
        self.store.put(&self.table, station_to_item(station)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Station>, StoreError> {
        let items = self.store.scan(&self.table).await?;
        let stations = items
            .iter()
            .map(station_from_item)
            .collect::<Result<Vec<_>, _>>()?;
        info!(stations_found = stations.len(), "Stations read from store");
        Ok(stations)
    }

    /// Stored stations that some station lists as a destination, each once,
    /// in order of first mention. Unknown codes are skipped.
    pub async fn destination_stations(&self) -> Result<Vec<Station>, StoreError> {
        let stations = self.list().await?;
        let by_code: HashMap<&str, &Station> =
            stations.iter().map(|s| (s.code.as_str(), s)).collect();

        let mut seen = Vec::new();
        let mut result = Vec::new();
        for code in stations.iter().flat_map(|s| &s.destinations) {
            if seen.contains(code) {
                continue;
            }
            seen.push(code.clone());
            if let Some(station) = by_code.get(code.as_str()) {
                result.push((*station).clone());
            }
        }
        Ok(result)
    }
}
