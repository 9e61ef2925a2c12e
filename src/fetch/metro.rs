use async_trait::async_trait;
use tracing::debug;

use super::{HttpClient, Resource, TransitApi, fetch_bytes};
use crate::config::Config;
use crate::error::FetchError;

/// [`TransitApi`] backed by the metro JSON endpoints named in [`Config`].
pub struct MetroApi<C> {
    client: C,
    config: Config,
}

impl<C: HttpClient> MetroApi<C> {
    pub fn new(client: C, config: Config) -> Self {
        Self { client, config }
    }

    pub fn url_for(&self, resource: &Resource) -> String {
        match resource {
            Resource::Predictions => self.config.train_url(),
            Resource::Stations => self.config.station_url(),
            Resource::StationTimes(code) => self.config.station_timing_url(code),
        }
    }
}

#[async_trait]
impl<C: HttpClient> TransitApi for MetroApi<C> {
    #[tracing::instrument(skip(self), fields(resource = %resource))]
    async fn fetch(&self, resource: &Resource) -> Result<Vec<u8>, FetchError> {
        let url = self.url_for(resource);
        let bytes = fetch_bytes(&self.client, &url).await?;
        debug!(bytes = bytes.len(), "Upstream payload received");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;
    use std::time::Duration;

    fn api() -> MetroApi<BasicClient> {
        let config = Config::from_json(r#"{"api_endpoint": "https://metro.example"}"#).unwrap();
        MetroApi::new(BasicClient::new(Duration::from_secs(1)).unwrap(), config)
    }

    #[test]
    fn test_resource_urls() {
        let api = api();
        assert_eq!(
            api.url_for(&Resource::Predictions),
            "https://metro.example/StationPrediction.svc/json/GetPrediction/All"
        );
        assert_eq!(
            api.url_for(&Resource::Stations),
            "https://metro.example/Rail.svc/json/jStations"
        );
        assert_eq!(
            api.url_for(&Resource::StationTimes("B02".into())),
            "https://metro.example/Rail.svc/json/jStationTimes?StationCode=B02"
        );
    }

    #[tokio::test]
    async fn test_invalid_url_is_a_fetch_error() {
        let config = Config::from_json(r#"{"api_endpoint": "not a url"}"#).unwrap();
        let api = MetroApi::new(BasicClient::new(Duration::from_secs(1)).unwrap(), config);
        let err = api.fetch(&Resource::Stations).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }
}
