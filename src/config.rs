//! Process configuration.
//!
//! Loaded once at startup from a JSON file and handed to every component
//! that needs it:
//! ```json
//! {
//!   "api_key": "...",
//!   "poll_interval_secs": 20,
//!   "storage": { "endpoint": "http://localhost:8000/" }
//! }
//! ```

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "Config::default_api_endpoint")]
    pub api_endpoint: String,
    #[serde(default = "Config::default_train_route")]
    pub train_route: String,
    #[serde(default = "Config::default_station_route")]
    pub station_route: String,
    #[serde(default = "Config::default_station_timing_route")]
    pub station_timing_route: String,
    /// IANA zone the upstream schedule times are expressed in.
    #[serde(default = "Config::default_timezone")]
    pub timezone: Tz,
    #[serde(default = "Config::default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "Config::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// How long an in-flight poll cycle may run after shutdown is requested.
    #[serde(default = "Config::default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    #[serde(default = "Config::default_window_refresh_secs")]
    pub window_refresh_secs: u64,
    /// Upper bound on ticks skipped after consecutive failed cycles.
    #[serde(default = "Config::default_max_backoff_ticks")]
    pub max_backoff_ticks: u32,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Endpoint override, e.g. a local DynamoDB.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "StorageConfig::default_prediction_table")]
    pub prediction_table: String,
    #[serde(default = "StorageConfig::default_station_table")]
    pub station_table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            prediction_table: Self::default_prediction_table(),
            station_table: Self::default_station_table(),
        }
    }
}

impl StorageConfig {
    fn default_prediction_table() -> String {
        "trains".to_string()
    }
    fn default_station_table() -> String {
        "stations".to_string()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_endpoint: Self::default_api_endpoint(),
            train_route: Self::default_train_route(),
            station_route: Self::default_station_route(),
            station_timing_route: Self::default_station_timing_route(),
            timezone: Self::default_timezone(),
            poll_interval_secs: Self::default_poll_interval_secs(),
            request_timeout_secs: Self::default_request_timeout_secs(),
            shutdown_grace_secs: Self::default_shutdown_grace_secs(),
            window_refresh_secs: Self::default_window_refresh_secs(),
            max_backoff_ticks: Self::default_max_backoff_ticks(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    fn default_api_endpoint() -> String {
        "https://api.wmata.com".to_string()
    }
    fn default_train_route() -> String {
        "/StationPrediction.svc/json/GetPrediction/All".to_string()
    }
    fn default_station_route() -> String {
        "/Rail.svc/json/jStations".to_string()
    }
    fn default_station_timing_route() -> String {
        "/Rail.svc/json/jStationTimes?StationCode=".to_string()
    }
    fn default_timezone() -> Tz {
        chrono_tz::America::New_York
    }
    fn default_poll_interval_secs() -> u64 {
        20
    }
    fn default_request_timeout_secs() -> u64 {
        10
    }
    fn default_shutdown_grace_secs() -> u64 {
        10
    }
    fn default_window_refresh_secs() -> u64 {
        24 * 60 * 60
    }
    fn default_max_backoff_ticks() -> u32 {
        8
    }

    /// Loads the config from a JSON file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn train_url(&self) -> String {
        format!("{}{}", self.api_endpoint, self.train_route)
    }

    pub fn station_url(&self) -> String {
        format!("{}{}", self.api_endpoint, self.station_route)
    }

    pub fn station_timing_url(&self, station_code: &str) -> String {
        format!(
            "{}{}{}",
            self.api_endpoint, self.station_timing_route, station_code
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn window_refresh(&self) -> Duration {
        Duration::from_secs(self.window_refresh_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.poll_interval_secs, 20);
        assert_eq!(config.timezone, chrono_tz::America::New_York);
        assert_eq!(config.storage.prediction_table, "trains");
        assert_eq!(config.storage.station_table, "stations");
        assert!(config.storage.endpoint.is_none());
    }

    #[test]
    fn test_urls_join_endpoint_and_route() {
        let config = Config::from_json(
            r#"{
                "api_endpoint": "https://metro.example",
                "train_route": "/trains",
                "station_timing_route": "/times?StationCode="
            }"#,
        )
        .unwrap();
        assert_eq!(config.train_url(), "https://metro.example/trains");
        assert_eq!(
            config.station_timing_url("A01"),
            "https://metro.example/times?StationCode=A01"
        );
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(Config::from_json(r#"{"binding_prot": 8080}"#).is_err());
    }

    #[test]
    fn test_invalid_timezone_is_rejected() {
        assert!(Config::from_json(r#"{"timezone": "Mars/Olympus"}"#).is_err());
    }
}
