//! Transit API client.
//!
//! [`HttpClient`] is the transport seam, [`ApiKey`] decorates it with the
//! upstream credential, and [`MetroApi`] maps a named [`Resource`] onto an
//! upstream URL. The rest of the crate only sees [`TransitApi`].

mod auth;
mod basic;
mod metro;
mod retry;

pub use auth::ApiKey;
pub use basic::BasicClient;
pub use metro::MetroApi;
pub use retry::{RetryPolicy, retry};

use async_trait::async_trait;
use reqwest::{Request, Response};
use std::fmt;

use crate::error::FetchError;

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

/// A named upstream resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// Live train predictions for every station.
    Predictions,
    /// The station list.
    Stations,
    /// Opening times and first/last trains for one station.
    StationTimes(String),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Predictions => write!(f, "predictions"),
            Resource::Stations => write!(f, "stations"),
            Resource::StationTimes(code) => write!(f, "station_times/{code}"),
        }
    }
}

/// Fetches the raw payload of a named resource. No retries, no caching.
#[async_trait]
pub trait TransitApi: Send + Sync {
    async fn fetch(&self, resource: &Resource) -> Result<Vec<u8>, FetchError>;
}

/// Issues a GET for `url` and returns the body of a successful response.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
) -> Result<Vec<u8>, FetchError> {
    let parsed = url
        .parse::<reqwest::Url>()
        .map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
    let req = Request::new(reqwest::Method::GET, parsed);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(resp.bytes().await?.to_vec())
}
