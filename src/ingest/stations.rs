use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::fetch::{Resource, RetryPolicy, TransitApi, retry};
use crate::normalize::{StationTimes, normalize_station_times, normalize_stations};
use crate::rate_limit::RateLimiter;
use crate::repository::StationRepository;

/// Counts from one station bulk load.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub stations: usize,
    pub with_schedule: usize,
    pub rejected: usize,
    pub failed_writes: usize,
}

/// Fetches the station list and every station's schedule, then stores the
/// normalized stations.
///
/// Schedule requests go out one at a time behind `limiter`. A station whose
/// schedule cannot be fetched or parsed is stored without one.
#[tracing::instrument(skip_all)]
pub async fn load_stations(
    api: &dyn TransitApi,
    repo: &StationRepository,
    limiter: &RateLimiter,
    policy: RetryPolicy,
) -> Result<LoadReport> {
    let payload = api
        .fetch(&Resource::Stations)
        .await
        .context("failed to fetch station list")?;
    let listed = normalize_stations(&payload, &HashMap::new())
        .context("failed to parse station list")?;
    info!(stations = listed.records.len(), "Station list fetched, loading schedules");

    let mut schedules: HashMap<String, StationTimes> = HashMap::new();
    for station in &listed.records {
        let resource = Resource::StationTimes(station.code.clone());
        let fetched = retry(policy, || {
            let resource = resource.clone();
            async move {
                limiter.acquire().await;
                api.fetch(&resource).await
            }
        })
        .await;

        let times = match fetched {
            Ok(bytes) => normalize_station_times(&bytes).map_err(anyhow::Error::from),
            Err(e) => Err(e.into()),
        };
        match times {
            Ok(times) => {
                schedules.insert(station.code.clone(), times);
            }
            Err(e) => {
                warn!(station = %station.code, error = %e, "No schedule for station, storing without one");
            }
        }
    }

    let batch = normalize_stations(&payload, &schedules).context("failed to parse station list")?;
    for e in &batch.rejected {
        warn!(error = %e, "Skipping station record");
    }

    let mut report = LoadReport {
        rejected: batch.rejected.len(),
        ..LoadReport::default()
    };
    for station in &batch.records {
        match repo.save(station).await {
            Ok(()) => {
                report.stations += 1;
                if !station.schedule.is_empty() {
                    report.with_schedule += 1;
                }
            }
            Err(e) => {
                warn!(station = %station.code, error = %e, "Failed to store station");
                report.failed_writes += 1;
            }
        }
    }

    info!(
        stations = report.stations,
        with_schedule = report.with_schedule,
        rejected = report.rejected,
        failed_writes = report.failed_writes,
        "Station load complete"
    );
    Ok(report)
}
