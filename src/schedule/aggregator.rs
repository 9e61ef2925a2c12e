use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::{OperatingWindow, current_window};
use crate::error::ScheduleError;
use crate::repository::StationRepository;

#[derive(Debug, Clone, Copy)]
struct HeldWindow {
    window: OperatingWindow,
    computed_at: DateTime<Utc>,
}

/// Whether ingestion should run at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Open,
    Closed,
    /// No window has ever been computed.
    Unknown,
}

/// Holds the last known [`OperatingWindow`] and recomputes it from the
/// stored station schedules.
///
/// Readers share the window through a lock; only [`refresh`] writes it, and
/// a failed refresh leaves the previous window in place.
///
/// [`refresh`]: ScheduleAggregator::refresh
#[derive(Clone)]
pub struct ScheduleAggregator {
    stations: StationRepository,
    tz: Tz,
    max_age: Duration,
    held: Arc<RwLock<Option<HeldWindow>>>,
}

impl ScheduleAggregator {
    pub fn new(stations: StationRepository, tz: Tz, max_age: Duration) -> Self {
        Self {
            stations,
            tz,
            max_age,
            held: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn window(&self) -> Option<OperatingWindow> {
        self.held.read().await.map(|h| h.window)
    }

    /// Recomputes the window relevant at `now` from the station table.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<OperatingWindow, ScheduleError> {
        let result = match self.stations.list().await {
            Ok(stations) => current_window(&stations, now.with_timezone(&self.tz).naive_local()),
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(window) => {
                *self.held.write().await = Some(HeldWindow {
                    window,
                    computed_at: now,
                });
                info!(open = %window.open, close = %window.close, "Operating window refreshed");
                Ok(window)
            }
            Err(e) => {
                warn!(error = %e, "Failed to refresh operating window, keeping previous");
                Err(e)
            }
        }
    }

    /// Decides whether to ingest at `now`, refreshing first when the held
    /// window has ended since it was computed or is older than the refresh
    /// interval.
    pub async fn gate(&self, now: DateTime<Utc>) -> Gate {
        let local = now.with_timezone(&self.tz).naive_local();
        let held = *self.held.read().await;

        let stale = match held {
            None => true,
            Some(h) => {
                // A window that had already closed when it was computed is
                // the best available until it ages out.
                let computed_local = h.computed_at.with_timezone(&self.tz).naive_local();
                (local > h.window.close && computed_local <= h.window.close)
                    || (now - h.computed_at)
                        .to_std()
                        .is_ok_and(|age| age >= self.max_age)
            }
        };
        let window = if stale {
            self.refresh(now).await.ok().or(held.map(|h| h.window))
        } else {
            held.map(|h| h.window)
        };

        match window {
            None => Gate::Unknown,
            Some(w) if w.contains(local) => Gate::Open,
            Some(_) => Gate::Closed,
        }
    }
}
