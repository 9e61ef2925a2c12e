use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::fetch::{Resource, TransitApi};
use crate::normalize::normalize_predictions;
use crate::repository::PredictionRepository;
use crate::schedule::{Gate, ScheduleAggregator};

/// Where a poll cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Fetching,
    Normalizing,
    Persisting,
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    OutsideWindow,
    BackingOff { remaining: u32 },
    FetchFailed,
    ParseFailed,
    Persisted {
        written: usize,
        failed: usize,
        rejected: usize,
    },
}

/// Timer-driven loop: fetch live predictions, normalize, persist.
///
/// Each tick makes at most one upstream attempt. After `k` consecutive
/// failed cycles the next `min(2^(k-1) - 1, max_backoff_ticks)` ticks are
/// skipped.
pub struct Poller {
    api: Arc<dyn TransitApi>,
    predictions: PredictionRepository,
    aggregator: Option<ScheduleAggregator>,
    interval: Duration,
    shutdown_grace: Duration,
    max_backoff_ticks: u32,
    state: PollState,
    consecutive_failures: u32,
    skip_ticks: u32,
}

impl Poller {
    pub fn new(
        api: Arc<dyn TransitApi>,
        predictions: PredictionRepository,
        aggregator: Option<ScheduleAggregator>,
        config: &Config,
    ) -> Self {
        Self {
            api,
            predictions,
            aggregator,
            interval: config.poll_interval(),
            shutdown_grace: config.shutdown_grace(),
            max_backoff_ticks: config.max_backoff_ticks,
            state: PollState::Idle,
            consecutive_failures: 0,
            skip_ticks: 0,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    fn transition(&mut self, next: PollState) {
        debug!(from = ?self.state, to = ?next, "Poller state change");
        self.state = next;
    }

    fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let backoff = 2u32
            .saturating_pow(self.consecutive_failures - 1)
            .saturating_sub(1);
        self.skip_ticks = backoff.min(self.max_backoff_ticks);
        self.transition(PollState::Idle);
    }

    /// Runs one cycle as of `now`.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> CycleOutcome {
        if self.skip_ticks > 0 {
            self.skip_ticks -= 1;
            return CycleOutcome::BackingOff {
                remaining: self.skip_ticks,
            };
        }

        if let Some(aggregator) = &self.aggregator {
            match aggregator.gate(now).await {
                Gate::Closed => return CycleOutcome::OutsideWindow,
                Gate::Unknown => debug!("Operating window unknown, polling anyway"),
                Gate::Open => {}
            }
        }

        self.transition(PollState::Fetching);
        info!("Fetching train predictions");
        let payload = match self.api.fetch(&Resource::Predictions).await {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, failures = self.consecutive_failures + 1, "Failed to fetch predictions");
                self.record_failure();
                return CycleOutcome::FetchFailed;
            }
        };

        self.transition(PollState::Normalizing);
        let batch = match normalize_predictions(&payload, now) {
            Ok(batch) => batch,
            Err(e) => {
                error!(error = %e, "Failed to parse prediction payload");
                self.record_failure();
                return CycleOutcome::ParseFailed;
            }
        };
        for e in &batch.rejected {
            debug!(error = %e, "Skipping prediction record");
        }

        self.transition(PollState::Persisting);
        let mut written = 0;
        let mut failed = 0;
        for record in &batch.records {
            match self.predictions.persist(record).await {
                Ok(()) => written += 1,
                Err(e) => {
                    error!(
                        error = %e,
                        location = %record.location_code,
                        created_epoch_ms = record.created_epoch_ms,
                        "Failed to persist prediction"
                    );
                    failed += 1;
                }
            }
        }

        self.consecutive_failures = 0;
        self.transition(PollState::Idle);
        CycleOutcome::Persisted {
            written,
            failed,
            rejected: batch.rejected.len(),
        }
    }

    /// Ticks every poll interval until `shutdown` flips to `true` or its
    /// sender is dropped. A cycle in flight at shutdown gets the grace
    /// period to finish.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let grace = self.shutdown_grace;
        info!(interval_secs = self.interval.as_secs(), "Starting prediction poller");

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = interval.tick() => {}
            }
            if *shutdown.borrow() {
                break;
            }

            let mut stopping = false;
            let cycle = self.tick(Utc::now());
            tokio::pin!(cycle);
            let outcome = tokio::select! {
                outcome = &mut cycle => Some(outcome),
                _ = shutdown.changed() => {
                    stopping = true;
                    info!(grace_secs = grace.as_secs(), "Shutdown requested, finishing in-flight cycle");
                    tokio::time::timeout(grace, &mut cycle).await.ok()
                }
            };

            match outcome {
                Some(outcome) => log_outcome(&outcome),
                None => warn!("In-flight cycle abandoned after grace period"),
            }
            if stopping {
                break;
            }
        }

        info!("Prediction poller stopped");
    }
}

fn log_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::OutsideWindow => debug!("Outside operating window, cycle skipped"),
        CycleOutcome::BackingOff { remaining } => {
            debug!(remaining, "Backing off after failures, cycle skipped")
        }
        CycleOutcome::FetchFailed | CycleOutcome::ParseFailed => {}
        CycleOutcome::Persisted {
            written,
            failed,
            rejected,
        } => info!(written, failed, rejected, "Poll cycle complete"),
    }
}
