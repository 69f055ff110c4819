//! Per-source health derived from consecutive network outcomes.
//!
//! ```text
//! Healthy --failure--> Degraded --failure x N--> Down
//!    ^                                             |
//!    +------------------- success -----------------+
//! ```
//!
//! Every status transition is published on a bounded broadcast channel.
//! Publishing never blocks the fetch path; a subscriber that falls more than
//! the channel capacity behind loses the oldest notifications.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{EnergySource, FetchErrorKind};

pub const DEFAULT_DOWN_THRESHOLD: u32 = 3;

/// Buffered notifications per subscriber.
pub const NOTIFICATION_CAPACITY: usize = 64;

/// Ordered from best to worst so the aggregate is the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Down,
}

impl HealthStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Down => "down",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one network-backed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(FetchErrorKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthRecord {
    pub source: EnergySource,
    pub status: HealthStatus,
    pub consecutive_failures: u32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_success_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_failure_at: Option<OffsetDateTime>,
    pub last_error: Option<FetchErrorKind>,
}

impl HealthRecord {
    /// A source with no recorded outcomes.
    pub const fn new(source: EnergySource) -> Self {
        Self {
            source,
            status: HealthStatus::Healthy,
            consecutive_failures: 0,
            last_success_at: None,
            last_failure_at: None,
            last_error: None,
        }
    }
}

/// Thread-safe health state machine shared by all concurrent fetches.
#[derive(Debug)]
pub struct HealthMonitor {
    down_threshold: u32,
    records: Mutex<BTreeMap<EnergySource, HealthRecord>>,
    notifier: broadcast::Sender<HealthRecord>,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_DOWN_THRESHOLD)
    }
}

impl HealthMonitor {
    /// `down_threshold` consecutive failures mark a source Down (minimum one).
    pub fn new(down_threshold: u32) -> Self {
        let (notifier, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            down_threshold: down_threshold.max(1),
            records: Mutex::new(BTreeMap::new()),
            notifier,
        }
    }

    pub const fn down_threshold(&self) -> u32 {
        self.down_threshold
    }

    /// Applies `outcome` and returns the updated record.
    pub fn record_outcome(&self, source: EnergySource, outcome: Outcome) -> HealthRecord {
        let mut records = self
            .records
            .lock()
            .expect("health monitor lock is not poisoned");
        let record = records
            .entry(source)
            .or_insert_with(|| HealthRecord::new(source));
        let previous = record.status;
        let now = OffsetDateTime::now_utc();

        match outcome {
            Outcome::Success => {
                record.consecutive_failures = 0;
                record.last_success_at = Some(now);
                record.status = HealthStatus::Healthy;
            }
            Outcome::Failure(kind) => {
                record.consecutive_failures = record.consecutive_failures.saturating_add(1);
                record.last_failure_at = Some(now);
                record.last_error = Some(kind);
                record.status = if record.consecutive_failures >= self.down_threshold {
                    HealthStatus::Down
                } else {
                    HealthStatus::Degraded
                };
            }
        }

        let updated = record.clone();
        if updated.status != previous {
            if updated.status == HealthStatus::Healthy {
                info!(
                    source = %source,
                    action = "health",
                    outcome = "transition",
                    from = %previous,
                    to = %updated.status,
                    consecutive_failures = updated.consecutive_failures,
                    "source recovered"
                );
            } else {
                warn!(
                    source = %source,
                    action = "health",
                    outcome = "transition",
                    from = %previous,
                    to = %updated.status,
                    consecutive_failures = updated.consecutive_failures,
                    "source health worsened"
                );
            }
            // no receivers is fine; the record is still queryable
            let _ = self.notifier.send(updated.clone());
        }

        updated
    }

    pub fn status_of(&self, source: EnergySource) -> HealthRecord {
        self.records
            .lock()
            .expect("health monitor lock is not poisoned")
            .get(&source)
            .cloned()
            .unwrap_or_else(|| HealthRecord::new(source))
    }

    /// Records for every source that has reported at least one outcome.
    pub fn snapshot(&self) -> Vec<HealthRecord> {
        self.records
            .lock()
            .expect("health monitor lock is not poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Worst status across observed sources.
    pub fn overall(&self) -> HealthStatus {
        self.records
            .lock()
            .expect("health monitor lock is not poisoned")
            .values()
            .map(|record| record.status)
            .max()
            .unwrap_or(HealthStatus::Healthy)
    }

    /// Raw receiver of status transitions.
    pub fn watch(&self) -> broadcast::Receiver<HealthRecord> {
        self.notifier.subscribe()
    }

    /// Invokes `callback` on a dedicated task for every status transition.
    ///
    /// Must be called from within a tokio runtime. The task ends when the
    /// monitor is dropped; abort the handle to unsubscribe earlier.
    pub fn subscribe<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: Fn(HealthRecord) + Send + Sync + 'static,
    {
        let mut receiver = self.notifier.subscribe();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(record) => callback(record),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(
                            action = "health",
                            outcome = "lagged",
                            skipped,
                            "health subscriber fell behind; oldest notifications dropped"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn degrades_then_goes_down_at_threshold() {
        let monitor = HealthMonitor::default();
        let failure = Outcome::Failure(FetchErrorKind::Server);

        assert_eq!(monitor.status_of(EnergySource::Wind).status, HealthStatus::Healthy);
        assert_eq!(monitor.record_outcome(EnergySource::Wind, failure).status, HealthStatus::Degraded);
        assert_eq!(monitor.record_outcome(EnergySource::Wind, failure).status, HealthStatus::Degraded);

        let down = monitor.record_outcome(EnergySource::Wind, failure);
        assert_eq!(down.status, HealthStatus::Down);
        assert_eq!(down.consecutive_failures, 3);
        assert_eq!(down.last_error, Some(FetchErrorKind::Server));
    }

    #[test]
    fn success_resets_immediately() {
        let monitor = HealthMonitor::new(2);
        monitor.record_outcome(EnergySource::Coal, Outcome::Failure(FetchErrorKind::Timeout));
        monitor.record_outcome(EnergySource::Coal, Outcome::Failure(FetchErrorKind::Timeout));
        assert_eq!(monitor.overall(), HealthStatus::Down);

        let record = monitor.record_outcome(EnergySource::Coal, Outcome::Success);
        assert_eq!(record.status, HealthStatus::Healthy);
        assert_eq!(record.consecutive_failures, 0);
        assert!(record.last_success_at.is_some());
        assert!(record.last_failure_at.is_some());
    }

    #[test]
    fn overall_reports_worst_source() {
        let monitor = HealthMonitor::default();
        monitor.record_outcome(EnergySource::Solar, Outcome::Success);
        monitor.record_outcome(EnergySource::Wind, Outcome::Failure(FetchErrorKind::Network));

        assert_eq!(monitor.overall(), HealthStatus::Degraded);
        assert_eq!(monitor.snapshot().len(), 2);
    }

    #[test]
    fn notifies_only_on_transitions() {
        let monitor = HealthMonitor::new(3);
        let mut receiver = monitor.watch();

        monitor.record_outcome(EnergySource::Solar, Outcome::Success);
        monitor.record_outcome(EnergySource::Solar, Outcome::Failure(FetchErrorKind::Auth));
        monitor.record_outcome(EnergySource::Solar, Outcome::Failure(FetchErrorKind::Auth));
        monitor.record_outcome(EnergySource::Solar, Outcome::Failure(FetchErrorKind::Auth));

        let first = receiver.try_recv().expect("degraded transition");
        assert_eq!(first.status, HealthStatus::Degraded);
        let second = receiver.try_recv().expect("down transition");
        assert_eq!(second.status, HealthStatus::Down);
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn subscriber_callback_runs_off_the_calling_path() {
        let monitor = HealthMonitor::default();
        let (sender, mut received) = tokio::sync::mpsc::unbounded_channel();
        let sender = Arc::new(sender);
        let handle = monitor.subscribe({
            let sender = Arc::clone(&sender);
            move |record| {
                let _ = sender.send(record);
            }
        });

        monitor.record_outcome(EnergySource::NaturalGas, Outcome::Failure(FetchErrorKind::Network));

        let record = received.recv().await.expect("callback invoked");
        assert_eq!(record.source, EnergySource::NaturalGas);
        assert_eq!(record.status, HealthStatus::Degraded);
        handle.abort();
    }
}
