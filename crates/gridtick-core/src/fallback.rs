//! Last-known-good readings, served when a live fetch is exhausted.

use std::time::Duration;

use tracing::warn;

use crate::cache::{TtlCache, DEFAULT_CAPACITY};
use crate::{CacheKey, EnergySource, Provenance, Reading, SeriesQuery};

pub const DEFAULT_FALLBACK_TTL: Duration = Duration::from_secs(600);

/// Read-mostly table of the latest live reading per key.
///
/// Shares [`TtlCache`] with the primary store but keeps its own, longer TTL.
/// Clones share storage. Never performs network I/O.
#[derive(Debug, Clone)]
pub struct FallbackProvider {
    table: TtlCache<CacheKey, Reading>,
}

impl Default for FallbackProvider {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_FALLBACK_TTL)
    }
}

impl FallbackProvider {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            table: TtlCache::new(capacity, ttl),
        }
    }

    /// Stores `reading` as the last known good value for `key`.
    pub async fn record(&self, key: CacheKey, reading: Reading) {
        self.table.put(key, reading, None).await;
    }

    /// The stored reading tagged `Fallback`, or `None` if nothing fresh enough exists.
    pub async fn last_known_good(&self, source: EnergySource, query: SeriesQuery) -> Option<Reading> {
        match self.table.get(&CacheKey::new(source, query)).await {
            Some(hit) => {
                let age = hit.value.age().saturating_add(hit.stored_for);
                warn!(
                    source = %source,
                    action = "fallback",
                    outcome = "served",
                    age_ms = crate::domain::duration_ms::as_millis(age),
                    "serving last known good reading"
                );
                Some(hit.value.reissue(Provenance::Fallback, age))
            }
            None => {
                warn!(
                    source = %source,
                    action = "fallback",
                    outcome = "absent",
                    "no last known good reading"
                );
                None
            }
        }
    }

    pub async fn purge_expired(&self) -> usize {
        self.table.purge_expired().await
    }

    pub async fn ttl(&self) -> Duration {
        self.table.default_ttl().await
    }

    pub async fn len(&self) -> usize {
        self.table.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.table.is_empty().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(source: EnergySource, value: f64) -> Reading {
        Reading::live(source, value, "megawatthours", Vec::new()).expect("finite value")
    }

    #[tokio::test(start_paused = true)]
    async fn serves_recorded_reading_tagged_fallback_with_age() {
        let fallback = FallbackProvider::default();
        let query = SeriesQuery::default();
        fallback
            .record(CacheKey::new(EnergySource::Wind, query), reading(EnergySource::Wind, 5.0))
            .await;

        tokio::time::advance(Duration::from_secs(400)).await;

        let served = fallback
            .last_known_good(EnergySource::Wind, query)
            .await
            .expect("within fallback ttl");
        assert_eq!(served.provenance(), Provenance::Fallback);
        assert_eq!(served.age(), Duration::from_secs(400));
        assert!((served.value() - 5.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn absent_when_never_recorded_or_expired() {
        let fallback = FallbackProvider::new(10, Duration::from_secs(600));
        let query = SeriesQuery::default();
        assert!(fallback.last_known_good(EnergySource::Coal, query).await.is_none());

        fallback
            .record(CacheKey::new(EnergySource::Coal, query), reading(EnergySource::Coal, 1.0))
            .await;
        tokio::time::advance(Duration::from_secs(601)).await;

        assert!(fallback.last_known_good(EnergySource::Coal, query).await.is_none());
    }

    #[tokio::test]
    async fn keys_are_isolated_by_query() {
        let fallback = FallbackProvider::default();
        let daily = SeriesQuery::default();
        let weekly = SeriesQuery::new(crate::Frequency::Hourly, 168).expect("valid length");
        fallback
            .record(CacheKey::new(EnergySource::Solar, daily), reading(EnergySource::Solar, 2.0))
            .await;

        assert!(fallback.last_known_good(EnergySource::Solar, daily).await.is_some());
        assert!(fallback.last_known_good(EnergySource::Solar, weekly).await.is_none());
    }
}
