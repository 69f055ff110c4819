//! Cache-first, retried fetch of a single source.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::cache::TtlCache;
use crate::fallback::FallbackProvider;
use crate::feed::ReadingFeed;
use crate::retry::RetryEngine;
use crate::{
    CacheKey, EnergySource, FetchError, Provenance, Reading, SeriesQuery, SourcePolicy,
};

/// Cache-first fetch of one source under its [`SourcePolicy`].
///
/// Within one call the cache check happens before any network attempt, and
/// the write-through happens after the attempt succeeded. Exhaustion is
/// propagated; consulting the fallback table is the orchestrator's job.
#[derive(Clone)]
pub struct SourceClient {
    feeds: HashMap<EnergySource, Arc<dyn ReadingFeed>>,
    cache: TtlCache<CacheKey, Reading>,
    fallback: FallbackProvider,
    retry: RetryEngine,
}

impl std::fmt::Debug for SourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut feeds = self
            .feeds
            .iter()
            .map(|(source, feed)| (source.as_str(), feed.name()))
            .collect::<Vec<_>>();
        feeds.sort_unstable();
        f.debug_struct("SourceClient")
            .field("feeds", &feeds)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl SourceClient {
    pub fn new(
        cache: TtlCache<CacheKey, Reading>,
        fallback: FallbackProvider,
        retry: RetryEngine,
    ) -> Self {
        Self {
            feeds: HashMap::new(),
            cache,
            fallback,
            retry,
        }
    }

    /// Routes every source the feed declares to it, replacing earlier registrations.
    pub fn register(&mut self, feed: Arc<dyn ReadingFeed>) {
        for source in feed.sources() {
            self.feeds.insert(source, Arc::clone(&feed));
        }
    }

    pub fn with_feed(mut self, feed: Arc<dyn ReadingFeed>) -> Self {
        self.register(feed);
        self
    }

    pub fn has_feed(&self, source: EnergySource) -> bool {
        self.feeds.contains_key(&source)
    }

    pub fn cache(&self) -> &TtlCache<CacheKey, Reading> {
        &self.cache
    }

    pub fn fallback(&self) -> &FallbackProvider {
        &self.fallback
    }

    /// Returns a `Cached` reading if one is fresh, otherwise a `Live` one.
    ///
    /// # Errors
    ///
    /// Returns the terminal [`FetchError`] once retries are exhausted or a
    /// non-retryable failure occurs. A source without a feed fails as
    /// `MalformedRequest` without touching the network.
    pub async fn fetch(
        &self,
        source: EnergySource,
        query: SeriesQuery,
        policy: &SourcePolicy,
    ) -> Result<Reading, FetchError> {
        let key = CacheKey::new(source, query);
        if let Some(hit) = self.cache.get(&key).await {
            debug!(
                source = %source,
                action = "cache",
                outcome = "hit",
                stored_ms = crate::domain::duration_ms::as_millis(hit.stored_for),
                "serving cached reading"
            );
            let age = hit.value.age().saturating_add(hit.stored_for);
            return Ok(hit.value.reissue(Provenance::Cached, age));
        }
        debug!(source = %source, action = "cache", outcome = "miss", "cache miss");

        let feed = self.feeds.get(&source).ok_or_else(|| {
            FetchError::malformed_request(format!("no feed registered for source '{source}'"))
        })?;

        let reading = self
            .retry
            .execute_paced(
                source,
                policy,
                || feed.pace(),
                |attempt| feed.fetch(source, query, attempt),
            )
            .await?;

        self.cache
            .put(key, reading.clone(), Some(policy.cache_ttl))
            .await;
        self.fallback.record(key, reading.clone()).await;

        Ok(reading)
    }
}
