//! Batch acquisition across sources with health tracking and fallback.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cache::TtlCache;
use crate::config::AcquisitionConfig;
use crate::fallback::FallbackProvider;
use crate::feed::{EiaFeed, ReadingFeed};
use crate::health::{HealthMonitor, HealthRecord, HealthStatus, Outcome};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::retry::RetryEngine;
use crate::source_client::SourceClient;
use crate::throttling::RequestThrottle;
use crate::{
    CoreError, EnergySource, FetchError, PolicyTable, Provenance, Reading, SeriesQuery,
    SourcePolicy, ValidationError,
};

/// Validated batch request: a de-duplicated, ordered set of sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    sources: Vec<EnergySource>,
    query: Option<SeriesQuery>,
    deadline: Option<Duration>,
}

impl FetchRequest {
    /// Keeps the first occurrence of each source.
    pub fn new(sources: impl IntoIterator<Item = EnergySource>) -> Result<Self, ValidationError> {
        let sources = dedupe_sources(sources);
        if sources.is_empty() {
            return Err(ValidationError::EmptySourceSet);
        }

        Ok(Self {
            sources,
            query: None,
            deadline: None,
        })
    }

    /// Bounds the whole batch; sources still running when it elapses are cancelled.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Overrides the orchestrator's default series query.
    pub fn with_query(mut self, query: SeriesQuery) -> Self {
        self.query = Some(query);
        self
    }

    pub fn sources(&self) -> &[EnergySource] {
        &self.sources
    }

    pub const fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub const fn query(&self) -> Option<SeriesQuery> {
        self.query
    }
}

fn dedupe_sources(sources: impl IntoIterator<Item = EnergySource>) -> Vec<EnergySource> {
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .filter(|source| seen.insert(*source))
        .collect()
}

/// Per-source entry of a [`FetchResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceReading {
    Available(Reading),
    /// Neither the network nor the fallback table produced a reading.
    Missing {
        source: EnergySource,
        error: FetchError,
    },
}

impl SourceReading {
    pub fn source(&self) -> EnergySource {
        match self {
            Self::Available(reading) => reading.source(),
            Self::Missing { source, .. } => *source,
        }
    }

    pub fn reading(&self) -> Option<&Reading> {
        match self {
            Self::Available(reading) => Some(reading),
            Self::Missing { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            Self::Available(_) => None,
            Self::Missing { error, .. } => Some(error),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }
}

/// One batch, in request order. A fresh value is produced per call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResult {
    pub batch_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub latency_ms: u64,
    pub health: HealthStatus,
    pub readings: Vec<SourceReading>,
}

impl FetchResult {
    pub fn get(&self, source: EnergySource) -> Option<&SourceReading> {
        self.readings.iter().find(|entry| entry.source() == source)
    }

    pub fn missing(&self) -> Vec<EnergySource> {
        self.readings
            .iter()
            .filter(|entry| entry.is_missing())
            .map(SourceReading::source)
            .collect()
    }

    pub fn available(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter().filter_map(SourceReading::reading)
    }
}

#[derive(Debug)]
struct OrchestratorInner {
    client: SourceClient,
    policies: PolicyTable,
    health: HealthMonitor,
    query: SeriesQuery,
}

/// Concurrent per-source acquisition with health tracking and fallback.
///
/// Clones share caches, feeds and health state.
#[derive(Debug, Clone)]
pub struct FetchOrchestrator {
    inner: Arc<OrchestratorInner>,
}

impl FetchOrchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub fn new(
        client: SourceClient,
        policies: PolicyTable,
        health: HealthMonitor,
        query: SeriesQuery,
    ) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                client,
                policies,
                health,
                query,
            }),
        }
    }

    /// Fetches every requested source concurrently and joins them in request order.
    ///
    /// One source's failure never fails the batch: it is replaced by its
    /// fallback reading or a Missing marker.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnregisteredSource`] before any work starts
    /// if a source has no feed or no policy.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, ValidationError> {
        let plan = self.plan(request)?;
        let started = Instant::now();
        let deadline = request.deadline.map(|limit| started + limit);

        let pending = plan
            .into_iter()
            .map(|(source, policy)| self.spawn_source(source, request, policy, deadline))
            .collect::<Vec<_>>();

        let mut readings = Vec::with_capacity(pending.len());
        for entry in pending {
            readings.push(entry.await);
        }

        Ok(FetchResult {
            batch_id: Uuid::new_v4(),
            generated_at: OffsetDateTime::now_utc(),
            latency_ms: crate::domain::duration_ms::as_millis(started.elapsed()),
            health: self.inner.health.overall(),
            readings,
        })
    }

    /// Like [`fetch`](Self::fetch), but yields each source as soon as it completes.
    ///
    /// The channel closes after the last source reports. Must be called from
    /// within a tokio runtime.
    pub fn fetch_progressive(
        &self,
        request: &FetchRequest,
    ) -> Result<mpsc::Receiver<SourceReading>, ValidationError> {
        let plan = self.plan(request)?;
        let deadline = request.deadline.map(|limit| Instant::now() + limit);
        let (sender, receiver) = mpsc::channel(plan.len());

        for (source, policy) in plan {
            let pending = self.spawn_source(source, request, policy, deadline);
            let sender = sender.clone();
            tokio::spawn(async move {
                // receiver dropped means the caller stopped listening
                let _ = sender.send(pending.await).await;
            });
        }

        Ok(receiver)
    }

    pub fn subscribe_health<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: Fn(HealthRecord) + Send + Sync + 'static,
    {
        self.inner.health.subscribe(callback)
    }

    pub fn health(&self) -> &HealthMonitor {
        &self.inner.health
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.inner.policies
    }

    pub fn client(&self) -> &SourceClient {
        &self.inner.client
    }

    /// Sweeps expired entries from the cache and fallback tables.
    pub async fn purge_expired(&self) -> usize {
        let client = &self.inner.client;
        client.cache().purge_expired().await + client.fallback().purge_expired().await
    }

    fn plan(
        &self,
        request: &FetchRequest,
    ) -> Result<Vec<(EnergySource, SourcePolicy)>, ValidationError> {
        request
            .sources
            .iter()
            .map(|&source| {
                self.inner
                    .policies
                    .get(source)
                    .filter(|_| self.inner.client.has_feed(source))
                    .map(|policy| (source, policy.clone()))
                    .ok_or(ValidationError::UnregisteredSource { requested: source })
            })
            .collect()
    }

    /// Starts the source immediately; the returned future only collects it.
    fn spawn_source(
        &self,
        source: EnergySource,
        request: &FetchRequest,
        policy: SourcePolicy,
        deadline: Option<Instant>,
    ) -> impl Future<Output = SourceReading> + Send + 'static {
        let query = request.query.unwrap_or(self.inner.query);
        let handle = tokio::spawn(fetch_source(
            Arc::clone(&self.inner),
            source,
            query,
            policy,
            deadline,
        ));

        async move {
            match handle.await {
                Ok(entry) => entry,
                Err(join_error) => {
                    error!(
                        source = %source,
                        action = "fetch",
                        outcome = "missing",
                        error = %join_error,
                        "source task did not complete"
                    );
                    SourceReading::Missing {
                        source,
                        error: FetchError::cancelled(format!("source task failed: {join_error}")),
                    }
                }
            }
        }
    }
}

async fn fetch_source(
    inner: Arc<OrchestratorInner>,
    source: EnergySource,
    query: SeriesQuery,
    policy: SourcePolicy,
    deadline: Option<Instant>,
) -> SourceReading {
    let attempt = inner.client.fetch(source, query, &policy);
    let outcome = match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, attempt).await.ok(),
        None => Some(attempt.await),
    };

    let error = match outcome {
        Some(Ok(reading)) => {
            if reading.provenance() == Provenance::Live {
                inner.health.record_outcome(source, Outcome::Success);
                info!(source = %source, action = "fetch", outcome = "live", value = reading.value(), "live reading");
            } else {
                debug!(source = %source, action = "fetch", outcome = "cached", "cached reading");
            }
            return SourceReading::Available(reading);
        }
        Some(Err(error)) => {
            inner
                .health
                .record_outcome(source, Outcome::Failure(error.kind()));
            error
        }
        None => FetchError::cancelled("batch deadline elapsed before the source completed"),
    };

    match inner.client.fallback().last_known_good(source, query).await {
        Some(reading) => {
            warn!(source = %source, action = "fetch", outcome = "fallback", error = %error, "using fallback reading");
            SourceReading::Available(reading)
        }
        None => {
            warn!(source = %source, action = "fetch", outcome = "missing", error = %error, "no reading available");
            SourceReading::Missing { source, error }
        }
    }
}

/// Assembles a [`FetchOrchestrator`] from an [`AcquisitionConfig`].
///
/// When the config carries an api key, the EIA feed is registered for every
/// fuel source. Feeds added with [`with_feed`](Self::with_feed) are
/// registered afterwards and take precedence for the sources they declare.
///
/// ```rust,ignore
/// use gridtick_core::{AcquisitionConfig, EnergySource, FetchOrchestrator, FetchRequest};
///
/// let orchestrator = FetchOrchestrator::builder()
///     .with_config(AcquisitionConfig::from_env())
///     .build()?;
/// let request = FetchRequest::new([EnergySource::Solar, EnergySource::Coal])?;
/// let result = orchestrator.fetch(&request).await?;
/// ```
#[derive(Default)]
pub struct OrchestratorBuilder {
    config: AcquisitionConfig,
    http_client: Option<Arc<dyn HttpClient>>,
    feeds: Vec<Arc<dyn ReadingFeed>>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: AcquisitionConfig) -> Self {
        self.config = config;
        self
    }

    /// Transport for the EIA feed; defaults to a pooled reqwest client.
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_feed(mut self, feed: Arc<dyn ReadingFeed>) -> Self {
        self.feeds.push(feed);
        self
    }

    pub fn build(self) -> Result<FetchOrchestrator, CoreError> {
        let config = self.config;
        config.validate()?;

        let cache = TtlCache::new(config.cache_capacity, SourcePolicy::standard().cache_ttl);
        let fallback = FallbackProvider::new(config.cache_capacity, config.fallback_ttl);
        let retry = RetryEngine::new(config.retry_after_cap);
        let mut client = SourceClient::new(cache, fallback, retry);

        match &config.api_key {
            Some(api_key) => {
                let http_client = match self.http_client {
                    Some(http_client) => http_client,
                    None => Arc::new(ReqwestHttpClient::new(&config.http_client_config())?),
                };
                let mut feed =
                    EiaFeed::new(http_client, api_key.clone()).with_endpoint(config.endpoint.clone());
                if config.requests_per_minute > 0 {
                    feed = feed.with_throttle(RequestThrottle::per_minute(config.requests_per_minute));
                }
                client.register(Arc::new(feed));
            }
            None if self.feeds.is_empty() => {
                warn!(
                    action = "fetch",
                    outcome = "unconfigured",
                    "no eia api key configured; fuel sources are unregistered"
                );
            }
            None => {}
        }

        for feed in self.feeds {
            client.register(feed);
        }

        Ok(FetchOrchestrator::new(
            client,
            config.policies,
            HealthMonitor::new(config.down_threshold),
            config.query,
        ))
    }
}
