//! # Gridtick Core
//!
//! Resilient acquisition of metered electricity-generation data.
//!
//! ## Overview
//!
//! This crate sits between the provider network and whatever displays the
//! data. Each requested energy source is fetched independently:
//!
//! - **Cache store** answers fresh repeats without touching the network
//! - **Retry engine** bounds every attempt and backs off exponentially
//! - **Per-source policies** give coal its longer timeout and extra retry
//! - **Fallback table** serves the last known good reading once retries are exhausted
//! - **Health monitor** tracks consecutive failures and publishes transitions
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Bounded TTL table shared by the cache store and fallback |
//! | [`config`] | Acquisition configuration (env + JSON file) |
//! | [`domain`] | Readings, provenance, series queries |
//! | [`error`] | Validation and core error types |
//! | [`fallback`] | Last-known-good provider |
//! | [`feed`] | Provider feed trait and the EIA feed |
//! | [`fetch_error`] | Provider failure taxonomy |
//! | [`health`] | Health state machine and notifications |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`orchestrator`] | Concurrent batch fetches |
//! | [`retry`] | Backoff schedule and retry engine |
//! | [`source`] | Energy source identifiers |
//! | [`source_client`] | Cache-first single-source fetch |
//! | [`source_policy`] | Per-source timeout/retry/TTL table |
//! | [`summary`] | Hourly analysis over a batch |
//! | [`throttling`] | Client-side request pacing |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gridtick_core::{AcquisitionConfig, EnergySource, FetchOrchestrator, FetchRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = FetchOrchestrator::builder()
//!         .with_config(AcquisitionConfig::from_env())
//!         .build()?;
//!
//!     let request = FetchRequest::new([EnergySource::Solar, EnergySource::Coal])?;
//!     let result = orchestrator.fetch(&request).await?;
//!
//!     for entry in &result.readings {
//!         match entry.reading() {
//!             Some(reading) => println!("{}: {:.1} {}", reading.source(), reading.value(), reading.unit()),
//!             None => println!("{}: missing", entry.source()),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐      ┌──────────────────┐
//! │  Fetch Orchestrator  │─────▶│  Health Monitor  │──▶ subscribers
//! └──────────┬───────────┘      └──────────────────┘
//!            │ one task per source
//!            ▼
//! ┌──────────────────────┐      ┌──────────────────┐
//! │    Source Client     │─────▶│   Cache Store    │
//! └──────────┬───────────┘      └──────────────────┘
//!            │ miss
//!            ▼                   ┌──────────────────┐
//! ┌──────────────────────┐      │ Fallback Provider│◀── on exhaustion
//! │    Retry Engine      │      └──────────────────┘
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐      ┌──────────────────┐
//! │  Reading Feed (EIA)  │─────▶│   HTTP Client    │
//! └──────────────────────┘      └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! A batch never fails because a provider did. Provider failures become
//! [`FetchError`] values inside [`SourceReading::Missing`]; only malformed
//! input (an empty or unregistered source set) is reported as a
//! [`ValidationError`].
//!
//! ```rust
//! use gridtick_core::{FetchError, FetchErrorKind};
//!
//! fn describe(error: &FetchError) -> &'static str {
//!     match error.kind() {
//!         FetchErrorKind::Auth => "check the api key",
//!         FetchErrorKind::RateLimited => "slow down",
//!         _ if error.retryable() => "transient",
//!         _ => "permanent",
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - The api key is read from the environment or config file and never logged
//! - Transport errors are stripped of URLs, which carry the key

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod fallback;
pub mod feed;
pub mod fetch_error;
pub mod health;
pub mod http_client;
pub mod orchestrator;
pub mod retry;
pub mod source;
pub mod source_client;
pub mod source_policy;
pub mod summary;
pub mod throttling;

// Caching
pub use cache::{CacheHit, TtlCache, DEFAULT_CAPACITY};

// Configuration
pub use config::AcquisitionConfig;

// Domain models
pub use domain::{
    CacheKey, Frequency, HourlySample, Provenance, Reading, SeriesQuery, MAX_SERIES_LENGTH,
};

// Error types
pub use error::{CoreError, ValidationError};
pub use fetch_error::{FetchError, FetchErrorKind};

// Fallback
pub use fallback::{FallbackProvider, DEFAULT_FALLBACK_TTL};

// Feeds
pub use feed::{EiaFeed, FeedFuture, PaceFuture, ReadingFeed, EIA_DEFAULT_ENDPOINT};

// Health
pub use health::{
    HealthMonitor, HealthRecord, HealthStatus, Outcome, DEFAULT_DOWN_THRESHOLD,
};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpClientConfig, HttpError, HttpErrorKind, HttpRequest, HttpResponse,
    ReqwestHttpClient,
};

// Orchestration
pub use orchestrator::{
    FetchOrchestrator, FetchRequest, FetchResult, OrchestratorBuilder, SourceReading,
};

// Retry logic
pub use retry::{Attempt, Backoff, RetryEngine, DEFAULT_RETRY_AFTER_CAP};

pub use source::EnergySource;
pub use source_client::SourceClient;
pub use source_policy::{PolicyTable, SourcePolicy};
pub use summary::{GenerationSummary, SourceSummary};
pub use throttling::RequestThrottle;
