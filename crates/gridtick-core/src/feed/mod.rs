//! Provider feeds: one network call for one source.
//!
//! A [`ReadingFeed`] knows how to turn a `(source, query)` pair into a
//! [`Reading`]. It performs exactly one attempt; retries, timeouts and
//! caching are layered on top by [`crate::SourceClient`].

mod eia;

use std::future::Future;
use std::pin::Pin;

pub use eia::{EiaFeed, EIA_DEFAULT_ENDPOINT};

use crate::retry::Attempt;
use crate::{EnergySource, FetchError, Reading, SeriesQuery};

pub type FeedFuture<'a> = Pin<Box<dyn Future<Output = Result<Reading, FetchError>> + Send + 'a>>;

pub type PaceFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Single-attempt provider contract.
///
/// Implementations must be `Send + Sync`; one instance serves every
/// concurrent fetch for the sources it declares.
pub trait ReadingFeed: Send + Sync {
    /// Short identifier used in log events.
    fn name(&self) -> &'static str;

    /// Sources this feed can serve.
    fn sources(&self) -> Vec<EnergySource>;

    /// Waits for client-side pacing before an attempt; not covered by the
    /// attempt timeout. The default does not wait.
    fn pace(&self) -> PaceFuture<'_> {
        Box::pin(std::future::ready(()))
    }

    /// Performs one network attempt.
    ///
    /// # Errors
    ///
    /// Returns a classified [`FetchError`]; the caller decides whether to retry.
    fn fetch(&self, source: EnergySource, query: SeriesQuery, attempt: Attempt) -> FeedFuture<'_>;
}
