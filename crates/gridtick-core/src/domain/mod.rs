//! # Domain Models
//!
//! Canonical types shared by every layer of the acquisition core.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Reading`] | One immutable measurement for one source, tagged with provenance |
//! | [`Provenance`] | Where a reading came from: live, cached or fallback |
//! | [`HourlySample`] | A single period/value pair from the provider series |
//! | [`SeriesQuery`] | Query parameters sent to the provider |
//! | [`CacheKey`] | `(source, query)` key shared by the cache and fallback tables |
//!
//! Readings are never edited. A cache or fallback hit produces a new
//! [`Reading`] via [`Reading::reissue`] carrying the new provenance and age.

pub mod duration_ms;
mod query;
mod reading;

pub use query::{CacheKey, Frequency, SeriesQuery, MAX_SERIES_LENGTH};
pub use reading::{HourlySample, Provenance, Reading};
