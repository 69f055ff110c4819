use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{EnergySource, ValidationError};

/// Where a [`Reading`] was obtained from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Fetched from the provider during this call.
    Live,
    /// Served from the primary cache within its TTL.
    Cached,
    /// Last-known-good value served after the primary fetch was exhausted.
    Fallback,
}

impl Provenance {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Cached => "cached",
            Self::Fallback => "fallback",
        }
    }
}

impl Display for Provenance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provider period and its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlySample {
    pub period: String,
    pub value: f64,
}

/// Immutable measurement for a single energy source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    source: EnergySource,
    value: f64,
    unit: String,
    #[serde(with = "time::serde::rfc3339")]
    acquired_at: OffsetDateTime,
    provenance: Provenance,
    #[serde(rename = "age_ms", with = "super::duration_ms")]
    age: Duration,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    series: Vec<HourlySample>,
}

impl Reading {
    /// Creates a freshly acquired live reading.
    pub fn live(
        source: EnergySource,
        value: f64,
        unit: impl Into<String>,
        series: Vec<HourlySample>,
    ) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "value" });
        }
        if series.iter().any(|sample| !sample.value.is_finite()) {
            return Err(ValidationError::NonFiniteValue { field: "series" });
        }

        Ok(Self {
            source,
            value,
            unit: unit.into(),
            acquired_at: OffsetDateTime::now_utc(),
            provenance: Provenance::Live,
            age: Duration::ZERO,
            series,
        })
    }

    /// Produces a successor reading with the same measurement and a new provenance/age.
    pub fn reissue(&self, provenance: Provenance, age: Duration) -> Self {
        Self {
            provenance,
            age,
            ..self.clone()
        }
    }

    pub const fn source(&self) -> EnergySource {
        self.source
    }

    pub const fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub const fn acquired_at(&self) -> OffsetDateTime {
        self.acquired_at
    }

    pub const fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub const fn age(&self) -> Duration {
        self.age
    }

    pub fn series(&self) -> &[HourlySample] {
        &self.series
    }
}
