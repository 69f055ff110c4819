use serde::{Deserialize, Serialize};

use crate::{EnergySource, ValidationError};

/// Provider row cap for a single request.
pub const MAX_SERIES_LENGTH: u16 = 5_000;

/// Sampling frequency requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    Hourly,
    LocalHourly,
}

impl Frequency {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::LocalHourly => "local-hourly",
        }
    }
}

/// Query parameters for one series request, part of every cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesQuery {
    pub frequency: Frequency,
    /// Number of most recent periods to request.
    pub length: u16,
}

impl SeriesQuery {
    pub fn new(frequency: Frequency, length: u16) -> Result<Self, ValidationError> {
        let query = Self { frequency, length };
        query.validate()?;
        Ok(query)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.length == 0 || self.length > MAX_SERIES_LENGTH {
            return Err(ValidationError::InvalidSeriesLength {
                value: self.length,
                max: MAX_SERIES_LENGTH,
            });
        }
        Ok(())
    }
}

impl Default for SeriesQuery {
    fn default() -> Self {
        Self {
            frequency: Frequency::Hourly,
            length: 24,
        }
    }
}

/// Key shared by the cache store and the fallback table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: EnergySource,
    pub query: SeriesQuery,
}

impl CacheKey {
    pub const fn new(source: EnergySource, query: SeriesQuery) -> Self {
        Self { source, query }
    }
}
