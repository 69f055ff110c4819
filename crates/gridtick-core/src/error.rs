use thiserror::Error;

use crate::EnergySource;

/// Validation and contract errors exposed by `gridtick-core`.
///
/// These are programmer or configuration mistakes and are reported
/// synchronously; provider failures are [`crate::FetchError`] values instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid source '{value}', expected one of solar, wind, coal, natural_gas, ai_analysis")]
    InvalidSource { value: String },

    #[error("fetch request must include at least one source")]
    EmptySourceSet,
    #[error("source '{requested}' has no registered feed or policy")]
    UnregisteredSource { requested: EnergySource },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },

    #[error("config field '{field}' must be greater than zero")]
    ZeroConfigValue { field: &'static str },
    #[error("series length must be between 1 and {max}, got {value}")]
    InvalidSeriesLength { value: u16, max: u16 },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http client setup failed: {0}")]
    HttpSetup(String),
}
