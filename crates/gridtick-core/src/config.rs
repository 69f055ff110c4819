//! Acquisition-layer configuration.
//!
//! # Environment Variables
//!
//! | Setting | Primary Env Var | Fallback Env Var |
//! |---------|----------------|------------------|
//! | EIA api key | `GRIDTICK_EIA_API_KEY` | `ENERGY_API_KEY` |
//! | EIA endpoint | `GRIDTICK_EIA_ENDPOINT` | - |
//!
//! Durations are written as integer milliseconds (`*_ms` keys) in JSON.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CAPACITY;
use crate::domain::duration_ms;
use crate::fallback::DEFAULT_FALLBACK_TTL;
use crate::feed::EIA_DEFAULT_ENDPOINT;
use crate::health::DEFAULT_DOWN_THRESHOLD;
use crate::http_client::HttpClientConfig;
use crate::retry::DEFAULT_RETRY_AFTER_CAP;
use crate::{CoreError, PolicyTable, SeriesQuery, ValidationError};

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub endpoint: String,
    /// Opaque credential; never serialized back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub policies: PolicyTable,
    pub cache_capacity: usize,
    #[serde(rename = "fallback_ttl_ms", with = "duration_ms")]
    pub fallback_ttl: Duration,
    pub down_threshold: u32,
    pub query: SeriesQuery,
    #[serde(rename = "connect_timeout_ms", with = "duration_ms")]
    pub connect_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    /// Client-side pacing for the shared credential; `0` disables it.
    pub requests_per_minute: u32,
    #[serde(rename = "retry_after_cap_ms", with = "duration_ms")]
    pub retry_after_cap: Duration,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from(EIA_DEFAULT_ENDPOINT),
            api_key: None,
            policies: PolicyTable::default(),
            cache_capacity: DEFAULT_CAPACITY,
            fallback_ttl: DEFAULT_FALLBACK_TTL,
            down_threshold: DEFAULT_DOWN_THRESHOLD,
            query: SeriesQuery::default(),
            connect_timeout: Duration::from_secs(5),
            pool_max_idle_per_host: 10,
            requests_per_minute: 60,
            retry_after_cap: DEFAULT_RETRY_AFTER_CAP,
        }
    }
}

impl std::fmt::Debug for AcquisitionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquisitionConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("policies", &self.policies)
            .field("cache_capacity", &self.cache_capacity)
            .field("fallback_ttl", &self.fallback_ttl)
            .field("down_threshold", &self.down_threshold)
            .field("query", &self.query)
            .field("connect_timeout", &self.connect_timeout)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .field("requests_per_minute", &self.requests_per_minute)
            .field("retry_after_cap", &self.retry_after_cap)
            .finish()
    }
}

impl AcquisitionConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| env::var(name).ok())
    }

    /// Applies overrides from `lookup`; empty values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(key) = non_empty("GRIDTICK_EIA_API_KEY").or_else(|| non_empty("ENERGY_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(endpoint) = non_empty("GRIDTICK_EIA_ENDPOINT") {
            self.endpoint = endpoint;
        }
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.cache_capacity == 0 {
            return Err(ValidationError::ZeroConfigValue {
                field: "cache_capacity",
            });
        }
        if self.down_threshold == 0 {
            return Err(ValidationError::ZeroConfigValue {
                field: "down_threshold",
            });
        }
        if self.fallback_ttl.is_zero() {
            return Err(ValidationError::ZeroConfigValue {
                field: "fallback_ttl_ms",
            });
        }
        if self.connect_timeout.is_zero() {
            return Err(ValidationError::ZeroConfigValue {
                field: "connect_timeout_ms",
            });
        }
        self.query.validate()?;
        self.policies.validate()
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            connect_timeout: self.connect_timeout,
            pool_max_idle_per_host: self.pool_max_idle_per_host,
            ..HttpClientConfig::default()
        }
    }
}
