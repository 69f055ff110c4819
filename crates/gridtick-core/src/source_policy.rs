use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::duration_ms;
use crate::retry::Backoff;
use crate::{EnergySource, ValidationError};

/// Timeout, retry and caching treatment for one energy source.
///
/// Plain configuration record: sources that need different handling (coal)
/// get a different instance, not a different code path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePolicy {
    /// Hard limit for a single attempt.
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,
    /// Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    #[serde(rename = "backoff_base_ms", with = "duration_ms")]
    pub backoff_base: Duration,
    #[serde(rename = "max_backoff_ms", with = "duration_ms")]
    pub max_backoff: Duration,
    #[serde(default)]
    pub jitter: bool,
    #[serde(rename = "cache_ttl_ms", with = "duration_ms")]
    pub cache_ttl: Duration,
}

impl SourcePolicy {
    /// Policy shared by solar, wind and natural gas.
    pub fn standard() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            jitter: false,
            cache_ttl: Duration::from_secs(300),
        }
    }

    /// Coal reports are slow to publish upstream: longer timeout, one more retry.
    pub fn coal() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            max_retries: 4,
            ..Self::standard()
        }
    }

    pub fn analysis() -> Self {
        Self {
            max_retries: 2,
            backoff_base: Duration::from_secs(2),
            ..Self::standard()
        }
    }

    pub fn default_for(source: EnergySource) -> Self {
        match source {
            EnergySource::Coal => Self::coal(),
            EnergySource::AiAnalysis => Self::analysis(),
            EnergySource::Solar | EnergySource::Wind | EnergySource::NaturalGas => {
                Self::standard()
            }
        }
    }

    pub const fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Exponential doubling from `backoff_base`, capped at `max_backoff`.
    pub fn backoff(&self) -> Backoff {
        Backoff::Exponential {
            base: self.backoff_base,
            factor: 2.0,
            max: self.max_backoff,
            jitter: self.jitter,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout.is_zero() {
            return Err(ValidationError::ZeroConfigValue { field: "timeout_ms" });
        }
        if self.cache_ttl.is_zero() {
            return Err(ValidationError::ZeroConfigValue {
                field: "cache_ttl_ms",
            });
        }
        Ok(())
    }
}

/// Source-indexed policy lookup.
///
/// Deserializing reads per-source overrides on top of the default table, so a
/// config that names one source keeps the defaults for every other source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PolicyTable {
    policies: BTreeMap<EnergySource, SourcePolicy>,
}

impl<'de> Deserialize<'de> for PolicyTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let overrides = BTreeMap::<EnergySource, SourcePolicy>::deserialize(deserializer)?;
        let mut table = Self::default();
        table.policies.extend(overrides);
        Ok(table)
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            policies: EnergySource::ALL
                .into_iter()
                .map(|source| (source, SourcePolicy::default_for(source)))
                .collect(),
        }
    }
}

impl PolicyTable {
    pub fn empty() -> Self {
        Self {
            policies: BTreeMap::new(),
        }
    }

    pub fn with_policy(mut self, source: EnergySource, policy: SourcePolicy) -> Self {
        self.policies.insert(source, policy);
        self
    }

    pub fn get(&self, source: EnergySource) -> Option<&SourcePolicy> {
        self.policies.get(&source)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EnergySource, &SourcePolicy)> {
        self.policies.iter().map(|(source, policy)| (*source, policy))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.policies.values().try_for_each(SourcePolicy::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coal_policy_has_longer_timeout_and_extra_retry() {
        let standard = SourcePolicy::standard();
        let coal = SourcePolicy::coal();

        assert_eq!(standard.timeout, Duration::from_secs(15));
        assert_eq!(coal.timeout, Duration::from_secs(20));
        assert_eq!(coal.max_retries, standard.max_retries + 1);
        assert_eq!(coal.total_attempts(), 5);
        assert_eq!(coal.cache_ttl, standard.cache_ttl);
    }

    #[test]
    fn default_table_covers_every_source() {
        let table = PolicyTable::default();

        for source in EnergySource::ALL {
            assert!(table.get(source).is_some(), "missing policy for {source}");
        }
        assert_eq!(table.get(EnergySource::Coal), Some(&SourcePolicy::coal()));
        assert_eq!(
            table.get(EnergySource::Solar).map(|policy| policy.timeout),
            Some(Duration::from_secs(15))
        );
    }

    #[test]
    fn table_round_trips_through_json_keys() {
        let json = serde_json::to_value(PolicyTable::default()).expect("serializable");

        assert_eq!(json["coal"]["timeout_ms"], 20_000);
        assert_eq!(json["natural_gas"]["max_retries"], 3);
    }

    #[test]
    fn partial_table_keeps_defaults_for_unlisted_sources() {
        let table: PolicyTable = serde_json::from_str(
            r#"{"solar": {"timeout_ms": 2000, "max_retries": 0, "backoff_base_ms": 10, "max_backoff_ms": 10, "cache_ttl_ms": 1000}}"#,
        )
        .expect("valid table");

        assert_eq!(
            table.get(EnergySource::Solar).map(|policy| policy.timeout),
            Some(Duration::from_secs(2))
        );
        assert_eq!(table.get(EnergySource::Coal), Some(&SourcePolicy::coal()));
        assert_eq!(table.get(EnergySource::Wind), Some(&SourcePolicy::standard()));
        assert_eq!(
            table.get(EnergySource::AiAnalysis),
            Some(&SourcePolicy::analysis())
        );
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let policy = SourcePolicy {
            timeout: Duration::ZERO,
            ..SourcePolicy::standard()
        };
        assert_eq!(
            policy.validate(),
            Err(ValidationError::ZeroConfigValue { field: "timeout_ms" })
        );
    }
}
