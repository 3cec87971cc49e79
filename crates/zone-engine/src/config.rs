//! Engine configuration.
//!
//! Read from the environment, falling back to defaults:
//!
//! - `ZONES_CACHE_CAPACITY` - soft capacity of each domain's query cache
//! - `ZONES_TRIM_INTERVAL_MS` - period of the cache maintenance task

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const CACHE_CAPACITY_VAR: &str = "ZONES_CACHE_CAPACITY";
const TRIM_INTERVAL_VAR: &str = "ZONES_TRIM_INTERVAL_MS";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Entries each domain cache trims down to.
    pub cache_capacity: usize,
    /// Milliseconds between cache trims.
    pub trim_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 100_000,
            trim_interval_ms: 10_000,
        }
    }
}

impl EngineConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = var(CACHE_CAPACITY_VAR) {
            let size: i64 = raw.trim().parse().map_err(|_| ConfigError::Parse {
                var: CACHE_CAPACITY_VAR,
                value: raw.clone(),
            })?;
            config.cache_capacity =
                usize::try_from(size).map_err(|_| ConfigError::NegativeCacheSize(size))?;
        }

        if let Some(raw) = var(TRIM_INTERVAL_VAR) {
            config.trim_interval_ms = raw.trim().parse().map_err(|_| ConfigError::Parse {
                var: TRIM_INTERVAL_VAR,
                value: raw.clone(),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trim_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }

    #[must_use]
    pub const fn trim_interval(&self) -> Duration {
        Duration::from_millis(self.trim_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let pairs = pairs.to_vec();
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v).to_owned())
        }
    }

    #[test]
    fn test_defaults_without_vars() {
        assert_eq!(EngineConfig::from_vars(|_| None), Ok(EngineConfig::default()));
    }

    #[test]
    fn test_reads_vars() {
        let config = EngineConfig::from_vars(vars(&[
            ("ZONES_CACHE_CAPACITY", "512"),
            ("ZONES_TRIM_INTERVAL_MS", " 250 "),
        ]))
        .unwrap();

        assert_eq!(config.cache_capacity, 512);
        assert_eq!(config.trim_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert_eq!(
            EngineConfig::from_vars(vars(&[("ZONES_CACHE_CAPACITY", "-1")])),
            Err(ConfigError::NegativeCacheSize(-1))
        );
        assert_eq!(
            EngineConfig::from_vars(vars(&[("ZONES_TRIM_INTERVAL_MS", "0")])),
            Err(ConfigError::ZeroInterval)
        );
        assert!(matches!(
            EngineConfig::from_vars(vars(&[("ZONES_CACHE_CAPACITY", "lots")])),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{ "cache_capacity": 64 }"#).unwrap();

        assert_eq!(config.cache_capacity, 64);
        assert_eq!(config.trim_interval_ms, EngineConfig::default().trim_interval_ms);
    }
}
