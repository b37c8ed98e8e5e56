//! Environment-driven configuration.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use gatehouse_observability::{LogFormat, UnknownLogFormat};

pub const SNAPSHOT_VAR: &str = "GATEHOUSE_SNAPSHOT";
pub const CACHE_TTL_VAR: &str = "GATEHOUSE_PERMISSION_CACHE_TTL_SECS";
pub const LOG_FORMAT_VAR: &str = "GATEHOUSE_LOG_FORMAT";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer number of seconds, got '{value}'")]
    InvalidTtl { var: &'static str, value: String },

    #[error("{var}: {source}")]
    InvalidLogFormat {
        var: &'static str,
        #[source]
        source: UnknownLogFormat,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatehouseConfig {
    /// Directory snapshot to load, if any.
    pub snapshot_path: Option<PathBuf>,
    /// TTL of the effective-permission cache; `None` disables it.
    pub permission_cache_ttl: Option<Duration>,
    pub log_format: LogFormat,
}

impl GatehouseConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup` (env-like: name → value).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let snapshot_path = lookup(SNAPSHOT_VAR)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let permission_cache_ttl = match lookup(CACHE_TTL_VAR) {
            None => None,
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidTtl {
                    var: CACHE_TTL_VAR,
                    value: raw.clone(),
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
        };

        let log_format = match lookup(LOG_FORMAT_VAR) {
            Some(raw) => raw.parse().map_err(|source| ConfigError::InvalidLogFormat {
                var: LOG_FORMAT_VAR,
                source,
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            snapshot_path,
            permission_cache_ttl,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = GatehouseConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, GatehouseConfig::default());
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn reads_every_variable() {
        let config = GatehouseConfig::from_lookup(lookup(&[
            (SNAPSHOT_VAR, "/etc/gatehouse/directory.json"),
            (CACHE_TTL_VAR, "30"),
            (LOG_FORMAT_VAR, "pretty"),
        ]))
        .unwrap();
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/etc/gatehouse/directory.json")));
        assert_eq!(config.permission_cache_ttl, Some(Duration::from_secs(30)));
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn zero_ttl_disables_the_cache() {
        let config = GatehouseConfig::from_lookup(lookup(&[(CACHE_TTL_VAR, "0")])).unwrap();
        assert_eq!(config.permission_cache_ttl, None);
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(matches!(
            GatehouseConfig::from_lookup(lookup(&[(CACHE_TTL_VAR, "-5")])),
            Err(ConfigError::InvalidTtl { .. })
        ));
        assert!(matches!(
            GatehouseConfig::from_lookup(lookup(&[(LOG_FORMAT_VAR, "xml")])),
            Err(ConfigError::InvalidLogFormat { .. })
        ));
    }
}
