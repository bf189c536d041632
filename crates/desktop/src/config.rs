//! Client configuration, read from the environment.

use core::str::FromStr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use erpdesk_observability::LogFormat;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// What to do with a session restored from storage at startup.
///
/// A restored session is never checked against the backend during restore
/// itself; a revoked token is otherwise only discovered on the next failed
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestorePolicy {
    /// Accept the persisted user as-is.
    #[default]
    TrustCache,
    /// Accept it, then confirm it with `GET /profile/` right after startup.
    Revalidate,
}

impl FromStr for RestorePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trust-cache" | "trust_cache" | "cache" => Ok(RestorePolicy::TrustCache),
            "revalidate" => Ok(RestorePolicy::Revalidate),
            other => Err(ConfigError::Invalid {
                key: "ERPDESK_RESTORE_POLICY",
                message: format!("unknown restore policy '{other}'"),
            }),
        }
    }
}

/// Where persisted session state lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    /// Nothing survives the process.
    Memory,
    /// SQLite database in the given directory.
    Directory(PathBuf),
    /// SQLite database in the OS data directory.
    Default,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub storage: StorageLocation,
    /// `None` disables the timeout.
    pub request_timeout: Option<Duration>,
    pub restore_policy: RestorePolicy,
    pub log_format: LogFormat,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            storage: StorageLocation::Default,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            restore_policy: RestorePolicy::default(),
            log_format: LogFormat::Compact,
        }
    }
}

impl ClientConfig {
    /// Load from `ERPDESK_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (environment, test fixtures).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("ERPDESK_API_URL").filter(|v| !v.trim().is_empty()) {
            config.api_url = url.trim().trim_end_matches('/').to_string();
        }

        if let Some(dir) = lookup("ERPDESK_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            config.storage = if dir.trim() == ":memory:" {
                StorageLocation::Memory
            } else {
                StorageLocation::Directory(PathBuf::from(dir.trim()))
            };
        }

        if let Some(raw) = lookup("ERPDESK_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "ERPDESK_REQUEST_TIMEOUT_SECS",
                message: format!("{e}"),
            })?;
            config.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(raw) = lookup("ERPDESK_RESTORE_POLICY") {
            config.restore_policy = raw.parse()?;
        }

        if let Some(raw) = lookup("ERPDESK_LOG_FORMAT") {
            config.log_format = raw.parse().map_err(|message| ConfigError::Invalid {
                key: "ERPDESK_LOG_FORMAT",
                message,
            })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.storage, StorageLocation::Default);
        assert_eq!(config.request_timeout, Some(DEFAULT_REQUEST_TIMEOUT));
        assert_eq!(config.restore_policy, RestorePolicy::TrustCache);
    }

    #[test]
    fn reads_every_variable() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("ERPDESK_API_URL", "https://erp.example.com/api/"),
            ("ERPDESK_DATA_DIR", "/tmp/erpdesk"),
            ("ERPDESK_REQUEST_TIMEOUT_SECS", "0"),
            ("ERPDESK_RESTORE_POLICY", "revalidate"),
            ("ERPDESK_LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "https://erp.example.com/api");
        assert_eq!(config.storage, StorageLocation::Directory(PathBuf::from("/tmp/erpdesk")));
        assert_eq!(config.request_timeout, None);
        assert_eq!(config.restore_policy, RestorePolicy::Revalidate);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn memory_storage_marker() {
        let config = ClientConfig::from_lookup(lookup(&[("ERPDESK_DATA_DIR", ":memory:")])).unwrap();
        assert_eq!(config.storage, StorageLocation::Memory);
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(ClientConfig::from_lookup(lookup(&[("ERPDESK_REQUEST_TIMEOUT_SECS", "soon")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[("ERPDESK_RESTORE_POLICY", "never")])).is_err());
    }
}
