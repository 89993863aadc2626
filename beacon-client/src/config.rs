//! Configuration for Beacon Client

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};
use crate::store::DEFAULT_CACHE_NAME;

/// Tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Collector endpoint receiving batches
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Delay between the queue becoming non-empty and a send, in milliseconds
    #[serde(default = "default_cooldown")]
    pub cooldown_ms: u64,

    /// Directory holding the cache slot
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// File name of the cache slot
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Timeout for one collector request, in milliseconds
    #[serde(default = "default_timeout")]
    pub request_timeout_ms: u64,
}

fn default_endpoint() -> String { "http://127.0.0.1:8080".to_string() }
fn default_cooldown() -> u64 { 2000 }
fn default_cache_dir() -> PathBuf { PathBuf::from(".beacon") }
fn default_cache_name() -> String { DEFAULT_CACHE_NAME.to_string() }
fn default_timeout() -> u64 { 30000 }

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            cooldown_ms: default_cooldown(),
            cache_dir: default_cache_dir(),
            cache_name: default_cache_name(),
            request_timeout_ms: default_timeout(),
        }
    }
}

impl TrackerConfig {
    /// Defaults overlaid with `BEACON_*` environment variables
    ///
    /// Reads `BEACON_ENDPOINT`, `BEACON_COOLDOWN_MS`, `BEACON_CACHE_DIR` and
    /// `BEACON_REQUEST_TIMEOUT_MS`. Unparseable numbers keep the default.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(endpoint) = std::env::var("BEACON_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Some(ms) = std::env::var("BEACON_COOLDOWN_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.cooldown_ms = ms;
        }
        if let Ok(dir) = std::env::var("BEACON_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Some(ms) = std::env::var("BEACON_REQUEST_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.request_timeout_ms = ms;
        }

        config
    }

    /// Set the collector endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the cooldown
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown_ms = cooldown.as_millis() as u64;
        self
    }

    /// Set the cache directory
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Cooldown as a duration
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Full path of the cache slot
    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(&self.cache_name)
    }

    /// Check the configuration is usable
    ///
    /// A zero cooldown is rejected: failed batches are retried after one
    /// cooldown, so zero would resend to a failing collector in a tight loop.
    pub fn validate(&self) -> TrackerResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(TrackerError::Config("endpoint must not be empty".to_string()));
        }
        if self.cooldown_ms == 0 {
            return Err(TrackerError::Config("cooldown_ms must be greater than zero".to_string()));
        }
        if self.cache_name.is_empty() {
            return Err(TrackerError::Config("cache_name must not be empty".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(TrackerError::Config("request_timeout_ms must be greater than zero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_and_derived_values() {
        let config = TrackerConfig::default()
            .with_endpoint("http://collector.local/ingest")
            .with_cooldown(Duration::from_millis(250))
            .with_cache_dir("/var/lib/game")
            .with_request_timeout(Duration::from_secs(3));

        assert_eq!(config.cooldown(), Duration::from_millis(250));
        assert_eq!(config.request_timeout_ms, 3000);
        assert_eq!(config.cache_path(), PathBuf::from("/var/lib/game/analytics_cache"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unusable_values() {
        let mut config = TrackerConfig::default();
        config.cache_name.clear();
        assert!(config.validate().is_err());

        let config = TrackerConfig::default().with_request_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_document_keeps_other_defaults() {
        let config: TrackerConfig = serde_json::from_str(r#"{"cooldown_ms": 500}"#).unwrap();

        assert_eq!(config.cooldown_ms, 500);
        assert_eq!(config.endpoint, "http://127.0.0.1:8080");
        assert_eq!(config.cache_dir, PathBuf::from(".beacon"));
    }
}
