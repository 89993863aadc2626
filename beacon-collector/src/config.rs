//! Collector configuration

use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

/// How the collector decides to reject a request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailurePolicy {
    /// Always answer 200
    Never,
    /// Always answer 400
    Always,
    /// Answer 400 to the first `n` requests, 200 afterwards
    FirstN(u64),
    /// Answer 400 with the given probability (0.0 to 1.0)
    Rate(f64),
}

impl FailurePolicy {
    /// Decide for the request with zero-based index `request_index`
    pub fn should_fail(&self, request_index: u64) -> bool {
        match *self {
            FailurePolicy::Never => false,
            FailurePolicy::Always => true,
            FailurePolicy::FirstN(n) => request_index < n,
            FailurePolicy::Rate(p) => rand::random::<f64>() < p.clamp(0.0, 1.0),
        }
    }
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Rate(0.3)
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    /// Parses `never`, `always`, `first:N` or a bare rate such as `0.3`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "never" => return Ok(FailurePolicy::Never),
            "always" => return Ok(FailurePolicy::Always),
            _ => {}
        }

        if let Some(n) = s.strip_prefix("first:") {
            return n
                .parse()
                .map(FailurePolicy::FirstN)
                .map_err(|e| format!("invalid request count '{}': {}", n, e));
        }

        match s.parse::<f64>() {
            Ok(p) if (0.0..=1.0).contains(&p) => Ok(FailurePolicy::Rate(p)),
            Ok(p) => Err(format!("failure rate {} is outside 0.0..=1.0", p)),
            Err(_) => Err(format!("unknown failure policy '{}'", s)),
        }
    }
}

/// Collector configuration
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Address to bind
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Failure injection
    pub failure: FailurePolicy,
}

impl CollectorConfig {
    /// Create a new configuration builder
    pub fn builder() -> CollectorConfigBuilder {
        CollectorConfigBuilder::default()
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            failure: FailurePolicy::default(),
        }
    }
}

/// Builder for CollectorConfig
#[derive(Debug, Default)]
pub struct CollectorConfigBuilder {
    host: Option<IpAddr>,
    port: Option<u16>,
    failure: Option<FailurePolicy>,
}

impl CollectorConfigBuilder {
    /// Set the bind address
    pub fn host(mut self, host: IpAddr) -> Self {
        self.host = Some(host);
        self
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the failure policy
    pub fn failure(mut self, failure: FailurePolicy) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Build the configuration
    pub fn build(self) -> CollectorConfig {
        let defaults = CollectorConfig::default();
        CollectorConfig {
            host: self.host.unwrap_or(defaults.host),
            port: self.port.unwrap_or(defaults.port),
            failure: self.failure.unwrap_or(defaults.failure),
        }
    }
}
