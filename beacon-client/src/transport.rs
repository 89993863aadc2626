//! Collector transports
//!
//! The collector contract is deliberately thin: a POST of the encoded batch
//! succeeds on HTTP 200 and fails on anything else.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use crate::config::TrackerConfig;
use crate::error::{DeliveryError, DeliveryResult, TrackerError, TrackerResult};

/// Destination for encoded batches
#[async_trait]
pub trait Collector: Send + Sync {
    /// Backend name
    fn name(&self) -> &str;

    /// Deliver one encoded batch
    ///
    /// `Ok` means the collector acknowledged every event in `body`.
    async fn deliver(&self, body: Vec<u8>) -> DeliveryResult<()>;
}

/// HTTP collector client
#[derive(Debug, Clone)]
pub struct HttpCollector {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpCollector {
    /// Create a collector for `endpoint` with an explicit request timeout
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> TrackerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TrackerError::Transport(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    /// Create a collector from tracker configuration
    pub fn from_config(config: &TrackerConfig) -> TrackerResult<Self> {
        Self::new(
            config.endpoint.clone(),
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    /// Collector endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Collector for HttpCollector {
    fn name(&self) -> &str {
        "http"
    }

    async fn deliver(&self, body: Vec<u8>) -> DeliveryResult<()> {
        tracing::debug!(
            "POST to {}: {}",
            self.endpoint,
            String::from_utf8_lossy(&body)
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        // The body is informational only; a failed read must not turn a 200 into a retry
        let text = response.text().await.unwrap_or_default();

        if status == StatusCode::OK {
            tracing::debug!("Response: {}", text);
            Ok(())
        } else {
            Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body: text,
            })
        }
    }
}
