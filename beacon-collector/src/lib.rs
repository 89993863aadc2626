//! Beacon Collector - mock analytics collector
//!
//! A test double for the HTTP endpoint Beacon clients deliver batches to.
//! It accepts any method on any path, logs the caller and raw body, and
//! answers `200 OK` or `400 Bad request` according to a [`FailurePolicy`].
//! Every response carries permissive CORS headers so browser builds can post
//! to it directly.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │               CollectorServer                 │
//! │  ┌─────────────────────────────────────────┐  │
//! │  │  AppState                               │  │
//! │  │  FailurePolicy + request counter + log  │  │
//! │  └─────────────────────────────────────────┘  │
//! │                      │                        │
//! │              any method, any path             │
//! │                      ▼                        │
//! │           routes::ingest → 200 / 400          │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! Integration tests bind port 0 and hand the listener to
//! [`CollectorServer::serve`], then read [`CollectorServer::requests`].

pub mod routes;
mod config;

pub use config::{CollectorConfig, CollectorConfigBuilder, FailurePolicy};

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::net::TcpListener;

/// One request as the collector saw it
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    /// HTTP method
    pub method: String,
    /// Request path
    pub path: String,
    /// `X-Forwarded-For` if present, else the peer address
    pub caller: String,
    /// Raw body, lossily decoded as UTF-8
    pub body: String,
    /// Status the collector answered with
    pub status: u16,
    /// Arrival time
    pub received_at: DateTime<Utc>,
}

/// Shared application state
pub struct AppState {
    policy: FailurePolicy,
    request_count: AtomicU64,
    requests: Mutex<Vec<ReceivedRequest>>,
}

impl AppState {
    /// Create new app state with the given failure policy
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            policy,
            request_count: AtomicU64::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Take the next request index and decide whether it fails
    pub(crate) fn next_should_fail(&self) -> bool {
        let index = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.policy.should_fail(index)
    }

    pub(crate) fn record(&self, request: ReceivedRequest) {
        self.requests.lock().push(request);
    }
}

/// Mock collector HTTP server
///
/// # Example
///
/// ```rust,ignore
/// use beacon_collector::{CollectorConfig, CollectorServer, FailurePolicy};
///
/// #[tokio::main]
/// async fn main() {
///     let config = CollectorConfig::builder()
///         .port(8080)
///         .failure(FailurePolicy::Rate(0.3))
///         .build();
///
///     CollectorServer::new(config).run().await.unwrap();
/// }
/// ```
pub struct CollectorServer {
    state: Arc<AppState>,
    config: CollectorConfig,
}

impl CollectorServer {
    /// Create a new collector
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            state: Arc::new(AppState::new(config.failure)),
            config,
        }
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        routes::create_router(Arc::clone(&self.state))
    }

    /// Get the socket address for the server
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.config.host, self.config.port)
    }

    /// Requests received so far, in arrival order
    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.state.requests.lock().clone()
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> u64 {
        self.state.request_count.load(Ordering::SeqCst)
    }

    /// Serve on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        let app = self.router();
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }

    /// Bind the configured address and serve
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.addr();
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server is running on http://{}", addr);
        tracing::info!("Failure policy: {:?}", self.config.failure);

        self.serve(listener).await?;
        Ok(())
    }
}
