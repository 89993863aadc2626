//! Beacon Collector Binary
//!
//! Mock collector for exercising Beacon clients, including their retry path.
//!
//! ## Usage
//!
//! ```bash
//! # Start with defaults (127.0.0.1:8080, ~30% of requests rejected)
//! beacon-collector
//!
//! # Custom port, never fail
//! BEACON_COLLECTOR_PORT=9000 BEACON_COLLECTOR_FAILURE=never beacon-collector
//!
//! # Reject the first three requests
//! BEACON_COLLECTOR_FAILURE=first:3 beacon-collector
//! ```

use std::net::IpAddr;

use beacon_collector::{CollectorConfig, CollectorServer, FailurePolicy};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beacon_collector=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration from environment
    let host: Option<IpAddr> = std::env::var("BEACON_COLLECTOR_HOST")
        .ok()
        .and_then(|h| h.parse().ok());

    let port: Option<u16> = std::env::var("BEACON_COLLECTOR_PORT")
        .ok()
        .and_then(|p| p.parse().ok());

    let failure: Option<FailurePolicy> = match std::env::var("BEACON_COLLECTOR_FAILURE") {
        Ok(raw) => Some(raw.parse()?),
        Err(_) => None,
    };

    let mut builder = CollectorConfig::builder();
    if let Some(host) = host {
        builder = builder.host(host);
    }
    if let Some(port) = port {
        builder = builder.port(port);
    }
    if let Some(failure) = failure {
        builder = builder.failure(failure);
    }

    tracing::info!("Starting Beacon Collector v{}", env!("CARGO_PKG_VERSION"));

    let server = CollectorServer::new(builder.build());
    server.run().await?;

    Ok(())
}
