//! Beacon Track CLI - record events and deliver them to a collector
//!
//! Usage:
//!     beacon-track levelStart=level:3 getReward=coins:100
//!     beacon-track --demo --endpoint http://127.0.0.1:8080
//!     beacon-track --wait-secs 0          # only queue and cache, no delivery

use std::path::PathBuf;
use std::time::Duration;

use beacon_client::{Tracker, TrackerConfig};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEMO_EVENTS: [(&str, &str); 3] = [
    ("levelStart", "level:3"),
    ("getReward", "coins:100"),
    ("coinSpent", "count:3"),
];

#[derive(Parser, Debug)]
#[command(name = "beacon-track")]
#[command(about = "Track analytics events and deliver them to a Beacon collector")]
#[command(version)]
struct Args {
    /// Events to track, as TYPE=DATA
    events: Vec<String>,

    /// Collector endpoint (default: BEACON_ENDPOINT or http://127.0.0.1:8080)
    #[arg(long)]
    endpoint: Option<String>,

    /// Cooldown before each send, in milliseconds
    #[arg(long)]
    cooldown_ms: Option<u64>,

    /// Directory holding the cache slot
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Seconds to keep delivering before exiting
    #[arg(long, default_value_t = 10)]
    wait_secs: u64,

    /// Track the three demo events
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beacon_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = TrackerConfig::from_env();
    if let Some(endpoint) = args.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(ms) = args.cooldown_ms {
        config.cooldown_ms = ms;
    }
    if let Some(dir) = args.cache_dir {
        config.cache_dir = dir;
    }

    let mut events = Vec::with_capacity(args.events.len() + DEMO_EVENTS.len());
    if args.demo {
        events.extend(DEMO_EVENTS.iter().map(|(t, d)| (t.to_string(), d.to_string())));
    }
    for raw in &args.events {
        match raw.split_once('=') {
            Some((event_type, data)) => events.push((event_type.to_string(), data.to_string())),
            None => return Err(format!("expected TYPE=DATA, got '{}'", raw).into()),
        }
    }

    let tracker = Tracker::new(config)?;
    if tracker.pending_count() > 0 {
        tracing::info!("{} event(s) carried over from the last run", tracker.pending_count());
    }

    for (event_type, data) in events {
        tracker.track_event(event_type, data);
    }

    if args.wait_secs == 0 {
        tracing::info!("{} event(s) cached, delivery skipped", tracker.pending_count());
        return Ok(());
    }

    let delivery = tracker.start()?;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(args.wait_secs);

    while tracker.pending_count() > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let stats = delivery.stats();
    delivery.shutdown().await;

    tracing::info!(
        "Done: {} delivered in {} request(s), {} failed request(s), {} still pending",
        stats.events_delivered,
        stats.successes,
        stats.failures,
        tracker.pending_count()
    );

    Ok(())
}
