//! Beacon Client - durable analytics event batching and delivery
//!
//! The client is the application-side half of Beacon:
//! - Records named events with opaque payloads
//! - Mirrors the pending queue into a single cache slot on every change
//! - Sends pending events to a collector in cooldown-spaced batches
//! - Removes only what the collector acknowledged with HTTP 200
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      BEACON CLIENT                          │
//! │                                                             │
//! │   track_event ──► ┌─────────────┐ ──► ┌─────────────┐       │
//! │                   │ EventQueue  │     │ EventCache  │       │
//! │                   │ (live ids)  │     │ codec+store │       │
//! │                   └─────────────┘     └─────────────┘       │
//! │                      ▲      │                ▲              │
//! │          remove_all  │      │ snapshot       │ persist      │
//! │                      │      ▼                │              │
//! │                   ┌──────────────────────────┴──┐           │
//! │                   │        DeliveryLoop         │           │
//! │                   │ Idle → Cooldown → Sending   │           │
//! │                   └─────────────────────────────┘           │
//! │                                  │                          │
//! │                          ┌───────▼───────┐                  │
//! │                          │   Collector   │  POST, 200 = ack │
//! │                          └───────────────┘                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use beacon_client::{Tracker, TrackerConfig};
//!
//! let tracker = Tracker::new(TrackerConfig::from_env())?;
//! let delivery = tracker.start()?;
//!
//! tracker.track_event("levelStart", "level:3");
//! tracker.track_event("getReward", "coins:100");
//!
//! // ... on exit
//! delivery.shutdown().await;
//! ```
//!
//! ## Durability
//!
//! Delivery is at-least-once while the process lives. Across a crash, an event
//! survives if the save that follows its `track_event` completed. The window
//! between queueing an event and finishing that save is not covered.

pub mod cache;
pub mod codec;
pub mod config;
pub mod delivery;
pub mod error;
pub mod event;
pub mod queue;
pub mod store;
pub mod tracker;
pub mod transport;

pub use cache::{CacheStats, EventCache};
pub use config::TrackerConfig;
pub use delivery::{CycleOutcome, DeliveryHandle, DeliveryLoop, DeliveryState, DeliveryStats};
pub use error::{CodecError, DeliveryError, RestoreError, StoreError, TrackerError, TrackerResult};
pub use event::{Event, EventId};
pub use queue::{Batch, EventQueue, QueueStats};
pub use store::{DurabilityHook, FileStore, MemoryStore, NoopDurabilityHook, PersistentStore};
pub use tracker::Tracker;
pub use transport::{Collector, HttpCollector};
