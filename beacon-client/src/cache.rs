//! Durable mirror of the pending queue
//!
//! [`EventCache`] joins the codec and a [`PersistentStore`]. Every save goes
//! through one lock and snapshots the queue *inside* it, so two writers can
//! never leave an older snapshot on disk after a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{RestoreError, RestoreResult, StoreError};
use crate::event::Event;
use crate::queue::EventQueue;
use crate::store::PersistentStore;

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    /// Store backend name
    pub backend: String,

    /// Successful saves
    pub saves: u64,

    /// Failed saves
    pub save_failures: u64,

    /// Last successful save
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_saved_at: Option<DateTime<Utc>>,
}

/// Serialized persist/restore path for the pending queue
pub struct EventCache {
    store: Arc<dyn PersistentStore>,
    write_lock: Mutex<()>,
    saves: AtomicU64,
    save_failures: AtomicU64,
    last_saved_at: RwLock<Option<DateTime<Utc>>>,
}

impl EventCache {
    /// Create a cache over the given store
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
            saves: AtomicU64::new(0),
            save_failures: AtomicU64::new(0),
            last_saved_at: RwLock::new(None),
        }
    }

    /// Write the current queue contents to the store
    ///
    /// Failures are logged and counted, never returned: the queue keeps
    /// running in memory until the next successful save.
    pub fn persist(&self, queue: &EventQueue) -> bool {
        let _guard = self.write_lock.lock();

        let batch = queue.snapshot();
        let bytes = match codec::encode(batch.events()) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.save_failures.fetch_add(1, Ordering::SeqCst);
                tracing::warn!("Save events to persistent cache failed: {}", e);
                return false;
            }
        };

        tracing::debug!(
            "Save to persistent ({}): {}",
            self.store.name(),
            String::from_utf8_lossy(&bytes)
        );

        match self.store.save(&bytes) {
            Ok(()) => {
                self.saves.fetch_add(1, Ordering::SeqCst);
                *self.last_saved_at.write() = Some(Utc::now());
                true
            }
            Err(e) => {
                self.save_failures.fetch_add(1, Ordering::SeqCst);
                log_write_failure(&e);
                false
            }
        }
    }

    /// Read cached events back
    ///
    /// A slot that was never written yields no events.
    pub fn load_events(&self) -> RestoreResult<Vec<Event>> {
        let Some(bytes) = self.store.load()? else {
            return Ok(Vec::new());
        };

        let events = codec::decode(&bytes)?;
        tracing::debug!(
            "Restore from persistent ({}): {}",
            self.store.name(),
            String::from_utf8_lossy(&bytes)
        );
        Ok(events)
    }

    /// Seed `queue` with cached events, returning how many were added
    ///
    /// Unreadable or malformed cache content degrades to an empty start.
    pub fn restore_into(&self, queue: &EventQueue) -> usize {
        match self.load_events() {
            Ok(events) => {
                let count = events.len();
                for event in events {
                    queue.add(event);
                }
                if count > 0 {
                    tracing::info!("Restored {} pending event(s) from cache", count);
                }
                count
            }
            Err(RestoreError::Codec(e)) => {
                tracing::warn!("Cached events are malformed, starting empty: {}", e);
                0
            }
            Err(RestoreError::Store(e)) => {
                tracing::warn!("Restore events from persistent cache failed: {}", e);
                0
            }
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            backend: self.store.name().to_string(),
            saves: self.saves.load(Ordering::SeqCst),
            save_failures: self.save_failures.load(Ordering::SeqCst),
            last_saved_at: *self.last_saved_at.read(),
        }
    }
}

fn log_write_failure(error: &StoreError) {
    match error {
        StoreError::Commit(reason) => {
            tracing::warn!("Cache written but durability commit failed: {}", reason)
        }
        other => tracing::warn!("Save events to persistent cache failed: {}", other),
    }
}
