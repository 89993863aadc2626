//! Producer-facing tracker

use std::sync::Arc;

use crate::cache::{CacheStats, EventCache};
use crate::config::TrackerConfig;
use crate::delivery::{DeliveryHandle, DeliveryLoop};
use crate::error::TrackerResult;
use crate::event::Event;
use crate::queue::{EventQueue, QueueStats};
use crate::store::{FileStore, PersistentStore};
use crate::transport::{Collector, HttpCollector};

/// Entry point for recording analytics events
///
/// Cloning is cheap; every clone feeds the same queue and cache.
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    config: TrackerConfig,
    queue: Arc<EventQueue>,
    cache: Arc<EventCache>,
}

impl Tracker {
    /// Create a tracker whose cache slot lives in `config.cache_dir`
    ///
    /// Cached events from a previous run are queued before this returns.
    pub fn new(config: TrackerConfig) -> TrackerResult<Self> {
        let store = FileStore::new(config.cache_dir.clone(), &config.cache_name);
        Self::with_store(config, Arc::new(store))
    }

    /// Create a tracker over a custom store
    ///
    /// `config` is validated the same way as in [`Tracker::new`].
    pub fn with_store(
        config: TrackerConfig,
        store: Arc<dyn PersistentStore>,
    ) -> TrackerResult<Self> {
        config.validate()?;

        let queue = Arc::new(EventQueue::new());
        let cache = Arc::new(EventCache::new(store));
        cache.restore_into(&queue);

        Ok(Self {
            inner: Arc::new(TrackerInner {
                config,
                queue,
                cache,
            }),
        })
    }

    /// Record one event
    ///
    /// The whole queue is re-encoded and saved before this returns, so an
    /// event is only at risk if the process dies during that save. A failed
    /// save is logged; the event still stays queued in memory.
    pub fn track_event(&self, event_type: impl Into<String>, data: impl Into<String>) {
        let event = Event::new(event_type, data);
        tracing::trace!("Tracking {}: {}", event.event_type, event.data);

        self.inner.queue.add(event);
        self.inner.cache.persist(&self.inner.queue);
    }

    /// Start delivering to the configured HTTP endpoint
    ///
    /// Must be called from within a tokio runtime. Each call spawns a new
    /// loop, so call it once per tracker.
    pub fn start(&self) -> TrackerResult<DeliveryHandle> {
        let collector = HttpCollector::from_config(&self.inner.config)?;
        tracing::info!("Delivering analytics events to {}", collector.endpoint());
        Ok(self.start_with_collector(Arc::new(collector)))
    }

    /// Start delivering through a custom collector
    pub fn start_with_collector(&self, collector: Arc<dyn Collector>) -> DeliveryHandle {
        self.delivery_loop(collector).spawn()
    }

    /// Build a delivery loop without spawning it
    ///
    /// Hosts that schedule delivery themselves can drive it with
    /// [`DeliveryLoop::run_cycle`].
    pub fn delivery_loop(&self, collector: Arc<dyn Collector>) -> DeliveryLoop {
        DeliveryLoop::new(
            Arc::clone(&self.inner.queue),
            Arc::clone(&self.inner.cache),
            collector,
            self.inner.config.cooldown(),
        )
    }

    /// Number of events not yet acknowledged
    pub fn pending_count(&self) -> usize {
        self.inner.queue.len()
    }

    /// Events not yet acknowledged, oldest first
    pub fn pending_events(&self) -> Vec<Event> {
        self.inner.queue.events()
    }

    /// Get queue statistics
    pub fn queue_stats(&self) -> QueueStats {
        self.inner.queue.stats()
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Tracker configuration
    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }
}
