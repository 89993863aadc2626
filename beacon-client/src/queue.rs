//! Pending event queue
//!
//! The queue is a set of live occurrences keyed by [`EventId`]. A delivery
//! attempt works on a [`Batch`] (a copy taken by [`EventQueue::snapshot`]) and
//! afterwards removes exactly those ids, so anything added while the request
//! was in flight stays queued.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::event::{Event, EventId};

/// Queue statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    /// Number of events currently pending
    pub pending_count: usize,

    /// Total events ever added
    pub total_added: u64,

    /// Total events removed after acknowledgment
    pub total_removed: u64,
}

/// Immutable copy of the pending set taken for one delivery attempt
#[derive(Debug, Clone, Default)]
pub struct Batch {
    entries: Vec<(EventId, Event)>,
}

impl Batch {
    /// Number of events in the batch
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identities of the batched occurrences
    pub fn ids(&self) -> impl Iterator<Item = EventId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// The batched events
    pub fn events(&self) -> impl Iterator<Item = &Event> + '_ {
        self.entries.iter().map(|(_, event)| event)
    }

    /// Check whether an occurrence is part of this batch
    pub fn contains(&self, id: EventId) -> bool {
        // entries are taken from a BTreeMap, so they are sorted by id
        self.entries.binary_search_by_key(&id, |(id, _)| *id).is_ok()
    }
}

#[derive(Debug, Default)]
struct QueueInner {
    next_id: u64,
    live: BTreeMap<EventId, Event>,
}

/// In-memory set of events not yet acknowledged by the collector
///
/// All operations take one internal lock, so producers on any thread may
/// call [`add`](Self::add) while the delivery loop snapshots and reconciles.
#[derive(Debug, Default)]
pub struct EventQueue {
    inner: Mutex<QueueInner>,
    not_empty: Notify,
    total_added: AtomicU64,
    total_removed: AtomicU64,
}

impl EventQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event as a new occurrence
    pub fn add(&self, event: Event) -> EventId {
        let id = {
            let mut inner = self.inner.lock();
            let id = EventId(inner.next_id);
            inner.next_id += 1;
            inner.live.insert(id, event);
            id
        };

        self.total_added.fetch_add(1, Ordering::SeqCst);
        self.not_empty.notify_one();
        id
    }

    /// Copy the current pending set into a batch
    pub fn snapshot(&self) -> Batch {
        let inner = self.inner.lock();
        Batch {
            entries: inner
                .live
                .iter()
                .map(|(id, event)| (*id, event.clone()))
                .collect(),
        }
    }

    /// Remove every occurrence in `batch` that is still live
    ///
    /// Returns how many were removed. Events added after the snapshot are
    /// untouched.
    pub fn remove_all(&self, batch: &Batch) -> usize {
        let removed = {
            let mut inner = self.inner.lock();
            batch
                .ids()
                .filter(|id| inner.live.remove(id).is_some())
                .count()
        };

        self.total_removed.fetch_add(removed as u64, Ordering::SeqCst);
        removed
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        self.inner.lock().live.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.inner.lock().live.is_empty()
    }

    /// Check whether an occurrence is still pending
    pub fn contains(&self, id: EventId) -> bool {
        self.inner.lock().live.contains_key(&id)
    }

    /// Pending events, oldest first
    pub fn events(&self) -> Vec<Event> {
        self.inner.lock().live.values().cloned().collect()
    }

    /// Wait until at least one event is pending
    pub async fn wait_non_empty(&self) {
        loop {
            let notified = self.not_empty.notified();
            if !self.is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Get queue statistics
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending_count: self.len(),
            total_added: self.total_added.load(Ordering::SeqCst),
            total_removed: self.total_removed.load(Ordering::SeqCst),
        }
    }
}
