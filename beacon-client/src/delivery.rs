//! Background delivery loop
//!
//! ```text
//!            queue non-empty          cooldown elapsed
//!   ┌──────┐ ──────────────► ┌──────────┐ ─────────────► ┌─────────┐
//!   │ Idle │                 │ Cooldown │                │ Sending │
//!   └──────┘ ◄────────────── └──────────┘ ◄───────────── └─────────┘
//!       ▲      (never)             ▲    failure, or 200 with    │
//!       │                          │    events still pending    │
//!       └──────────────────────────┴────────────────────────────┘
//!                         200 and queue drained
//! ```
//!
//! A cycle snapshots the queue, POSTs the batch and, on a 200 only, removes
//! exactly the batched ids and re-persists. A failed cycle changes nothing;
//! the next cycle resends the same events plus whatever arrived meanwhile.
//! The cooldown timer is not reset by events arriving during it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::cache::EventCache;
use crate::codec;
use crate::queue::EventQueue;
use crate::transport::Collector;

/// Where the loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    /// Nothing pending
    Idle,
    /// Waiting for the cooldown before sending
    Cooldown,
    /// A request is in flight
    Sending,
}

/// Result of one send attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing was pending, no request made
    Empty,
    /// The collector acknowledged the batch
    Delivered {
        /// Events removed from the queue
        count: usize,
    },
    /// The batch was rejected or never arrived; the queue is unchanged
    Failed,
}

/// Delivery statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryStats {
    /// Requests sent
    pub attempts: u64,

    /// Requests acknowledged with 200
    pub successes: u64,

    /// Requests that failed
    pub failures: u64,

    /// Events removed after acknowledgment
    pub events_delivered: u64,

    /// Last acknowledged request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_delivery_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct DeliveryCounters {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    events_delivered: AtomicU64,
    last_delivery_at: RwLock<Option<DateTime<Utc>>>,
}

impl DeliveryCounters {
    fn snapshot(&self) -> DeliveryStats {
        DeliveryStats {
            attempts: self.attempts.load(Ordering::SeqCst),
            successes: self.successes.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
            events_delivered: self.events_delivered.load(Ordering::SeqCst),
            last_delivery_at: *self.last_delivery_at.read(),
        }
    }
}

/// Cooldown-batched sender for the pending queue
pub struct DeliveryLoop {
    queue: Arc<EventQueue>,
    cache: Arc<EventCache>,
    collector: Arc<dyn Collector>,
    cooldown: Duration,
    counters: Arc<DeliveryCounters>,
    state_tx: watch::Sender<DeliveryState>,
}

impl DeliveryLoop {
    /// Create a loop over `queue`, persisting through `cache`
    pub fn new(
        queue: Arc<EventQueue>,
        cache: Arc<EventCache>,
        collector: Arc<dyn Collector>,
        cooldown: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(DeliveryState::Idle);
        Self {
            queue,
            cache,
            collector,
            cooldown,
            counters: Arc::new(DeliveryCounters::default()),
            state_tx,
        }
    }

    /// Run one send attempt immediately, without cooldown
    ///
    /// After a 200 the queue is re-persisted before this returns. That save
    /// is a blocking write and fsync on the task driving the cycle, so a slow
    /// store stalls the runtime worker for its duration.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let batch = self.queue.snapshot();
        if batch.is_empty() {
            return CycleOutcome::Empty;
        }

        self.counters.attempts.fetch_add(1, Ordering::SeqCst);

        let body = match codec::encode(batch.events()) {
            Ok(body) => body,
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::SeqCst);
                tracing::warn!("Failed to encode batch of {} event(s): {}", batch.len(), e);
                return CycleOutcome::Failed;
            }
        };

        match self.collector.deliver(body).await {
            Ok(()) => {
                let removed = self.queue.remove_all(&batch);
                self.cache.persist(&self.queue);

                self.counters.successes.fetch_add(1, Ordering::SeqCst);
                self.counters
                    .events_delivered
                    .fetch_add(removed as u64, Ordering::SeqCst);
                *self.counters.last_delivery_at.write() = Some(Utc::now());

                tracing::info!(
                    "Delivered {} event(s) via {}, {} still pending",
                    removed,
                    self.collector.name(),
                    self.queue.len()
                );
                CycleOutcome::Delivered { count: removed }
            }
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::SeqCst);
                tracing::warn!(
                    "Request error, keeping {} event(s) for retry: {}",
                    batch.len(),
                    e
                );
                CycleOutcome::Failed
            }
        }
    }

    /// Get delivery statistics
    pub fn stats(&self) -> DeliveryStats {
        self.counters.snapshot()
    }

    /// Spawn the loop on the current tokio runtime
    ///
    /// The loop only stops through [`DeliveryHandle::shutdown`]; dropping the
    /// handle detaches it.
    pub fn spawn(self) -> DeliveryHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let state_rx = self.state_tx.subscribe();
        let counters = Arc::clone(&self.counters);

        let handle = tokio::spawn(self.run(shutdown_rx));

        DeliveryHandle {
            handle,
            shutdown_tx,
            state_rx,
            counters,
        }
    }

    async fn run(self, mut shutdown: mpsc::Receiver<()>) {
        tracing::debug!(
            "Delivery loop started (collector: {}, cooldown: {:?})",
            self.collector.name(),
            self.cooldown
        );

        loop {
            if self.queue.is_empty() {
                self.set_state(DeliveryState::Idle);
                tokio::select! {
                    Some(()) = shutdown.recv() => break,
                    _ = self.queue.wait_non_empty() => {}
                }
            }

            self.set_state(DeliveryState::Cooldown);
            tokio::select! {
                Some(()) = shutdown.recv() => break,
                _ = tokio::time::sleep(self.cooldown) => {}
            }

            self.set_state(DeliveryState::Sending);
            tokio::select! {
                Some(()) = shutdown.recv() => break,
                _ = self.run_cycle() => {}
            }
        }

        tracing::debug!("Delivery loop stopped, {} event(s) pending", self.queue.len());
    }

    fn set_state(&self, state: DeliveryState) {
        self.state_tx.send_replace(state);
    }
}

/// Handle to a spawned delivery loop
pub struct DeliveryHandle {
    handle: JoinHandle<()>,
    shutdown_tx: mpsc::Sender<()>,
    state_rx: watch::Receiver<DeliveryState>,
    counters: Arc<DeliveryCounters>,
}

impl DeliveryHandle {
    /// Current loop state
    pub fn state(&self) -> DeliveryState {
        *self.state_rx.borrow()
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<DeliveryState> {
        self.state_rx.clone()
    }

    /// Get delivery statistics
    pub fn stats(&self) -> DeliveryStats {
        self.counters.snapshot()
    }

    /// Whether the loop task has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the loop at its next suspension point and wait for it to exit
    ///
    /// An in-flight request is abandoned; its events stay queued and cached.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.handle.await {
            tracing::warn!("Delivery loop task ended abnormally: {}", e);
        }
    }
}
