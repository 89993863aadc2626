//! Tracked events and their occurrence identity

use std::fmt;

use serde::{Deserialize, Serialize};

/// One tracked occurrence: a type label and an opaque payload
///
/// Two `Event`s with equal fields are still distinct occurrences once they
/// are in a queue; identity there is the [`EventId`], never the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    /// Event type label
    #[serde(rename = "type")]
    pub event_type: String,

    /// Opaque payload
    pub data: String,
}

impl Event {
    /// Create a new event
    pub fn new(event_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            data: data.into(),
        }
    }
}

/// Identity of one occurrence inside an [`EventQueue`](crate::queue::EventQueue)
///
/// Minted from a monotonic counter, never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub(crate) u64);

impl EventId {
    /// Raw identifier value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "evt-{}", self.0)
    }
}
