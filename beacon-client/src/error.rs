//! Error types for Beacon Client
//!
//! Every failure on the track/deliver path is absorbed where it happens and
//! only logged. These types exist so each boundary can say *what* failed.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for persistent store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Result type for reading the cache back
pub type RestoreResult<T> = Result<T, RestoreError>;

/// Result type for delivery attempts
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Result type for tracker construction
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Errors raised by a persistent store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Writing the cache slot failed
    #[error("Failed to write cache slot {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the cache slot failed
    #[error("Failed to read cache slot {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The platform durability hook reported a failure
    #[error("Durability commit failed: {0}")]
    Commit(String),
}

/// Errors raised while encoding or decoding a cache document
#[derive(Error, Debug)]
pub enum CodecError {
    /// The input is not a JSON document at all
    #[error("Malformed document: {0}")]
    MalformedDocument(#[source] serde_json::Error),

    /// Serializing the pending events failed
    #[error("Encoding failed: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Why cached events could not be restored
#[derive(Error, Debug)]
pub enum RestoreError {
    /// The slot could not be read
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The slot content is not a JSON document
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Errors raised by a single delivery attempt
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The collector answered with something other than 200
    #[error("Collector rejected batch with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The request never produced a response (connect, timeout, ...)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The batch could not be encoded
    #[error("Batch encoding failed: {0}")]
    Codec(#[from] CodecError),
}

/// Errors that can occur while building a tracker
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Configuration is unusable
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// HTTP client could not be constructed
    #[error("Transport setup failed: {0}")]
    Transport(String),
}
