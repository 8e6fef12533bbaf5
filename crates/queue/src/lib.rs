//! Durable download queue.
//!
//! Pending [`File`](wddl_model::File) records are stored as JSON in a single
//! `sled` tree keyed by file ID. Every operation touches one key (or one
//! read-only scan), so each is individually atomic and crash consistent;
//! no cross-operation transactions are needed.

mod queue;

pub use queue::{DEFAULT_POLL_INTERVAL, DiskQueue};

/// Errors produced by the queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("store error: {0}")]
    Store(#[from] sled::Error),

    #[error("record encoding error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("filter error: {0}")]
    Filter(#[source] std::io::Error),
}
