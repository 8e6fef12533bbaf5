//! Remote scanning and resumable partitioned file transfer.
//!
//! A download streams the missing byte range of a remote file into fixed-size
//! partition files (`1.part`, `2.part`, ...) inside the file's temp
//! directory. Partitions already on disk are reused, so an interrupted
//! transfer resumes where it stopped. Once every partition is present with
//! its exact size they are merged, the merged file is size-checked and then
//! published to the destination.

mod downloader;
mod merge;
mod partition;
mod scanner;
mod sweep;
mod writer;

#[cfg(test)]
mod testing;

use std::time::Duration;

pub use downloader::PartitionedDownloader;
pub use merge::{MERGE_FILE, merge_partitions, publish, validate_partitions};
pub use partition::{PartitionState, partition_path};
pub use scanner::RemoteScanner;
pub use sweep::RemoteSweeper;
pub use writer::PartitionWriter;

/// Default partition size: 64 MiB.
pub const DEFAULT_PARTITION_SIZE: u64 = 64 * 1024 * 1024;

/// Default read buffer size: 256 KiB.
pub const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("remote error: {0}")]
    Remote(#[from] wddl_remote::RemoteError),

    #[error("partition {index} incomplete: expected {expected} bytes, found {actual:?}")]
    IncompletePartitions {
        index: u64,
        expected: u64,
        actual: Option<u64>,
    },

    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("download of {id} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        id: String,
        attempts: u32,
        #[source]
        source: Box<TransferError>,
    },
}

/// Tunables of the partitioned downloader.
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Size of every partition but the last.
    pub partition_size: u64,
    /// Delay before the first attempt.
    pub warmup: Duration,
    /// Total attempts per download.
    pub max_attempts: u32,
    /// Wait after the first failed attempt; doubles on each further failure.
    pub backoff_base: Duration,
    /// Read buffer size while streaming.
    pub buffer_size: usize,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            partition_size: DEFAULT_PARTITION_SIZE,
            warmup: Duration::from_secs(3),
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl TransferOptions {
    /// Delay after failed attempt `attempt` (1-based): 2s, 4s, 8s... with
    /// the default base.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(1 << exp)
    }
}
