//! Component seams the orchestrator is generic over.
//!
//! Async methods return boxed futures so implementations stay free to
//! recurse (the scanner does) and tests can provide plain mocks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{EngineConfig, File, Progress, QueueStat};

/// Boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Predicate applied while listing the queue.
///
/// `Ok(false)` excludes the entry, `Err` aborts the whole listing.
pub type FileFilter = Arc<dyn Fn(&File) -> std::io::Result<bool> + Send + Sync>;

/// Discovers candidate files on the remote store.
pub trait Scanner: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Recursively lists `path` and returns one [`File`] per regular file.
    ///
    /// Any listing error aborts the whole scan.
    fn scan<'a>(
        &'a self,
        config: &'a EngineConfig,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Vec<File>, Self::Error>>;
}

/// Transfers one file end-to-end.
pub trait Downloader: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Downloads `file` to its destination, emitting progress on `progress`.
    fn download<'a>(
        &'a self,
        progress: mpsc::Sender<Progress>,
        file: &'a File,
    ) -> BoxFuture<'a, Result<(), Self::Error>>;

    /// Removes the remote copy of `file`.
    fn delete<'a>(&'a self, file: &'a File) -> BoxFuture<'a, Result<(), Self::Error>>;
}

/// Durable set of files that still need downloading, keyed by [`File::id`].
pub trait Queue: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Inserts or overwrites the entry for `file.id`.
    fn add(&self, file: &File) -> Result<(), Self::Error>;

    /// Whether an entry for `id` exists.
    fn exists(&self, id: &str) -> Result<bool, Self::Error>;

    /// Number of entries.
    fn len(&self) -> Result<usize, Self::Error>;

    /// Whether the queue holds no entries.
    fn is_empty(&self) -> Result<bool, Self::Error> {
        Ok(self.len()? == 0)
    }

    /// Entry count and total size.
    fn stat(&self) -> Result<QueueStat, Self::Error>;

    /// All entries in key order, optionally filtered.
    fn list(&self, filter: Option<&FileFilter>) -> Result<Vec<File>, Self::Error>;

    /// Level-triggered stream of matching entries.
    ///
    /// Entries are re-listed on a fixed interval and redelivered until they
    /// are deleted. The stream closes once `cancel` fires.
    fn subscribe(&self, cancel: CancellationToken, filter: Option<FileFilter>)
    -> mpsc::Receiver<File>;

    /// Removes the entry for `id`; absent keys are not an error.
    fn delete(&self, id: &str) -> Result<(), Self::Error>;
}
