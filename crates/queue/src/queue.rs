use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use wddl_model::{File, FileFilter, Queue, QueueStat};

use crate::QueueError;

/// Name of the tree holding queue entries.
const QUEUE_TREE: &str = "queue";

/// Interval between two re-listings of a subscription.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Queue persisted in a `sled` database.
///
/// Cloning is cheap; clones share the same database.
#[derive(Clone)]
pub struct DiskQueue {
    db: sled::Db,
    tree: sled::Tree,
    poll_interval: Duration,
}

impl DiskQueue {
    /// Opens (or creates) the queue database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, QueueError> {
        let db = sled::open(path.as_ref())?;
        let tree = db.open_tree(QUEUE_TREE)?;
        debug!(path = %path.as_ref().display(), entries = tree.len(), "queue opened");
        Ok(Self {
            db,
            tree,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Overrides the subscription poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Flushes pending writes of the whole database to disk.
    pub fn flush(&self) -> Result<(), QueueError> {
        self.db.flush()?;
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Result<File, QueueError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl Queue for DiskQueue {
    type Error = QueueError;

    fn add(&self, file: &File) -> Result<(), QueueError> {
        let value = serde_json::to_vec(file)?;
        self.tree.insert(file.id.as_bytes(), value)?;
        self.tree.flush()?;
        debug!(id = %file.id, name = %file.name, size = file.size, "queued file");
        Ok(())
    }

    fn exists(&self, id: &str) -> Result<bool, QueueError> {
        Ok(self.tree.contains_key(id.as_bytes())?)
    }

    fn len(&self) -> Result<usize, QueueError> {
        Ok(self.tree.len())
    }

    fn stat(&self) -> Result<QueueStat, QueueError> {
        let mut stat = QueueStat::default();
        for entry in self.tree.iter() {
            let (_, value) = entry?;
            let file = Self::decode(&value)?;
            stat.files += 1;
            stat.full_size += file.size;
        }
        Ok(stat)
    }

    fn list(&self, filter: Option<&FileFilter>) -> Result<Vec<File>, QueueError> {
        let mut files = Vec::new();
        for entry in self.tree.iter() {
            let (_, value) = entry?;
            let file = Self::decode(&value)?;
            let keep = match filter {
                Some(filter) => filter(&file).map_err(QueueError::Filter)?,
                None => true,
            };
            if keep {
                files.push(file);
            }
        }
        Ok(files)
    }

    fn subscribe(
        &self,
        cancel: CancellationToken,
        filter: Option<FileFilter>,
    ) -> mpsc::Receiver<File> {
        let (tx, rx) = mpsc::channel(1);
        let queue = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(queue.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let files = match queue.list(filter.as_ref()) {
                    Ok(files) => files,
                    Err(e) => {
                        error!(error = %e, "failed to list queue");
                        continue;
                    }
                };

                for file in files {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        sent = tx.send(file) => {
                            if sent.is_err() {
                                debug!("queue subscriber dropped");
                                return;
                            }
                        }
                    }
                }
            }
            debug!("queue subscription closed");
        });

        rx
    }

    fn delete(&self, id: &str) -> Result<(), QueueError> {
        if self.tree.remove(id.as_bytes())?.is_some() {
            self.tree.flush()?;
            debug!(id, "removed file from queue");
        }
        Ok(())
    }
}
