use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;
use wddl_model::{File, Progress};

use crate::partition::{PartitionState, partition_path};
use crate::{DEFAULT_BUFFER_SIZE, TransferError};

/// Streams the missing range of a file into sequential partition files.
///
/// Writing starts at partition `done + 1`. Each partition is capped at its
/// expected size; reaching the cap closes it, emits one [`Progress`] event
/// and opens the next one.
pub struct PartitionWriter<'a> {
    file: &'a File,
    state: PartitionState,
    progress: mpsc::Sender<Progress>,
    buffer_size: usize,
}

struct OpenPartition {
    index: u64,
    out: tokio::fs::File,
    remaining: u64,
    written: u64,
    started: Instant,
}

impl<'a> PartitionWriter<'a> {
    pub fn new(file: &'a File, state: PartitionState, progress: mpsc::Sender<Progress>) -> Self {
        Self {
            file,
            state,
            progress,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Copies `reader` into partitions and returns the number of bytes written.
    ///
    /// At most [`PartitionState::remaining`] bytes are consumed. A stream that
    /// ends early leaves the last partition short; the caller's validation
    /// catches that.
    pub async fn write_from<R>(self, reader: R) -> Result<u64, TransferError>
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = reader.take(self.state.remaining());
        let mut buf = vec![0u8; self.buffer_size];
        let mut total = 0u64;
        let mut current = self.open(self.state.done + 1).await?;

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            let mut chunk = &buf[..n];

            while !chunk.is_empty() {
                let Some(part) = current.as_mut() else {
                    break;
                };
                let take = chunk.len().min(usize::try_from(part.remaining).unwrap_or(usize::MAX));
                part.out.write_all(&chunk[..take]).await?;
                part.remaining -= take as u64;
                part.written += take as u64;
                total += take as u64;
                chunk = &chunk[take..];

                if part.remaining == 0 {
                    let next = part.index + 1;
                    if let Some(done) = current.take() {
                        self.close(done).await?;
                    }
                    current = self.open(next).await?;
                }
            }
        }

        if let Some(mut part) = current {
            part.out.flush().await?;
            debug!(
                id = %self.file.id,
                partition = part.index,
                written = part.written,
                "stream ended inside partition"
            );
        }
        Ok(total)
    }

    async fn open(&self, index: u64) -> Result<Option<OpenPartition>, TransferError> {
        if index > self.state.count {
            return Ok(None);
        }
        let out = tokio::fs::File::create(partition_path(&self.file.temp, index)).await?;
        Ok(Some(OpenPartition {
            index,
            out,
            remaining: self.state.expected_size(index),
            written: 0,
            started: Instant::now(),
        }))
    }

    async fn close(&self, mut part: OpenPartition) -> Result<(), TransferError> {
        part.out.flush().await?;
        part.out.sync_data().await?;

        let elapsed = part.started.elapsed().as_secs_f64();
        let speed = if elapsed > 0.0 {
            (part.written as f64 / elapsed) as u64
        } else {
            part.written
        };
        let covered = (part.index * self.state.partition_size).min(self.state.size);
        let percent = if self.state.size == 0 {
            100.0
        } else {
            covered as f64 * 100.0 / self.state.size as f64
        };

        debug!(
            id = %self.file.id,
            partition = part.index,
            count = self.state.count,
            "partition complete"
        );

        let event = Progress {
            id: self.file.id.clone(),
            name: self.file.name.clone(),
            percent,
            speed,
        };
        if self.progress.send(event).await.is_err() {
            debug!(id = %self.file.id, "progress receiver dropped");
        }
        Ok(())
    }
}
