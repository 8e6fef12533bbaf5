use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use wddl_model::{BoxFuture, Downloader, File, Progress};
use wddl_remote::RemoteStore;

use crate::merge::{merge_partitions, publish, validate_partitions};
use crate::partition::PartitionState;
use crate::writer::PartitionWriter;
use crate::{TransferError, TransferOptions};

/// Resumable downloader writing fixed-size partitions.
pub struct PartitionedDownloader<R> {
    remote: R,
    options: TransferOptions,
}

impl<R: RemoteStore> PartitionedDownloader<R> {
    pub fn new(remote: R, options: TransferOptions) -> Self {
        Self { remote, options }
    }

    async fn run(&self, progress: mpsc::Sender<Progress>, file: &File) -> Result<(), TransferError> {
        tokio::time::sleep(self.options.warmup).await;

        let max_attempts = self.options.max_attempts.max(1);
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.attempt(&progress, file).await {
                Ok(()) => {
                    info!(id = %file.id, name = %file.name, size = file.size, attempt, "download complete");
                    return Ok(());
                }
                Err(e) if attempt < max_attempts => {
                    let delay = self.options.delay_for_attempt(attempt);
                    warn!(
                        id = %file.id,
                        name = %file.name,
                        attempt,
                        delay_secs = delay.as_secs_f64(),
                        error = %e,
                        "download attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(TransferError::RetriesExhausted {
                        id: file.id.clone(),
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
            }
        }
    }

    /// One pass: fetch what is missing, validate, merge and publish.
    async fn attempt(&self, progress: &mpsc::Sender<Progress>, file: &File) -> Result<(), TransferError> {
        tokio::fs::create_dir_all(&file.temp).await?;
        let state = PartitionState::inspect(&file.temp, file.size, self.options.partition_size).await?;

        if !state.is_complete() {
            debug!(
                id = %file.id,
                done = state.done,
                count = state.count,
                offset = state.skip_bytes,
                "requesting remaining range"
            );
            let stream = self
                .remote
                .read_range(&file.source, state.skip_bytes, state.remaining())
                .await?;
            PartitionWriter::new(file, state, progress.clone())
                .with_buffer_size(self.options.buffer_size)
                .write_from(stream)
                .await?;
        }

        validate_partitions(&file.temp, &state).await?;
        let merged = merge_partitions(&file.temp, &state).await?;
        publish(&merged, &file.dest).await?;

        if let Err(e) = tokio::fs::remove_dir_all(&file.temp).await {
            warn!(id = %file.id, temp = %file.temp.display(), error = %e, "failed to remove temp directory");
        }
        Ok(())
    }
}

impl<R: RemoteStore> Downloader for PartitionedDownloader<R> {
    type Error = TransferError;

    fn download<'a>(
        &'a self,
        progress: mpsc::Sender<Progress>,
        file: &'a File,
    ) -> BoxFuture<'a, Result<(), TransferError>> {
        Box::pin(self.run(progress, file))
    }

    fn delete<'a>(&'a self, file: &'a File) -> BoxFuture<'a, Result<(), TransferError>> {
        Box::pin(async move {
            self.remote.remove(&file.source).await?;
            debug!(id = %file.id, source = %file.source, "removed remote copy");
            Ok(())
        })
    }
}
