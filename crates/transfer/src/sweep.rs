use tracing::{debug, info, warn};
use wddl_model::{EngineConfig, Scanner};
use wddl_remote::RemoteStore;

use crate::TransferError;
use crate::scanner::RemoteScanner;

/// Removes remote files that already exist locally with the same size.
///
/// Catches remote copies left behind when the post-download remove failed.
pub struct RemoteSweeper<R> {
    scanner: RemoteScanner<R>,
    config: EngineConfig,
}

impl<R: RemoteStore> RemoteSweeper<R> {
    pub fn new(remote: R, config: EngineConfig) -> Self {
        Self {
            scanner: RemoteScanner::new(remote),
            config,
        }
    }

    /// Walks the input root once and returns the number of removed files.
    ///
    /// A listing error aborts the sweep. Individual failures are logged and
    /// skipped.
    pub async fn sweep(&self) -> Result<usize, TransferError> {
        let files = self
            .scanner
            .scan(&self.config, &self.config.input_root)
            .await?;

        let mut removed = 0;
        for file in &files {
            match file.is_delivered().await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    warn!(dest = %file.dest.display(), error = %e, "cannot stat destination, skipping");
                    continue;
                }
            }

            match self.scanner.remote().remove(&file.source).await {
                Ok(()) => {
                    debug!(source = %file.source, "removed delivered remote file");
                    removed += 1;
                }
                Err(e) => warn!(source = %file.source, error = %e, "failed to remove remote file"),
            }
        }

        info!(scanned = files.len(), removed, "remote sweep finished");
        Ok(removed)
    }
}
