//! Wires the engine components together and runs until interrupted.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use wddl_engine::Engine;
use wddl_queue::DiskQueue;
use wddl_remote::DirStore;
use wddl_transfer::{PartitionedDownloader, RemoteScanner, RemoteSweeper, TransferOptions};

use crate::config::Config;

pub async fn run(config: Config) -> anyhow::Result<()> {
    let engine_config = config.engine_config();
    tokio::fs::create_dir_all(&engine_config.temp_root)
        .await
        .with_context(|| format!("creating {}", engine_config.temp_root.display()))?;

    let remote = Arc::new(DirStore::new(&config.remote_root));

    if config.sweep_remote {
        let sweeper = RemoteSweeper::new(Arc::clone(&remote), engine_config.clone());
        if let Err(e) = sweeper.sweep().await {
            tracing::error!(error = %e, "remote sweep failed");
        }
    }

    let queue = DiskQueue::open(&config.queue_path)
        .with_context(|| format!("opening queue at {}", config.queue_path.display()))?;

    let engine = Engine::new(
        engine_config,
        RemoteScanner::new(Arc::clone(&remote)),
        queue.clone(),
        PartitionedDownloader::new(remote, TransferOptions::default()),
    );

    let cancel = CancellationToken::new();
    let handle = engine.start(cancel.clone());
    tracing::info!("wddl ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("SIGINT received, shutting down");

    cancel.cancel();
    tracing::info!("waiting for in-flight downloads");
    handle.wait().await;
    queue.flush()?;
    Ok(())
}
