use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use wddl_model::{Downloader, EngineConfig, File, FileFilter, Progress, Queue, QueueStat, Scanner};

use crate::locks::LockSet;
use crate::speed::SpeedAggregator;

/// Download engine over a scanner, a durable queue and a downloader.
pub struct Engine<S, Q, D> {
    shared: Arc<Shared<S, Q, D>>,
    progress_rx: mpsc::Receiver<Progress>,
}

struct Shared<S, Q, D> {
    config: EngineConfig,
    scanner: S,
    queue: Q,
    downloader: D,
    locks: LockSet,
    workers: Arc<Semaphore>,
    tracker: TaskTracker,
    progress_tx: mpsc::Sender<Progress>,
}

/// Handle to a started engine.
pub struct EngineHandle {
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl EngineHandle {
    /// Signals every loop to stop accepting new work.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Resolves once all loops stopped and in-flight downloads finished.
    pub async fn wait(self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl<S, Q, D> Engine<S, Q, D>
where
    S: Scanner,
    Q: Queue,
    D: Downloader,
{
    pub fn new(config: EngineConfig, scanner: S, queue: Q, downloader: D) -> Self {
        let workers = config.workers();
        let (progress_tx, progress_rx) = mpsc::channel(workers);
        Self {
            shared: Arc::new(Shared {
                config,
                scanner,
                queue,
                downloader,
                locks: LockSet::new(),
                workers: Arc::new(Semaphore::new(workers)),
                tracker: TaskTracker::new(),
                progress_tx,
            }),
            progress_rx,
        }
    }

    pub fn locks(&self) -> &LockSet {
        &self.shared.locks
    }

    /// Runs one scan cycle and returns the number of newly queued files.
    pub async fn scan_once(&self) -> usize {
        self.shared.scan_once().await
    }

    /// Hands `file` to a worker unless it is already in flight.
    ///
    /// Waits for a free worker slot. Returns whether a worker was started.
    pub async fn dispatch(&self, file: File, cancel: &CancellationToken) -> bool {
        self.shared.dispatch(file, cancel).await
    }

    /// Runs the worker body for `file` on the current task.
    pub async fn process(&self, file: &File) {
        self.shared.process(file).await;
    }

    /// Spawns the scan, dispatch and progress loops.
    pub fn start(self, cancel: CancellationToken) -> EngineHandle {
        let Self {
            shared,
            progress_rx,
        } = self;

        info!(
            input = %shared.config.input_root,
            output = %shared.config.output_root.display(),
            workers = shared.config.workers(),
            "engine starting"
        );

        shared
            .tracker
            .spawn(scan_loop(Arc::clone(&shared), cancel.clone()));
        shared
            .tracker
            .spawn(dispatch_loop(Arc::clone(&shared), cancel.clone()));
        shared
            .tracker
            .spawn(progress_loop(Arc::clone(&shared), progress_rx, cancel.clone()));

        EngineHandle {
            cancel,
            tracker: shared.tracker.clone(),
        }
    }
}

impl<S, Q, D> Shared<S, Q, D>
where
    S: Scanner,
    Q: Queue,
    D: Downloader,
{
    async fn scan_once(&self) -> usize {
        let files = match self
            .scanner
            .scan(&self.config, &self.config.input_root)
            .await
        {
            Ok(files) => files,
            Err(e) => {
                error!(error = %e, "scan failed");
                return 0;
            }
        };

        let found = files.len();
        let mut added = 0;
        for file in files {
            match file.is_delivered().await {
                Ok(true) => {
                    debug!(id = %file.id, dest = %file.dest.display(), "already delivered");
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(dest = %file.dest.display(), error = %e, "cannot stat destination");
                    continue;
                }
            }

            match self.queue.exists(&file.id) {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => {
                    error!(id = %file.id, error = %e, "queue lookup failed");
                    continue;
                }
            }

            match self.queue.add(&file) {
                Ok(()) => {
                    info!(id = %file.id, name = %file.name, size = file.size, "queued");
                    added += 1;
                }
                Err(e) => error!(id = %file.id, error = %e, "failed to queue file"),
            }
        }

        debug!(found, added, "scan cycle finished");
        added
    }

    async fn dispatch(self: &Arc<Self>, file: File, cancel: &CancellationToken) -> bool {
        let Some(lock) = self.locks.try_acquire(&file.id) else {
            debug!(id = %file.id, "already in flight, dropping delivery");
            return false;
        };

        let permit = tokio::select! {
            _ = cancel.cancelled() => return false,
            permit = Arc::clone(&self.workers).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return false,
            },
        };

        let shared = Arc::clone(self);
        self.tracker.spawn(async move {
            let _permit = permit;
            let _lock = lock;
            shared.process(&file).await;
        });
        true
    }

    async fn process(&self, file: &File) {
        match file.is_delivered().await {
            Ok(true) => {
                info!(id = %file.id, name = %file.name, "destination already complete");
                self.forget(file);
                return;
            }
            Ok(false) => {}
            Err(e) => warn!(dest = %file.dest.display(), error = %e, "cannot stat destination"),
        }

        debug!(id = %file.id, name = %file.name, size = file.size, "download started");
        if let Err(e) = self
            .downloader
            .download(self.progress_tx.clone(), file)
            .await
        {
            error!(id = %file.id, name = %file.name, error = %e, "download failed");
            return;
        }
        self.forget(file);

        if self.config.remove_remote {
            match self.downloader.delete(file).await {
                Ok(()) => debug!(id = %file.id, source = %file.source, "remote copy removed"),
                Err(e) => warn!(id = %file.id, source = %file.source, error = %e, "failed to remove remote copy"),
            }
        }
    }

    fn forget(&self, file: &File) {
        if let Err(e) = self.queue.delete(&file.id) {
            error!(id = %file.id, error = %e, "failed to remove queue entry");
        }
    }

    fn report(&self, aggregator: &mut SpeedAggregator) {
        let stat = match self.queue.stat() {
            Ok(stat) => stat,
            Err(e) => {
                error!(error = %e, "failed to read queue stats");
                return;
            }
        };
        if let Some(line) = queue_summary(stat, aggregator.avg_speed()) {
            info!("{line}");
        }
    }
}

/// Periodic summary line, `None` while the queue is empty.
pub fn queue_summary(stat: QueueStat, speed: u64) -> Option<String> {
    if stat.files == 0 {
        return None;
    }
    Some(format!(
        "avg speed {:.2} KB/s; estimate {}; in queue {} files ({} bytes)",
        speed as f64 / 1024.0,
        format_eta(stat.eta(speed)),
        stat.files,
        stat.full_size
    ))
}

/// Includes entries whose destination can be inspected.
///
/// Runs synchronously inside the queue poller: one stat per entry per poll.
fn destination_filter() -> FileFilter {
    Arc::new(|file: &File| match std::fs::metadata(&file.dest) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => {
            warn!(dest = %file.dest.display(), error = %e, "skipping queue entry");
            Ok(false)
        }
    })
}

async fn scan_loop<S, Q, D>(shared: Arc<Shared<S, Q, D>>, cancel: CancellationToken)
where
    S: Scanner,
    Q: Queue,
    D: Downloader,
{
    let mut interval = tokio::time::interval(shared.config.scan_every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                shared.scan_once().await;
            }
        }
    }
    debug!("scan loop stopped");
}

async fn dispatch_loop<S, Q, D>(shared: Arc<Shared<S, Q, D>>, cancel: CancellationToken)
where
    S: Scanner,
    Q: Queue,
    D: Downloader,
{
    let mut files = shared
        .queue
        .subscribe(cancel.clone(), Some(destination_filter()));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = files.recv() => match next {
                Some(file) => {
                    shared.dispatch(file, &cancel).await;
                }
                None => break,
            },
        }
    }
    debug!("dispatch loop stopped");
}

async fn progress_loop<S, Q, D>(
    shared: Arc<Shared<S, Q, D>>,
    mut events: mpsc::Receiver<Progress>,
    cancel: CancellationToken,
) -> SpeedAggregator
where
    S: Scanner,
    Q: Queue,
    D: Downloader,
{
    let every = shared.config.report_every;
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut aggregator = SpeedAggregator::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            Some(progress) = events.recv() => {
                info!("{progress}");
                aggregator.record(&progress);
            }
            _ = interval.tick() => shared.report(&mut aggregator),
        }
    }
    debug!("progress loop stopped");
    aggregator
}

/// Formats an ETA as `1h02m03s`, `4m05s` or `6s`.
pub fn format_eta(eta: Duration) -> String {
    let secs = eta.as_secs();
    let (h, m, s) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if h > 0 {
        format!("{h}h{m:02}m{s:02}s")
    } else if m > 0 {
        format!("{m}m{s:02}s")
    } else {
        format!("{s}s")
    }
}
