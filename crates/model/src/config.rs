use std::path::PathBuf;
use std::time::Duration;

/// Default interval between two remote scans.
pub const DEFAULT_SCAN_EVERY: Duration = Duration::from_secs(10);

/// Default interval between two throughput summaries.
pub const DEFAULT_REPORT_EVERY: Duration = Duration::from_secs(15 * 60);

/// Default number of parallel downloads.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Immutable engine configuration, passed in at construction time.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Remote directory that is mirrored (e.g. `/backups`).
    pub input_root: String,
    /// Local directory the remote tree is mapped onto.
    pub output_root: PathBuf,
    /// Local directory holding per-file partition directories.
    pub temp_root: PathBuf,
    /// Maximum number of downloads in flight.
    pub concurrency: usize,
    /// Interval of the scan loop.
    pub scan_every: Duration,
    /// Interval of the throughput summary.
    pub report_every: Duration,
    /// Remove the remote copy after a successful publish.
    pub remove_remote: bool,
}

impl EngineConfig {
    /// Creates a configuration with default intervals and concurrency.
    pub fn new(
        input_root: impl Into<String>,
        output_root: impl Into<PathBuf>,
        temp_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
            temp_root: temp_root.into(),
            concurrency: DEFAULT_CONCURRENCY,
            scan_every: DEFAULT_SCAN_EVERY,
            report_every: DEFAULT_REPORT_EVERY,
            remove_remote: false,
        }
    }

    /// Concurrency clamped to at least one worker.
    pub fn workers(&self) -> usize {
        self.concurrency.max(1)
    }
}
