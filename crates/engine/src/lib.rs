//! Download engine orchestrator.
//!
//! [`Engine`] runs three loops against one cancellation token: the scan loop
//! feeds new remote files into the queue, the dispatch loop consumes the
//! queue subscription and hands files to a bounded worker pool, and the
//! progress loop aggregates per-partition throughput into a periodic
//! summary. A [`LockSet`] guarantees at most one in-flight download per file.

mod buffer;
mod engine;
mod locks;
mod speed;

pub use engine::{Engine, EngineHandle, format_eta, queue_summary};
pub use locks::{FileLock, LockSet};
pub use speed::{IDLE_TIMEOUT, SAMPLES_PER_FILE, SpeedAggregator};
