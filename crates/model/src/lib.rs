//! Shared vocabulary of the wddl download engine.
//!
//! Every component crate speaks in terms of the types defined here: the
//! canonical [`File`] record produced by the scanner and persisted by the
//! queue, the ephemeral [`Progress`] events emitted by transfers, and the
//! three seams ([`Scanner`], [`Downloader`], [`Queue`]) the orchestrator is
//! generic over.

pub mod config;
pub mod file;
pub mod progress;
pub mod seams;

pub use config::EngineConfig;
pub use file::{File, file_id};
pub use progress::{Progress, QueueStat};
pub use seams::{BoxFuture, Downloader, FileFilter, Queue, Scanner};
