use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::EngineConfig;

/// Deterministic identity of a remote file.
///
/// MD5 over `"<source>_<size>"`, hex encoded. A file that changes size gets a
/// new identity and is therefore a new work item.
pub fn file_id(source: &str, size: u64) -> String {
    let mut hasher = Md5::new();
    hasher.update(source.as_bytes());
    hasher.update(b"_");
    hasher.update(size.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Canonical record of one remote file scheduled for download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    /// See [`file_id`].
    pub id: String,
    /// Base name of the remote file.
    pub name: String,
    /// Remote path.
    pub source: String,
    /// Per-file partition directory.
    pub temp: PathBuf,
    /// Local target path.
    pub dest: PathBuf,
    /// Size in bytes, as reported by the remote listing.
    pub size: u64,
}

impl File {
    /// Builds the record for `source`, mapping the remote input root onto
    /// the local output root.
    pub fn new(config: &EngineConfig, source: &str, size: u64) -> Self {
        let id = file_id(source, size);
        let name = source.rsplit('/').next().unwrap_or(source).to_string();
        let relative = relative_to(source, &config.input_root);

        Self {
            temp: config.temp_root.join(&id),
            dest: config.output_root.join(relative),
            id,
            name,
            source: source.to_string(),
            size,
        }
    }

    /// Whether `path` already holds a file of exactly this size.
    pub async fn delivered_at(&self, path: &Path) -> std::io::Result<bool> {
        match tokio::fs::metadata(path).await {
            Ok(meta) => Ok(meta.is_file() && meta.len() == self.size),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Whether the destination already holds this file.
    pub async fn is_delivered(&self) -> std::io::Result<bool> {
        self.delivered_at(&self.dest).await
    }
}

/// Strips `root` from `source` on a segment boundary.
fn relative_to<'a>(source: &'a str, root: &str) -> &'a str {
    let root = root.trim_end_matches('/');
    match source.strip_prefix(root) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => source.trim_start_matches('/'),
    }
}
