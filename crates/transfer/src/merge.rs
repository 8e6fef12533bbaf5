use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::TransferError;
use crate::partition::{PartitionState, partition_path};

/// Name of the merge artifact inside a file's temp directory.
pub const MERGE_FILE: &str = "merge.tmp";

/// Checks that partitions `1..=count` all exist with their exact sizes.
pub async fn validate_partitions(temp: &Path, state: &PartitionState) -> Result<(), TransferError> {
    for index in 1..=state.count {
        let expected = state.expected_size(index);
        let actual = match tokio::fs::metadata(partition_path(temp, index)).await {
            Ok(meta) if meta.is_file() => Some(meta.len()),
            Ok(_) => None,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        if actual != Some(expected) {
            return Err(TransferError::IncompletePartitions {
                index,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

/// Concatenates the partitions in index order into [`MERGE_FILE`].
///
/// The merged file is synced before its size is checked against
/// `state.size`. On mismatch only the merge artifact is removed.
pub async fn merge_partitions(temp: &Path, state: &PartitionState) -> Result<PathBuf, TransferError> {
    let merged = temp.join(MERGE_FILE);
    let mut out = tokio::fs::File::create(&merged).await?;

    for index in 1..=state.count {
        let mut part = tokio::fs::File::open(partition_path(temp, index)).await?;
        tokio::io::copy(&mut part, &mut out).await?;
    }
    out.flush().await?;
    out.sync_all().await?;
    drop(out);

    let actual = tokio::fs::metadata(&merged).await?.len();
    if actual != state.size {
        if let Err(e) = tokio::fs::remove_file(&merged).await {
            warn!(path = %merged.display(), error = %e, "failed to remove merge artifact");
        }
        return Err(TransferError::SizeMismatch {
            expected: state.size,
            actual,
        });
    }

    debug!(path = %merged.display(), size = actual, "partitions merged");
    Ok(merged)
}

/// Moves `merged` to `dest`, creating parent directories.
///
/// Tries a rename first. Across filesystems it copies to a sibling of
/// `dest`, syncs it and renames that into place, so `dest` never holds a
/// partial file.
pub async fn publish(merged: &Path, dest: &Path) -> Result<(), TransferError> {
    let file_name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| TransferError::InvalidPath(dest.display().to_string()))?;
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    if let Err(e) = tokio::fs::rename(merged, dest).await {
        debug!(error = %e, "rename failed, copying instead");
        let staging = dest.with_file_name(format!(".{file_name}.wddl"));
        tokio::fs::copy(merged, &staging).await?;
        tokio::fs::File::open(&staging).await?.sync_all().await?;
        tokio::fs::rename(&staging, dest).await?;
        tokio::fs::remove_file(merged).await?;
    }

    debug!(dest = %dest.display(), "published");
    Ok(())
}
