use std::path::{Path, PathBuf};

/// Path of partition `index` (1-based) inside `temp`.
pub fn partition_path(temp: &Path, index: u64) -> PathBuf {
    temp.join(format!("{index}.part"))
}

/// Transfer progress of one file, derived from the partitions on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionState {
    /// Declared file size.
    pub size: u64,
    /// Size of every partition but possibly the last.
    pub partition_size: u64,
    /// Total number of partitions.
    pub count: u64,
    /// Partitions complete on disk, counted contiguously from index 1.
    pub done: u64,
    /// Bytes covered by the complete partitions.
    pub skip_bytes: u64,
    /// Size of the final partition, 0 when `size` divides evenly.
    pub last_partition_size: u64,
}

impl PartitionState {
    /// Layout of a file of `size` bytes with nothing downloaded yet.
    pub fn plan(size: u64, partition_size: u64) -> Self {
        let partition_size = partition_size.max(1);
        Self {
            size,
            partition_size,
            count: size.div_ceil(partition_size),
            done: 0,
            skip_bytes: 0,
            last_partition_size: size % partition_size,
        }
    }

    /// Reconstructs the state from the partition files found in `temp`.
    ///
    /// Only the contiguous prefix of correctly sized partitions counts: a
    /// missing or mis-sized partition stops the count even if later ones
    /// exist.
    pub async fn inspect(temp: &Path, size: u64, partition_size: u64) -> std::io::Result<Self> {
        let mut state = Self::plan(size, partition_size);

        for index in 1..=state.count {
            match tokio::fs::metadata(partition_path(temp, index)).await {
                Ok(meta) if meta.is_file() && meta.len() == state.expected_size(index) => {
                    state.done = index;
                }
                Ok(_) => break,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => break,
                Err(e) => return Err(e),
            }
        }
        state.skip_bytes = state.done * state.partition_size;
        Ok(state)
    }

    /// Exact size partition `index` must have.
    pub fn expected_size(&self, index: u64) -> u64 {
        if index == self.count && self.last_partition_size != 0 {
            self.last_partition_size
        } else {
            self.partition_size
        }
    }

    /// Whether every partition is already on disk.
    pub fn is_complete(&self) -> bool {
        self.done >= self.count
    }

    /// Bytes still to fetch from the remote.
    pub fn remaining(&self) -> u64 {
        self.size.saturating_sub(self.skip_bytes)
    }
}
