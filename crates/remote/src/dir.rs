use std::io::SeekFrom;
use std::path::PathBuf;

use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, warn};
use wddl_model::BoxFuture;

use crate::{ByteStream, RemoteEntry, RemoteError, RemoteStore, validate_remote_path};

/// Remote store backed by a local directory tree.
///
/// Remote path `/a/b` maps to `<root>/a/b`.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, RemoteError> {
        validate_remote_path(path)?;
        let mut full = self.root.clone();
        for segment in path.split('/').filter(|s| !s.is_empty() && *s != ".") {
            full.push(segment);
        }
        Ok(full)
    }
}

fn not_found(path: &str, e: std::io::Error) -> RemoteError {
    if e.kind() == std::io::ErrorKind::NotFound {
        RemoteError::NotFound(path.to_string())
    } else {
        RemoteError::Io(e)
    }
}

impl RemoteStore for DirStore {
    fn read_dir<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Vec<RemoteEntry>, RemoteError>> {
        Box::pin(async move {
            let dir = self.resolve(path)?;
            let mut reader = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| not_found(path, e))?;

            let mut entries = Vec::new();
            while let Some(entry) = reader.next_entry().await? {
                let Ok(name) = entry.file_name().into_string() else {
                    warn!(dir = %dir.display(), "skipping entry with non UTF-8 name");
                    continue;
                };
                // Follows symlinks, like a mount would.
                let meta = match tokio::fs::metadata(entry.path()).await {
                    Ok(meta) => meta,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        warn!(path = %entry.path().display(), "skipping dangling entry");
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };
                entries.push(RemoteEntry {
                    name,
                    is_dir: meta.is_dir(),
                    size: if meta.is_dir() { 0 } else { meta.len() },
                });
            }
            entries.sort_by(|a, b| a.name.cmp(&b.name));

            debug!(path, entries = entries.len(), "listed directory");
            Ok(entries)
        })
    }

    fn read_range<'a>(
        &'a self,
        path: &'a str,
        offset: u64,
        length: u64,
    ) -> BoxFuture<'a, Result<ByteStream, RemoteError>> {
        Box::pin(async move {
            let full = self.resolve(path)?;
            let mut file = tokio::fs::File::open(&full)
                .await
                .map_err(|e| not_found(path, e))?;
            file.seek(SeekFrom::Start(offset)).await?;

            let stream: ByteStream = Box::pin(file.take(length));
            Ok(stream)
        })
    }

    fn remove<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<(), RemoteError>> {
        Box::pin(async move {
            let full = self.resolve(path)?;
            tokio::fs::remove_file(&full)
                .await
                .map_err(|e| not_found(path, e))?;
            debug!(path, "removed remote file");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("in").join("sub")).unwrap();
        fs::write(root.join("in").join("a.bin"), b"0123456789").unwrap();
        fs::write(root.join("in").join("sub").join("b.bin"), b"xyz").unwrap();
        dir
    }

    #[tokio::test]
    async fn read_dir_lists_sorted_entries() {
        let dir = create_tree();
        let store = DirStore::new(dir.path());

        let entries = store.read_dir("/in").await.unwrap();
        assert_eq!(
            entries,
            vec![RemoteEntry::file("a.bin", 10), RemoteEntry::dir("sub")]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn read_dir_skips_dangling_symlink() {
        let dir = create_tree();
        let root = dir.path();
        std::os::unix::fs::symlink(root.join("missing"), root.join("in").join("broken")).unwrap();
        let store = DirStore::new(root);

        let entries = store.read_dir("/in").await.unwrap();
        assert_eq!(
            entries,
            vec![RemoteEntry::file("a.bin", 10), RemoteEntry::dir("sub")]
        );
    }

    #[tokio::test]
    async fn read_dir_missing_is_not_found() {
        let dir = create_tree();
        let store = DirStore::new(dir.path());
        let err = store.read_dir("/nope").await.unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)));
    }

    #[tokio::test]
    async fn read_range_streams_window() {
        let dir = create_tree();
        let store = DirStore::new(dir.path());

        let mut stream = store.read_range("/in/a.bin", 3, 4).await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        assert_eq!(&buf, b"3456");
    }

    #[tokio::test]
    async fn read_range_past_end_is_short() {
        let dir = create_tree();
        let store = DirStore::new(dir.path());

        let mut stream = store.read_range("/in/a.bin", 8, 100).await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        assert_eq!(&buf, b"89");
    }

    #[tokio::test]
    async fn remove_deletes_file() {
        let dir = create_tree();
        let store = DirStore::new(dir.path());

        store.remove("/in/sub/b.bin").await.unwrap();
        assert!(!dir.path().join("in/sub/b.bin").exists());

        let err = store.remove("/in/sub/b.bin").await.unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)));
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let dir = create_tree();
        let store = DirStore::new(dir.path().join("in"));

        let err = store.read_dir("/../").await.unwrap_err();
        assert!(matches!(err, RemoteError::InvalidPath(_)));
        let err = store.remove("/sub/../../escape").await.unwrap_err();
        assert!(matches!(err, RemoteError::InvalidPath(_)));
    }
}
