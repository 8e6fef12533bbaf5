use tracing::debug;
use wddl_model::{BoxFuture, EngineConfig, File, Scanner};
use wddl_remote::{RemoteError, RemoteStore, validate_entry_name};

use crate::TransferError;

/// Lists the remote tree and turns every regular file into a [`File`].
pub struct RemoteScanner<R> {
    remote: R,
}

impl<R: RemoteStore> RemoteScanner<R> {
    pub fn new(remote: R) -> Self {
        Self { remote }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    fn walk<'a>(
        &'a self,
        config: &'a EngineConfig,
        path: &'a str,
        files: &'a mut Vec<File>,
    ) -> BoxFuture<'a, Result<(), TransferError>> {
        Box::pin(async move {
            let entries = self.remote.read_dir(path).await?;
            for entry in entries {
                validate_entry_name(&entry.name).map_err(|e| match e {
                    RemoteError::InvalidPath(msg) => TransferError::InvalidPath(msg),
                    other => other.into(),
                })?;

                let child = join_remote(path, &entry.name);
                if entry.is_dir {
                    self.walk(config, &child, files).await?;
                } else {
                    files.push(File::new(config, &child, entry.size));
                }
            }
            Ok(())
        })
    }
}

fn join_remote(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

impl<R: RemoteStore> Scanner for RemoteScanner<R> {
    type Error = TransferError;

    fn scan<'a>(
        &'a self,
        config: &'a EngineConfig,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Vec<File>, TransferError>> {
        Box::pin(async move {
            let mut files = Vec::new();
            self.walk(config, path, &mut files).await?;
            debug!(path, files = files.len(), "scan complete");
            Ok(files)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryRemote;
    use std::path::Path;
    use wddl_remote::RemoteEntry;

    fn config() -> EngineConfig {
        EngineConfig::new("/in", "/out", "/tmp/wddl")
    }

    #[test]
    fn join_handles_root() {
        assert_eq!(join_remote("/", "a"), "/a");
        assert_eq!(join_remote("/in/", "a"), "/in/a");
        assert_eq!(join_remote("/in", "a"), "/in/a");
    }

    #[tokio::test]
    async fn scans_recursively() {
        let remote = MemoryRemote::new();
        remote.add_file("/in/a.bin", vec![0; 3]);
        remote.add_file("/in/sub/b.bin", vec![0; 5]);
        remote.add_file("/in/sub/deep/c.bin", vec![0; 1]);
        remote.add_dir("/in/empty");

        let scanner = RemoteScanner::new(remote);
        let config = config();
        let mut files = scanner.scan(&config, "/in").await.unwrap();
        files.sort_by(|a, b| a.source.cmp(&b.source));

        let sources: Vec<&str> = files.iter().map(|f| f.source.as_str()).collect();
        assert_eq!(sources, vec!["/in/a.bin", "/in/sub/b.bin", "/in/sub/deep/c.bin"]);
        assert_eq!(files[1].size, 5);
        assert_eq!(files[1].name, "b.bin");
        assert_eq!(files[1].dest, Path::new("/out/sub/b.bin"));
        assert_eq!(files[2].temp, Path::new("/tmp/wddl").join(&files[2].id));
    }

    #[tokio::test]
    async fn empty_root_yields_nothing() {
        let remote = MemoryRemote::new();
        remote.add_dir("/in");
        let scanner = RemoteScanner::new(remote);
        assert!(scanner.scan(&config(), "/in").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_error_aborts_scan() {
        let remote = MemoryRemote::new();
        remote.add_file("/in/a.bin", vec![0; 3]);
        // Listed as a directory but cannot be read.
        remote.add_entry("/in", RemoteEntry::dir("broken"));

        let scanner = RemoteScanner::new(remote);
        let err = scanner.scan(&config(), "/in").await.unwrap_err();
        assert!(matches!(
            err,
            TransferError::Remote(RemoteError::NotFound(ref p)) if p == "/in/broken"
        ));
    }

    #[tokio::test]
    async fn missing_root_is_an_error() {
        let scanner = RemoteScanner::new(MemoryRemote::new());
        assert!(scanner.scan(&config(), "/in").await.is_err());
    }

    #[tokio::test]
    async fn hostile_entry_name_is_rejected() {
        let remote = MemoryRemote::new();
        remote.add_entry("/in", RemoteEntry::file("../escape.bin", 10));

        let scanner = RemoteScanner::new(remote);
        let err = scanner.scan(&config(), "/in").await.unwrap_err();
        assert!(matches!(err, TransferError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn works_over_mounted_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("in/sub")).unwrap();
        std::fs::write(dir.path().join("in/sub/x.bin"), b"12345").unwrap();

        let scanner = RemoteScanner::new(wddl_remote::DirStore::new(dir.path()));
        let files = scanner.scan(&config(), "/in").await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].source, "/in/sub/x.bin");
        assert_eq!(files[0].size, 5);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dangling_symlink_does_not_abort_scan() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("in")).unwrap();
        std::fs::write(dir.path().join("in/good.bin"), b"abc").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("in/broken")).unwrap();

        let scanner = RemoteScanner::new(wddl_remote::DirStore::new(dir.path()));
        let files = scanner.scan(&config(), "/in").await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].source, "/in/good.bin");
    }
}
