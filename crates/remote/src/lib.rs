//! Remote hierarchical file store seen by the download engine.
//!
//! The engine needs three operations from the remote side: list a
//! directory, stream a byte range of a file and remove a file. Protocol
//! clients implement [`RemoteStore`]; [`DirStore`] serves a locally mounted
//! tree (davfs, rclone mount, NFS) and doubles as a test fixture.

mod dir;
mod validation;

use std::pin::Pin;
use std::sync::Arc;

use tokio::io::AsyncRead;
use wddl_model::BoxFuture;

pub use dir::DirStore;
pub use validation::{validate_entry_name, validate_remote_path};

/// Errors produced by remote stores.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

impl RemoteEntry {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            size,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            size: 0,
        }
    }
}

/// Byte stream returned by a range read.
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Remote store operations consumed by the engine.
///
/// Paths are `/`-separated and absolute within the store.
pub trait RemoteStore: Send + Sync + 'static {
    /// Lists the direct children of `path`.
    fn read_dir<'a>(&'a self, path: &'a str)
    -> BoxFuture<'a, Result<Vec<RemoteEntry>, RemoteError>>;

    /// Streams `length` bytes of `path` starting at `offset`.
    fn read_range<'a>(
        &'a self,
        path: &'a str,
        offset: u64,
        length: u64,
    ) -> BoxFuture<'a, Result<ByteStream, RemoteError>>;

    /// Removes the file at `path`.
    fn remove<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<(), RemoteError>>;
}

impl<T: RemoteStore> RemoteStore for Arc<T> {
    fn read_dir<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Vec<RemoteEntry>, RemoteError>> {
        (**self).read_dir(path)
    }

    fn read_range<'a>(
        &'a self,
        path: &'a str,
        offset: u64,
        length: u64,
    ) -> BoxFuture<'a, Result<ByteStream, RemoteError>> {
        (**self).read_range(path, offset, length)
    }

    fn remove<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<(), RemoteError>> {
        (**self).remove(path)
    }
}
