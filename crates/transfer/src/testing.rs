//! In-memory remote store for tests.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;

use wddl_model::BoxFuture;
use wddl_remote::{ByteStream, RemoteEntry, RemoteError, RemoteStore};

#[derive(Default)]
pub(crate) struct MemoryRemote {
    dirs: Mutex<HashMap<String, Vec<RemoteEntry>>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    /// Every `(path, offset, length)` passed to `read_range`.
    pub ranges: Mutex<Vec<(String, u64, u64)>>,
    pub removed: Mutex<Vec<String>>,
    /// Bytes cut from the end of every range response.
    pub truncate: Mutex<u64>,
    /// Number of upcoming range reads that fail.
    pub fail_reads: Mutex<u32>,
    pub fail_remove: Mutex<bool>,
}

fn split(path: &str) -> (String, String) {
    match path.rfind('/') {
        Some(0) => ("/".to_string(), path[1..].to_string()),
        Some(i) => (path[..i].to_string(), path[i + 1..].to_string()),
        None => ("/".to_string(), path.to_string()),
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&self, path: &str) {
        let mut dirs = self.dirs.lock().unwrap();
        dirs.entry(path.to_string()).or_default();
        let mut current = path.to_string();
        while current != "/" {
            let (parent, name) = split(&current);
            let siblings = dirs.entry(parent.clone()).or_default();
            if !siblings.iter().any(|e| e.name == name) {
                siblings.push(RemoteEntry::dir(name));
            }
            current = parent;
        }
    }

    pub fn add_file(&self, path: &str, data: Vec<u8>) {
        let (parent, name) = split(path);
        self.add_dir(&parent);
        let mut dirs = self.dirs.lock().unwrap();
        let siblings = dirs.entry(parent).or_default();
        siblings.retain(|e| e.name != name);
        siblings.push(RemoteEntry::file(name, data.len() as u64));
        self.files.lock().unwrap().insert(path.to_string(), data);
    }

    /// Adds a raw listing entry without backing data.
    pub fn add_entry(&self, dir: &str, entry: RemoteEntry) {
        self.add_dir(dir);
        self.dirs
            .lock()
            .unwrap()
            .entry(dir.to_string())
            .or_default()
            .push(entry);
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }
}

impl RemoteStore for MemoryRemote {
    fn read_dir<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Vec<RemoteEntry>, RemoteError>> {
        Box::pin(async move {
            self.dirs
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| RemoteError::NotFound(path.to_string()))
        })
    }

    fn read_range<'a>(
        &'a self,
        path: &'a str,
        offset: u64,
        length: u64,
    ) -> BoxFuture<'a, Result<ByteStream, RemoteError>> {
        Box::pin(async move {
            self.ranges
                .lock()
                .unwrap()
                .push((path.to_string(), offset, length));

            {
                let mut fail = self.fail_reads.lock().unwrap();
                if *fail > 0 {
                    *fail -= 1;
                    return Err(RemoteError::Io(std::io::Error::other("connection reset")));
                }
            }

            let files = self.files.lock().unwrap();
            let data = files
                .get(path)
                .ok_or_else(|| RemoteError::NotFound(path.to_string()))?;
            let start = (offset as usize).min(data.len());
            let end = ((offset + length) as usize).min(data.len());
            let end = end.saturating_sub(*self.truncate.lock().unwrap() as usize).max(start);
            let stream: ByteStream = Box::pin(Cursor::new(data[start..end].to_vec()));
            Ok(stream)
        })
    }

    fn remove<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<(), RemoteError>> {
        Box::pin(async move {
            if *self.fail_remove.lock().unwrap() {
                return Err(RemoteError::Io(std::io::Error::other("permission denied")));
            }
            self.removed.lock().unwrap().push(path.to_string());
            self.files
                .lock()
                .unwrap()
                .remove(path)
                .map(|_| ())
                .ok_or_else(|| RemoteError::NotFound(path.to_string()))
        })
    }
}
