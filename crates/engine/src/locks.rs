use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct Owners {
    next_token: u64,
    held: HashMap<String, u64>,
}

/// Process-local set of files with a download in flight.
///
/// Each acquisition gets a unique token; the returned [`FileLock`] releases
/// the entry on drop only if it still owns it.
#[derive(Clone, Default)]
pub struct LockSet {
    inner: Arc<Mutex<Owners>>,
}

impl LockSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn owners(&self) -> MutexGuard<'_, Owners> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Locks `id`, or returns `None` if it is already locked.
    pub fn try_acquire(&self, id: &str) -> Option<FileLock> {
        let mut owners = self.owners();
        if owners.held.contains_key(id) {
            return None;
        }
        owners.next_token += 1;
        let token = owners.next_token;
        owners.held.insert(id.to_string(), token);

        Some(FileLock {
            set: self.clone(),
            id: id.to_string(),
            token,
        })
    }

    pub fn is_locked(&self, id: &str) -> bool {
        self.owners().held.contains_key(id)
    }

    fn release(&self, id: &str, token: u64) {
        let mut owners = self.owners();
        if owners.held.get(id) == Some(&token) {
            owners.held.remove(id);
        }
    }
}

/// Ownership of one entry of a [`LockSet`].
pub struct FileLock {
    set: LockSet,
    id: String,
    token: u64,
}

impl Drop for FileLock {
    fn drop(&mut self) {
        self.set.release(&self.id, self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails() {
        let locks = LockSet::new();
        let first = locks.try_acquire("a");
        assert!(first.is_some());
        assert!(locks.try_acquire("a").is_none());
        assert!(locks.try_acquire("b").is_some());
    }

    #[test]
    fn drop_releases() {
        let locks = LockSet::new();
        let lock = locks.try_acquire("a").unwrap();
        assert!(locks.is_locked("a"));
        assert!(!locks.is_locked("b"));

        drop(lock);
        assert!(!locks.is_locked("a"));
        assert!(locks.try_acquire("a").is_some());
    }

    #[test]
    fn stale_token_does_not_release() {
        let locks = LockSet::new();
        let first = locks.try_acquire("a").unwrap();
        let stale_token = first.token;
        drop(first);

        let _second = locks.try_acquire("a").unwrap();
        locks.release("a", stale_token);
        assert!(locks.is_locked("a"));
    }

    #[test]
    fn concurrent_acquire_has_one_winner() {
        let locks = LockSet::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                std::thread::spawn(move || locks.try_acquire("shared").map(std::mem::forget).is_some())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
