//! Per-path mutual exclusion for key-store read-modify-write cycles.
//!
//! Scope is this process only. Two processes sharing a key-store directory
//! are not coordinated.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

type Registry = Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>;

fn registry() -> &'static Registry {
    static LOCKS: OnceLock<Registry> = OnceLock::new();
    LOCKS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// The lock guarding `path`. Equivalent spellings of one path share a lock.
///
/// Entries no caller holds any more are dropped on each lookup, so the
/// registry only tracks stores that are in use.
pub fn lock_for(path: &Path) -> Arc<Mutex<()>> {
    let key = lock_key(path);
    let mut map = registry().lock().unwrap_or_else(|e| e.into_inner());
    map.retain(|_, lock| Arc::strong_count(lock) > 1);
    map.entry(key).or_default().clone()
}

/// Run `f` while holding the lock for `path`.
pub fn with_lock<T>(path: &Path, f: impl FnOnce() -> T) -> T {
    let lock = lock_for(path);
    let _guard: MutexGuard<'_, ()> = lock.lock().unwrap_or_else(|e| e.into_inner());
    f()
}

// Purely lexical: the key must not change when the store's directory is
// created between two lookups. Symlinks are not resolved.
fn lock_key(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut key = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                key.pop();
            }
            other => key.push(other.as_os_str()),
        }
    }
    key
}

#[cfg(test)]
fn is_registered(path: &Path) -> bool {
    let map = registry().lock().unwrap_or_else(|e| e.into_inner());
    map.contains_key(&lock_key(path))
}
