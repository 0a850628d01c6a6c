//! Key-value store boundary used for sessions and caches.
//!
//! Applications provide a store as `dyn Store` and resolve `Arc<dyn Store>` in
//! their handlers:
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use strip::store::{MemoryStore, Store};
//!
//! let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
//! store.set("session:1", b"alice".to_vec(), Some(Duration::from_secs(60)));
//! assert_eq!(store.get("session:1").as_deref(), Some(&b"alice"[..]));
//! ```

use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::trace;

/// Byte-oriented key-value storage with optional expiry.
pub trait Store: Send + Sync {
    /// Value for `key`, `None` when missing or expired.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Insert or replace `key`. `ttl = None` never expires.
    fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>);

    /// Remove `key`. Returns whether a live value was removed.
    fn delete(&self, key: &str) -> bool;

    /// Give an existing key a new time to live. Returns `false` when the key is
    /// missing or already expired.
    fn expire(&self, key: &str, ttl: Duration) -> bool;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Add `delta` to the decimal integer stored at `key` (missing keys start at
    /// 0) and return the new value. `None` when the stored value is not an
    /// integer or the result overflows.
    fn incr(&self, key: &str, delta: i64) -> Option<i64>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    deadline: Option<Instant>,
}

/// Deadline `ttl` after `now`; a TTL past the clock's range never expires.
fn deadline_after(now: Instant, ttl: Duration) -> Option<Instant> {
    now.checked_add(ttl)
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.deadline.map_or(true, |deadline| now < deadline)
    }
}

/// In-process [`Store`] on a sharded concurrent map.
///
/// Expired entries are dropped lazily when touched, or in bulk by
/// [`MemoryStore::purge_expired`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, expired ones included until they are purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        let removed = before.saturating_sub(self.entries.len());
        trace!(removed, "Purged expired store entries");
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                return Some(entry.value.clone());
            }
        } else {
            return None;
        }
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        None
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) {
        let deadline = ttl.and_then(|ttl| deadline_after(Instant::now(), ttl));
        self.entries.insert(key.to_owned(), Entry { value, deadline });
    }

    fn delete(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .remove(key)
            .is_some_and(|(_, entry)| entry.is_live(now))
    }

    fn expire(&self, key: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        match self.entries.get_mut(key) {
            Some(mut entry) if entry.is_live(now) => {
                entry.deadline = deadline_after(now, ttl);
                true
            }
            _ => false,
        }
    }

    fn incr(&self, key: &str, delta: i64) -> Option<i64> {
        let now = Instant::now();
        let mut entry = self.entries.entry(key.to_owned()).or_insert_with(|| Entry {
            value: b"0".to_vec(),
            deadline: None,
        });
        if !entry.is_live(now) {
            entry.value = b"0".to_vec();
            entry.deadline = None;
        }
        let current: i64 = std::str::from_utf8(&entry.value).ok()?.trim().parse().ok()?;
        let next = current.checked_add(delta)?;
        entry.value = next.to_string().into_bytes();
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_set_get_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k"), None);
        store.set("k", b"v".to_vec(), None);
        assert_eq!(store.get("k"), Some(b"v".to_vec()));
        assert!(store.contains("k"));
        assert!(store.delete("k"));
        assert!(!store.delete("k"));
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_ttl_expiry_is_lazy() {
        let store = MemoryStore::new();
        store.set("short", b"v".to_vec(), Some(Duration::from_millis(10)));
        thread::sleep(Duration::from_millis(30));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("short"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_expire_extends_live_keys_only() {
        let store = MemoryStore::new();
        store.set("k", b"v".to_vec(), Some(Duration::from_millis(10)));
        assert!(store.expire("k", Duration::from_secs(60)));
        thread::sleep(Duration::from_millis(30));
        assert_eq!(store.get("k"), Some(b"v".to_vec()));
        assert!(!store.expire("missing", Duration::from_secs(1)));

        store.set("gone", b"v".to_vec(), Some(Duration::from_millis(1)));
        thread::sleep(Duration::from_millis(10));
        assert!(!store.expire("gone", Duration::from_secs(60)));
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let store = MemoryStore::new();
        store.set("forever", b"v".to_vec(), Some(Duration::MAX));
        assert_eq!(store.get("forever"), Some(b"v".to_vec()));
        assert!(store.expire("forever", Duration::MAX));
        assert_eq!(store.purge_expired(), 0);
        assert!(store.contains("forever"));
    }

    #[test]
    fn test_purge_expired() {
        let store = MemoryStore::new();
        store.set("a", b"1".to_vec(), Some(Duration::from_millis(1)));
        store.set("b", b"2".to_vec(), None);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_incr() {
        let store = MemoryStore::new();
        assert_eq!(store.incr("hits", 1), Some(1));
        assert_eq!(store.incr("hits", 5), Some(6));
        assert_eq!(store.incr("hits", -10), Some(-4));
        store.set("text", b"abc".to_vec(), None);
        assert_eq!(store.incr("text", 1), None);
    }

    #[test]
    fn test_concurrent_incr() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..100 {
                        store.incr("n", 1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.get("n"), Some(b"800".to_vec()));
    }
}
