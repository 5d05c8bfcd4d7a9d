//! Thread-Safe Key-Value Store with Expiry Support
//!
//! This module implements the core storage engine: a map from string keys to
//! [`Value`] records, guarded by a single reader/writer lock.
//!
//! ## Design Decisions
//!
//! 1. **One lock for the whole map**: reads share, writes and the background
//!    sweep exclude. At this scale a single `RwLock` is the one serialization
//!    point to reason about for both correctness and contention.
//! 2. **Lazy expiry on lookup**: `get` filters expired entries itself, so an
//!    expired-but-not-yet-swept key behaves exactly like a missing key. The
//!    background reaper only reclaims memory; correctness never depends on it.
//! 3. **Total operations**: missing keys are valid outcomes, not errors. No
//!    storage operation can fail.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// A stored value with an optional expiration instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    /// The payload. Opaque to the storage layer.
    pub data: String,
    /// When this value expires. `None` means it never expires.
    pub expires_at: Option<Instant>,
}

impl Value {
    /// Creates a value without expiry.
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            expires_at: None,
        }
    }

    /// Creates a value that expires `ttl` from now.
    ///
    /// A `ttl` too large to yield a representable instant saturates to no
    /// expiry; the value behaves as if it were set without one.
    pub fn with_ttl(data: impl Into<String>, ttl: Duration) -> Self {
        Self {
            data: data.into(),
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    /// Returns true if the expiration instant has passed.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| Instant::now() >= exp)
            .unwrap_or(false)
    }

    /// Remaining whole seconds until expiry, or `None` for persistent values.
    ///
    /// Returns `Some(0)` once the expiration instant has passed.
    pub fn ttl_secs(&self) -> Option<i64> {
        self.expires_at.map(|exp| {
            let now = Instant::now();
            if now >= exp {
                0
            } else {
                (exp - now).as_secs() as i64
            }
        })
    }
}

/// The storage engine: a key→value map shared by every client connection.
///
/// Designed to be wrapped in an `Arc` and handed to each connection task and
/// to the background reaper. All operations are thread-safe.
///
/// # Example
///
/// ```
/// use linekv::storage::Store;
/// use std::time::Duration;
///
/// let store = Store::new();
///
/// store.set("name", "bar");
/// assert_eq!(store.get("name").map(|v| v.data), Some("bar".to_string()));
///
/// store.set_ex("session", "abc123", Duration::from_secs(60));
/// ```
#[derive(Debug, Default)]
pub struct Store {
    data: RwLock<HashMap<String, Value>>,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts or replaces the value for `key` with no expiry.
    ///
    /// Any TTL previously set on the key is dropped.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut data = self.data.write().unwrap();
        data.insert(key.into(), Value::new(value));
    }

    /// Inserts or replaces the value for `key`, expiring `ttl` from now.
    ///
    /// Callers are responsible for validating that `ttl` is positive; the
    /// command dispatcher rejects non-positive TTLs before reaching here.
    pub fn set_ex(&self, key: impl Into<String>, value: impl Into<String>, ttl: Duration) {
        let mut data = self.data.write().unwrap();
        data.insert(key.into(), Value::with_ttl(value, ttl));
    }

    /// Looks up `key`, returning `None` if it is missing or expired.
    ///
    /// An expired entry that the reaper has not swept yet behaves exactly
    /// like a missing key. Takes only the read lock and never mutates.
    pub fn get(&self, key: &str) -> Option<Value> {
        let data = self.data.read().unwrap();
        match data.get(key) {
            Some(value) if !value.is_expired() => Some(value.clone()),
            _ => None,
        }
    }

    /// Removes `key` if an entry is physically present.
    ///
    /// Returns true if a removal occurred, even when the removed entry was
    /// already logically expired.
    pub fn delete(&self, key: &str) -> bool {
        let mut data = self.data.write().unwrap();
        data.remove(key).is_some()
    }

    /// Evicts every expired entry and returns how many were removed.
    ///
    /// Called periodically by the background reaper. This is purely a memory
    /// reclamation pass; `get` filters expired entries independently.
    pub fn sweep_expired(&self) -> usize {
        let mut data = self.data.write().unwrap();
        let before = data.len();
        data.retain(|_, value| !value.is_expired());
        before - data.len()
    }

    /// Number of physically present entries, expired ones included.
    pub fn len(&self) -> usize {
        self.data.read().unwrap().len()
    }

    /// Returns true if no entries are physically present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let store = Store::new();

        store.set("foo", "bar");
        assert_eq!(store.get("foo").map(|v| v.data), Some("bar".to_string()));
    }

    #[test]
    fn test_get_nonexistent() {
        let store = Store::new();
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_overwrite() {
        let store = Store::new();

        store.set("foo", "bar");
        store.set("foo", "value");
        assert_eq!(store.get("foo").map(|v| v.data), Some("value".to_string()));
    }

    #[test]
    fn test_set_drops_prior_ttl() {
        let store = Store::new();

        store.set_ex("foo", "bar", Duration::from_secs(100));
        store.set("foo", "bar");
        assert_eq!(store.get("foo").and_then(|v| v.expires_at), None);
    }

    #[test]
    fn test_delete() {
        let store = Store::new();

        store.set("foo", "bar");
        assert!(store.delete("foo"));
        assert!(store.get("foo").is_none());
        assert!(!store.delete("foo")); // Already deleted
    }

    #[test]
    fn test_delete_nonexistent() {
        let store = Store::new();
        assert!(!store.delete("missing"));
    }

    #[test]
    fn test_expiry_filters_lookup() {
        let store = Store::new();

        store.set_ex("foo", "bar", Duration::from_millis(50));
        assert!(store.get("foo").is_some());

        std::thread::sleep(Duration::from_millis(100));

        // Nothing has swept the entry, the lookup must still miss.
        assert!(store.get("foo").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let store = Store::new();

        // A TTL past the representable range must not panic; the entry
        // simply never expires.
        store.set_ex("foo", "bar", Duration::from_secs(u64::MAX));
        let value = store.get("foo").unwrap();
        assert_eq!(value.data, "bar");
        assert_eq!(value.expires_at, None);
        assert_eq!(value.ttl_secs(), None);
    }

    #[test]
    fn test_delete_expired_entry_reports_removal() {
        let store = Store::new();

        store.set_ex("foo", "bar", Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(50));

        assert!(store.delete("foo"));
    }

    #[test]
    fn test_ttl_secs() {
        let store = Store::new();

        store.set("persistent", "v");
        assert_eq!(store.get("persistent").unwrap().ttl_secs(), None);

        store.set_ex("expiring", "v", Duration::from_secs(100));
        let ttl = store.get("expiring").unwrap().ttl_secs().unwrap();
        assert!(ttl > 0 && ttl <= 100);
    }

    #[test]
    fn test_sweep_expired() {
        let store = Store::new();

        store.set_ex("key1", "value1", Duration::from_millis(10));
        store.set_ex("key2", "value2", Duration::from_millis(10));
        store.set("key3", "value3"); // No expiry

        std::thread::sleep(Duration::from_millis(50));

        let swept = store.sweep_expired();
        assert_eq!(swept, 2);
        assert_eq!(store.len(), 1);
        assert!(store.get("key3").is_some());
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(Store::new());
        let mut handles = vec![];

        for i in 0..10 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let key = format!("key-{}-{}", i, j);
                    store.set(key.clone(), "value");
                    store.get(&key);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 1000);
    }
}
