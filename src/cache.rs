//! Result cache for forge reads
//!
//! The client consults the cache before listing open requests or looking up
//! the current user, and invalidates listings after every mutation.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Key-value cache with per-entry time to live
pub trait ResultCache: Send + Sync {
    /// Get a live entry
    fn get(&self, key: &str) -> Option<String>;

    /// Store an entry for `ttl`
    fn set(&self, key: &str, value: String, ttl: Duration);

    /// Drop an entry
    fn invalidate(&self, key: &str);
}

/// In-process cache backed by a map
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some((value, expires)) if Instant::now() < *expires => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: String, ttl: Duration) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), (value, Instant::now() + ttl));
        }
    }

    fn invalidate(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

/// Cache that never stores anything
pub struct NoCache;

impl ResultCache for NoCache {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }
    fn set(&self, _key: &str, _value: String, _ttl: Duration) {}
    fn invalidate(&self, _key: &str) {}
}
