//! In-memory time-to-live cache shared by the registry and audit clients

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

/// Source of the current time in milliseconds since UNIX epoch
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

struct Entry<V> {
    value: V,
    inserted_at: i64,
}

/// Keyed store whose entries expire `ttl_ms` after they were written
///
/// Expiry is lazy: a stale entry is removed by the `get` that finds it.
/// Reads never refresh an entry's timestamp and there is no capacity bound.
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
    ttl_ms: i64,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl_ms: i64) -> Self {
        Self::with_clock(ttl_ms, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl_ms: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl_ms,
            clock,
        }
    }

    /// Acquire the entry map, recovering it from a poisoned lock
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, Entry<V>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        let mut entries = self.lock_entries();

        let entry = entries.get(key)?;
        if now - entry.inserted_at > self.ttl_ms {
            debug!("Cache entry expired: {}", key);
            entries.remove(key);
            return None;
        }

        Some(entry.value.clone())
    }

    pub fn set(&self, key: &str, value: V) {
        let inserted_at = self.clock.now_ms();
        self.lock_entries().insert(
            key.to_string(),
            Entry {
                value,
                inserted_at,
            },
        );
    }

    pub fn delete(&self, key: &str) {
        self.lock_entries().remove(key);
    }

    pub fn clear(&self) {
        self.lock_entries().clear();
    }

    /// Number of stored entries, including ones that expired but were not read yet
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock_entries().contains_key(key)
    }
}
