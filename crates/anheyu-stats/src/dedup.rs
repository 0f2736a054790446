//! In-memory request-dedup map (§4.3.1 step 3, §9 "sync set membership").
//!
//! Key is `visitor_id:url_path:floor(now / window)`; a repeat call within the
//! same bucket is recognized without any I/O. Unbounded but periodically
//! swept, per §5.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct DedupMap {
    window: Duration,
    entries: Mutex<HashMap<String, Instant>>,
}

impl DedupMap {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Build the dedup key for `(visitor_id, url_path)` at `now`.
    pub fn bucket_key(&self, visitor_id: &str, url_path: &str, now: Instant, epoch: Instant) -> String {
        let bucket = now.duration_since(epoch).as_secs() / self.window.as_secs().max(1);
        format!("{visitor_id}:{url_path}:{bucket}")
    }

    /// Insert `key` if absent. Returns `true` if this call performed the
    /// insert (first sighting this bucket), `false` if it was a duplicate.
    pub fn insert_if_absent(&self, key: String, now: Instant) -> bool {
        let mut entries = self.entries.lock().unwrap();
        if let std::collections::hash_map::Entry::Vacant(e) = entries.entry(key) {
            e.insert(now);
            true
        } else {
            false
        }
    }

    /// Drop entries older than `max_age`. Called periodically so the map
    /// never grows unbounded.
    pub fn sweep(&self, now: Instant, max_age: Duration) {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, inserted_at| now.duration_since(*inserted_at) < max_age);
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}
