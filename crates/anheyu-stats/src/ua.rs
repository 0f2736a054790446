//! User-agent classification and cache (§4.3.3).
//!
//! A case-insensitive substring classifier feeding an md5-keyed cache; entries
//! older than the configured TTL are evicted lazily on read, and also by a
//! periodic `sweep()` the broker's cron table calls so cold entries that are
//! never looked up again still get reclaimed.

use anheyu_types::{Browser, Device, Os};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 60);

pub fn classify(user_agent: &str) -> (Browser, Os, Device) {
    let ua = user_agent.to_lowercase();
    let browser = if ua.contains("edg/") || ua.contains("edge") {
        Browser::Edge
    } else if ua.contains("chrome") {
        Browser::Chrome
    } else if ua.contains("firefox") {
        Browser::Firefox
    } else if ua.contains("safari") && !ua.contains("chrome") {
        Browser::Safari
    } else {
        Browser::Other
    };

    let os = if ua.contains("android") {
        Os::Android
    } else if ua.contains("iphone") || ua.contains("ipad") || ua.contains("ios") {
        Os::Ios
    } else if ua.contains("windows") {
        Os::Windows
    } else if ua.contains("mac os") || ua.contains("macos") || ua.contains("macintosh") {
        Os::MacOs
    } else if ua.contains("linux") {
        Os::Linux
    } else {
        Os::Other
    };

    let device = if ua.contains("ipad") || ua.contains("tablet") {
        Device::Tablet
    } else if ua.contains("mobile") || ua.contains("iphone") || ua.contains("android") {
        Device::Mobile
    } else {
        Device::Desktop
    };

    (browser, os, device)
}

struct Entry {
    value: (Browser, Os, Device),
    inserted_at: Instant,
}

pub struct UaCache {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
}

impl UaCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Classify `user_agent`, serving from cache when a fresh entry exists.
    pub fn resolve(&self, user_agent: &str) -> (Browser, Os, Device) {
        let key = format!("{:x}", md5::compute(user_agent.as_bytes()));
        let now = Instant::now();
        {
            let entries = self.entries.lock().unwrap();
            if let Some(entry) = entries.get(&key)
                && now.duration_since(entry.inserted_at) < self.ttl {
                    return entry.value;
                }
        }
        let value = classify(user_agent);
        self.entries.lock().unwrap().insert(
            key,
            Entry {
                value,
                inserted_at: now,
            },
        );
        value
    }

    pub fn sweep(&self) {
        let now = Instant::now();
        let ttl = self.ttl;
        self.entries.lock().unwrap().retain(|_, entry| now.duration_since(entry.inserted_at) < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}
