//! In-memory `CacheAdapter` fallback used in tests and in deployments without
//! a Redis instance. TTLs are tracked but only enforced lazily on read.

use crate::CacheAdapter;
use anheyu_types::errors::CacheError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct State {
    strings: HashMap<String, Entry>,
    sets: HashMap<String, HashSet<String>>,
    lists: HashMap<String, Vec<String>>,
}

pub struct InMemoryCache {
    state: Mutex<State>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    fn is_live(entry: &Entry) -> bool {
        entry.expires_at.map(|at| Instant::now() < at).unwrap_or(true)
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheAdapter for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .strings
            .get(key)
            .filter(|e| Self::is_live(e))
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut state = self.state.lock().unwrap();
        state.strings.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
        Ok(())
    }

    async fn incr(&self, key: &str, delta: i64, ttl: Option<Duration>) -> Result<i64, CacheError> {
        let mut state = self.state.lock().unwrap();
        let existed = state.strings.get(key).map(Self::is_live).unwrap_or(false);
        let current: i64 = if existed {
            state.strings[key]
                .value
                .parse()
                .map_err(|_| CacheError::Decode(key.to_string()))?
        } else {
            0
        };
        let next = current + delta;
        let expires_at = if existed {
            state.strings.get(key).and_then(|e| e.expires_at)
        } else {
            ttl.map(|d| Instant::now() + d)
        };
        state.strings.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut state = self.state.lock().unwrap();
        if let Some(e) = state.strings.get_mut(key) {
            e.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut state = self.state.lock().unwrap();
        state.strings.remove(key);
        state.sets.remove(key);
        state.lists.remove(key);
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        let mut state = self.state.lock().unwrap();
        Ok(state
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string()))
    }

    async fn set_card(&self, key: &str) -> Result<u64, CacheError> {
        let state = self.state.lock().unwrap();
        Ok(state.sets.get(key).map(|s| s.len() as u64).unwrap_or(0))
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut state = self.state.lock().unwrap();
        state.lists.entry(key.to_string()).or_default().push(value.to_string());
        Ok(())
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, CacheError> {
        let state = self.state.lock().unwrap();
        let Some(list) = state.lists.get(key) else {
            return Ok(Vec::new());
        };
        let len = list.len() as isize;
        let norm = |i: isize| -> isize {
            if i < 0 { (len + i).max(0) } else { i }
        };
        let s = norm(start).min(len);
        let e = norm(stop).min(len - 1);
        if s > e || len == 0 {
            return Ok(Vec::new());
        }
        Ok(list[s as usize..=e as usize].to_vec())
    }

    async fn list_len(&self, key: &str) -> Result<u64, CacheError> {
        let state = self.state.lock().unwrap();
        Ok(state.lists.get(key).map(|l| l.len() as u64).unwrap_or(0))
    }

    async fn get_and_delete_many(&self, pattern: &str) -> Result<Vec<(String, String)>, CacheError> {
        let mut state = self.state.lock().unwrap();
        let matching: Vec<String> = state
            .strings
            .keys()
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect();
        let mut out = Vec::with_capacity(matching.len());
        for k in matching {
            if let Some(entry) = state.strings.remove(&k)
                && Self::is_live(&entry)
            {
                out.push((k, entry.value));
            }
        }
        Ok(out)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .strings
            .keys()
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect())
    }
}

/// Minimal glob matcher supporting a single trailing `*` wildcard, which is
/// all the key-family patterns in this system ever need.
fn glob_match(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => pattern == key,
    }
}
