use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use regex::Regex;

use super::entry::CacheEntry;
use super::tier::{CacheError, CacheTier};
use crate::config::CacheBackendKind;

#[derive(Debug)]
struct StoredEntry {
    entry: Arc<CacheEntry>,
    expires_at: Instant,
}

impl StoredEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Process-local cache tier backed by a `DashMap`.
///
/// Entries are shared as `Arc<CacheEntry>`, so a hit never copies the
/// aggregate. Expiry is checked lazily on read and by
/// [`LocalTier::cleanup_expired`].
#[derive(Clone, Default)]
pub struct LocalTier {
    entries: Arc<DashMap<String, StoredEntry>>,
}

impl LocalTier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evicts every expired entry; returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, stored| !stored.is_expired());
        before.saturating_sub(self.entries.len())
    }
}

#[async_trait]
impl CacheTier for LocalTier {
    async fn get(&self, key: &str) -> Result<Option<Arc<CacheEntry>>, CacheError> {
        if let Some(stored) = self.entries.get(key) {
            if !stored.is_expired() {
                return Ok(Some(Arc::clone(&stored.entry)));
            }
            // The read guard must be released before removing from the same shard.
            drop(stored);
            self.entries.remove_if(key, |_, stored| stored.is_expired());
            tracing::debug!(key = %key, "evicted expired entry");
        }
        Ok(None)
    }

    async fn set(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            StoredEntry {
                entry: Arc::new(entry.clone()),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut removed = 0u64;
        self.entries.retain(|key, _| {
            if key.starts_with(prefix) {
                removed += 1;
                false
            } else {
                true
            }
        });
        Ok(removed)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let matcher = glob_to_regex(pattern)?;
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|item| !item.value().is_expired() && matcher.is_match(item.key()))
            .map(|item| item.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn backend(&self) -> CacheBackendKind {
        CacheBackendKind::Local
    }
}

/// Translates a Redis-style glob into an anchored regex.
fn glob_to_regex(pattern: &str) -> Result<Regex, CacheError> {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            '[' => {
                out.push('[');
                for class in chars.by_ref() {
                    match class {
                        ']' => break,
                        '\\' | '[' => {
                            out.push('\\');
                            out.push(class);
                        }
                        other => out.push(other),
                    }
                }
                out.push(']');
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out).map_err(|e| CacheError::unavailable(format!("invalid key pattern {pattern:?}: {e}")))
}
