use async_trait::async_trait;
use dashmap::DashMap;
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;

use crate::error::BackendError;

/// Expiring string -> string lookup in front of the mapping store.
///
/// Purely advisory: a miss only means the store has to be asked.
#[async_trait]
pub trait ResolutionCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BackendError>;

    /// Push the deadline of a live entry to `now + ttl` without touching its
    /// value. Absent or already expired keys are left alone.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), BackendError>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Thread-safe in-memory cache with a per-entry deadline.
///
/// Backed by a DashMap so reads are concurrent and mostly lock-free. Expired
/// entries are dropped lazily when read and in bulk by [`LinkCache::purge_expired`].
#[derive(Clone, Debug)]
pub struct LinkCache {
    inner: Arc<DashMap<String, Entry>>,
}

impl LinkCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Look up a live entry. Returns a clone of the value if present.
    pub fn lookup(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        // Copy out before touching the map again; holding a shard guard
        // across `remove_if` would deadlock.
        let hit = self
            .inner
            .get(key)
            .map(|entry| (entry.value.clone(), entry.expires_at));

        match hit {
            Some((value, expires_at)) if expires_at > now => Some(value),
            Some(_) => {
                self.inner.remove_if(key, |_, entry| entry.expires_at <= now);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>, ttl: Duration) {
        self.inner.insert(
            key.into(),
            Entry {
                value: value.into(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Extend a live entry. Returns `false` if there was nothing to extend.
    pub fn touch(&self, key: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        match self.inner.get_mut(key) {
            Some(mut entry) if entry.expires_at > now => {
                entry.expires_at = now + ttl;
                true
            }
            _ => false,
        }
    }

    pub fn remove(&self, key: &str) {
        self.inner.remove(key);
    }

    /// Drop every entry, live or not.
    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Drop expired entries and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.inner.len())
    }

    /// Number of entries currently held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Run [`LinkCache::purge_expired`] every `period` until the runtime shuts down.
    pub fn spawn_sweeper(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let purged = cache.purge_expired();
                if purged > 0 {
                    tracing::debug!("Cache sweep dropped {} expired entr(ies)", purged);
                }
            }
        })
    }
}

impl Default for LinkCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResolutionCache for LinkCache {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.lookup(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BackendError> {
        self.insert(key, value, ttl);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), BackendError> {
        self.touch(key, ttl);
        Ok(())
    }
}

/// Cache used when caching is switched off: never hits, drops every write.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullCache;

#[async_trait]
impl ResolutionCache for NullCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, BackendError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), BackendError> {
        Ok(())
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<(), BackendError> {
        Ok(())
    }
}
