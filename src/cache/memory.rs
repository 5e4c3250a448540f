//! In-process [`ScoreStore`] with Redis-like TTL semantics.
//!
//! `SET` clears any previous expiry and `EXPIRE` arms one, as Redis does.
//! Expiry uses [`tokio::time::Instant`] so paused-clock tests can advance it.
//! Expired entries are dropped lazily on read and swept on every write, so the
//! map stays bounded by the live key set.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::warn;

use super::store::{ScoreStore, StoreError};

const SOURCE: &str = "cache::memory";

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl: Option<Duration>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value stored under `key`, if still live.
    pub fn value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.read("value")
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    /// TTL most recently applied to `key` with `EXPIRE`.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.read("ttl").get(key).and_then(|entry| entry.ttl)
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.read("len")
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave an entry half-written, so a
    // poisoned map is still usable.
    fn read(&self, op: &'static str) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.entries.read().unwrap_or_else(|poisoned| {
            log_poisoned(op);
            PoisonError::into_inner(poisoned)
        })
    }

    fn write(&self, op: &'static str) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.entries.write().unwrap_or_else(|poisoned| {
            log_poisoned(op);
            PoisonError::into_inner(poisoned)
        })
    }
}

fn log_poisoned(op: &'static str) {
    warn!(
        target = SOURCE,
        op,
        result = "poisoned_recovered",
        "Recovered from poisoned memory store lock"
    );
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let mut entries = self.write("get");
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut entries = self.write("set");
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                ttl: None,
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        if let Some(entry) = self.write("expire").get_mut(key) {
            entry.ttl = Some(ttl);
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let store = MemoryStore::new();
        store.set("k", "v").await.expect("set");
        store
            .expire("k", Duration::from_secs(10))
            .await
            .expect("expire");

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(store.get("k").await.expect("get").as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get("k").await.expect("get"), None);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn set_clears_previous_expiry() {
        let store = MemoryStore::new();
        store.set("k", "old").await.expect("set");
        store
            .expire("k", Duration::from_secs(1))
            .await
            .expect("expire");
        store.set("k", "new").await.expect("set");

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(store.get("k").await.expect("get").as_deref(), Some("new"));
        assert_eq!(store.ttl("k"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn writes_sweep_expired_entries() {
        let store = MemoryStore::new();
        for index in 0..1000 {
            let key = format!("k{index}");
            store.set(&key, "v").await.expect("set");
            store
                .expire(&key, Duration::from_secs(3600))
                .await
                .expect("expire");
        }

        tokio::time::advance(Duration::from_secs(7200)).await;
        store.set("fresh", "v").await.expect("set");

        assert_eq!(store.read("test").len(), 1);
        assert_eq!(store.value("fresh").as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn expire_on_missing_key_is_a_no_op() {
        let store = MemoryStore::new();
        store
            .expire("missing", Duration::from_secs(1))
            .await
            .expect("expire");
        assert!(store.is_empty());
    }
}
