//! Versioned read-through cache for computed scores.

use std::{sync::Arc, time::Duration};

use metrics::counter;
use tracing::{debug, warn};

use crate::domain::score::Score;

use super::keys::ScoreKey;
use super::store::ScoreStore;

/// Freshness window applied to every write.
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

const SOURCE: &str = "cache::score_cache";

/// Result of a cache read.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(Score),
    /// Key missing, expired, or holding a payload that no longer decodes.
    Absent,
    /// The store could not be reached; callers treat this as a miss.
    Unavailable,
}

#[derive(Clone)]
pub struct ScoreCache {
    store: Arc<dyn ScoreStore>,
    ttl: Duration,
}

impl ScoreCache {
    pub fn new(store: Arc<dyn ScoreStore>) -> Self {
        Self {
            store,
            ttl: CACHE_TTL,
        }
    }

    pub fn store(&self) -> &Arc<dyn ScoreStore> {
        &self.store
    }

    pub async fn get(&self, identifier: &str, human: bool) -> CacheLookup {
        let key = ScoreKey::new(identifier, human);

        let payload = match self.store.get(key.as_str()).await {
            Ok(Some(payload)) if !payload.is_empty() => payload,
            Ok(_) => {
                counter!("score_api_cache_miss_total").increment(1);
                debug!(target = SOURCE, key = %key, result = "absent", "cache miss");
                return CacheLookup::Absent;
            }
            Err(err) => {
                counter!("score_api_cache_unavailable_total").increment(1);
                warn!(
                    target = SOURCE,
                    op = "get",
                    key = %key,
                    result = "unavailable",
                    error = %err,
                    "Score store unavailable; treating as miss"
                );
                return CacheLookup::Unavailable;
            }
        };

        match Score::from_json(&payload) {
            Ok(score) if score.is_human() == human => {
                counter!("score_api_cache_hit_total").increment(1);
                debug!(target = SOURCE, key = %key, result = "hit", "cache hit");
                CacheLookup::Hit(score)
            }
            Ok(_) => {
                counter!("score_api_cache_miss_total").increment(1);
                warn!(
                    target = SOURCE,
                    op = "get",
                    key = %key,
                    result = "shape_mismatch",
                    "Cached breakdown kind does not match key; treating as miss"
                );
                CacheLookup::Absent
            }
            Err(err) => {
                counter!("score_api_cache_miss_total").increment(1);
                warn!(
                    target = SOURCE,
                    op = "get",
                    key = %key,
                    result = "undecodable",
                    error = %err,
                    "Cached payload failed to decode; treating as miss"
                );
                CacheLookup::Absent
            }
        }
    }

    /// Write `payload` under the versioned key and arm the TTL.
    ///
    /// Failures are logged and swallowed; a lost write only costs a recompute.
    pub async fn set(&self, identifier: &str, human: bool, payload: &str) {
        let key = ScoreKey::new(identifier, human);

        if let Err(err) = self.store.set(key.as_str(), payload).await {
            warn!(
                target = SOURCE,
                op = "set",
                key = %key,
                result = "error",
                error = %err,
                "Failed to cache score"
            );
            return;
        }

        if let Err(err) = self.store.expire(key.as_str(), self.ttl).await {
            warn!(
                target = SOURCE,
                op = "expire",
                key = %key,
                result = "error",
                error = %err,
                "Failed to set score TTL; entry lives until evicted"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::cache::{MemoryStore, StoreError};

    const PAYLOAD: &str = r#"{"total_score":42,"breakdown":{"a":42}}"#;

    struct UnreachableStore;

    #[async_trait]
    impl ScoreStore for UnreachableStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::connection("connection refused"))
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::connection("connection refused"))
        }

        async fn expire(&self, _key: &str, _ttl: Duration) -> Result<(), StoreError> {
            Err(StoreError::connection("connection refused"))
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::connection("connection refused"))
        }
    }

    #[tokio::test]
    async fn read_after_write_returns_equal_score() {
        let store = Arc::new(MemoryStore::new());
        let cache = ScoreCache::new(store.clone());

        cache.set("foo", false, PAYLOAD).await;

        let expected = Score::from_json(PAYLOAD).expect("valid");
        assert_eq!(cache.get("foo", false).await, CacheLookup::Hit(expected));
        assert_eq!(store.value("v:foo:false").as_deref(), Some(PAYLOAD));
        assert_eq!(store.ttl("v:foo:false"), Some(Duration::from_secs(3600)));
    }

    #[tokio::test]
    async fn human_flag_partitions_entries() {
        let cache = ScoreCache::new(Arc::new(MemoryStore::new()));
        cache.set("foo", false, PAYLOAD).await;

        assert_eq!(cache.get("foo", true).await, CacheLookup::Absent);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_read_as_absent() {
        let cache = ScoreCache::new(Arc::new(MemoryStore::new()));
        cache.set("foo", false, PAYLOAD).await;

        tokio::time::advance(CACHE_TTL).await;
        assert_eq!(cache.get("foo", false).await, CacheLookup::Absent);
    }

    #[tokio::test]
    async fn corrupt_payload_reads_as_absent() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("v:foo:false", "{not json")
            .await
            .expect("seed store");
        let cache = ScoreCache::new(store);

        assert_eq!(cache.get("foo", false).await, CacheLookup::Absent);
    }

    #[tokio::test]
    async fn mismatched_breakdown_kind_reads_as_absent() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("v:foo:true", PAYLOAD)
            .await
            .expect("seed store");
        let cache = ScoreCache::new(store);

        assert_eq!(cache.get("foo", true).await, CacheLookup::Absent);
    }

    #[tokio::test]
    async fn store_failure_reads_as_unavailable_and_writes_are_swallowed() {
        let cache = ScoreCache::new(Arc::new(UnreachableStore));

        assert_eq!(cache.get("foo", false).await, CacheLookup::Unavailable);
        cache.set("foo", false, PAYLOAD).await;
    }
}
