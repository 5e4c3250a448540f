//! Read-through score lookup: cache first, external computation on miss.

use std::{sync::Arc, time::Instant};

use metrics::{counter, histogram};
use tracing::{info, warn};

use crate::cache::{CacheLookup, ScoreCache};
use crate::domain::score::Score;

use super::computer::ScoreComputer;
use super::error::ScoreError;

const SOURCE: &str = "application::score";

/// Normalised inputs of one score request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreRequest {
    /// Trimmed, lower-cased identifier; `None` when neither alias was given.
    pub identifier: Option<String>,
    pub human: bool,
    pub force: bool,
}

impl ScoreRequest {
    /// Build a request from the raw `url` / `github` aliases. The first
    /// non-blank alias wins.
    pub fn new<'a>(
        aliases: impl IntoIterator<Item = Option<&'a str>>,
        human: bool,
        force: bool,
    ) -> Self {
        let identifier = aliases
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(str::to_lowercase);

        Self {
            identifier,
            human,
            force,
        }
    }

    pub fn identifier_or_empty(&self) -> &str {
        self.identifier.as_deref().unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct ScoreService {
    cache: ScoreCache,
    computer: Arc<dyn ScoreComputer>,
}

impl ScoreService {
    pub fn new(cache: ScoreCache, computer: Arc<dyn ScoreComputer>) -> Self {
        Self { cache, computer }
    }

    pub fn cache(&self) -> &ScoreCache {
        &self.cache
    }

    pub async fn lookup(&self, request: &ScoreRequest) -> Result<Score, ScoreError> {
        let identifier = request
            .identifier
            .as_deref()
            .ok_or(ScoreError::MissingParameter)?;

        if !request.force {
            match self.cache.get(identifier, request.human).await {
                CacheLookup::Hit(score) => return Ok(score),
                CacheLookup::Absent | CacheLookup::Unavailable => {}
            }
        }

        self.compute_and_store(identifier, request.human).await
    }

    async fn compute_and_store(&self, identifier: &str, human: bool) -> Result<Score, ScoreError> {
        let started_at = Instant::now();
        let result = self.computer.compute(identifier, human).await;
        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        histogram!("score_api_compute_ms").record(elapsed_ms as f64);

        let computed = match result {
            Ok(computed) => computed,
            Err(err) => {
                counter!("score_api_compute_failure_total").increment(1);
                warn!(
                    target = SOURCE,
                    op = "compute",
                    identifier,
                    human,
                    result = err.kind(),
                    elapsed_ms,
                    error = %err,
                    "Score computation failed"
                );
                return Err(err.into());
            }
        };

        info!(
            target = SOURCE,
            op = "compute",
            identifier,
            human,
            result = "ok",
            elapsed_ms,
            "Score computed"
        );

        self.cache.set(identifier, human, &computed.payload).await;
        Ok(computed.score)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::application::computer::{ComputeError, ComputedScore};
    use crate::cache::{CACHE_TTL, MemoryStore};

    struct ScriptedComputer {
        calls: AtomicUsize,
        lines: Mutex<Vec<&'static str>>,
    }

    impl ScriptedComputer {
        fn new(lines: &[&'static str]) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                lines: Mutex::new(lines.iter().rev().copied().collect()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ScoreComputer for ScriptedComputer {
        async fn compute(
            &self,
            _identifier: &str,
            human: bool,
        ) -> Result<ComputedScore, ComputeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let line = self
                .lines
                .lock()
                .expect("lines lock")
                .pop()
                .unwrap_or_default();
            ComputedScore::from_line(line, human)
        }
    }

    fn service(lines: &[&'static str]) -> (ScoreService, Arc<ScriptedComputer>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let computer = ScriptedComputer::new(lines);
        let service = ScoreService::new(ScoreCache::new(store.clone()), computer.clone());
        (service, computer, store)
    }

    fn request(identifier: &str, force: bool) -> ScoreRequest {
        ScoreRequest::new([Some(identifier)], false, force)
    }

    const FIRST: &str = r#"{"total_score":42,"breakdown":{"a":42}}"#;
    const SECOND: &str = r#"{"total_score":7,"breakdown":{"a":7}}"#;

    #[test]
    fn first_populated_alias_wins_and_is_normalised() {
        let request = ScoreRequest::new([Some("  "), Some(" Foo/Bar ")], false, false);
        assert_eq!(request.identifier.as_deref(), Some("foo/bar"));

        let request = ScoreRequest::new([None, None], false, false);
        assert_eq!(request.identifier, None);
        assert_eq!(request.identifier_or_empty(), "");
    }

    #[tokio::test]
    async fn miss_computes_and_caches() {
        let (service, computer, store) = service(&[FIRST]);

        let score = service.lookup(&request("foo", false)).await.expect("score");

        assert_eq!(score.truncated(), 42);
        assert_eq!(computer.calls(), 1);
        assert_eq!(store.value("v:foo:false").as_deref(), Some(FIRST));
        assert_eq!(store.ttl("v:foo:false"), Some(CACHE_TTL));
    }

    #[tokio::test]
    async fn fresh_hit_skips_the_computer() {
        let (service, computer, _store) = service(&[FIRST]);

        service.lookup(&request("foo", false)).await.expect("score");
        let score = service.lookup(&request("foo", false)).await.expect("score");

        assert_eq!(score.truncated(), 42);
        assert_eq!(computer.calls(), 1);
    }

    #[tokio::test]
    async fn force_bypasses_the_cache_and_overwrites_it() {
        let (service, computer, store) = service(&[FIRST, SECOND]);

        service.lookup(&request("foo", false)).await.expect("score");
        let score = service.lookup(&request("foo", true)).await.expect("score");

        assert_eq!(score.truncated(), 7);
        assert_eq!(computer.calls(), 2);
        assert_eq!(store.value("v:foo:false").as_deref(), Some(SECOND));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_are_recomputed() {
        let (service, computer, _store) = service(&[FIRST, SECOND]);

        service.lookup(&request("foo", false)).await.expect("score");
        tokio::time::advance(CACHE_TTL).await;
        let score = service.lookup(&request("foo", false)).await.expect("score");

        assert_eq!(score.truncated(), 7);
        assert_eq!(computer.calls(), 2);
    }

    #[tokio::test]
    async fn missing_identifier_never_reaches_the_computer() {
        let (service, computer, _store) = service(&[FIRST]);

        let err = service
            .lookup(&ScoreRequest::default())
            .await
            .expect_err("missing parameter");

        assert!(matches!(err, ScoreError::MissingParameter));
        assert_eq!(computer.calls(), 0);
    }

    #[tokio::test]
    async fn failed_computation_writes_nothing() {
        let (service, _computer, store) = service(&["Traceback (most recent call last)"]);

        let err = service
            .lookup(&request("foo", false))
            .await
            .expect_err("malformed output");

        assert!(matches!(err, ScoreError::Computation(ComputeError::Decode(_))));
        assert!(store.is_empty());
    }
}
