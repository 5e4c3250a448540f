//! Connection management for the backing score store.
//!
//! [`connect`] resolves the configured address, proves the store answers
//! `PING` under a bounded [`RetryPolicy`], and hands back a shared
//! [`ScoreStore`] together with the idle-connection reaper it started.
//! The address `memory://` selects an in-process store for local runs.

mod redis;
mod retry;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::{MemoryStore, ScoreStore};
use crate::config::StoreSettings;

pub use self::redis::RedisStore;
pub use retry::{ConnectError, RetryPolicy, retry_with_policy};

const SOURCE: &str = "infra::store";
const MEMORY_SCHEME: &str = "memory://";

/// A connected store plus the background task that maintains its pool.
pub struct ConnectedStore {
    pub store: Arc<dyn ScoreStore>,
    reaper: Option<JoinHandle<()>>,
}

impl ConnectedStore {
    pub fn shutdown(self) {
        if let Some(reaper) = self.reaper {
            reaper.abort();
        }
    }
}

pub async fn connect(settings: &StoreSettings) -> Result<ConnectedStore, ConnectError> {
    if settings.url.starts_with(MEMORY_SCHEME) {
        info!(
            target = SOURCE,
            op = "connect",
            backend = "memory",
            "Using in-process score store"
        );
        return Ok(ConnectedStore {
            store: Arc::new(MemoryStore::new()),
            reaper: None,
        });
    }

    let store = RedisStore::from_settings(settings)?;
    let policy = RetryPolicy::from(settings);
    retry_with_policy(&policy, "connect", |_| store.ping()).await?;

    let reaper = store.spawn_idle_reaper(settings.idle_timeout);
    Ok(ConnectedStore {
        store: Arc::new(store),
        reaper: Some(reaper),
    })
}
