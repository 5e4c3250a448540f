//! Key-value store seam underneath the score cache.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection unavailable: {0}")]
    Connection(String),
    #[error("store command `{command}` failed: {message}")]
    Command {
        command: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn connection(err: impl std::fmt::Display) -> Self {
        Self::Connection(err.to_string())
    }

    pub fn command(command: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Command {
            command,
            message: err.to_string(),
        }
    }
}

/// String-keyed store speaking the `GET` / `SET` / `EXPIRE` / `PING` subset.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Fetch a value; `Ok(None)` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Expire `key` once `ttl` has elapsed from now.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
