//! Redis-backed [`ScoreStore`] over a small deadpool connection pool.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{
    Config, Connection, Pool, PoolConfig, Runtime, Timeouts,
    redis::{self, RedisError},
};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::{ScoreStore, StoreError};
use crate::config::StoreSettings;

use super::retry::ConnectError;

const SOURCE: &str = "infra::store::redis";

/// Upper bound on waiting for a free pooled connection.
const POOL_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Build the pool without opening any connection.
    ///
    /// Borrowed connections are recycled with a `PING`; one that fails the
    /// check is discarded and a fresh one is opened in its place.
    pub fn from_settings(settings: &StoreSettings) -> Result<Self, ConnectError> {
        let mut pool_config = PoolConfig::new(settings.max_idle.get());
        pool_config.timeouts = Timeouts {
            wait: Some(POOL_WAIT_TIMEOUT),
            create: Some(settings.connect_timeout),
            recycle: Some(settings.connect_timeout),
        };

        let mut config = Config::from_url(settings.url.clone());
        config.pool = Some(pool_config);

        let pool = config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|err| ConnectError::InvalidAddress(err.to_string()))?;

        Ok(Self { pool })
    }

    /// Periodically close connections that sat idle for longer than
    /// `idle_timeout`.
    pub fn spawn_idle_reaper(&self, idle_timeout: Duration) -> JoinHandle<()> {
        let pool = self.pool.clone();
        let period = (idle_timeout / 2).max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                pool.retain(|_, metrics| metrics.last_used() < idle_timeout);
                let status = pool.status();
                debug!(
                    target = SOURCE,
                    op = "reap_idle",
                    pooled = status.size,
                    available = status.available,
                    "Reaped idle store connections"
                );
            }
        })
    }

    async fn connection(&self) -> Result<Connection, StoreError> {
        self.pool.get().await.map_err(StoreError::connection)
    }
}

fn command_error(command: &'static str) -> impl FnOnce(RedisError) -> StoreError {
    move |err| StoreError::command(command, err)
}

#[async_trait]
impl ScoreStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(command_error("GET"))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(command_error("SET"))?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl.as_secs())
            .query_async(&mut conn)
            .await
            .map_err(command_error("EXPIRE"))?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let _pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(command_error("PING"))?;
        Ok(())
    }
}
