//! Bounded, sequential retry for store startup.

use std::{fmt::Display, future::Future, num::NonZeroU32, time::Duration};

use thiserror::Error;
use tokio::time::{Instant, sleep, timeout};
use tracing::{info, warn};

use crate::config::StoreSettings;

const SOURCE: &str = "infra::store::retry";

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid store address: {0}")]
    InvalidAddress(String),
    #[error("store unreachable after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

/// Fixed-delay policy: up to `max_attempts` tries, `delay` apart, each bounded
/// by `attempt_timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: NonZeroU32,
    pub delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: NonZeroU32::new(5).unwrap_or(NonZeroU32::MIN),
            delay: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(1),
        }
    }
}

impl From<&StoreSettings> for RetryPolicy {
    fn from(settings: &StoreSettings) -> Self {
        Self {
            max_attempts: settings.connect_attempts,
            delay: settings.connect_retry_delay,
            attempt_timeout: settings.connect_timeout,
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (1-based), or `None` once
    /// the ceiling is reached.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.max_attempts.get()).then_some(self.delay)
    }
}

/// Run `attempt_fn` until it succeeds or `policy` is exhausted.
///
/// Attempts never overlap: each one is awaited (or timed out) before the delay
/// for the next begins.
pub async fn retry_with_policy<T, E, F, Fut>(
    policy: &RetryPolicy,
    op: &'static str,
    mut attempt_fn: F,
) -> Result<T, ConnectError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let started_at = Instant::now();
    let mut attempt = 1;

    loop {
        let last_error = match timeout(policy.attempt_timeout, attempt_fn(attempt)).await {
            Ok(Ok(value)) => {
                info!(
                    target = SOURCE,
                    op,
                    attempt,
                    result = "ok",
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    "Store connection established"
                );
                return Ok(value);
            }
            Ok(Err(err)) => err.to_string(),
            Err(_) => format!(
                "attempt timed out after {}ms",
                policy.attempt_timeout.as_millis()
            ),
        };

        warn!(
            target = SOURCE,
            op,
            attempt,
            max_attempts = policy.max_attempts.get(),
            result = "error",
            error = %last_error,
            "Store connection attempt failed"
        );

        match policy.delay_after(attempt) {
            Some(delay) => {
                sleep(delay).await;
                attempt += 1;
            }
            None => {
                return Err(ConnectError::Exhausted {
                    attempts: attempt,
                    last_error,
                });
            }
        }
    }
}
