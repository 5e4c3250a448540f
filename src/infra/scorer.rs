//! [`ScoreComputer`] backed by an external program.
//!
//! The program is invoked as `<command> <identifier> <true|false>` and must
//! print the score as a single JSON line; the last non-blank line of stdout
//! is taken as that line.

use std::{
    io::ErrorKind,
    path::PathBuf,
    process::Stdio,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::{process::Command, time::timeout};
use tracing::{debug, warn};

use crate::application::computer::{ComputeError, ComputedScore, ScoreComputer};
use crate::config::ScorerSettings;

const SOURCE: &str = "infra::scorer";

#[derive(Debug, Clone)]
pub struct CommandScorer {
    command: PathBuf,
    timeout: Duration,
}

impl CommandScorer {
    pub fn new(command: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &ScorerSettings) -> Self {
        Self::new(settings.command.clone(), settings.timeout)
    }

    async fn run(&self, identifier: &str, human: bool) -> Result<String, ComputeError> {
        let child = Command::new(&self.command)
            .arg(identifier)
            .arg(if human { "true" } else { "false" })
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ComputeError::Spawn)?;

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(ComputeError::Spawn)?,
            Err(_) => {
                return Err(ComputeError::Timeout {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            return Err(ComputeError::Exit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// The structured line: the last line of `stdout` with visible content.
fn result_line(stdout: &str) -> Option<&str> {
    stdout.lines().rev().find(|line| !line.trim().is_empty())
}

#[async_trait]
impl ScoreComputer for CommandScorer {
    async fn compute(&self, identifier: &str, human: bool) -> Result<ComputedScore, ComputeError> {
        let started_at = Instant::now();

        let result = self.run(identifier, human).await.and_then(|stdout| {
            let line = result_line(&stdout).ok_or(ComputeError::EmptyOutput)?;
            ComputedScore::from_line(line, human)
        });

        match &result {
            Ok(_) => debug!(
                target = SOURCE,
                op = "scorer::compute",
                command = %self.command.display(),
                identifier,
                human,
                result = "ok",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                "Scorer produced a score"
            ),
            Err(err) => {
                let error_code = match err {
                    ComputeError::Spawn(io) if io.kind() == ErrorKind::NotFound => "not_found",
                    other => other.kind(),
                };
                warn!(
                    target = SOURCE,
                    op = "scorer::compute",
                    command = %self.command.display(),
                    identifier,
                    human,
                    result = "error",
                    error_code,
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    error = %err,
                    "Scorer invocation failed"
                );
            }
        }

        result
    }
}
