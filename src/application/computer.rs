//! Seam to the external scoring program.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::score::Score;

/// A freshly computed score and the exact payload to cache for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedScore {
    pub score: Score,
    pub payload: String,
}

impl ComputedScore {
    /// Decode one scorer output line, checking the breakdown kind matches the
    /// requested flag.
    pub fn from_line(line: &str, human: bool) -> Result<Self, ComputeError> {
        let payload = line.trim();
        if payload.is_empty() {
            return Err(ComputeError::EmptyOutput);
        }

        let score = Score::from_json(payload).map_err(ComputeError::Decode)?;
        if score.is_human() != human {
            return Err(ComputeError::ShapeMismatch { expected_human: human });
        }

        Ok(Self {
            score,
            payload: payload.to_string(),
        })
    }
}

/// Why a computation produced no score.
///
/// Callers treat every variant the same way; the distinction exists for logs.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("failed to launch scorer: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("scorer exited with status {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },
    #[error("scorer did not finish within {seconds}s")]
    Timeout { seconds: u64 },
    #[error("scorer produced no output")]
    EmptyOutput,
    #[error("scorer output is not a valid score: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("scorer returned the wrong breakdown kind (expected human = {expected_human})")]
    ShapeMismatch { expected_human: bool },
}

impl ComputeError {
    pub fn kind(&self) -> &'static str {
        match self {
            ComputeError::Spawn(_) => "spawn",
            ComputeError::Exit { .. } => "exit",
            ComputeError::Timeout { .. } => "timeout",
            ComputeError::EmptyOutput => "empty_output",
            ComputeError::Decode(_) => "decode",
            ComputeError::ShapeMismatch { .. } => "shape_mismatch",
        }
    }
}

#[async_trait]
pub trait ScoreComputer: Send + Sync {
    async fn compute(&self, identifier: &str, human: bool) -> Result<ComputedScore, ComputeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_line_keeps_the_exact_payload() {
        let computed =
            ComputedScore::from_line("{\"total_score\":42,\"breakdown\":{\"a\":42}}\n", false)
                .expect("valid line");
        assert_eq!(
            computed.payload,
            "{\"total_score\":42,\"breakdown\":{\"a\":42}}"
        );
        assert_eq!(computed.score.truncated(), 42);
    }

    #[test]
    fn from_line_rejects_wrong_breakdown_kind() {
        let err = ComputedScore::from_line("{\"total_score\":1,\"breakdown\":{}}", true)
            .expect_err("kind mismatch");
        assert_eq!(err.kind(), "shape_mismatch");
    }

    #[test]
    fn from_line_rejects_blank_and_garbage() {
        assert_eq!(
            ComputedScore::from_line("   ", false)
                .expect_err("blank")
                .kind(),
            "empty_output"
        );
        assert_eq!(
            ComputedScore::from_line("not json", false)
                .expect_err("garbage")
                .kind(),
            "decode"
        );
    }
}
