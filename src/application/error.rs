use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{config::LoadError, infra::error::InfraError};

use super::computer::ComputeError;

/// Diagnostic chain attached to a response for the logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status,
            public_message,
            report: ErrorReport::from_message(source, status, detail),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

/// Why a request produced no score.
///
/// Every variant renders the same "no score" body; none of them changes the
/// HTTP status. `CacheUnavailable` is reserved for callers that require the
/// cache; the read-through path degrades store failures to a miss instead.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("missing `url` or `github` parameter")]
    MissingParameter,
    #[error("score cache unavailable")]
    CacheUnavailable,
    #[error("score computation failed: {0}")]
    Computation(#[from] ComputeError),
    #[error("score serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScoreError {
    pub fn kind(&self) -> &'static str {
        match self {
            ScoreError::MissingParameter => "missing_parameter",
            ScoreError::CacheUnavailable => "cache_unavailable",
            ScoreError::Computation(err) => err.kind(),
            ScoreError::Serialization(_) => "serialization",
        }
    }
}

/// Startup and process-level failures; these end the process.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use crate::infra::store::ConnectError;

    use super::*;

    #[test]
    fn report_collects_the_source_chain() {
        let error = AppError::from(InfraError::from(ConnectError::Exhausted {
            attempts: 5,
            last_error: "connection refused".to_string(),
        }));
        let report = ErrorReport::from_error("test", StatusCode::SERVICE_UNAVAILABLE, &error);

        assert_eq!(report.messages.len(), 2);
        assert!(report.messages[1].contains("connection refused"));
    }

    #[test]
    fn computation_kinds_pass_through() {
        let error = ScoreError::from(ComputeError::Timeout { seconds: 60 });
        assert_eq!(error.kind(), "timeout");
        assert_eq!(ScoreError::MissingParameter.kind(), "missing_parameter");
    }
}
