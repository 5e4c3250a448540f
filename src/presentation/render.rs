//! Turns a score lookup outcome into response bytes for one output format.

use bytes::Bytes;
use serde::Serialize;
use serde_json::Number;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::application::error::ScoreError;
use crate::domain::{
    format::OutputFormat,
    score::{Breakdown, Score},
};

use super::badge::BadgeRenderer;

const SOURCE: &str = "presentation::render";
const TEXT_ERROR: &str = "error";

/// A fully rendered body ready to be written to the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub content_type: &'static str,
    pub body: Bytes,
    /// Strong validator over `body`; set for SVG output only.
    pub etag: Option<String>,
}

impl Rendered {
    fn new(format: OutputFormat, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        let etag = (format == OutputFormat::Svg).then(|| etag_for(&body));
        Self {
            content_type: format.content_type(),
            body,
            etag,
        }
    }
}

/// `"<hex sha256>"` over the exact response body.
pub fn etag_for(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    format!("\"{}\"", hex::encode(hasher.finalize()))
}

#[derive(Serialize)]
struct ScoreBody<'a> {
    score: &'a Number,
    url: &'a str,
    breakdown: &'a Breakdown,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub struct ResponseRenderer {
    badges: BadgeRenderer,
}

impl ResponseRenderer {
    pub fn new(badges: BadgeRenderer) -> Self {
        Self { badges }
    }

    /// Render `score`, or the "no score" body when it is `None`.
    ///
    /// Never fails: any rendering problem degrades to the error body for the
    /// same format.
    pub async fn render(
        &self,
        score: Option<&Score>,
        format: OutputFormat,
        identifier: &str,
    ) -> Rendered {
        let Some(score) = score else {
            return self.render_error(format, identifier);
        };

        match format {
            OutputFormat::Json => match score_json(score, identifier) {
                Ok(body) => Rendered::new(format, body),
                Err(err) => {
                    warn!(
                        target = SOURCE,
                        op = "render_json",
                        identifier,
                        result = "error",
                        error = %err,
                        "Failed to serialize score"
                    );
                    self.render_error(format, identifier)
                }
            },
            OutputFormat::Text => Rendered::new(format, score.truncated().to_string()),
            OutputFormat::Svg => match self.badges.render_score(score).await {
                Ok(svg) => Rendered::new(format, svg),
                Err(err) => {
                    warn!(
                        target = SOURCE,
                        op = "render_svg",
                        identifier,
                        path = %self.badges.template_path().display(),
                        result = "error",
                        error = %err,
                        "Badge template unavailable; serving error badge"
                    );
                    self.render_error(format, identifier)
                }
            },
        }
    }

    pub fn render_error(&self, format: OutputFormat, identifier: &str) -> Rendered {
        match format {
            OutputFormat::Json => Rendered::new(format, error_json(identifier)),
            OutputFormat::Text => Rendered::new(format, TEXT_ERROR),
            OutputFormat::Svg => Rendered::new(format, self.badges.render_error()),
        }
    }
}

fn score_json(score: &Score, identifier: &str) -> Result<Vec<u8>, ScoreError> {
    let body = ScoreBody {
        score: score.total_score(),
        url: identifier,
        breakdown: score.breakdown(),
    };
    Ok(serde_json::to_vec(&body)?)
}

fn error_json(identifier: &str) -> Vec<u8> {
    let body = ErrorBody {
        error: format!("Could not determine score for {identifier}"),
    };
    serde_json::to_vec(&body).unwrap_or_else(|_| br#"{"error":"Could not determine score"}"#.to_vec())
}
