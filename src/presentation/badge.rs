//! SVG score badges.
//!
//! The success badge comes from a minijinja template file read once at first
//! use; the error badge is compiled into the binary so it can always be
//! produced.

use std::path::{Path, PathBuf};

use askama::Template;
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::domain::score::Score;

const SOURCE: &str = "presentation::badge";
const SCORE_TEMPLATE_NAME: &str = "score.svg";

pub const COLOR_LOW: &str = "#E74C3C";
pub const COLOR_MEDIUM: &str = "#F39C12";
pub const COLOR_HIGH: &str = "#2ECC71";
pub const COLOR_ERROR: &str = "#838383";
const ERROR_VALUE: &str = "Err";

const LOW_CEILING: f64 = 25.0;
const MEDIUM_CEILING: f64 = 80.0;

/// Last-resort error badge used if the compiled template fails to render.
const ERROR_BADGE_FALLBACK: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="85" height="20"><rect rx="3" width="85" height="20" fill="#555"/><rect rx="3" x="57" width="28" height="20" fill="#838383"/><g fill="#fff" text-anchor="middle" font-family="DejaVu Sans,Verdana,Geneva,sans-serif" font-size="11"><text x="28.5" y="14">score</text><text x="70" y="14">Err</text></g></svg>"##;

/// Values substituted into the success template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadgeParams {
    pub value: String,
    pub color: &'static str,
    pub three_digit: bool,
    pub single_digit: bool,
}

impl BadgeParams {
    pub fn from_score(score: &Score) -> Self {
        let total = score.total();
        Self {
            value: score.truncated().to_string(),
            color: color_for(total),
            three_digit: total >= 100.0,
            single_digit: total < 10.0,
        }
    }
}

pub fn color_for(total: f64) -> &'static str {
    if total < LOW_CEILING {
        COLOR_LOW
    } else if total < MEDIUM_CEILING {
        COLOR_MEDIUM
    } else {
        COLOR_HIGH
    }
}

#[derive(Debug, Error)]
pub enum BadgeTemplateError {
    #[error("failed to read badge template `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid badge template: {0}")]
    Syntax(#[source] minijinja::Error),
    #[error("failed to render badge template: {0}")]
    Render(#[source] minijinja::Error),
}

/// Template environment holding only the success badge.
///
/// Undefined variables are errors so a typo in the template surfaces as a
/// render failure instead of an empty attribute.
fn badge_environment(source: String) -> Result<Environment<'static>, BadgeTemplateError> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.add_template_owned(SCORE_TEMPLATE_NAME, source)
        .map_err(BadgeTemplateError::Syntax)?;
    Ok(env)
}

#[derive(Template)]
#[template(path = "badge_error.svg")]
struct ErrorBadgeTemplate {
    value: &'static str,
    color: &'static str,
}

/// Renders both badge kinds; owns the lazily-loaded success template.
#[derive(Debug)]
pub struct BadgeRenderer {
    template_path: PathBuf,
    template: OnceCell<Environment<'static>>,
}

impl BadgeRenderer {
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
            template: OnceCell::new(),
        }
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    /// Render the success badge, loading the template on first use.
    ///
    /// A failed load is not remembered; the next call tries again.
    pub async fn render_score(&self, score: &Score) -> Result<String, BadgeTemplateError> {
        let env = self
            .template
            .get_or_try_init(|| load_template(&self.template_path))
            .await?;
        env.get_template(SCORE_TEMPLATE_NAME)
            .and_then(|template| template.render(BadgeParams::from_score(score)))
            .map_err(BadgeTemplateError::Render)
    }

    /// Render the grey `Err` badge. Never fails.
    pub fn render_error(&self) -> String {
        ErrorBadgeTemplate {
            value: ERROR_VALUE,
            color: COLOR_ERROR,
        }
        .render()
        .unwrap_or_else(|err| {
            error!(
                target = SOURCE,
                op = "render_error",
                error = %err,
                "Error badge template failed; using fallback"
            );
            ERROR_BADGE_FALLBACK.to_string()
        })
    }
}

async fn load_template(path: &Path) -> Result<Environment<'static>, BadgeTemplateError> {
    let source = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| BadgeTemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let env = badge_environment(source)?;
    info!(
        target = SOURCE,
        op = "load_template",
        path = %path.display(),
        result = "ok",
        "Badge template loaded"
    );
    Ok(env)
}
