//! The computed score for one identifier.
//!
//! Numbers are kept as [`serde_json::Number`] so that a score computed as `42`
//! is echoed back as `42` rather than `42.0`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Number;

use super::error::DomainError;

/// Per-component contributions, in exactly one of the two shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Breakdown {
    /// Component name to its contribution.
    Components(BTreeMap<String, Number>),
    /// Component name to the ordered sub-scores shown to humans.
    Human(BTreeMap<String, Vec<Number>>),
}

impl Breakdown {
    pub fn is_human(&self) -> bool {
        matches!(self, Breakdown::Human(_))
    }
}

/// Result of one scoring run.
///
/// Deserialises from the scorer's wire shape
/// (`{"total_score": .., "breakdown": {..}}` or
/// `{"total_score": .., "human_breakdown": {..}}`) and rejects payloads that
/// carry both breakdowns or neither.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawScore")]
pub struct Score {
    total_score: Number,
    breakdown: Breakdown,
}

impl Score {
    pub fn new(total_score: impl Into<Number>, breakdown: Breakdown) -> Self {
        Self {
            total_score: total_score.into(),
            breakdown,
        }
    }

    /// Parse a single-line JSON payload as produced by the scorer.
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    pub fn total_score(&self) -> &Number {
        &self.total_score
    }

    pub fn breakdown(&self) -> &Breakdown {
        &self.breakdown
    }

    pub fn is_human(&self) -> bool {
        self.breakdown.is_human()
    }

    /// Total as a float, for threshold comparisons.
    pub fn total(&self) -> f64 {
        self.total_score.as_f64().unwrap_or_default()
    }

    /// Total truncated toward zero, as shown in text and badge output.
    pub fn truncated(&self) -> i64 {
        match self.total_score.as_i64() {
            Some(value) => value,
            None => self.total().trunc() as i64,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawScore {
    total_score: Number,
    #[serde(default)]
    breakdown: Option<BTreeMap<String, Number>>,
    #[serde(default)]
    human_breakdown: Option<BTreeMap<String, Vec<Number>>>,
}

impl TryFrom<RawScore> for Score {
    type Error = DomainError;

    fn try_from(raw: RawScore) -> Result<Self, Self::Error> {
        let breakdown = match (raw.breakdown, raw.human_breakdown) {
            (Some(components), None) => Breakdown::Components(components),
            (None, Some(human)) => Breakdown::Human(human),
            (Some(_), Some(_)) => {
                return Err(DomainError::invariant(
                    "score carries both `breakdown` and `human_breakdown`",
                ));
            }
            (None, None) => {
                return Err(DomainError::invariant(
                    "score carries neither `breakdown` nor `human_breakdown`",
                ));
            }
        };

        Ok(Self {
            total_score: raw.total_score,
            breakdown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_component_breakdown() {
        let score = Score::from_json(r#"{"total_score":42,"breakdown":{"a":42}}"#)
            .expect("valid score");

        assert_eq!(score.truncated(), 42);
        assert!(!score.is_human());
        match score.breakdown() {
            Breakdown::Components(map) => assert_eq!(map["a"], Number::from(42)),
            other => panic!("unexpected breakdown: {other:?}"),
        }
    }

    #[test]
    fn parses_human_breakdown_and_ignores_null_sibling() {
        let score = Score::from_json(
            r#"{"total_score":5.7,"breakdown":null,"human_breakdown":{"code":[1,2.5]}}"#,
        )
        .expect("valid score");

        assert!(score.is_human());
        assert_eq!(score.truncated(), 5);
        assert!((score.total() - 5.7).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_mixed_breakdowns() {
        let err = Score::from_json(
            r#"{"total_score":1,"breakdown":{"a":1},"human_breakdown":{"a":[1]}}"#,
        )
        .expect_err("mixed payload must fail");
        assert!(err.to_string().contains("both"), "unexpected error: {err}");
    }

    #[test]
    fn rejects_missing_breakdown() {
        assert!(Score::from_json(r#"{"total_score":1}"#).is_err());
    }

    #[test]
    fn integer_totals_serialize_without_fraction() {
        let score = Score::new(42, Breakdown::Components(BTreeMap::new()));
        assert_eq!(
            serde_json::to_string(score.total_score()).expect("serialize"),
            "42"
        );
    }
}
