//! Cache key construction.
//!
//! Keys have the shape `{SCHEMA_VERSION}:{identifier}:{human}`. The human flag
//! is always the final segment and is exactly `true` or `false`, so two
//! distinct `(identifier, human)` pairs can never share a key, even when the
//! identifier itself contains `:`.

/// Literal tag for the shape of cached [`Score`](crate::domain::score::Score)
/// payloads.
///
/// Bump this (`v2`, `v3`, ...) whenever the serialized score shape changes so
/// that payloads written under the old shape are never read under the new one.
pub const SCHEMA_VERSION: &str = "v";

/// Versioned key for one identifier and human-detail flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScoreKey(String);

impl ScoreKey {
    pub fn new(identifier: &str, human: bool) -> Self {
        Self(format!("{SCHEMA_VERSION}:{identifier}:{human}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ScoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
