//! Output formats selected by the request path suffix.

/// Representation requested for a score response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
    Svg,
}

impl OutputFormat {
    /// Resolve the format from a `score.<suffix>` path suffix.
    ///
    /// Unrecognised suffixes fall back to JSON.
    pub fn from_suffix(suffix: Option<&str>) -> Self {
        match suffix.map(str::to_ascii_lowercase).as_deref() {
            Some("svg") => OutputFormat::Svg,
            Some("txt") => OutputFormat::Text,
            _ => OutputFormat::Json,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Json => "application/json",
            OutputFormat::Text => "text/plain; charset=utf-8",
            OutputFormat::Svg => "image/svg+xml",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Text => "txt",
            OutputFormat::Svg => "svg",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes_resolve_to_formats() {
        assert_eq!(OutputFormat::from_suffix(None), OutputFormat::Json);
        assert_eq!(OutputFormat::from_suffix(Some("json")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_suffix(Some("svg")), OutputFormat::Svg);
        assert_eq!(OutputFormat::from_suffix(Some("txt")), OutputFormat::Text);
    }

    #[test]
    fn unknown_suffix_falls_back_to_json() {
        assert_eq!(OutputFormat::from_suffix(Some("html")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_suffix(Some("png")), OutputFormat::Json);
    }
}
