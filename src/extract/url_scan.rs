//! Absolute URL scanning for `regex:` rules
//!
//! This is not a regular expression engine. Three pattern literals are
//! recognized, all meaning "the first absolute URL in the text". Every
//! other pattern is rejected.

use super::ExtractError;

/// Pattern literals accepted after the `regex:` prefix
pub const SUPPORTED_PATTERNS: [&str; 3] = [r#"https?://[^\s"]+"#, "http://.*", "https://.*"];

/// Whether `pattern` is one of [`SUPPORTED_PATTERNS`]
pub fn is_supported(pattern: &str) -> bool {
    SUPPORTED_PATTERNS.contains(&pattern)
}

/// Apply a pattern literal to `text`
pub fn find_with_pattern<'t>(text: &'t str, pattern: &str) -> Result<&'t str, ExtractError> {
    if !is_supported(pattern) {
        return Err(ExtractError::UnsupportedPattern(pattern.to_string()));
    }
    find_first_url(text).ok_or(ExtractError::UrlNotFound)
}

/// Find the first `http://` or `https://` URL in `text`.
///
/// The match runs until whitespace, a quote, `<`, `>` or end of text.
pub fn find_first_url(text: &str) -> Option<&str> {
    let start = [text.find("http://"), text.find("https://")]
        .into_iter()
        .flatten()
        .min()?;

    let rest = &text[start..];
    let end = rest.find(is_terminator).unwrap_or(rest.len());
    Some(&rest[..end])
}

fn is_terminator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '"' | '\'' | '<' | '>')
}
