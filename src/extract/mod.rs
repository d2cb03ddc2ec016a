//! Response URL extraction
//!
//! Pulls the uploaded file's public URL out of an upload service response
//! using a configured rule:
//!
//! - `json:<path>` evaluates a dotted JSON path (see [`json_path`])
//! - `regex:<pattern>` scans for the first absolute URL (see [`url_scan`])
//!
//! Neither is a general engine. Only the documented subsets are accepted
//! and anything outside them is reported as an error.
//!
//! # Example
//!
//! ```
//! use image_uploadr::extract::extract;
//!
//! let body = br#"{"data":{"link":"https://i.example.com/a.png"}}"#;
//! let url = extract(body, "json:$.data.link").unwrap();
//! assert_eq!(url, "https://i.example.com/a.png");
//! ```

use thiserror::Error;

pub mod json_path;
pub mod url_scan;

/// Prefix selecting JSON path extraction
pub const JSON_PREFIX: &str = "json:";

/// Prefix selecting URL scan extraction
pub const REGEX_PREFIX: &str = "regex:";

/// Extraction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Unsupported response rule '{0}': must start with 'json:' or 'regex:'")]
    UnsupportedRule(String),

    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),

    #[error("JSON path not found: key '{0}' does not exist")]
    PathNotFound(String),

    #[error("JSON array index {index} out of bounds (length {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Invalid JSON array index '{0}'")]
    InvalidIndex(String),

    #[error("Cannot traverse into a scalar value at '{0}'")]
    CannotTraverse(String),

    #[error("JSON path does not resolve to a string (found {0})")]
    NotAString(&'static str),

    #[error("Unsupported regex pattern '{0}'")]
    UnsupportedPattern(String),

    #[error("No URL found in response")]
    UrlNotFound,

    #[error("Extracted URL is empty")]
    EmptyUrl,
}

/// A parsed extraction rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractRule<'a> {
    /// `json:<path>`
    JsonPath(&'a str),
    /// `regex:<pattern>`
    Pattern(&'a str),
}

impl<'a> ExtractRule<'a> {
    /// Dispatch on the rule prefix
    pub fn parse(rule: &'a str) -> Result<Self, ExtractError> {
        if let Some(path) = rule.strip_prefix(JSON_PREFIX) {
            Ok(Self::JsonPath(path))
        } else if let Some(pattern) = rule.strip_prefix(REGEX_PREFIX) {
            Ok(Self::Pattern(pattern))
        } else {
            Err(ExtractError::UnsupportedRule(rule.to_string()))
        }
    }

    /// Apply this rule to a raw response body
    pub fn apply(&self, body: &[u8]) -> Result<String, ExtractError> {
        let url = match *self {
            Self::JsonPath(path) => {
                let value: serde_json::Value = serde_json::from_slice(body)
                    .map_err(|e| ExtractError::InvalidJson(e.to_string()))?;
                json_path::evaluate(&value, path)?.to_string()
            }
            Self::Pattern(pattern) => {
                let text = String::from_utf8_lossy(body);
                url_scan::find_with_pattern(&text, pattern)?.to_string()
            }
        };

        if url.is_empty() {
            return Err(ExtractError::EmptyUrl);
        }
        Ok(url)
    }
}

/// Extract a URL from `body` using the rule string `rule`
pub fn extract(body: &[u8], rule: &str) -> Result<String, ExtractError> {
    ExtractRule::parse(rule)?.apply(body)
}
