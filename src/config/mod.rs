//! Configuration module for Image Uploadr
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and validation.
//!
//! Keys mirror the host application's option names:
//!
//! ```yaml
//! upload-enable: true
//! upload-url: "https://img.example.com/api/upload"
//! upload-max-size: 10
//! upload-format: multipart
//! upload-field: image
//! upload-header:
//!   - "Authorization: Bearer ${IMG_TOKEN}"
//! upload-timeout: 30
//! upload-response-path: "json:$.data.link"
//! logging:
//!   level: info
//!   json: true
//! ```

use crate::extract::{ExtractRule, REGEX_PREFIX};
use crate::upload::encoder::UploadFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in a string.
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - Simple expansion, keeps placeholder if var not found
/// - `${VAR_NAME:-default}` - Expansion with default value
///
/// Variable names must start with a letter or underscore and contain only
/// uppercase letters, digits, and underscores.
///
/// # Examples
///
/// ```ignore
/// std::env::set_var("MY_VAR", "value");
/// let result = expand_env_vars("prefix-${MY_VAR}-suffix");
/// assert_eq!(result, "prefix-value-suffix");
///
/// let result = expand_env_vars("${MISSING:-default}");
/// assert_eq!(result, "default");
/// ```
pub(crate) fn expand_env_vars(s: &str) -> String {
    let re = env_var_regex();
    let mut last_match = 0;
    let mut result = String::with_capacity(s.len());

    for cap in re.captures_iter(s) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };

        result.push_str(&s[last_match..full_match.start()]);

        let value = match std::env::var(var_name.as_str()) {
            Ok(val) => val,
            Err(_) => match cap.get(2) {
                Some(default) => default.as_str().to_string(),
                // No env var and no default. Keep the original placeholder.
                None => full_match.as_str().to_string(),
            },
        };
        result.push_str(&value);

        last_match = full_match.end();
    }

    result.push_str(&s[last_match..]);

    result
}

fn env_var_regex() -> &'static regex_lite::Regex {
    static RE: std::sync::OnceLock<regex_lite::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]+))?\}")
            .expect("env var pattern is valid")
    })
}

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate that a URL starts with http:// or https://
fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        ConfigLoader::from_str(content)
    }

    /// Validate the configuration
    ///
    /// Only file-loaded configuration goes through here. The upload pipeline
    /// itself reports bad values as failures at call time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let upload = &self.upload;

        let format = upload.format.parse::<UploadFormat>().map_err(|_| {
            ConfigError::ValidationError(format!(
                "Invalid upload-format '{}': must be 'multipart', 'json', or 'binary'",
                upload.format
            ))
        })?;

        match ExtractRule::parse(&upload.response_path) {
            Ok(ExtractRule::Pattern(pattern))
                if !crate::extract::url_scan::is_supported(pattern) =>
            {
                return Err(ConfigError::ValidationError(format!(
                    "Unsupported upload-response-path pattern '{}{}'",
                    REGEX_PREFIX, pattern
                )));
            }
            Ok(_) => {}
            Err(e) => return Err(ConfigError::ValidationError(e.to_string())),
        }

        if upload.enabled {
            if let Some(ref url) = upload.url {
                if !is_valid_http_url(url) {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid upload-url '{}': must start with http:// or https://",
                        url
                    )));
                }
            }
        }

        if upload.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "upload-timeout must be at least 1 second".into(),
            ));
        }

        if format != UploadFormat::Binary && upload.field.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "upload-field cannot be empty".into(),
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level '{}': must be one of trace, debug, info, warn, error",
                    other
                )))
            }
        }

        Ok(())
    }
}

/// Upload configuration
///
/// Read-only snapshot handed to the pipeline at call time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Master on/off switch. Default: false
    #[serde(rename = "upload-enable")]
    pub enabled: bool,

    /// Target endpoint. Absent means every upload falls back.
    #[serde(rename = "upload-url")]
    pub url: Option<String>,

    /// Admission size cap in MiB. Default: 10
    #[serde(rename = "upload-max-size")]
    pub max_size_mib: u64,

    /// Body encoding: "multipart", "json" or "binary". Default: "multipart"
    #[serde(rename = "upload-format")]
    pub format: String,

    /// Form field / JSON key carrying the image. Default: "file"
    #[serde(rename = "upload-field")]
    pub field: String,

    /// Static `Name: Value` headers, sent in order
    #[serde(rename = "upload-header")]
    pub headers: Vec<String>,

    /// Transport deadline in seconds. Default: 30
    #[serde(rename = "upload-timeout")]
    pub timeout_secs: u64,

    /// Extraction rule, `json:<path>` or `regex:<pattern>`. Default: "json:$.url"
    #[serde(rename = "upload-response-path")]
    pub response_path: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            max_size_mib: default_max_size_mib(),
            format: default_format(),
            field: default_field(),
            headers: Vec::new(),
            timeout_secs: default_timeout_secs(),
            response_path: default_response_path(),
        }
    }
}

impl UploadConfig {
    /// Admission size cap in bytes
    pub fn max_bytes(&self) -> u64 {
        self.max_size_mib.saturating_mul(1024 * 1024)
    }

    /// Transport deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured endpoint, if any non-blank one is set
    pub fn endpoint(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

fn default_max_size_mib() -> u64 {
    10
}

fn default_format() -> String {
    "multipart".to_string()
}

fn default_field() -> String {
    "file".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_response_path() -> String {
    "json:$.url".to_string()
}

/// Logging configuration for the command-line binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). Default: "info"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output. Default: true
    #[serde(default = "default_log_json")]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_log_json(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_json() -> bool {
    true
}
