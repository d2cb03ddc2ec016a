//! Upload module
//!
//! Runs the per-file upload pipeline:
//! admission check, body encoding, HTTP transport, URL extraction.
//!
//! Every call resolves to exactly one [`UploadOutcome`]; internal errors
//! never escape to the caller.
//!
//! # Example
//!
//! ```no_run
//! use image_uploadr::config::UploadConfig;
//! use image_uploadr::upload::{UploadOutcome, Uploader};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = UploadConfig {
//!     enabled: true,
//!     url: Some("https://img.example.com/upload".into()),
//!     response_path: "json:$.data.link".into(),
//!     ..Default::default()
//! };
//! let uploader = Uploader::new(config)?;
//!
//! match uploader.upload("/tmp/screenshot.png").await {
//!     UploadOutcome::Success(url) => println!("{url}"),
//!     UploadOutcome::Failure(message) => eprintln!("upload failed: {message}"),
//!     UploadOutcome::Fallback => println!("/tmp/screenshot.png"),
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::UploadConfig;
use crate::extract::{ExtractError, ExtractRule};
use crate::metrics;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

pub mod admission;
pub mod encoder;
pub mod file_type;
pub mod transport;

use encoder::UploadFormat;
use transport::Transport;

/// Upload errors
///
/// The first group is benign and maps to [`UploadOutcome::Fallback`];
/// everything else maps to [`UploadOutcome::Failure`].
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Upload is disabled")]
    Disabled,

    #[error("No upload URL configured")]
    NoEndpoint,

    #[error("Cannot read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("File is {size} bytes, exceeding the {max} byte limit")]
    TooLarge { size: u64, max: u64 },

    #[error("Not a recognized image: {}", .0.display())]
    NotAnImage(PathBuf),

    #[error("Unsupported upload format '{0}': must be 'multipart', 'json', or 'binary'")]
    UnsupportedFormat(String),

    #[error("Invalid upload URL {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("Server returned HTTP {status}{}", format_body(.body))]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Upload timed out after {:.1}s (limit {}s)", .elapsed.as_secs_f64(), .limit.as_secs())]
    Timeout { elapsed: Duration, limit: Duration },

    #[error("Response body exceeds {0} bytes")]
    ResponseTooLarge(usize),

    #[error("Failed to extract URL from response: {0}")]
    Extract(#[from] ExtractError),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

fn format_body(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

impl UploadError {
    /// Whether this error is a benign skip rather than a failure
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            Self::Disabled
                | Self::NoEndpoint
                | Self::Unreadable { .. }
                | Self::TooLarge { .. }
                | Self::NotAnImage(_)
        )
    }

    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::NoEndpoint => "no_endpoint",
            Self::Unreadable { .. } => "unreadable",
            Self::TooLarge { .. } => "too_large",
            Self::NotAnImage(_) => "not_an_image",
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::InvalidUrl(_) => "invalid_url",
            Self::Transport(_) => "transport",
            Self::HttpStatus { .. } => "http_status",
            Self::Timeout { .. } => "timeout",
            Self::ResponseTooLarge(_) => "response_too_large",
            Self::Extract(_) => "extract",
            Self::Runtime(_) => "runtime",
        }
    }

    /// Map into the caller-facing outcome
    pub fn into_outcome(self) -> UploadOutcome {
        if self.is_benign() {
            UploadOutcome::Fallback
        } else {
            UploadOutcome::Failure(self.to_string())
        }
    }
}

/// Result of one upload call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Uploaded; carries the non-empty public URL
    Success(String),
    /// Attempted and failed; carries a human-readable reason
    Failure(String),
    /// Skipped for a benign reason; use the local path
    Fallback,
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback)
    }

    /// Uploaded URL, if any
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Success(url) => Some(url),
            _ => None,
        }
    }

    /// The URL on success, otherwise the local path
    pub fn into_path_or_url(self, path: &Path) -> String {
        match self {
            Self::Success(url) => url,
            Self::Failure(_) | Self::Fallback => path.display().to_string(),
        }
    }

    /// Label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Failure(_) => "failure",
            Self::Fallback => "fallback",
        }
    }
}

impl From<UploadError> for UploadOutcome {
    fn from(err: UploadError) -> Self {
        err.into_outcome()
    }
}

/// Upload pipeline bound to one configuration snapshot
#[derive(Debug, Clone)]
pub struct Uploader {
    config: UploadConfig,
    transport: Transport,
}

impl Uploader {
    /// Create an uploader with its own HTTP client
    pub fn new(config: UploadConfig) -> Result<Self, UploadError> {
        Ok(Self {
            config,
            transport: Transport::new()?,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Upload one file.
    ///
    /// Never fails: every error is folded into the returned outcome.
    #[tracing::instrument(
        name = "upload.file",
        skip(self, path),
        fields(
            upload.path = %path.as_ref().display(),
            upload.format = %self.config.format,
            upload.size = tracing::field::Empty,
            upload.outcome = tracing::field::Empty
        )
    )]
    pub async fn upload(&self, path: impl AsRef<Path>) -> UploadOutcome {
        let path = path.as_ref();
        let start_time = Instant::now();

        let outcome = match self.try_upload(path).await {
            Ok(url) => {
                tracing::info!(url = %url, "Upload completed");
                UploadOutcome::Success(url)
            }
            Err(e) if e.is_benign() => {
                tracing::info!(reason = %e, "Upload skipped, using local path");
                metrics::record_skip(e.kind());
                e.into_outcome()
            }
            Err(e) => {
                tracing::error!(error = %e, "Upload failed");
                metrics::record_error(e.kind());
                e.into_outcome()
            }
        };

        metrics::record_upload_outcome(outcome.label());
        metrics::record_upload_duration(&self.config.format, start_time.elapsed().as_secs_f64());
        tracing::Span::current().record("upload.outcome", outcome.label());

        outcome
    }

    async fn try_upload(&self, path: &Path) -> Result<String, UploadError> {
        let file = admission::admit(&self.config, path).await?;
        tracing::Span::current().record("upload.size", file.bytes.len());

        let format: UploadFormat = self.config.format.parse()?;
        let body = encoder::encode(format, &self.config.field, &file.file_name, &file.bytes);
        drop(file.bytes);

        tracing::debug!(
            format = %format,
            file_type = %file.file_type,
            body_bytes = body.len(),
            "Encoded upload body"
        );

        let body_len = body.len() as u64;
        let response = self
            .transport
            .post(file.endpoint, &self.config.headers, body, self.config.timeout())
            .await?;
        metrics::record_upload_bytes(body_len);

        let url = ExtractRule::parse(&self.config.response_path)?.apply(&response)?;
        Ok(url)
    }
}

/// Run the pipeline synchronously on a private current-thread runtime.
///
/// Must not be called from inside a tokio runtime.
pub fn upload_blocking(config: &UploadConfig, path: impl AsRef<Path>) -> UploadOutcome {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => return UploadError::Runtime(e.to_string()).into_outcome(),
    };

    let uploader = match Uploader::new(config.clone()) {
        Ok(uploader) => uploader,
        Err(e) => return e.into_outcome(),
    };

    runtime.block_on(uploader.upload(path))
}
