//! HTTP transport
//!
//! Sends one POST per upload with the encoded body and the configured
//! static headers, then drains the response.
//!
//! The timeout is a post-hoc check: the deadline is fixed before the
//! request goes out and compared once the response has been fully read.
//! In-flight requests are never cancelled.

use super::encoder::EncodedBody;
use super::UploadError;
use bytes::{Bytes, BytesMut};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Url;
use std::time::{Duration, Instant};

/// Maximum response body size kept in memory (1 MiB)
pub const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// Characters of a non-2xx response body quoted in the failure message
const ERROR_BODY_PREVIEW: usize = 200;

/// Split a `Name: Value` header entry on the first colon.
///
/// Both sides are trimmed. Entries without a colon, or with an empty name
/// or value, yield `None`.
pub fn parse_header(entry: &str) -> Option<(&str, &str)> {
    let (name, value) = entry.split_once(':')?;
    let (name, value) = (name.trim(), value.trim());
    if name.is_empty() || value.is_empty() {
        return None;
    }
    Some((name, value))
}

/// Build the header map from configured entries.
///
/// Malformed entries are skipped. `Content-Type` and `Content-Length` are
/// always taken from the body.
pub fn build_headers(entries: &[String], body: &EncodedBody) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for entry in entries {
        let Some((name, value)) = parse_header(entry) else {
            tracing::debug!(entry = %entry, "Skipping malformed upload header");
            continue;
        };
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => {
                tracing::warn!(header = %name, "Skipping upload header with invalid characters");
            }
        }
    }

    if let Ok(content_type) = HeaderValue::from_str(&body.content_type) {
        headers.insert(CONTENT_TYPE, content_type);
    }
    headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));

    headers
}

/// HTTP transport backed by a reusable `reqwest` client
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
}

impl Transport {
    /// Create a transport with a default client
    pub fn new() -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("image-uploadr/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UploadError::Transport(error_chain(&e)))?;
        Ok(Self { client })
    }

    /// POST `body` to `url` and return the raw response body.
    #[tracing::instrument(
        name = "upload.transport.post",
        skip(self, headers, body),
        fields(
            http.method = "POST",
            http.url = %url,
            http.content_type = %body.content_type,
            upload.bytes = body.len(),
            http.status_code = tracing::field::Empty,
            response.bytes = tracing::field::Empty
        ),
        err(Display)
    )]
    pub async fn post(
        &self,
        url: &str,
        headers: &[String],
        body: EncodedBody,
        timeout: Duration,
    ) -> Result<Bytes, UploadError> {
        let url = Url::parse(url).map_err(|e| UploadError::InvalidUrl(format!("{url}: {e}")))?;

        let started = Instant::now();
        // A timeout too large to represent as an instant means no deadline
        let deadline = started.checked_add(timeout);

        let header_map = build_headers(headers, &body);
        let mut response = self
            .client
            .post(url)
            .headers(header_map)
            .body(body.bytes)
            .send()
            .await
            .map_err(|e| UploadError::Transport(error_chain(&e)))?;

        let status = response.status();

        let mut buf = BytesMut::new();
        let mut overflowed = false;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| UploadError::Transport(error_chain(&e)))?
        {
            if buf.len() + chunk.len() > MAX_RESPONSE_BYTES {
                overflowed = true;
                break;
            }
            buf.extend_from_slice(&chunk);
        }

        let span = tracing::Span::current();
        span.record("http.status_code", status.as_u16());
        span.record("response.bytes", buf.len());

        let elapsed = started.elapsed();
        if deadline.is_some_and(|deadline| Instant::now() > deadline) {
            return Err(UploadError::Timeout { elapsed, limit: timeout });
        }

        if !status.is_success() {
            let preview: String = String::from_utf8_lossy(&buf)
                .trim()
                .chars()
                .take(ERROR_BODY_PREVIEW)
                .collect();
            return Err(UploadError::HttpStatus { status, body: preview });
        }

        if overflowed {
            return Err(UploadError::ResponseTooLarge(MAX_RESPONSE_BYTES));
        }

        tracing::debug!(
            status = status.as_u16(),
            bytes = buf.len(),
            elapsed_ms = elapsed.as_millis(),
            "Upload response received"
        );

        Ok(buf.freeze())
    }
}

/// Render an error with its source chain, e.g.
/// `error sending request: tcp connect error: Connection refused`
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
