//! Request body encoding
//!
//! Packages raw file bytes into one of three wire formats and reports the
//! matching `Content-Type` header value.
//!
//! # Example
//!
//! ```
//! use image_uploadr::upload::encoder::{encode, UploadFormat};
//!
//! let body = encode(UploadFormat::Json, "image", "a.png", b"hi");
//! assert_eq!(body.content_type, "application/json");
//! assert_eq!(&body.bytes[..], br#"{"image":"aGk="}"#);
//! ```

use super::UploadError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use std::str::FromStr;

/// Boundary token for multipart bodies
pub const MULTIPART_BOUNDARY: &str = "----ImageUploadrFormBoundary7MA4YWxkTrZu0gW";

/// Wire format of the request body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Multipart,
    Json,
    Binary,
}

impl FromStr for UploadFormat {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "multipart" => Ok(Self::Multipart),
            "json" => Ok(Self::Json),
            "binary" => Ok(Self::Binary),
            _ => Err(UploadError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for UploadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Multipart => f.write_str("multipart"),
            Self::Json => f.write_str("json"),
            Self::Binary => f.write_str("binary"),
        }
    }
}

/// Encoded request body with its content type
#[derive(Debug, Clone)]
pub struct EncodedBody {
    pub bytes: Bytes,
    pub content_type: String,
}

impl EncodedBody {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Encode `data` for the given format.
///
/// `field` names the form field (multipart) or object key (json) and is
/// ignored for binary bodies. `file_name` is only used by multipart.
pub fn encode(format: UploadFormat, field: &str, file_name: &str, data: &[u8]) -> EncodedBody {
    match format {
        UploadFormat::Multipart => encode_multipart(field, file_name, data),
        UploadFormat::Json => encode_json(field, data),
        UploadFormat::Binary => EncodedBody {
            bytes: Bytes::copy_from_slice(data),
            content_type: "application/octet-stream".to_string(),
        },
    }
}

/// Single-part `multipart/form-data` body.
///
/// Field and file names are embedded verbatim; quotes are not escaped.
fn encode_multipart(field: &str, file_name: &str, data: &[u8]) -> EncodedBody {
    let head = format!(
        "--{MULTIPART_BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    );
    let tail = format!("\r\n--{MULTIPART_BOUNDARY}--\r\n");

    let mut buf = BytesMut::with_capacity(head.len() + data.len() + tail.len());
    buf.put_slice(head.as_bytes());
    buf.put_slice(data);
    buf.put_slice(tail.as_bytes());

    EncodedBody {
        bytes: buf.freeze(),
        content_type: format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
    }
}

/// `{"<field>":"<base64>"}`
fn encode_json(field: &str, data: &[u8]) -> EncodedBody {
    let encoded = STANDARD.encode(data);
    // Escape the key through serde_json; base64 output needs no escaping.
    let key = serde_json::Value::String(field.to_string()).to_string();
    let body = format!("{{{key}:\"{encoded}\"}}");

    EncodedBody {
        bytes: Bytes::from(body),
        content_type: "application/json".to_string(),
    }
}
