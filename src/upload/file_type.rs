//! Image file classification
//!
//! Content sniffing runs on a short byte prefix via `infer`; when the
//! prefix is inconclusive the file extension is consulted via `mime_guess`.

use std::fmt;
use std::path::Path;

/// Number of leading bytes used for content sniffing
pub const SNIFF_LEN: usize = 16;

/// Recognized file kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Png,
    Jpeg,
    Gif,
    Webp,
    Bmp,
    Tiff,
    Ico,
    Avif,
    Heic,
    Svg,
    Unknown,
}

impl FileType {
    /// Classify from the leading bytes of a file.
    ///
    /// Only the first [`SNIFF_LEN`] bytes are inspected.
    pub fn sniff(prefix: &[u8]) -> Self {
        let prefix = &prefix[..prefix.len().min(SNIFF_LEN)];
        infer::get(prefix)
            .map(|kind| Self::from_mime(kind.mime_type()))
            .unwrap_or(Self::Unknown)
    }

    /// Classify from the path's extension
    pub fn from_path(path: &Path) -> Self {
        mime_guess::from_path(path)
            .iter()
            .map(|mime| Self::from_mime(mime.essence_str()))
            .find(|kind| kind.is_image())
            .unwrap_or(Self::Unknown)
    }

    /// Sniff first, then fall back to the extension
    pub fn detect(prefix: &[u8], path: &Path) -> Self {
        match Self::sniff(prefix) {
            Self::Unknown => Self::from_path(path),
            kind => kind,
        }
    }

    fn from_mime(mime: &str) -> Self {
        match mime {
            "image/png" => Self::Png,
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Self::Jpeg,
            "image/gif" => Self::Gif,
            "image/webp" => Self::Webp,
            "image/bmp" | "image/x-ms-bmp" => Self::Bmp,
            "image/tiff" => Self::Tiff,
            "image/vnd.microsoft.icon" | "image/x-icon" => Self::Ico,
            "image/avif" => Self::Avif,
            "image/heif" | "image/heic" => Self::Heic,
            "image/svg+xml" => Self::Svg,
            _ => Self::Unknown,
        }
    }

    /// Whether this kind is eligible for upload
    pub fn is_image(self) -> bool {
        self != Self::Unknown
    }

    /// Canonical MIME type
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::Ico => "image/vnd.microsoft.icon",
            Self::Avif => "image/avif",
            Self::Heic => "image/heic",
            Self::Svg => "image/svg+xml",
            Self::Unknown => "application/octet-stream",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Ico => "ico",
            Self::Avif => "avif",
            Self::Heic => "heic",
            Self::Svg => "svg",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
