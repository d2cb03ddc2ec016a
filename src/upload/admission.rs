//! Admission check
//!
//! Decides whether a file is eligible for upload. Every rejection here is
//! benign and ends in a fallback to the local path.

use super::file_type::{FileType, SNIFF_LEN};
use super::UploadError;
use crate::config::UploadConfig;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};

/// A file that passed admission, with its full contents in memory
#[derive(Debug)]
pub struct AdmittedFile<'c> {
    pub endpoint: &'c str,
    pub path: PathBuf,
    pub file_name: String,
    pub file_type: FileType,
    pub bytes: Vec<u8>,
}

/// Run the admission steps in order.
pub async fn admit<'c>(config: &'c UploadConfig, path: &Path) -> Result<AdmittedFile<'c>, UploadError> {
    if !config.enabled {
        return Err(UploadError::Disabled);
    }
    let endpoint = config.endpoint().ok_or(UploadError::NoEndpoint)?;

    let unreadable = |source: std::io::Error| UploadError::Unreadable {
        path: path.to_path_buf(),
        source,
    };

    let mut file = tokio::fs::File::open(path).await.map_err(unreadable)?;

    let size = file.metadata().await.map_err(unreadable)?.len();
    let max = config.max_bytes();
    if size > max {
        tracing::warn!(
            path = %path.display(),
            size = size,
            max = max,
            "File exceeds upload size limit"
        );
        return Err(UploadError::TooLarge { size, max });
    }

    let mut prefix = Vec::with_capacity(SNIFF_LEN);
    (&mut file)
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut prefix)
        .await
        .map_err(unreadable)?;

    let file_type = FileType::detect(&prefix, path);
    if !file_type.is_image() {
        return Err(UploadError::NotAnImage(path.to_path_buf()));
    }

    file.seek(SeekFrom::Start(0)).await.map_err(unreadable)?;
    let bytes = read_capped(&mut file, max, size as usize)
        .await
        .map_err(unreadable)?;
    if bytes.len() as u64 > max {
        // File grew after the stat
        let size = bytes.len() as u64;
        tracing::warn!(
            path = %path.display(),
            size = size,
            max = max,
            "File grew past upload size limit while reading"
        );
        return Err(UploadError::TooLarge { size, max });
    }

    tracing::debug!(
        path = %path.display(),
        file_type = %file_type,
        mime = file_type.mime_type(),
        bytes = bytes.len(),
        "File admitted for upload"
    );

    Ok(AdmittedFile {
        endpoint,
        path: path.to_path_buf(),
        file_name: file_name(path),
        file_type,
        bytes,
    })
}

/// Read at most `max + 1` bytes, so an over-limit result is detectable
/// without draining the whole source.
async fn read_capped<R>(reader: R, max: u64, capacity: usize) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::with_capacity(capacity);
    reader
        .take(max.saturating_add(1))
        .read_to_end(&mut bytes)
        .await?;
    Ok(bytes)
}

/// Last path component, used verbatim
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}
