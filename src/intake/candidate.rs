//! Turning user-provided files into upload candidates

use crate::error::{BatcallError, Result};
use crate::types::{FileRef, MediaType, UploadCandidate};
use std::path::Path;
use tracing::debug;

/// Validation limits applied at intake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakePolicy {
    /// Largest accepted file, in bytes
    pub max_bytes: u64,
}

impl Default for IntakePolicy {
    fn default() -> Self {
        Self {
            max_bytes: crate::types::MAX_UPLOAD_BYTES,
        }
    }
}

impl IntakePolicy {
    /// Check a file reference against the allow-list and size ceiling
    ///
    /// A declared MIME type takes precedence; the extension is used when the
    /// source declared none.
    pub fn validate(&self, file: FileRef) -> Result<UploadCandidate> {
        let media_type = match file.mime.as_deref() {
            Some(mime) => MediaType::from_mime(mime, file.extension()).ok_or_else(|| {
                BatcallError::validation(&file.name, format!("unsupported media type '{}'", mime))
            })?,
            None => file
                .extension()
                .and_then(MediaType::from_extension)
                .ok_or_else(|| {
                    BatcallError::validation(
                        &file.name,
                        format!(
                            "unsupported file extension '{}'",
                            file.extension().unwrap_or("none")
                        ),
                    )
                })?,
        };

        if file.size_bytes > self.max_bytes {
            return Err(BatcallError::validation(
                &file.name,
                format!(
                    "file is {:.1} MB, the limit is {:.0} MB",
                    file.size_bytes as f64 / (1024.0 * 1024.0),
                    self.max_bytes as f64 / (1024.0 * 1024.0)
                ),
            ));
        }

        debug!(
            "Accepted {} ({} bytes, {})",
            file.name, file.size_bytes, media_type
        );

        Ok(UploadCandidate {
            name: file.name,
            size_bytes: file.size_bytes,
            media_type,
            source: file.path,
        })
    }
}

/// Describe a local file as a file reference
///
/// Only metadata is read; the audio itself is never opened.
pub fn file_ref_from_path(path: &Path) -> Result<FileRef> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        BatcallError::validation(path.display().to_string(), format!("cannot read file: {}", e))
    })?;
    if !metadata.is_file() {
        return Err(BatcallError::validation(
            path.display().to_string(),
            "not a regular file",
        ));
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(FileRef {
        name,
        size_bytes: metadata.len(),
        mime: None,
        path: Some(path.to_path_buf()),
    })
}
