//! Upload boundary: checks a user-supplied file before the pipeline sees it.
//!
//! A file is accepted only when its MIME type is `image/*` and it is no
//! larger than the configured limit. Rejected files never reach the decoder;
//! the error's message is the one shown to the user.

use crate::imaging::{BackendError, ImageBackend, RawImage};
use std::path::Path;
use thiserror::Error;

/// Default upload limit: 10 MiB.
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Please select a valid image file")]
    NotAnImage { mime: String },
    #[error("File size must be less than {}", format_limit(*.limit))]
    TooLarge { size: u64, limit: u64 },
    #[error("Could not read image: {0}")]
    Decode(#[from] BackendError),
}

fn format_limit(limit: u64) -> String {
    let mb = limit as f64 / (1024.0 * 1024.0);
    if mb.fract() == 0.0 {
        format!("{}MB", mb as u64)
    } else {
        format!("{mb:.1}MB")
    }
}

/// A file as handed over by whatever picked it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Read a file from disk, guessing its MIME type from the extension.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            name,
            mime: mime_for_path(path).to_string(),
            bytes,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Reject non-images and oversized files without decoding anything.
pub fn validate_upload(file: &UploadFile, max_bytes: u64) -> Result<(), UploadError> {
    if !file.mime.starts_with("image/") {
        return Err(UploadError::NotAnImage {
            mime: file.mime.clone(),
        });
    }
    if file.size() > max_bytes {
        return Err(UploadError::TooLarge {
            size: file.size(),
            limit: max_bytes,
        });
    }
    Ok(())
}

/// Validate, then decode into a raster for the pipeline.
pub fn accept_upload(
    backend: &impl ImageBackend,
    file: &UploadFile,
    max_bytes: u64,
) -> Result<RawImage, UploadError> {
    validate_upload(file, max_bytes)?;
    let image = backend.decode(&file.bytes)?;
    log::info!(
        "Accepted upload {} ({}, {} bytes, {})",
        file.name,
        file.mime,
        file.size(),
        image.dimensions()
    );
    Ok(image)
}

/// MIME type implied by a file extension. Unknown extensions map to
/// `application/octet-stream`, which the upload check rejects.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::Dimensions;
    use crate::test_helpers::gradient;

    fn file(mime: &str, len: usize) -> UploadFile {
        UploadFile {
            name: "photo".into(),
            mime: mime.into(),
            bytes: vec![0; len],
        }
    }

    #[test]
    fn rejects_non_image_mime() {
        let err = validate_upload(&file("text/plain", 10), DEFAULT_MAX_BYTES).unwrap_err();
        assert!(matches!(err, UploadError::NotAnImage { .. }));
        assert_eq!(err.to_string(), "Please select a valid image file");
    }

    #[test]
    fn rejects_oversized_file() {
        let err = validate_upload(&file("image/png", 11), 10).unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { size: 11, limit: 10 }));
    }

    #[test]
    fn default_limit_message() {
        let err = UploadError::TooLarge {
            size: DEFAULT_MAX_BYTES + 1,
            limit: DEFAULT_MAX_BYTES,
        };
        assert_eq!(err.to_string(), "File size must be less than 10MB");
    }

    #[test]
    fn limit_is_inclusive() {
        assert!(validate_upload(&file("image/png", 10), 10).is_ok());
    }

    #[test]
    fn rejected_upload_never_decodes() {
        let backend = MockBackend::new();
        assert!(accept_upload(&backend, &file("video/mp4", 4), DEFAULT_MAX_BYTES).is_err());
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn accepted_upload_decodes() {
        let backend = MockBackend::with_decoded(vec![gradient(6, 4)]);
        let image = accept_upload(&backend, &file("image/png", 32), DEFAULT_MAX_BYTES).unwrap();
        assert_eq!(image.dimensions(), Dimensions::new(6, 4));
        assert_eq!(backend.get_operations(), vec![RecordedOp::Decode(32)]);
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_for_path(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_for_path(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("a.gif")), "image/gif");
        assert_eq!(mime_for_path(Path::new("notes.txt")), "application/octet-stream");
        assert_eq!(mime_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn read_from_disk() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("pic.webp");
        std::fs::write(&path, b"RIFF").unwrap();
        let upload = UploadFile::read(&path).unwrap();
        assert_eq!(upload.name, "pic.webp");
        assert_eq!(upload.mime, "image/webp");
        assert_eq!(upload.size(), 4);
    }
}
