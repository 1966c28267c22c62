//! Export boundary: encoded artifacts and their file names.
//!
//! The export source is drawn at the session's target size, then encoded
//! once (single format) or once per format in "download all" mode. Writing
//! the bytes somewhere is left to the caller; [`write_artifact`] is the
//! filesystem version the CLI uses.

use crate::imaging::{
    self, BackendError, Dimensions, EncodedImage, ImageBackend, ImageFormat, Quality, RawImage,
};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Nothing to export: no image has been uploaded")]
    NothingToExport,
    #[error("Export failed: {0}")]
    Encoding(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One downloadable file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub image: EncodedImage,
}

/// `{name}{ext}`, or `{name}-{id}{ext}` when several formats are exported.
///
/// # Examples
/// ```
/// # use image_wizard::export::suggested_file_name;
/// # use image_wizard::imaging::ImageFormat;
/// assert_eq!(suggested_file_name("photo", ImageFormat::Png, false), "photo.png");
/// assert_eq!(suggested_file_name("photo", ImageFormat::Jpeg, true), "photo-jpg.jpg");
/// ```
pub fn suggested_file_name(name: &str, format: ImageFormat, multi: bool) -> String {
    if multi {
        format!("{name}-{}{}", format.id(), format.extension())
    } else {
        format!("{name}{}", format.extension())
    }
}

/// Resample `source` to `target` unless it already has that size.
fn draw_at_target(
    backend: &impl ImageBackend,
    source: &RawImage,
    target: Dimensions,
) -> Result<RawImage, BackendError> {
    if source.dimensions() == target {
        Ok(source.clone())
    } else {
        imaging::resize(backend, source, target)
    }
}

/// Draw `source` at `target` and encode it as one artifact.
pub fn export_image(
    backend: &impl ImageBackend,
    source: &RawImage,
    target: Dimensions,
    format: ImageFormat,
    quality: Quality,
    name: &str,
) -> Result<ExportArtifact, ExportError> {
    let canvas = draw_at_target(backend, source, target)?;
    let image = imaging::encode(backend, &canvas, format, quality)?;
    Ok(ExportArtifact {
        file_name: suggested_file_name(name, format, false),
        image,
    })
}

/// Draw `source` at `target` once, then encode every format from it.
///
/// Results are in [`ImageFormat::ALL`] order and fail independently.
pub fn export_all_formats(
    backend: &impl ImageBackend,
    source: &RawImage,
    target: Dimensions,
    quality: Quality,
    name: &str,
) -> Result<Vec<(ImageFormat, Result<ExportArtifact, ExportError>)>, ExportError> {
    let canvas = draw_at_target(backend, source, target)?;
    Ok(imaging::encode_all_formats(backend, &canvas, quality)
        .into_iter()
        .map(|(format, encoded)| {
            let artifact = encoded
                .map(|image| ExportArtifact {
                    file_name: suggested_file_name(name, format, true),
                    image,
                })
                .map_err(ExportError::from);
            (format, artifact)
        })
        .collect())
}

/// Write an artifact into `dir`, creating the directory if needed.
pub fn write_artifact(dir: &Path, artifact: &ExportArtifact) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(&artifact.file_name);
    fs::write(&path, &artifact.image.bytes)?;
    log::info!("Wrote {} ({} bytes)", path.display(), artifact.image.bytes.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::test_helpers::{gradient, solid};
    use tempfile::TempDir;

    #[test]
    fn file_names_per_mode() {
        assert_eq!(suggested_file_name("out", ImageFormat::WebP, false), "out.webp");
        assert_eq!(suggested_file_name("out", ImageFormat::Gif, true), "out-gif.gif");
        assert_eq!(
            suggested_file_name("processed-image", ImageFormat::Jpeg, false),
            "processed-image.jpg"
        );
    }

    #[test]
    fn export_skips_resample_at_target_size() {
        let backend = MockBackend::new();
        let source = gradient(8, 6);
        let artifact = export_image(
            &backend,
            &source,
            Dimensions::new(8, 6),
            ImageFormat::Png,
            Quality::default(),
            "x",
        )
        .unwrap();
        assert_eq!(artifact.file_name, "x.png");
        assert_eq!(artifact.image.dimensions, Dimensions::new(8, 6));
        assert!(
            !backend
                .get_operations()
                .iter()
                .any(|op| matches!(op, RecordedOp::Resize { .. }))
        );
    }

    #[test]
    fn export_draws_at_target_size() {
        let backend = MockBackend::new();
        let artifact = export_image(
            &backend,
            &gradient(8, 6),
            Dimensions::new(4, 4),
            ImageFormat::Jpeg,
            Quality::new(60),
            "x",
        )
        .unwrap();
        assert_eq!(artifact.image.dimensions, Dimensions::new(4, 4));
        assert_eq!(
            backend.get_operations(),
            vec![
                RecordedOp::Resize {
                    from: Dimensions::new(8, 6),
                    to: Dimensions::new(4, 4)
                },
                RecordedOp::Encode {
                    format: ImageFormat::Jpeg,
                    quality: 60,
                    size: Dimensions::new(4, 4)
                },
            ]
        );
    }

    #[test]
    fn encoding_failure_surfaces() {
        let backend = MockBackend::failing_on(vec![ImageFormat::Gif]);
        let result = export_image(
            &backend,
            &solid(2, 2, [0, 0, 0, 255]),
            Dimensions::new(2, 2),
            ImageFormat::Gif,
            Quality::default(),
            "x",
        );
        assert!(matches!(result, Err(ExportError::Encoding(_))));
    }

    #[test]
    fn export_all_names_every_format() {
        let backend = MockBackend::new();
        let results = export_all_formats(
            &backend,
            &solid(3, 3, [9, 9, 9, 255]),
            Dimensions::new(3, 3),
            Quality::default(),
            "img",
        )
        .unwrap();
        let names: Vec<String> = results
            .iter()
            .map(|(_, r)| r.as_ref().unwrap().file_name.clone())
            .collect();
        assert_eq!(names, vec!["img-png.png", "img-jpg.jpg", "img-webp.webp", "img-gif.gif"]);
        let mimes: Vec<&str> = results
            .iter()
            .map(|(_, r)| r.as_ref().unwrap().image.mime_type())
            .collect();
        assert_eq!(mimes, vec!["image/png", "image/jpeg", "image/webp", "image/gif"]);
    }

    #[test]
    fn write_artifact_creates_file() {
        let tmp = TempDir::new().unwrap();
        let artifact = ExportArtifact {
            file_name: "a.png".into(),
            image: EncodedImage {
                bytes: vec![1, 2, 3],
                format: ImageFormat::Png,
                dimensions: Dimensions::new(1, 1),
                estimated_bytes: 0.9,
            },
        };
        let path = write_artifact(&tmp.path().join("nested"), &artifact).unwrap();
        assert_eq!(fs::read(path).unwrap(), vec![1, 2, 3]);
    }
}
