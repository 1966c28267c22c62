//! High-level image operations.
//!
//! These functions combine calculations with backend execution. They check
//! preconditions, build parameters, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::estimate_size_bytes;
use super::params::{EncodeParams, ImageFormat, Quality, ResizeParams};
use super::raster::{Dimensions, RawImage};
use rayon::prelude::*;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Encoded export bytes plus the metadata the export boundary needs.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub dimensions: Dimensions,
    /// Heuristic size shown to the user; not `bytes.len()`.
    pub estimated_bytes: f64,
}

impl EncodedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Resample `source` to exactly `target`.
///
/// Rejects zero-sized targets. Aspect-ratio locking is the caller's job; the
/// output is stretched to whatever `target` says.
pub fn resize(backend: &impl ImageBackend, source: &RawImage, target: Dimensions) -> Result<RawImage> {
    if !target.is_valid() {
        return Err(BackendError::InvalidDimensions {
            width: target.width,
            height: target.height,
        });
    }
    let resized = backend.resize(&ResizeParams {
        source: source.clone(),
        target,
    })?;
    if resized.dimensions() != target {
        return Err(BackendError::ProcessingFailed(format!(
            "backend produced {} instead of {}",
            resized.dimensions(),
            target
        )));
    }
    Ok(resized)
}

/// Encode `source` into one format.
pub fn encode(
    backend: &impl ImageBackend,
    source: &RawImage,
    format: ImageFormat,
    quality: Quality,
) -> Result<EncodedImage> {
    let bytes = backend.encode(&EncodeParams {
        source: source.clone(),
        format,
        quality,
    })?;
    Ok(EncodedImage {
        bytes,
        format,
        dimensions: source.dimensions(),
        estimated_bytes: estimate_size_bytes(source.dimensions(), format, quality),
    })
}

/// Encode `source` once per format, in parallel.
///
/// Results come back in [`ImageFormat::ALL`] order (PNG, JPEG, WEBP, GIF).
/// Each entry succeeds or fails on its own.
pub fn encode_all_formats(
    backend: &impl ImageBackend,
    source: &RawImage,
    quality: Quality,
) -> Vec<(ImageFormat, Result<EncodedImage>)> {
    ImageFormat::ALL
        .par_iter()
        .map(|&format| (format, encode(backend, source, format, quality)))
        .collect()
}
