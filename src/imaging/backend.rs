//! Image processing backend trait and shared error type.
//!
//! The [`ImageBackend`] trait defines the three codec/resampling operations
//! every backend must support: decode, resize, and encode. The masking
//! heuristic is not part of the trait; it is a plain per-pixel function in
//! [`mask`](super::mask).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use `MockBackend`, which records operations.

use super::params::{EncodeParams, ResizeParams};
use super::raster::{RasterError, RawImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Invalid target dimensions {width}x{height}: both sides must be positive")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// Trait for image processing backends.
///
/// `Sync` so one backend can serve the parallel encoders of "download all".
pub trait ImageBackend: Sync {
    /// Decode an encoded file (PNG, JPEG, WebP, GIF, ...) into RGBA8.
    fn decode(&self, bytes: &[u8]) -> Result<RawImage, BackendError>;

    /// Resample to exactly `params.target`.
    fn resize(&self, params: &ResizeParams) -> Result<RawImage, BackendError>;

    /// Encode into `params.format`.
    fn encode(&self, params: &EncodeParams) -> Result<Vec<u8>, BackendError>;
}
