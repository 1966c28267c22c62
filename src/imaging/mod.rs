//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode upload** | `image::load_from_memory` |
//! | **Resize** | `image::imageops::resize` (exact target, configurable filter) |
//! | **Background mask** | brightness threshold in [`mask`] |
//! | **Encode** | `image` PNG / JPEG / WebP / GIF encoders |
//!
//! The module is split into:
//! - **Raster**: [`RawImage`] and [`Dimensions`]
//! - **Calculations**: Pure functions for aspect ratios and size estimates (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend
//! - **Mask**: the background heuristic and its simulated progress run

pub mod backend;
mod calculations;
pub mod mask;
pub mod operations;
mod params;
mod raster;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{
    AspectRatio, QUICK_PRESETS, constrain_to_aspect, derive_height, estimate_size_bytes,
    format_size_estimate,
};
pub use mask::{
    CancelToken, MaskEvent, MaskRun, MaskTimings, NoPause, Pacer, SleepPacer, remove_background,
};
pub use operations::{EncodedImage, encode, encode_all_formats, resize};
pub use params::{EncodeParams, ImageFormat, MaskQuality, Quality, ResizeParams};
pub use raster::{Dimensions, RasterError, RawImage};
pub use rust_backend::RustBackend;
