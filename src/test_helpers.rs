//! Shared test utilities: small synthetic rasters and a ready controller.

use crate::config::WizardConfig;
use crate::imaging::{Dimensions, RawImage, RustBackend};
use crate::pipeline::PipelineController;

/// Opaque raster with a distinct value in every channel, so resampling and
/// codec bugs show up as pixel mismatches.
pub fn gradient(width: u32, height: u32) -> RawImage {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(&[(x * 7 % 256) as u8, (y * 13 % 256) as u8, 128, 255]);
        }
    }
    RawImage::new(width, height, pixels).unwrap()
}

/// Alternating opaque near-white and half-transparent dark pixels.
pub fn checkerboard(width: u32, height: u32) -> RawImage {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            if (x + y) % 2 == 0 {
                pixels.extend_from_slice(&[250, 250, 250, 255]);
            } else {
                pixels.extend_from_slice(&[20, 40, 60, 128]);
            }
        }
    }
    RawImage::new(width, height, pixels).unwrap()
}

pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RawImage {
    RawImage::filled(Dimensions::new(width, height), rgba).unwrap()
}

/// Controller over the real backend with stock config.
pub fn controller() -> PipelineController<RustBackend> {
    PipelineController::new(RustBackend::new(), &WizardConfig::default())
}
