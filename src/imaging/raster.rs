//! The raster type every pipeline stage reads and writes.
//!
//! A [`RawImage`] is created once (at upload) and then only ever replaced:
//! each stage produces a brand-new raster instead of editing its input. The
//! pixel buffer sits behind an `Arc`, so handing the same raster to a worker
//! thread or to four parallel encoders costs a pointer copy.

use image::RgbaImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RasterError {
    #[error("Raster dimensions must be positive, got {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },
    #[error("Pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferLength {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Width and height of a raster, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both sides are at least one pixel.
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Clamp both sides into `1..=max`, the range the form controls accept.
    pub fn clamp_to(self, max: u32) -> Self {
        let max = max.max(1);
        Self {
            width: self.width.clamp(1, max),
            height: self.height.clamp(1, max),
        }
    }

    pub fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Decoded RGBA8 raster, row-major, 4 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl RawImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::ZeroDimension { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(RasterError::BufferLength {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    /// A raster where every pixel has the same RGBA value.
    pub fn filled(size: Dimensions, rgba: [u8; 4]) -> Result<Self, RasterError> {
        let count = size.width as usize * size.height as usize;
        let pixels = rgba.iter().copied().cycle().take(count * 4).collect();
        Self::new(size.width, size.height, pixels)
    }

    pub fn from_rgba_image(img: RgbaImage) -> Result<Self, RasterError> {
        let (width, height) = img.dimensions();
        Self::new(width, height, img.into_raw())
    }

    /// A copy of this raster with `edit` applied to every RGBA pixel.
    ///
    /// The buffer keeps its length, so the result needs no re-validation.
    pub(crate) fn map_pixels<F>(&self, edit: F) -> RawImage
    where
        F: Fn(&mut [u8]) + Sync + Send,
    {
        let mut pixels = self.pixels.to_vec();
        pixels.par_chunks_exact_mut(4).for_each(|px| edit(px));
        Self {
            width: self.width,
            height: self.height,
            pixels: pixels.into(),
        }
    }

    /// Copy into an `image::RgbaImage` for the codec/resampling functions.
    pub fn to_rgba_image(&self) -> RgbaImage {
        // Length is checked on construction, so from_raw cannot fail here.
        RgbaImage::from_raw(self.width, self.height, self.pixels.to_vec())
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA value at `(x, y)`, or `None` outside the raster.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.pixels[idx..idx + 4];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Iterator over the alpha channel in pixel order.
    pub fn alpha_channel(&self) -> impl Iterator<Item = u8> + '_ {
        self.pixels.chunks_exact(4).map(|px| px[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_zero_width() {
        let err = RawImage::new(0, 4, Vec::new()).unwrap_err();
        assert_eq!(
            err,
            RasterError::ZeroDimension {
                width: 0,
                height: 4
            }
        );
    }

    #[test]
    fn new_rejects_short_buffer() {
        let err = RawImage::new(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(
            err,
            RasterError::BufferLength {
                expected: 16,
                actual: 15,
                ..
            }
        ));
    }

    #[test]
    fn filled_repeats_pixel() {
        let img = RawImage::filled(Dimensions::new(3, 2), [1, 2, 3, 4]).unwrap();
        assert_eq!(img.pixels().len(), 24);
        assert_eq!(img.pixel(2, 1), Some([1, 2, 3, 4]));
        assert_eq!(img.pixel(3, 0), None);
    }

    #[test]
    fn rgba_image_conversion_keeps_pixels() {
        let img = RawImage::new(2, 1, vec![10, 20, 30, 40, 50, 60, 70, 80]).unwrap();
        let back = RawImage::from_rgba_image(img.to_rgba_image()).unwrap();
        assert_eq!(img, back);
    }

    #[test]
    fn map_pixels_edits_a_copy() {
        let img = RawImage::new(2, 1, vec![10, 20, 30, 255, 40, 50, 60, 255]).unwrap();
        let faded = img.map_pixels(|px| px[3] = 7);
        assert_eq!(faded.dimensions(), img.dimensions());
        assert_eq!(faded.pixels(), &[10, 20, 30, 7, 40, 50, 60, 7]);
        assert_eq!(img.pixel(0, 0), Some([10, 20, 30, 255]));
    }

    #[test]
    fn clones_share_the_buffer() {
        let img = RawImage::filled(Dimensions::new(8, 8), [0, 0, 0, 255]).unwrap();
        let copy = img.clone();
        assert!(std::ptr::eq(img.pixels().as_ptr(), copy.pixels().as_ptr()));
    }

    #[test]
    fn clamp_to_keeps_sides_in_range() {
        assert_eq!(
            Dimensions::new(0, 9000).clamp_to(4000),
            Dimensions::new(1, 4000)
        );
        assert_eq!(
            Dimensions::new(640, 480).clamp_to(4000),
            Dimensions::new(640, 480)
        );
    }

    #[test]
    fn dimensions_display() {
        assert_eq!(Dimensions::new(1920, 1080).to_string(), "1920x1080");
    }
}
