//! Pure Rust image backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG, WebP, GIF) | `image::load_from_memory` → RGBA8 |
//! | Resize | `image::imageops::resize` (filter from config, Triangle by default) |
//! | Encode → PNG | `PngEncoder`, full RGBA |
//! | Encode → JPEG | `JpegEncoder::new_with_quality`, alpha composited onto white |
//! | Encode → WebP | `WebPEncoder::new_lossless` after quality-driven channel quantization |
//! | Encode → GIF | `GifEncoder`, alpha reduced to on/off transparency |

use super::backend::{BackendError, ImageBackend};
use super::params::{EncodeParams, ImageFormat, Quality, ResizeParams};
use super::raster::RawImage;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};
use std::io::Cursor;

/// Opaque background JPEG export flattens transparency onto.
const JPEG_BACKGROUND: [u8; 3] = [255, 255, 255];

/// Alpha at or above this stays visible in a GIF; below becomes transparent.
const GIF_ALPHA_CUTOFF: u8 = 128;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    filter: FilterType,
}

impl RustBackend {
    pub fn new() -> Self {
        Self::with_filter(FilterType::Triangle)
    }

    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> FilterType {
        self.filter
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Composite every pixel over an opaque background and drop alpha.
fn flatten_onto(img: &RgbaImage, background: [u8; 3]) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b, a] = img.get_pixel(x, y).0;
        let alpha = a as f32 / 255.0;
        let blend = |c: u8, bg: u8| (c as f32 * alpha + bg as f32 * (1.0 - alpha)).round() as u8;
        image::Rgb([
            blend(r, background[0]),
            blend(g, background[1]),
            blend(b, background[2]),
        ])
    })
}

/// Coarsen RGB channels for lossy-style WebP output.
///
/// The pure-Rust WebP encoder is lossless only, so quality is expressed by
/// reducing the number of levels per channel before encoding.
fn quantize_rgb_for_webp(data: &mut [u8], quality: Quality) {
    if quality.value() >= 100 {
        return;
    }
    let levels = webp_levels_from_quality(quality);
    let step = 255.0 / (levels as f32 - 1.0);
    for pixel in data.chunks_exact_mut(4) {
        for channel in pixel.iter_mut().take(3) {
            let bucket = (*channel as f32 / step).round();
            *channel = (bucket * step).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Levels per channel: fine at high quality, coarse at low quality.
fn webp_levels_from_quality(quality: Quality) -> u16 {
    let normalized = quality.value() as f32 / 100.0;
    let levels = 2.0 + normalized * normalized * 254.0;
    levels.round().clamp(2.0, 256.0) as u16
}

/// Snap alpha to fully opaque or fully transparent.
///
/// A GIF has a single transparent palette index, so every transparent pixel
/// is collapsed onto the same RGBA value.
fn binarize_alpha(img: &mut RgbaImage) {
    for px in img.pixels_mut() {
        if px.0[3] >= GIF_ALPHA_CUTOFF {
            px.0[3] = 255;
        } else {
            px.0 = [0, 0, 0, 0];
        }
    }
}

fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, BackendError> {
    let mut buffer = Vec::new();
    PngEncoder::new(Cursor::new(&mut buffer))
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgba8)
        .map_err(|e| BackendError::Encode(format!("PNG encode failed: {e}")))?;
    Ok(buffer)
}

fn encode_jpeg(img: &RgbaImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let flat = flatten_onto(img, JPEG_BACKGROUND);
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(Cursor::new(&mut buffer), quality.value() as u8)
        .write_image(flat.as_raw(), flat.width(), flat.height(), ExtendedColorType::Rgb8)
        .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {e}")))?;
    Ok(buffer)
}

fn encode_webp(mut img: RgbaImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    quantize_rgb_for_webp(&mut img, quality);
    let mut buffer = Vec::new();
    WebPEncoder::new_lossless(Cursor::new(&mut buffer))
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgba8)
        .map_err(|e| BackendError::Encode(format!("WebP encode failed: {e}")))?;
    Ok(buffer)
}

fn encode_gif(mut img: RgbaImage) -> Result<Vec<u8>, BackendError> {
    binarize_alpha(&mut img);
    let mut buffer = Vec::new();
    {
        let mut encoder = GifEncoder::new(Cursor::new(&mut buffer));
        encoder
            .encode_frame(image::Frame::new(img))
            .map_err(|e| BackendError::Encode(format!("GIF encode failed: {e}")))?;
    }
    Ok(buffer)
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<RawImage, BackendError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| BackendError::Decode(format!("Failed to decode image: {e}")))?;
        Ok(RawImage::from_rgba_image(decoded.to_rgba8())?)
    }

    fn resize(&self, params: &ResizeParams) -> Result<RawImage, BackendError> {
        let target = params.target;
        if !target.is_valid() {
            return Err(BackendError::InvalidDimensions {
                width: target.width,
                height: target.height,
            });
        }
        let src = params.source.to_rgba_image();
        let resized = image::imageops::resize(&src, target.width, target.height, self.filter);
        Ok(RawImage::from_rgba_image(resized)?)
    }

    fn encode(&self, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        let img = params.source.to_rgba_image();
        match params.format {
            ImageFormat::Png => encode_png(&img),
            ImageFormat::Jpeg => encode_jpeg(&img, params.quality),
            ImageFormat::WebP => encode_webp(img, params.quality),
            ImageFormat::Gif => encode_gif(img),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::raster::Dimensions;
    use crate::test_helpers::{checkerboard, gradient};

    fn encode(backend: &RustBackend, source: &RawImage, format: ImageFormat, q: u32) -> Vec<u8> {
        backend
            .encode(&EncodeParams {
                source: source.clone(),
                format,
                quality: Quality::new(q),
            })
            .unwrap()
    }

    #[test]
    fn resize_produces_exact_dimensions() {
        let backend = RustBackend::new();
        let source = gradient(64, 48);
        for target in [
            Dimensions::new(1, 1),
            Dimensions::new(200, 10),
            Dimensions::new(7, 300),
        ] {
            let out = backend
                .resize(&ResizeParams {
                    source: source.clone(),
                    target,
                })
                .unwrap();
            assert_eq!(out.dimensions(), target);
        }
    }

    #[test]
    fn resize_rejects_zero_height() {
        let backend = RustBackend::new();
        let result = backend.resize(&ResizeParams {
            source: gradient(4, 4),
            target: Dimensions::new(10, 0),
        });
        assert!(matches!(
            result,
            Err(BackendError::InvalidDimensions {
                width: 10,
                height: 0
            })
        ));
    }

    #[test]
    fn png_round_trip_is_lossless() {
        let backend = RustBackend::new();
        let source = checkerboard(9, 5);
        let bytes = encode(&backend, &source, ImageFormat::Png, 10);
        let decoded = backend.decode(&bytes).unwrap();
        assert_eq!(decoded, source);
    }

    #[test]
    fn jpeg_flattens_transparency_onto_white() {
        let backend = RustBackend::new();
        let source = RawImage::filled(Dimensions::new(8, 8), [0, 0, 0, 0]).unwrap();
        let bytes = encode(&backend, &source, ImageFormat::Jpeg, 95);
        let decoded = backend.decode(&bytes).unwrap();
        for px in decoded.pixels().chunks_exact(4) {
            assert_eq!(px[3], 255);
            assert!(px[0] > 245 && px[1] > 245 && px[2] > 245, "{px:?}");
        }
    }

    #[test]
    fn webp_keeps_alpha() {
        let backend = RustBackend::new();
        let source = checkerboard(6, 6);
        let bytes = encode(&backend, &source, ImageFormat::WebP, 100);
        let decoded = backend.decode(&bytes).unwrap();
        assert_eq!(decoded, source);
    }

    #[test]
    fn webp_lower_quality_coarsens_channels() {
        let mut data = vec![100, 101, 102, 7];
        quantize_rgb_for_webp(&mut data, Quality::new(10));
        assert_eq!(data[3], 7);
        assert_ne!(&data[..3], &[100, 101, 102]);
    }

    #[test]
    fn webp_levels_grow_with_quality() {
        assert_eq!(webp_levels_from_quality(Quality::new(1)), 2);
        assert!(
            webp_levels_from_quality(Quality::new(50)) < webp_levels_from_quality(Quality::new(90))
        );
        assert_eq!(webp_levels_from_quality(Quality::new(100)), 256);
    }

    #[test]
    fn gif_alpha_is_binary() {
        let backend = RustBackend::new();
        let pixels = [[200, 10, 10, 255], [10, 200, 10, 200], [10, 10, 200, 60], [0, 0, 0, 0]]
            .concat();
        let source = RawImage::new(2, 2, pixels).unwrap();
        let bytes = encode(&backend, &source, ImageFormat::Gif, 50);
        let decoded = backend.decode(&bytes).unwrap();
        let alpha: Vec<u8> = decoded.alpha_channel().collect();
        assert_eq!(alpha, vec![255, 255, 0, 0]);
    }

    #[test]
    fn decode_garbage_errors() {
        let backend = RustBackend::new();
        assert!(matches!(
            backend.decode(b"definitely not an image"),
            Err(BackendError::Decode(_))
        ));
    }

    #[test]
    fn encoded_bytes_carry_format_signatures() {
        let backend = RustBackend::new();
        let source = gradient(4, 4);
        assert!(encode(&backend, &source, ImageFormat::Png, 90).starts_with(&[0x89, b'P']));
        assert!(encode(&backend, &source, ImageFormat::Jpeg, 90).starts_with(&[0xFF, 0xD8]));
        assert!(encode(&backend, &source, ImageFormat::Gif, 90).starts_with(b"GIF8"));
        let webp = encode(&backend, &source, ImageFormat::WebP, 90);
        assert_eq!(&webp[8..12], b"WEBP");
    }
}
