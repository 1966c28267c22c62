//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! and the [`backend`](super::backend) that does the actual pixel work.
//!
//! ## Types
//!
//! - [`Quality`]: Export quality (1-100, default 90). Clamped on construction.
//! - [`ImageFormat`]: The four export formats, with id, extension and MIME type.
//! - [`MaskQuality`]: Background-removal quality level (only changes simulated latency).
//! - [`ResizeParams`]: Source raster plus exact target dimensions.
//! - [`EncodeParams`]: Source raster, target format, quality.

use super::raster::{Dimensions, RawImage};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Quality setting for lossy export (1-100).
///
/// Every construction path clamps, deserialization included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

/// Export formats, in the order "download all" emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    #[serde(rename = "png")]
    Png,
    #[serde(rename = "jpg", alias = "jpeg")]
    Jpeg,
    #[serde(rename = "webp")]
    WebP,
    #[serde(rename = "gif")]
    Gif,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 4] = [
        ImageFormat::Png,
        ImageFormat::Jpeg,
        ImageFormat::WebP,
        ImageFormat::Gif,
    ];

    /// Short id used in multi-format file names (`photo-jpg.jpg`).
    pub fn id(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::WebP => "webp",
            ImageFormat::Gif => "gif",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => ".png",
            ImageFormat::Jpeg => ".jpg",
            ImageFormat::WebP => ".webp",
            ImageFormat::Gif => ".gif",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Gif => "image/gif",
        }
    }

    /// Bytes per pixel used by the size estimate.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            ImageFormat::Png | ImageFormat::WebP => 4,
            ImageFormat::Jpeg => 3,
            ImageFormat::Gif => 1,
        }
    }

    /// PNG and GIF have no quality knob.
    pub fn uses_quality(self) -> bool {
        matches!(self, ImageFormat::Jpeg | ImageFormat::WebP)
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
            "webp" => Ok(ImageFormat::WebP),
            "gif" => Ok(ImageFormat::Gif),
            other => Err(format!(
                "unknown format '{other}' (expected png, jpg, webp or gif)"
            )),
        }
    }
}

/// Background-removal quality level.
///
/// Only the simulated processing time differs between levels; the pixel
/// classification is identical for all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskQuality {
    Low,
    Medium,
    #[default]
    High,
}

impl MaskQuality {
    pub fn id(self) -> &'static str {
        match self {
            MaskQuality::Low => "low",
            MaskQuality::Medium => "medium",
            MaskQuality::High => "high",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MaskQuality::Low => "Low (Fast)",
            MaskQuality::Medium => "Medium",
            MaskQuality::High => "High (Slow)",
        }
    }
}

impl std::fmt::Display for MaskQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for MaskQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(MaskQuality::Low),
            "medium" => Ok(MaskQuality::Medium),
            "high" => Ok(MaskQuality::High),
            other => Err(format!(
                "unknown mask quality '{other}' (expected low, medium or high)"
            )),
        }
    }
}

/// Parameters for a resample to exact dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: RawImage,
    pub target: Dimensions,
}

/// Parameters for a single-format encode.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams {
    pub source: RawImage,
    pub format: ImageFormat,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_deserializes_through_clamp() {
        let high: Quality = serde_json::from_str("500").unwrap();
        assert_eq!(high.value(), 100);
        let low: Quality = serde_json::from_str("0").unwrap();
        assert_eq!(low.value(), 1);
        assert_eq!(serde_json::to_string(&Quality::new(75)).unwrap(), "75");
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn formats_are_listed_in_export_order() {
        let ids: Vec<_> = ImageFormat::ALL.iter().map(|f| f.id()).collect();
        assert_eq!(ids, ["png", "jpg", "webp", "gif"]);
    }

    #[test]
    fn gif_mime_type_is_correct() {
        assert_eq!(ImageFormat::Gif.mime_type(), "image/gif");
    }

    #[test]
    fn bytes_per_pixel_table() {
        assert_eq!(ImageFormat::Png.bytes_per_pixel(), 4);
        assert_eq!(ImageFormat::Jpeg.bytes_per_pixel(), 3);
        assert_eq!(ImageFormat::WebP.bytes_per_pixel(), 4);
        assert_eq!(ImageFormat::Gif.bytes_per_pixel(), 1);
    }

    #[test]
    fn format_parses_jpeg_alias() {
        assert_eq!("JPEG".parse::<ImageFormat>(), Ok(ImageFormat::Jpeg));
        assert_eq!("jpg".parse::<ImageFormat>(), Ok(ImageFormat::Jpeg));
        assert!("bmp".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn mask_quality_defaults_to_high() {
        assert_eq!(MaskQuality::default(), MaskQuality::High);
        assert_eq!("Medium".parse::<MaskQuality>(), Ok(MaskQuality::Medium));
    }

    #[test]
    fn format_serde_uses_ids() {
        let json = serde_json::to_string(&ImageFormat::Jpeg).unwrap();
        assert_eq!(json, "\"jpg\"");
        let parsed: ImageFormat = serde_json::from_str("\"jpeg\"").unwrap();
        assert_eq!(parsed, ImageFormat::Jpeg);
    }
}
