//! Pure calculation functions for dimensions and size estimates.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{ImageFormat, Quality};
use super::raster::Dimensions;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Quick-preset sizes offered next to the dimension inputs.
///
/// Presets set the target directly and bypass aspect-ratio recomputation.
pub const QUICK_PRESETS: [Dimensions; 4] = [
    Dimensions::new(800, 600),
    Dimensions::new(1920, 1080),
    Dimensions::new(1200, 1200),
    Dimensions::new(1500, 1000),
];

/// Aspect-ratio lock for the resize step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "free")]
    Free,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "16:9")]
    Widescreen,
    #[serde(rename = "3:2")]
    Photo,
    #[serde(rename = "5:4")]
    Portrait,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 6] = [
        AspectRatio::Free,
        AspectRatio::Square,
        AspectRatio::Standard,
        AspectRatio::Widescreen,
        AspectRatio::Photo,
        AspectRatio::Portrait,
    ];

    /// `(numerator, denominator)`, or `None` for [`AspectRatio::Free`].
    pub fn parts(self) -> Option<(u32, u32)> {
        match self {
            AspectRatio::Free => None,
            AspectRatio::Square => Some((1, 1)),
            AspectRatio::Standard => Some((4, 3)),
            AspectRatio::Widescreen => Some((16, 9)),
            AspectRatio::Photo => Some((3, 2)),
            AspectRatio::Portrait => Some((5, 4)),
        }
    }

    /// Width divided by height.
    pub fn ratio(self) -> Option<f64> {
        self.parts().map(|(n, d)| n as f64 / d as f64)
    }

    pub fn is_fixed(self) -> bool {
        self != AspectRatio::Free
    }

    pub fn id(self) -> &'static str {
        match self {
            AspectRatio::Free => "free",
            AspectRatio::Square => "1:1",
            AspectRatio::Standard => "4:3",
            AspectRatio::Widescreen => "16:9",
            AspectRatio::Photo => "3:2",
            AspectRatio::Portrait => "5:4",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::Free => "Free",
            AspectRatio::Square => "Square (1:1)",
            AspectRatio::Standard => "Standard (4:3)",
            AspectRatio::Widescreen => "Widescreen (16:9)",
            AspectRatio::Photo => "Photo (3:2)",
            AspectRatio::Portrait => "Portrait (5:4)",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        AspectRatio::ALL
            .into_iter()
            .find(|ar| ar.id() == needle)
            .ok_or_else(|| {
                format!("unknown aspect ratio '{s}' (expected free, 1:1, 4:3, 16:9, 3:2 or 5:4)")
            })
    }
}

/// Height that matches `width` under a fixed ratio: `round(width / ratio)`.
///
/// Never returns less than one pixel.
///
/// # Examples
/// ```
/// # use image_wizard::imaging::derive_height;
/// // 4:3 at 800 wide → 600 tall
/// assert_eq!(derive_height(800, 4.0 / 3.0), 600);
///
/// // 16:9 at 1920 wide → 1080 tall
/// assert_eq!(derive_height(1920, 16.0 / 9.0), 1080);
/// ```
pub fn derive_height(width: u32, ratio: f64) -> u32 {
    let height = (width as f64 / ratio).round();
    (height as u32).max(1)
}

/// Apply an aspect-ratio lock to `dims`: height follows width when fixed.
pub fn constrain_to_aspect(dims: Dimensions, aspect: AspectRatio) -> Dimensions {
    match aspect.ratio() {
        Some(ratio) => Dimensions::new(dims.width, derive_height(dims.width, ratio)),
        None => dims,
    }
}

/// Rough export size: `width * height * bytes_per_pixel * quality / 100`.
///
/// This is a heuristic shown to the user, not the real encoded size. The
/// quality factor applies to every format, including PNG and GIF.
pub fn estimate_size_bytes(dims: Dimensions, format: ImageFormat, quality: Quality) -> f64 {
    let pixels = dims.pixel_count() as f64;
    pixels * format.bytes_per_pixel() as f64 * quality.value() as f64 / 100.0
}

/// Human-facing rendering of a size estimate: `"234KB"` or `"5.9MB"`.
///
/// # Examples
/// ```
/// # use image_wizard::imaging::format_size_estimate;
/// assert_eq!(format_size_estimate(240_000.0), "234KB");
/// assert_eq!(format_size_estimate(6_220_800.0), "5.9MB");
/// ```
pub fn format_size_estimate(bytes: f64) -> String {
    let mb = bytes / (1024.0 * 1024.0);
    if mb < 1.0 {
        format!("{}KB", (bytes / 1024.0).round() as u64)
    } else {
        format!("{:.1}MB", mb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_ratio_at_800_is_600() {
        let ratio = AspectRatio::Standard.ratio().unwrap();
        assert_eq!(derive_height(800, ratio), 600);
    }

    #[test]
    fn square_ratio_copies_width() {
        let dims = constrain_to_aspect(Dimensions::new(1000, 500), AspectRatio::Square);
        assert_eq!(dims, Dimensions::new(1000, 1000));
    }

    #[test]
    fn free_ratio_leaves_dimensions_alone() {
        let dims = Dimensions::new(123, 456);
        assert_eq!(constrain_to_aspect(dims, AspectRatio::Free), dims);
    }

    #[test]
    fn every_fixed_ratio() {
        let w = 1200;
        let heights: Vec<_> = AspectRatio::ALL
            .iter()
            .filter_map(|ar| ar.ratio())
            .map(|r| derive_height(w, r))
            .collect();
        assert_eq!(heights, vec![1200, 900, 675, 800, 960]);
    }

    #[test]
    fn derived_height_never_zero() {
        assert_eq!(derive_height(1, 16.0 / 9.0), 1);
    }

    #[test]
    fn aspect_ratio_parses_ids() {
        assert_eq!("16:9".parse::<AspectRatio>(), Ok(AspectRatio::Widescreen));
        assert_eq!("FREE".parse::<AspectRatio>(), Ok(AspectRatio::Free));
        assert!("2:1".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn estimate_uses_bytes_per_pixel_and_quality() {
        let dims = Dimensions::new(800, 600);
        let q = Quality::new(90);
        assert_eq!(estimate_size_bytes(dims, ImageFormat::Png, q), 1_728_000.0);
        assert_eq!(estimate_size_bytes(dims, ImageFormat::Jpeg, q), 1_296_000.0);
        assert_eq!(estimate_size_bytes(dims, ImageFormat::WebP, q), 1_728_000.0);
        assert_eq!(estimate_size_bytes(dims, ImageFormat::Gif, q), 432_000.0);
    }

    #[test]
    fn estimate_formatting_switches_units_at_one_megabyte() {
        assert_eq!(format_size_estimate(1024.0 * 1024.0 - 1.0), "1024KB");
        assert_eq!(format_size_estimate(1024.0 * 1024.0), "1.0MB");
        assert_eq!(format_size_estimate(0.0), "0KB");
    }

    #[test]
    fn presets_match_quick_buttons() {
        assert_eq!(QUICK_PRESETS[0], Dimensions::new(800, 600));
        assert_eq!(QUICK_PRESETS[1], Dimensions::new(1920, 1080));
        assert_eq!(QUICK_PRESETS[2], Dimensions::new(1200, 1200));
        assert_eq!(QUICK_PRESETS[3], Dimensions::new(1500, 1000));
    }
}
