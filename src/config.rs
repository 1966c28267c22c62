//! Wizard configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user `config.toml` in the config directory overrides
//! them key by key.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [upload]
//! max_bytes = 10485760      # Largest accepted upload (10 MiB)
//!
//! [resize]
//! default_width = 800       # Target size before any image is loaded
//! default_height = 600
//! max_dimension = 4000      # Width/height edits are clamped to 1..=this
//! filter = "triangle"       # nearest, triangle, catmullrom, gaussian, lanczos3
//!
//! [background]
//! quality = "high"          # low, medium, high
//! ticks = 10                # Progress ticks per run
//! low_ms = 2000             # Simulated run length per quality
//! medium_ms = 4000
//! high_ms = 6000
//!
//! [export]
//! format = "png"            # png, jpg, webp, gif
//! quality = 90              # JPEG/WebP quality (1-100)
//! file_name = "processed-image"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Dimensions, ImageFormat, MaskQuality, MaskTimings, Quality};
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Wizard configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WizardConfig {
    /// Upload boundary limits.
    pub upload: UploadConfig,
    /// Resize defaults and limits.
    pub resize: ResizeConfig,
    /// Background-removal run settings.
    pub background: BackgroundConfig,
    /// Export defaults.
    pub export: ExportConfig,
}

impl WizardConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upload.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "upload.max_bytes must be non-zero".into(),
            ));
        }
        if self.resize.default_width == 0 || self.resize.default_height == 0 {
            return Err(ConfigError::Validation(
                "resize.default_width and resize.default_height must be non-zero".into(),
            ));
        }
        if self.resize.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "resize.max_dimension must be non-zero".into(),
            ));
        }
        if self.background.ticks == 0 {
            return Err(ConfigError::Validation(
                "background.ticks must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.export.quality) {
            return Err(ConfigError::Validation(
                "export.quality must be 1-100".into(),
            ));
        }
        if self.export.file_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "export.file_name must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Target dimensions of a fresh session.
    pub fn initial_target(&self) -> Dimensions {
        Dimensions::new(self.resize.default_width, self.resize.default_height)
    }

    pub fn mask_timings(&self) -> MaskTimings {
        self.background.timings()
    }

    pub fn export_quality(&self) -> Quality {
        Quality::new(self.export.quality)
    }
}

/// Upload boundary settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Largest accepted upload in bytes.
    pub max_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Resampling filter used by the resize stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResizeFilter {
    pub fn filter_type(self) -> FilterType {
        match self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Resize defaults and limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    /// Target width before any image is loaded.
    pub default_width: u32,
    /// Target height before any image is loaded.
    pub default_height: u32,
    /// Upper clamp for width/height edits.
    pub max_dimension: u32,
    /// Resampling filter.
    pub filter: ResizeFilter,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            default_width: 800,
            default_height: 600,
            max_dimension: 4000,
            filter: ResizeFilter::default(),
        }
    }
}

/// Background-removal run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackgroundConfig {
    /// Quality selected when a session starts.
    pub quality: MaskQuality,
    /// Number of progress ticks after the initial 0%.
    pub ticks: u32,
    pub low_ms: u64,
    pub medium_ms: u64,
    pub high_ms: u64,
}

impl BackgroundConfig {
    pub fn timings(&self) -> MaskTimings {
        MaskTimings {
            low: Duration::from_millis(self.low_ms),
            medium: Duration::from_millis(self.medium_ms),
            high: Duration::from_millis(self.high_ms),
            ticks: self.ticks,
        }
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            quality: MaskQuality::default(),
            ticks: 10,
            low_ms: 2000,
            medium_ms: 4000,
            high_ms: 6000,
        }
    }
}

/// Export defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub format: ImageFormat,
    /// JPEG/WebP quality (1 = worst, 100 = best).
    pub quality: u32,
    /// Base name for exported files, without extension.
    pub file_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ImageFormat::Png,
            quality: 90,
            file_name: "processed-image".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(WizardConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `config.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<WizardConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: WizardConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<WizardConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Image Wizard Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Upload
# ---------------------------------------------------------------------------
[upload]
# Largest accepted file in bytes (10 MiB).
max_bytes = 10485760

# ---------------------------------------------------------------------------
# Resize
# ---------------------------------------------------------------------------
[resize]
# Target size used before an image is loaded.
default_width = 800
default_height = 600

# Width and height edits are clamped to 1..=max_dimension.
max_dimension = 4000

# Resampling filter: nearest, triangle, catmullrom, gaussian, lanczos3.
filter = "triangle"

# ---------------------------------------------------------------------------
# Background removal
# ---------------------------------------------------------------------------
[background]
# Starting quality: low, medium, high. Only changes how long a run takes.
quality = "high"

# Progress ticks per run (after the initial 0%).
ticks = 10

# Simulated run length in milliseconds for each quality.
low_ms = 2000
medium_ms = 4000
high_ms = 6000

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# Default format: png, jpg, webp, gif.
format = "png"

# JPEG/WebP quality (1 = worst, 100 = best).
quality = 90

# Base file name, without extension.
file_name = "processed-image"
"##
}
