//! CLI output formatting for every wizard step.
//!
//! # Output Format
//!
//! ```text
//! [1/4] Upload Image
//!     Source: photo.jpg (1000x500)
//! [2/4] Resize & Edit
//!     Target: 1000x1000 (1:1)
//! [3/4] Remove Background
//!     high [##########] 100%
//!     Transparent: 412000 of 1000000 pixels
//! [4/4] Save Image
//!     001 PNG → out/processed-image.png (1.2MB written, est. 3.8MB)
//! ```
//!
//! # Architecture
//!
//! Each piece has a `format_*` function (returns `Vec<String>` or `String`)
//! for testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::export::ExportArtifact;
use crate::imaging::{
    AspectRatio, Dimensions, ImageFormat, MaskQuality, Quality, estimate_size_bytes,
    format_size_estimate,
};
use crate::store::{PipelineState, Step};
use serde::Serialize;
use std::path::Path;

const BAR_WIDTH: usize = 10;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

// ============================================================================
// Steps
// ============================================================================

/// `[2/4] Resize & Edit`
pub fn format_step_header(step: Step) -> String {
    format!("[{}/{}] {}", step.index() + 1, Step::ALL.len(), step.label())
}

pub fn print_step_header(step: Step) {
    println!("{}", format_step_header(step));
}

pub fn format_source_line(name: &str, dims: Dimensions) -> String {
    format!("{}Source: {} ({})", indent(1), name, dims)
}

pub fn format_target_line(dims: Dimensions, aspect: AspectRatio) -> String {
    format!("{}Target: {} ({})", indent(1), dims, aspect.id())
}

// ============================================================================
// Background removal
// ============================================================================

/// One progress line: `    low [###.......] 30%`.
pub fn format_mask_progress(quality: MaskQuality, percent: u8) -> String {
    let filled = (percent.min(100) as usize * BAR_WIDTH) / 100;
    format!(
        "{}{} [{}{}] {}%",
        indent(1),
        quality.id(),
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        percent
    )
}

pub fn print_mask_progress(quality: MaskQuality, percent: u8) {
    println!("{}", format_mask_progress(quality, percent));
}

/// Count of fully transparent pixels in the processed image.
pub fn transparent_pixels(state: &PipelineState) -> Option<usize> {
    state
        .processed_image()
        .map(|img| img.alpha_channel().filter(|&a| a == 0).count())
}

// ============================================================================
// State summary
// ============================================================================

/// Human-readable snapshot of the session.
pub fn format_state_summary(state: &PipelineState) -> Vec<String> {
    let mut lines = vec![format!("Step: {}", state.current_step())];
    match state.image_dimensions() {
        Some(dims) => lines.push(format!("{}Original: {}", indent(1), dims)),
        None => lines.push(format!("{}Original: none", indent(1))),
    }
    lines.push(format_target_line(
        state.target_dimensions(),
        state.aspect_ratio(),
    ));
    if let Some(edited) = state.edited_image() {
        lines.push(format!("{}Edited: {}", indent(1), edited.dimensions()));
    }
    if let (Some(processed), Some(clear)) = (state.processed_image(), transparent_pixels(state)) {
        lines.push(format!(
            "{}Transparent: {} of {} pixels",
            indent(1),
            clear,
            processed.dimensions().pixel_count()
        ));
    }
    if state.is_processing() {
        lines.push(format!("{}Processing: {}%", indent(1), state.mask_progress()));
    }
    if let Some(error) = state.processing_error() {
        lines.push(format!("{}Error: {}", indent(1), error));
    }
    lines
}

pub fn print_state_summary(state: &PipelineState) {
    for line in format_state_summary(state) {
        println!("{}", line);
    }
}

// ============================================================================
// Export
// ============================================================================

/// `    001 PNG → out/a.png (12KB written, est. 3.8MB)`
pub fn format_export_line(index: usize, artifact: &ExportArtifact, path: &Path) -> String {
    format!(
        "{}{} {} \u{2192} {} ({} written, est. {})",
        indent(1),
        format_index(index),
        artifact.image.format.id().to_uppercase(),
        path.display(),
        format_size_estimate(artifact.image.bytes.len() as f64),
        format_size_estimate(artifact.image.estimated_bytes)
    )
}

pub fn format_export_failure(index: usize, format: ImageFormat, error: &dyn std::fmt::Display) -> String {
    format!(
        "{}{} {} failed: {}",
        indent(1),
        format_index(index),
        format.id().to_uppercase(),
        error
    )
}

/// Size estimate for every format at `dims`.
pub fn format_estimates(dims: Dimensions, quality: Quality) -> Vec<String> {
    let mut lines = vec![format!("Estimates for {} at quality {}", dims, quality.value())];
    for format in ImageFormat::ALL {
        lines.push(format!(
            "{}{:<4} {}",
            indent(1),
            format.id(),
            format_size_estimate(estimate_size_bytes(dims, format, quality))
        ));
    }
    lines
}

pub fn print_estimates(dims: Dimensions, quality: Quality) {
    for line in format_estimates(dims, quality) {
        println!("{}", line);
    }
}

// ============================================================================
// JSON summary
// ============================================================================

/// Machine-readable result of one `run`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub input: String,
    pub original: Option<Dimensions>,
    pub target: Dimensions,
    pub aspect_ratio: AspectRatio,
    pub mask_quality: MaskQuality,
    pub background_removed: bool,
    pub transparent_pixels: Option<usize>,
    pub exports: Vec<ExportSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub path: String,
    pub format: ImageFormat,
    pub mime_type: &'static str,
    pub bytes: usize,
    pub estimated_bytes: f64,
    pub estimate: String,
}

impl ExportSummary {
    pub fn new(artifact: &ExportArtifact, path: &Path) -> Self {
        Self {
            path: path.display().to_string(),
            format: artifact.image.format,
            mime_type: artifact.image.mime_type(),
            bytes: artifact.image.bytes.len(),
            estimated_bytes: artifact.image.estimated_bytes,
            estimate: format_size_estimate(artifact.image.estimated_bytes),
        }
    }
}

impl RunSummary {
    pub fn new(input: &str, state: &PipelineState, mask_quality: MaskQuality) -> Self {
        Self {
            input: input.to_string(),
            original: state.image_dimensions(),
            target: state.target_dimensions(),
            aspect_ratio: state.aspect_ratio(),
            mask_quality,
            background_removed: state.background_removed(),
            transparent_pixels: transparent_pixels(state),
            exports: Vec::new(),
        }
    }
}

pub fn format_json_summary(summary: &RunSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}
