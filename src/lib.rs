//! # Image Wizard
//!
//! A four-step image editing wizard: upload an image, resize it (optionally
//! locked to an aspect ratio), strip a bright background, and export it as
//! PNG, JPEG, WebP or GIF.
//!
//! # Architecture: One Image, Four Steps
//!
//! ```text
//! 1. Upload      file bytes      →  original_image   (validate + decode)
//! 2. Edit        original_image  →  edited_image     (resample to target size)
//! 3. Background  edited_image    →  processed_image  (brightness-threshold mask)
//! 4. Save        export source   →  encoded bytes    (one format or all four)
//! ```
//!
//! Every stage reads the previous stage's raster and writes its own. Session
//! state lives in one [`store::ImageStore`] and changes only through its
//! closed set of [`store::Action`]s. The [`pipeline::PipelineController`]
//! decides which actions to dispatch: it gates step transitions on the
//! previous stage's output and owns the single in-flight masking run.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`store`] | Session state, actions, and the pure reducer |
//! | [`pipeline`] | Step state machine, resize controls, masking runs, export |
//! | [`upload`] | Upload boundary: MIME/size checks and decoding |
//! | [`export`] | Export boundary: artifacts, file names, writing to disk |
//! | [`imaging`] | Pure-Rust pixel work: resize, background mask, encoders |
//! | [`config`] | `config.toml` loading, validation, and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Simulated Masking Progress
//!
//! The background mask is a single per-pixel pass, but it is presented as a
//! run of progress ticks whose pacing depends on the selected quality. A run
//! is an iterator of events, so tests step it synchronously while the CLI
//! drives it on a worker thread with real pauses. Superseded runs are
//! cancelled through a shared token and their late events are dropped by
//! generation number.
//!
//! ## Pure-Rust Imaging
//!
//! All decoding, resampling, and encoding goes through the `image` crate. No
//! system libraries are needed and the binary is self-contained.

pub mod config;
pub mod export;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod store;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;
