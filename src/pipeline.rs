//! The four-step wizard: Upload → Edit → Background → Save.
//!
//! [`PipelineController`] owns the [`ImageStore`], the image backend, and the
//! single background-removal slot. Every change to session state goes through
//! `store.dispatch`; this module decides *which* actions to dispatch and when.
//!
//! ## Step gating
//!
//! | From | To | Requires |
//! |---|---|---|
//! | Upload | Edit | `original_image` |
//! | Edit | Background | `edited_image` |
//! | Edit | Save (skip) | `edited_image` |
//! | Background | Save | `processed_image` and no run in flight |
//!
//! Blocked transitions change nothing. `back` always retreats one step and
//! keeps every downstream field. Arriving at Background by either direction
//! starts a masking run.
//!
//! ## Masking runs
//!
//! Entering Background starts a [`MaskRun`] tagged with a generation number.
//! Only one run is live at a time: starting another (quality change) or
//! leaving the step cancels the current one through its [`CancelToken`].
//! Events carry the generation they came from, and [`apply_mask_event`]
//! drops any that don't match the live run, so a late completion from a
//! superseded run can never land in the store.
//!
//! A run can be driven three ways:
//! - [`poll_masking`]: one event per call, no waiting (tests, event loops)
//! - [`run_masking`]: blocks until done, pacing with a [`Pacer`]
//! - [`take_mask_run`]: hands the run to another thread; its events come
//!   back through [`apply_mask_event`]
//!
//! [`apply_mask_event`]: PipelineController::apply_mask_event
//! [`poll_masking`]: PipelineController::poll_masking
//! [`run_masking`]: PipelineController::run_masking
//! [`take_mask_run`]: PipelineController::take_mask_run

use crate::config::WizardConfig;
use crate::export::{self, ExportArtifact, ExportError};
use crate::imaging::{
    self, AspectRatio, BackendError, CancelToken, Dimensions, ImageBackend, ImageFormat,
    MaskEvent, MaskQuality, MaskRun, MaskTimings, Pacer, Quality, RawImage, RustBackend,
    constrain_to_aspect, estimate_size_bytes,
};
use crate::store::{Action, ImageStore, PipelineState, Step};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No image loaded")]
    MissingOriginal,
    #[error("The image has not been resized yet")]
    MissingEdited,
    #[error("Background removal has not finished")]
    MissingProcessed,
    #[error("Already at the last step")]
    NoNextStep,
    #[error("Cannot {action} during the {step} step")]
    WrongStep { action: &'static str, step: Step },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl PipelineError {
    /// True for the errors that just block a transition.
    pub fn is_missing_prerequisite(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingOriginal
                | PipelineError::MissingEdited
                | PipelineError::MissingProcessed
        )
    }
}

/// The live masking run. `run` is `None` once a driver has taken it.
#[derive(Debug)]
struct MaskSlot {
    generation: u64,
    token: CancelToken,
    run: Option<MaskRun>,
}

/// Orchestrates the wizard over one session.
pub struct PipelineController<B: ImageBackend = RustBackend> {
    store: ImageStore,
    backend: B,
    timings: MaskTimings,
    default_quality: MaskQuality,
    mask_quality: MaskQuality,
    maintain_aspect: bool,
    max_dimension: u32,
    generation: u64,
    mask: Option<MaskSlot>,
}

impl<B: ImageBackend> PipelineController<B> {
    pub fn new(backend: B, config: &WizardConfig) -> Self {
        Self {
            store: ImageStore::new(config.initial_target()),
            backend,
            timings: config.mask_timings(),
            default_quality: config.background.quality,
            mask_quality: config.background.quality,
            maintain_aspect: true,
            max_dimension: config.resize.max_dimension,
            generation: 0,
            mask: None,
        }
    }

    pub fn state(&self) -> &PipelineState {
        self.store.state()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn current_step(&self) -> Step {
        self.state().current_step()
    }

    pub fn mask_quality(&self) -> MaskQuality {
        self.mask_quality
    }

    pub fn maintain_aspect_ratio(&self) -> bool {
        self.maintain_aspect
    }

    /// True while a masking run is live (taken or not).
    pub fn is_masking(&self) -> bool {
        self.mask.is_some()
    }

    /// Generation of the live run, if any.
    pub fn mask_generation(&self) -> Option<u64> {
        self.mask.as_ref().map(|slot| slot.generation)
    }

    // =========================================================================
    // Step navigation
    // =========================================================================

    /// Load a decoded image and move on to Edit.
    ///
    /// Only allowed on the Upload step. A previous background-removal result
    /// is dropped since it belongs to the old image.
    pub fn upload(&mut self, image: RawImage) -> Result<(), PipelineError> {
        let step = self.current_step();
        if step != Step::Upload {
            return Err(PipelineError::WrongStep {
                action: "upload",
                step,
            });
        }
        log::info!("Loaded image {}", image.dimensions());
        self.store.dispatch(Action::SetOriginalImage(Some(image)));
        self.store.dispatch(Action::SetProcessedImage(None));
        self.store.dispatch(Action::SetBackgroundRemoved(false));
        self.store.dispatch(Action::SetProcessingError(None));
        self.enter_edit()
    }

    /// Advance one step if the current step's output exists.
    pub fn next(&mut self) -> Result<Step, PipelineError> {
        let result = match self.current_step() {
            Step::Upload => {
                if self.state().original_image().is_none() {
                    Err(PipelineError::MissingOriginal)
                } else {
                    self.enter_edit()
                }
            }
            Step::Edit => {
                if self.state().edited_image().is_none() {
                    Err(PipelineError::MissingEdited)
                } else {
                    self.enter_background()
                }
            }
            Step::Background => {
                if self.state().processed_image().is_none() || self.is_masking() {
                    Err(PipelineError::MissingProcessed)
                } else {
                    self.store.dispatch(Action::SetStep(Step::Save));
                    Ok(())
                }
            }
            Step::Save => Err(PipelineError::NoNextStep),
        };
        match result {
            Ok(()) => {
                log::info!("Step: {}", self.current_step());
                Ok(self.current_step())
            }
            Err(e) => {
                log::warn!("Cannot leave {}: {}", self.current_step(), e);
                Err(e)
            }
        }
    }

    /// Retreat one step. Downstream fields are kept; leaving Background
    /// cancels any run in flight, and returning to it from Save starts a
    /// fresh run over the edited image.
    pub fn back(&mut self) -> Step {
        let step = self.current_step();
        if let Some(previous) = step.previous() {
            if step == Step::Background {
                self.cancel_masking();
            }
            self.store.dispatch(Action::SetStep(previous));
            log::info!("Step: {previous} (back)");
            if previous == Step::Background && self.state().edited_image().is_some() {
                if let Err(e) = self.start_masking() {
                    log::warn!("Background removal did not restart: {e}");
                }
            }
        }
        self.current_step()
    }

    /// Jump from Edit straight to Save without removing the background.
    ///
    /// Any earlier mask result is discarded so the export source is the
    /// edited image.
    pub fn skip_background(&mut self) -> Result<(), PipelineError> {
        let step = self.current_step();
        if step != Step::Edit {
            return Err(PipelineError::WrongStep {
                action: "skip background removal",
                step,
            });
        }
        if self.state().edited_image().is_none() {
            return Err(PipelineError::MissingEdited);
        }
        self.store.dispatch(Action::SetProcessedImage(None));
        self.store.dispatch(Action::SetBackgroundRemoved(false));
        self.store.dispatch(Action::SetStep(Step::Save));
        log::info!("Step: {} (background skipped)", Step::Save);
        Ok(())
    }

    /// Drop everything and return to an empty Upload step.
    pub fn reset(&mut self) {
        self.cancel_masking();
        self.store.dispatch(Action::Reset);
        self.mask_quality = self.default_quality;
        self.maintain_aspect = true;
        log::info!("Session reset");
    }

    fn enter_edit(&mut self) -> Result<(), PipelineError> {
        self.regenerate_preview()?;
        self.store.dispatch(Action::SetStep(Step::Edit));
        Ok(())
    }

    fn enter_background(&mut self) -> Result<(), PipelineError> {
        self.start_masking()?;
        self.store.dispatch(Action::SetStep(Step::Background));
        Ok(())
    }

    // =========================================================================
    // Resize controls
    // =========================================================================

    /// Set the target width. With the aspect lock on and a fixed ratio, the
    /// height follows.
    pub fn set_width(&mut self, width: u32) -> Result<Dimensions, PipelineError> {
        let current = self.state().target_dimensions();
        let mut dims = Dimensions::new(self.clamp_side(width), current.height);
        if self.maintain_aspect {
            dims = constrain_to_aspect(dims, self.state().aspect_ratio());
        }
        self.set_target(dims)
    }

    /// Set the target height. The aspect lock does not push back on height
    /// edits.
    pub fn set_height(&mut self, height: u32) -> Result<Dimensions, PipelineError> {
        let current = self.state().target_dimensions();
        self.set_target(Dimensions::new(current.width, self.clamp_side(height)))
    }

    /// Select an aspect ratio; a fixed one recomputes the height from the
    /// current width.
    pub fn set_aspect_ratio(&mut self, aspect: AspectRatio) -> Result<Dimensions, PipelineError> {
        self.store.dispatch(Action::SetAspectRatio(aspect));
        let dims = constrain_to_aspect(self.state().target_dimensions(), aspect);
        self.set_target(dims)
    }

    /// Toggle the aspect lock. Turning it off also selects `Free`.
    pub fn set_maintain_aspect_ratio(&mut self, maintain: bool) -> Result<Dimensions, PipelineError> {
        self.maintain_aspect = maintain;
        if !maintain {
            self.store.dispatch(Action::SetAspectRatio(AspectRatio::Free));
            return Ok(self.state().target_dimensions());
        }
        let dims = constrain_to_aspect(self.state().target_dimensions(), self.state().aspect_ratio());
        self.set_target(dims)
    }

    /// Set both sides directly, bypassing the aspect lock.
    pub fn apply_preset(&mut self, preset: Dimensions) -> Result<Dimensions, PipelineError> {
        self.set_target(preset.clamp_to(self.max_dimension))
    }

    fn clamp_side(&self, value: u32) -> u32 {
        value.clamp(1, self.max_dimension.max(1))
    }

    fn set_target(&mut self, dims: Dimensions) -> Result<Dimensions, PipelineError> {
        self.store.dispatch(Action::SetTargetDimensions(dims));
        if self.current_step() == Step::Edit && self.state().original_image().is_some() {
            self.regenerate_preview()?;
        }
        Ok(dims)
    }

    /// Resample the original to the target size as the new `edited_image`.
    fn regenerate_preview(&mut self) -> Result<(), PipelineError> {
        let original = self
            .state()
            .original_image()
            .cloned()
            .ok_or(PipelineError::MissingOriginal)?;
        let target = self.state().target_dimensions();
        self.store.dispatch(Action::SetProcessing(true));
        match imaging::resize(&self.backend, &original, target) {
            Ok(edited) => {
                log::debug!("Preview {} -> {}", original.dimensions(), target);
                self.store.dispatch(Action::SetEditedImage(edited));
                self.store.dispatch(Action::SetProcessingError(None));
                self.settle_processing();
                Ok(())
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    // =========================================================================
    // Background removal
    // =========================================================================

    /// Change the masking quality. On the Background step this restarts the
    /// run from 0% when one is in flight or a result already exists.
    ///
    /// Returns whether a new run was started.
    pub fn set_mask_quality(&mut self, quality: MaskQuality) -> Result<bool, PipelineError> {
        if quality == self.mask_quality {
            return Ok(false);
        }
        self.mask_quality = quality;
        let rerun = self.current_step() == Step::Background
            && (self.is_masking() || self.state().processed_image().is_some());
        if rerun {
            log::info!("Mask quality changed to {quality}; restarting");
            self.start_masking()?;
        }
        Ok(rerun)
    }

    /// Step the live run once and apply the event.
    ///
    /// Returns `None` when no run is live or the run was handed to another
    /// driver.
    pub fn poll_masking(&mut self) -> Option<MaskEvent> {
        let slot = self.mask.as_mut()?;
        let generation = slot.generation;
        let event = slot.run.as_mut()?.next()?;
        self.apply_mask_event(generation, event.clone());
        Some(event)
    }

    /// Drive the live run to the end, pausing between ticks.
    ///
    /// `observer` sees every event after it has been applied. Returns the
    /// masked raster, or `None` if there was no run to drive.
    pub fn run_masking<P, F>(&mut self, pacer: &P, mut observer: F) -> Option<RawImage>
    where
        P: Pacer + ?Sized,
        F: FnMut(&MaskEvent),
    {
        let (generation, run) = self.take_mask_run()?;
        run.drive(pacer, |event| {
            self.apply_mask_event(generation, event.clone());
            observer(event);
        })
    }

    /// Hand the live run to an external driver (e.g. a worker thread).
    ///
    /// The run keeps its cancel token, so a later quality change or `back`
    /// still stops it.
    pub fn take_mask_run(&mut self) -> Option<(u64, MaskRun)> {
        let slot = self.mask.as_mut()?;
        let run = slot.run.take()?;
        Some((slot.generation, run))
    }

    /// Apply one event from run `generation`.
    ///
    /// Events from any run other than the live one are ignored; returns
    /// whether the event was applied.
    pub fn apply_mask_event(&mut self, generation: u64, event: MaskEvent) -> bool {
        match &self.mask {
            Some(slot) if slot.generation == generation => {}
            _ => {
                log::debug!("Ignoring event from stale mask run {generation}");
                return false;
            }
        }
        match event {
            MaskEvent::Progress(percent) => {
                self.store.dispatch(Action::SetMaskProgress(percent));
            }
            MaskEvent::Completed(image) => {
                self.mask = None;
                self.store.dispatch(Action::SetProcessedImage(Some(image)));
                self.store.dispatch(Action::SetBackgroundRemoved(true));
                self.store.dispatch(Action::SetMaskProgress(100));
                self.settle_processing();
                log::info!("Background removal run {generation} complete");
            }
        }
        true
    }

    /// Start a fresh run on the edited image, superseding any live one.
    fn start_masking(&mut self) -> Result<u64, PipelineError> {
        let edited = self
            .state()
            .edited_image()
            .cloned()
            .ok_or(PipelineError::MissingEdited)?;
        if let Some(old) = self.mask.take() {
            old.token.cancel();
            log::warn!("Mask run {} superseded", old.generation);
        }
        self.generation += 1;
        let run = MaskRun::new(edited, self.mask_quality, &self.timings);
        log::info!(
            "Background removal run {} at {} quality ({:?} per tick)",
            self.generation,
            self.mask_quality,
            run.interval()
        );
        self.mask = Some(MaskSlot {
            generation: self.generation,
            token: run.cancel_token(),
            run: Some(run),
        });
        self.store.dispatch(Action::SetProcessing(true));
        self.store.dispatch(Action::SetProcessingError(None));
        self.store.dispatch(Action::SetMaskProgress(0));
        self.store.dispatch(Action::SetBackgroundRemoved(false));
        Ok(self.generation)
    }

    /// Cancel the live run, if any.
    fn cancel_masking(&mut self) {
        if let Some(slot) = self.mask.take() {
            slot.token.cancel();
            log::info!("Mask run {} cancelled", slot.generation);
            self.settle_processing();
        }
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Processed, else edited, else original.
    pub fn export_source(&self) -> Option<&RawImage> {
        self.state().export_source()
    }

    /// Heuristic byte size of an export at the current target size.
    pub fn size_estimate(&self, format: ImageFormat, quality: Quality) -> f64 {
        estimate_size_bytes(self.state().target_dimensions(), format, quality)
    }

    /// Encode the export source, drawn at the target size, in one format.
    pub fn export(
        &mut self,
        format: ImageFormat,
        quality: Quality,
        name: &str,
    ) -> Result<ExportArtifact, ExportError> {
        let source = self
            .export_source()
            .cloned()
            .ok_or(ExportError::NothingToExport)?;
        let target = self.state().target_dimensions();
        self.store.dispatch(Action::SetProcessing(true));
        self.store.dispatch(Action::SetProcessingError(None));
        let result = export::export_image(&self.backend, &source, target, format, quality, name);
        self.settle_processing();
        match &result {
            Ok(artifact) => log::info!(
                "Exported {} ({} bytes)",
                artifact.file_name,
                artifact.image.bytes.len()
            ),
            Err(e) => self.record_error(e.to_string()),
        }
        result
    }

    /// Encode the export source once per format.
    ///
    /// The outer error covers failures shared by all formats (no source,
    /// resampling). Per-format encode failures are returned in place; the
    /// first one is also recorded as the processing error.
    pub fn export_all(
        &mut self,
        quality: Quality,
        name: &str,
    ) -> Result<Vec<(ImageFormat, Result<ExportArtifact, ExportError>)>, ExportError> {
        let source = self
            .export_source()
            .cloned()
            .ok_or(ExportError::NothingToExport)?;
        let target = self.state().target_dimensions();
        self.store.dispatch(Action::SetProcessing(true));
        self.store.dispatch(Action::SetProcessingError(None));
        let result = export::export_all_formats(&self.backend, &source, target, quality, name);
        self.settle_processing();
        match &result {
            Ok(results) => {
                let first_failure = results.iter().find_map(|(format, r)| {
                    r.as_ref().err().map(|e| format!("{}: {e}", format.id()))
                });
                if let Some(message) = first_failure {
                    self.record_error(message);
                }
            }
            Err(e) => self.record_error(e.to_string()),
        }
        result
    }

    // =========================================================================
    // Processing flag bookkeeping
    // =========================================================================

    /// `is_processing` stays on only while a masking run is live.
    fn settle_processing(&mut self) {
        let busy = self.is_masking();
        self.store.dispatch(Action::SetProcessing(busy));
    }

    fn record_error(&mut self, message: String) {
        log::warn!("{message}");
        self.store.dispatch(Action::SetProcessingError(Some(message)));
    }

    fn fail(&mut self, error: PipelineError) -> PipelineError {
        self.settle_processing();
        self.record_error(error.to_string());
        error
    }
}
