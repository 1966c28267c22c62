//! Session state and the single place it changes.
//!
//! [`PipelineState`] is the whole record of one editing session. It is only
//! ever changed by [`ImageStore::dispatch`] with one of the closed set of
//! [`Action`]s; [`reduce`] computes the next state from the current one and
//! the action without side effects. Fields are private with read-only
//! getters, so presentation code cannot poke at them directly.
//!
//! Going back a step never clears downstream fields. A stale
//! `processed_image` can outlive a new resize until the mask stage re-runs.

use crate::imaging::{AspectRatio, Dimensions, RawImage};
use serde::Serialize;

/// The four wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    #[default]
    Upload,
    Edit,
    Background,
    Save,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::Upload, Step::Edit, Step::Background, Step::Save];

    pub fn next(self) -> Option<Step> {
        match self {
            Step::Upload => Some(Step::Edit),
            Step::Edit => Some(Step::Background),
            Step::Background => Some(Step::Save),
            Step::Save => None,
        }
    }

    pub fn previous(self) -> Option<Step> {
        match self {
            Step::Upload => None,
            Step::Edit => Some(Step::Upload),
            Step::Background => Some(Step::Edit),
            Step::Save => Some(Step::Background),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Step::Upload => "Upload Image",
            Step::Edit => "Resize & Edit",
            Step::Background => "Remove Background",
            Step::Save => "Save Image",
        }
    }

    /// Zero-based position in the wizard.
    pub fn index(self) -> usize {
        match self {
            Step::Upload => 0,
            Step::Edit => 1,
            Step::Background => 2,
            Step::Save => 3,
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Full record of one editing session.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    original_image: Option<RawImage>,
    image_dimensions: Option<Dimensions>,
    target_dimensions: Dimensions,
    aspect_ratio: AspectRatio,
    edited_image: Option<RawImage>,
    processed_image: Option<RawImage>,
    background_removed: bool,
    current_step: Step,
    is_processing: bool,
    processing_error: Option<String>,
    mask_progress: u8,
    initial_target: Dimensions,
}

impl PipelineState {
    /// Empty session whose target size starts at `initial_target`.
    pub fn new(initial_target: Dimensions) -> Self {
        Self {
            original_image: None,
            image_dimensions: None,
            target_dimensions: initial_target,
            aspect_ratio: AspectRatio::Free,
            edited_image: None,
            processed_image: None,
            background_removed: false,
            current_step: Step::Upload,
            is_processing: false,
            processing_error: None,
            mask_progress: 0,
            initial_target,
        }
    }

    pub fn original_image(&self) -> Option<&RawImage> {
        self.original_image.as_ref()
    }

    /// Natural size of the uploaded image.
    pub fn image_dimensions(&self) -> Option<Dimensions> {
        self.image_dimensions
    }

    pub fn target_dimensions(&self) -> Dimensions {
        self.target_dimensions
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    /// Post-resize raster.
    pub fn edited_image(&self) -> Option<&RawImage> {
        self.edited_image.as_ref()
    }

    /// Post-mask raster.
    pub fn processed_image(&self) -> Option<&RawImage> {
        self.processed_image.as_ref()
    }

    pub fn background_removed(&self) -> bool {
        self.background_removed
    }

    pub fn current_step(&self) -> Step {
        self.current_step
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    pub fn processing_error(&self) -> Option<&str> {
        self.processing_error.as_deref()
    }

    /// Percent of the current (or last) masking run.
    pub fn mask_progress(&self) -> u8 {
        self.mask_progress
    }

    /// Export source: processed, else edited, else original.
    pub fn export_source(&self) -> Option<&RawImage> {
        self.processed_image
            .as_ref()
            .or(self.edited_image.as_ref())
            .or(self.original_image.as_ref())
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new(Dimensions::new(800, 600))
    }
}

/// Named state transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Also resets the target size to the image's natural size.
    SetOriginalImage(Option<RawImage>),
    SetEditedImage(RawImage),
    /// `None` discards a result that no longer matches the edited image.
    SetProcessedImage(Option<RawImage>),
    SetTargetDimensions(Dimensions),
    SetAspectRatio(AspectRatio),
    SetProcessing(bool),
    SetProcessingError(Option<String>),
    SetBackgroundRemoved(bool),
    SetMaskProgress(u8),
    SetStep(Step),
    Reset,
}

impl Action {
    /// Short name for log lines; payloads are rasters and too large to print.
    pub fn name(&self) -> &'static str {
        match self {
            Action::SetOriginalImage(_) => "SET_ORIGINAL_IMAGE",
            Action::SetEditedImage(_) => "SET_EDITED_IMAGE",
            Action::SetProcessedImage(_) => "SET_PROCESSED_IMAGE",
            Action::SetTargetDimensions(_) => "SET_TARGET_DIMENSIONS",
            Action::SetAspectRatio(_) => "SET_ASPECT_RATIO",
            Action::SetProcessing(_) => "SET_PROCESSING",
            Action::SetProcessingError(_) => "SET_PROCESSING_ERROR",
            Action::SetBackgroundRemoved(_) => "SET_BACKGROUND_REMOVED",
            Action::SetMaskProgress(_) => "SET_MASK_PROGRESS",
            Action::SetStep(_) => "SET_STEP",
            Action::Reset => "RESET",
        }
    }
}

/// Compute the state that follows `state` under `action`.
pub fn reduce(state: &PipelineState, action: Action) -> PipelineState {
    let mut next = state.clone();
    match action {
        Action::SetOriginalImage(image) => {
            match &image {
                Some(img) => {
                    next.image_dimensions = Some(img.dimensions());
                    next.target_dimensions = img.dimensions();
                }
                None => {
                    next.image_dimensions = None;
                    next.target_dimensions = state.initial_target;
                }
            }
            next.original_image = image;
        }
        Action::SetEditedImage(image) => next.edited_image = Some(image),
        Action::SetProcessedImage(image) => next.processed_image = image,
        Action::SetTargetDimensions(dims) => next.target_dimensions = dims,
        Action::SetAspectRatio(aspect) => next.aspect_ratio = aspect,
        Action::SetProcessing(flag) => next.is_processing = flag,
        Action::SetProcessingError(error) => next.processing_error = error,
        Action::SetBackgroundRemoved(flag) => next.background_removed = flag,
        Action::SetMaskProgress(percent) => next.mask_progress = percent.min(100),
        Action::SetStep(step) => next.current_step = step,
        Action::Reset => next = PipelineState::new(state.initial_target),
    }
    next
}

/// Owner of the session state.
///
/// `dispatch` takes `&mut self`, so two stage completions can never
/// interleave partial updates.
#[derive(Debug, Clone, Default)]
pub struct ImageStore {
    state: PipelineState,
}

impl ImageStore {
    pub fn new(initial_target: Dimensions) -> Self {
        Self {
            state: PipelineState::new(initial_target),
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn dispatch(&mut self, action: Action) {
        log::trace!("dispatch {}", action.name());
        self.state = reduce(&self.state, action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{gradient, solid};

    #[test]
    fn initial_state_is_empty() {
        let state = PipelineState::default();
        assert!(state.original_image().is_none());
        assert!(state.edited_image().is_none());
        assert!(state.processed_image().is_none());
        assert_eq!(state.target_dimensions(), Dimensions::new(800, 600));
        assert_eq!(state.aspect_ratio(), AspectRatio::Free);
        assert_eq!(state.current_step(), Step::Upload);
        assert!(!state.background_removed());
    }

    #[test]
    fn original_image_sets_natural_target() {
        let state = reduce(
            &PipelineState::default(),
            Action::SetOriginalImage(Some(gradient(1000, 500))),
        );
        assert_eq!(state.image_dimensions(), Some(Dimensions::new(1000, 500)));
        assert_eq!(state.target_dimensions(), Dimensions::new(1000, 500));
    }

    #[test]
    fn clearing_original_restores_initial_target() {
        let mut store = ImageStore::new(Dimensions::new(640, 480));
        store.dispatch(Action::SetOriginalImage(Some(gradient(10, 10))));
        store.dispatch(Action::SetOriginalImage(None));
        assert_eq!(store.state().target_dimensions(), Dimensions::new(640, 480));
        assert_eq!(store.state().image_dimensions(), None);
    }

    #[test]
    fn reduce_does_not_touch_input() {
        let before = PipelineState::default();
        let after = reduce(&before, Action::SetStep(Step::Save));
        assert_eq!(before.current_step(), Step::Upload);
        assert_eq!(after.current_step(), Step::Save);
    }

    #[test]
    fn reset_returns_to_initial_state() {
        let mut store = ImageStore::default();
        store.dispatch(Action::SetOriginalImage(Some(gradient(4, 4))));
        store.dispatch(Action::SetEditedImage(gradient(2, 2)));
        store.dispatch(Action::SetBackgroundRemoved(true));
        store.dispatch(Action::SetStep(Step::Background));
        store.dispatch(Action::Reset);
        assert_eq!(*store.state(), PipelineState::default());
    }

    #[test]
    fn export_source_priority() {
        let original = solid(1, 1, [1, 1, 1, 255]);
        let edited = solid(1, 1, [2, 2, 2, 255]);
        let processed = solid(1, 1, [3, 3, 3, 255]);

        let mut store = ImageStore::default();
        assert!(store.state().export_source().is_none());
        store.dispatch(Action::SetOriginalImage(Some(original.clone())));
        assert_eq!(store.state().export_source(), Some(&original));
        store.dispatch(Action::SetEditedImage(edited.clone()));
        assert_eq!(store.state().export_source(), Some(&edited));
        store.dispatch(Action::SetProcessedImage(Some(processed.clone())));
        assert_eq!(store.state().export_source(), Some(&processed));
        store.dispatch(Action::SetProcessedImage(None));
        assert_eq!(store.state().export_source(), Some(&edited));
    }

    #[test]
    fn mask_progress_is_capped() {
        let state = reduce(&PipelineState::default(), Action::SetMaskProgress(250));
        assert_eq!(state.mask_progress(), 100);
    }

    #[test]
    fn steps_walk_in_order() {
        let forward: Vec<_> = std::iter::successors(Some(Step::Upload), |s| s.next()).collect();
        assert_eq!(forward, Step::ALL.to_vec());
        assert_eq!(Step::Upload.previous(), None);
        assert_eq!(Step::Save.previous(), Some(Step::Background));
    }
}
