//! Brightness-threshold background removal.
//!
//! A pixel counts as background when its mean brightness `(R+G+B)/3` is above
//! 240, or when all three channels are above 250. Background pixels get alpha
//! 0; everything else is copied through untouched. The pass is per-pixel and
//! order-independent, so running it twice gives the same alpha as once.
//!
//! ## Simulated progress
//!
//! The pixel pass itself is instant. What the user sees is a [`MaskRun`]: a
//! stream of [`MaskEvent::Progress`] ticks (0%, 10%, ..., 100%) spaced
//! `duration / ticks` apart, where the duration depends on [`MaskQuality`],
//! followed by one [`MaskEvent::Completed`] carrying the masked raster. The
//! pixel pass happens only on that last step.
//!
//! A run is decoupled from real time: [`MaskRun`] is an iterator that can be
//! stepped synchronously, and [`MaskRun::drive`] adds pauses through a
//! [`Pacer`]. A superseded run is stopped through its [`CancelToken`]; once
//! cancelled it delivers no further events.

use super::params::MaskQuality;
use super::raster::RawImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Mean brightness strictly above this marks a pixel as background.
pub const BRIGHTNESS_THRESHOLD: u32 = 240;

/// Every channel strictly above this marks a pixel as background.
pub const NEAR_WHITE_THRESHOLD: u8 = 250;

/// Background classification for one pixel.
///
/// `(r + g + b) / 3 > 240` is evaluated exactly as `r + g + b > 720`.
pub fn is_background(r: u8, g: u8, b: u8) -> bool {
    let sum = r as u32 + g as u32 + b as u32;
    sum > BRIGHTNESS_THRESHOLD * 3
        || (r > NEAR_WHITE_THRESHOLD && g > NEAR_WHITE_THRESHOLD && b > NEAR_WHITE_THRESHOLD)
}

/// Zero the alpha of every background pixel; returns a new raster.
pub fn remove_background(source: &RawImage) -> RawImage {
    source.map_pixels(|px| {
        if is_background(px[0], px[1], px[2]) {
            px[3] = 0;
        }
    })
}

/// Simulated duration per quality level and the number of progress ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskTimings {
    pub low: Duration,
    pub medium: Duration,
    pub high: Duration,
    pub ticks: u32,
}

impl MaskTimings {
    pub fn duration(&self, quality: MaskQuality) -> Duration {
        match quality {
            MaskQuality::Low => self.low,
            MaskQuality::Medium => self.medium,
            MaskQuality::High => self.high,
        }
    }

    /// Pause between two consecutive ticks.
    pub fn interval(&self, quality: MaskQuality) -> Duration {
        self.duration(quality) / self.ticks.max(1)
    }
}

impl Default for MaskTimings {
    fn default() -> Self {
        Self {
            low: Duration::from_millis(2000),
            medium: Duration::from_millis(4000),
            high: Duration::from_millis(6000),
            ticks: 10,
        }
    }
}

/// Shared cancellation flag for one run.
///
/// Clones observe the same flag; cancelling any clone cancels the run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One item of a masking run.
#[derive(Debug, Clone, PartialEq)]
pub enum MaskEvent {
    /// Percent complete, 0 through 100.
    Progress(u8),
    /// The masked raster; always the last event of a run.
    Completed(RawImage),
}

/// Waits between ticks. Swapped out in tests so runs finish instantly.
pub trait Pacer {
    fn pause(&self, duration: Duration);
}

/// Real-time pacing with `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepPacer;

impl Pacer for SleepPacer {
    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// No waiting at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPause;

impl Pacer for NoPause {
    fn pause(&self, _duration: Duration) {}
}

/// A single simulated masking run over one source raster.
#[derive(Debug, Clone)]
pub struct MaskRun {
    source: RawImage,
    quality: MaskQuality,
    ticks: u32,
    interval: Duration,
    /// Ticks already emitted; `None` until the 0% event.
    emitted: Option<u32>,
    finished: bool,
    cancel: CancelToken,
}

impl MaskRun {
    pub fn new(source: RawImage, quality: MaskQuality, timings: &MaskTimings) -> Self {
        Self {
            source,
            quality,
            ticks: timings.ticks.max(1),
            interval: timings.interval(quality),
            emitted: None,
            finished: false,
            cancel: CancelToken::new(),
        }
    }

    pub fn quality(&self) -> MaskQuality {
        self.quality
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Handle that cancels this run from elsewhere.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// True once the completed raster has been delivered.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether the next event is preceded by a tick interval.
    ///
    /// The 0% event is immediate and so is the completion right after 100%.
    pub fn next_needs_pause(&self) -> bool {
        matches!(self.emitted, Some(n) if n < self.ticks)
    }

    /// Deliver every remaining event to `observer`, pausing between ticks.
    ///
    /// Returns the masked raster, or `None` if the run was cancelled first.
    pub fn drive<P, F>(mut self, pacer: &P, mut observer: F) -> Option<RawImage>
    where
        P: Pacer + ?Sized,
        F: FnMut(&MaskEvent),
    {
        loop {
            if self.next_needs_pause() {
                pacer.pause(self.interval);
            }
            match self.next()? {
                MaskEvent::Completed(image) => {
                    let event = MaskEvent::Completed(image.clone());
                    observer(&event);
                    return Some(image);
                }
                event => observer(&event),
            }
        }
    }

    fn percent(&self, tick: u32) -> u8 {
        (tick * 100 / self.ticks) as u8
    }
}

impl Iterator for MaskRun {
    type Item = MaskEvent;

    fn next(&mut self) -> Option<MaskEvent> {
        if self.finished || self.cancel.is_cancelled() {
            return None;
        }
        match self.emitted {
            None => {
                self.emitted = Some(0);
                Some(MaskEvent::Progress(0))
            }
            Some(n) if n < self.ticks => {
                let tick = n + 1;
                self.emitted = Some(tick);
                log::debug!("mask run tick {tick}/{}", self.ticks);
                Some(MaskEvent::Progress(self.percent(tick)))
            }
            Some(_) => {
                self.finished = true;
                Some(MaskEvent::Completed(remove_background(&self.source)))
            }
        }
    }
}
