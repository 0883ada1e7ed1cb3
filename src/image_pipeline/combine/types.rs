//! Frame combination types

use crate::image_pipeline::common::error::{CalibrationError, Result};
use crate::image_pipeline::grid::PixelGrid;

/// Default clipping threshold, in population standard deviations.
pub const DEFAULT_CLIP_SIGMA: f32 = 1.5;

/// Per-pixel reduction used to build a master frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CombineMethod {
    /// Running mean of the samples within `sigma` standard deviations of the
    /// per-pixel mean (default)
    SigmaClipped { sigma: f32 },
    /// Plain arithmetic mean
    Mean,
    /// Median; even sample counts average the two middle samples
    Median,
    /// Elementwise sum
    Sum,
}

impl Default for CombineMethod {
    fn default() -> Self {
        CombineMethod::SigmaClipped {
            sigma: DEFAULT_CLIP_SIGMA,
        }
    }
}

/// Ordered, non-empty set of same-sized exposures.
#[derive(Debug, Clone)]
pub struct FrameSet {
    frames: Vec<PixelGrid>,
}

impl FrameSet {
    /// Validates that every frame matches the first one's dimensions.
    pub fn new(frames: Vec<PixelGrid>) -> Result<Self> {
        let first = frames.first().ok_or(CalibrationError::EmptyFrameSet)?;
        for frame in &frames[1..] {
            first.ensure_same_shape(frame)?;
        }
        Ok(Self { frames })
    }

    pub fn frames(&self) -> &[PixelGrid] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.frames[0].dimensions()
    }
}
