//! Statistical frame combiner
//!
//! Builds master calibration frames (darks, biases, flats) from repeated
//! exposures with per-pixel sigma-clipped averaging, plus the plain mean,
//! median and sum reductions and the dark/flat application helpers.

mod combiner;
mod reducers;
pub mod types;

pub use combiner::{combine, combine_batched, flat_correct, subtract_master};
pub use types::{CombineMethod, DEFAULT_CLIP_SIGMA, FrameSet};
