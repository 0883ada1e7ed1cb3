//! Image calibration pipeline module
//!
//! Leaf modules hold the numeric kernels (grids, frame combination,
//! demosaicing, color statistics, star detection); `codec` is the FITS
//! boundary and `conversions` orchestrates the calibration workflows.

pub mod codec;
pub mod color;
pub mod combine;
pub mod common;
pub mod conversions;
pub mod debayer;
pub mod grid;
pub mod stars;

pub use common::{CalibrationError, PipelineTimings, Result};

pub use grid::{Normalization, PixelGrid};

pub use combine::{CombineMethod, FrameSet};

pub use debayer::{BayerPattern, ColorPlanes, CpuDebayer};

pub use color::{ColorBalanceCoeffs, Histogram, HistogramStats};

pub use stars::{Candidate, StarDetector};

pub use codec::{
    FitsFrameReader, FitsFrameWriter, FrameHeader, FrameKind, FrameReader, FrameWriter, RawFrame,
};

pub use conversions::{CalibratedExposure, CalibrationPipeline, PipelineConfig, PipelineConfigBuilder};
