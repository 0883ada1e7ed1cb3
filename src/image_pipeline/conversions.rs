//! Calibration orchestration
//!
//! Ties the codec, combiner, demosaic, color and detection stages together
//! into the master-frame, science and flat-view workflows.

mod calibration;
mod config;


pub use calibration::{CalibratedExposure, CalibrationPipeline, LoadedFrame};
pub use config::{DEFAULT_BATCH_SIZE, PipelineConfig, PipelineConfigBuilder};
