//! Point-source candidate detection on normalized images

mod detector;

pub use detector::{
    Candidate, DEFAULT_RELATIVE_PEAK_LIMIT, MIN_CHUNK_SIZE, SATURATION_LEVEL, StarDetector,
};
