use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("Grid shape mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    ShapeMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },

    #[error("Invalid Bayer pattern: {0}")]
    InvalidPattern(String),

    #[error("Degenerate statistics: {0}")]
    DegenerateStatistics(String),

    #[error("No maximum value could be found in the chunk at ({x}, {y})")]
    NoMaximumFound { x: usize, y: usize },

    #[error("Frame set is empty")]
    EmptyFrameSet,

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Failed to encode image: {0}")]
    EncodeError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Missing header keyword: {0}")]
    MissingHeader(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CalibrationError {
    pub(crate) fn shape_mismatch(expected: (usize, usize), actual: (usize, usize)) -> Self {
        CalibrationError::ShapeMismatch {
            expected_width: expected.0,
            expected_height: expected.1,
            width: actual.0,
            height: actual.1,
        }
    }
}

pub type Result<T> = std::result::Result<T, CalibrationError>;
