use std::collections::BTreeMap;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::debayer::BayerPattern;
use crate::image_pipeline::grid::PixelGrid;

/// Header keyword carrying the color filter layout.
pub const BAYER_PATTERN_KEY: &str = "BAYERPAT";
/// Header keyword naming the exposure type.
pub const OBJECT_KEY: &str = "OBJECT";

/// Calibration role of a frame, taken from its `OBJECT` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Dark,
    Flat,
    Bias,
    Science,
}

impl FrameKind {
    /// Anything that is not a dark, flat or bias frame is science.
    pub fn from_object(object: &str) -> Self {
        match object.trim().to_ascii_lowercase().as_str() {
            "dark" => FrameKind::Dark,
            "flat" => FrameKind::Flat,
            "bias" => FrameKind::Bias,
            _ => FrameKind::Science,
        }
    }

    pub fn is_calibration(&self) -> bool {
        !matches!(self, FrameKind::Science)
    }
}

/// Header keywords of a frame with their values rendered as text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameHeader {
    entries: BTreeMap<String, String>,
}

impl FrameHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bayer layout from `BAYERPAT`, `None` when the keyword is absent.
    pub fn bayer_pattern(&self) -> Result<Option<BayerPattern>> {
        self.get(BAYER_PATTERN_KEY)
            .map(str::parse::<BayerPattern>)
            .transpose()
    }

    pub fn frame_kind(&self) -> FrameKind {
        self.get(OBJECT_KEY)
            .map_or(FrameKind::Science, FrameKind::from_object)
    }
}

/// Samples as stored in the container.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSamples {
    /// BITPIX 16
    I16(Vec<i16>),
    /// BITPIX -32
    F32(Vec<f32>),
}

impl RawSamples {
    pub fn len(&self) -> usize {
        match self {
            RawSamples::I16(values) => values.len(),
            RawSamples::F32(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bitpix(&self) -> i32 {
        match self {
            RawSamples::I16(_) => 16,
            RawSamples::F32(_) => -32,
        }
    }
}

/// One decoded frame before conversion to floating point.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: usize,
    pub height: usize,
    pub samples: RawSamples,
    pub header: FrameHeader,
}

impl RawFrame {
    /// Converts the samples to `f32` without rescaling.
    pub fn into_grid(self) -> Result<PixelGrid> {
        let data = match self.samples {
            RawSamples::I16(values) => values.into_iter().map(f32::from).collect(),
            RawSamples::F32(values) => values,
        };
        PixelGrid::from_vec(self.width, self.height, data)
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::common::error::CalibrationError;

    #[test]
    fn test_frame_kind_from_object() {
        assert_eq!(FrameKind::from_object("dark"), FrameKind::Dark);
        assert_eq!(FrameKind::from_object(" Flat "), FrameKind::Flat);
        assert_eq!(FrameKind::from_object("BIAS"), FrameKind::Bias);
        assert_eq!(FrameKind::from_object("M31"), FrameKind::Science);
        assert_eq!(FrameKind::from_object(""), FrameKind::Science);
        assert!(!FrameKind::Science.is_calibration());
    }

    #[test]
    fn test_header_lookups() {
        let header = FrameHeader::new()
            .with(OBJECT_KEY, "dark")
            .with(BAYER_PATTERN_KEY, "bggr ");
        assert_eq!(header.frame_kind(), FrameKind::Dark);
        assert_eq!(header.bayer_pattern().unwrap(), Some(BayerPattern::Bggr));

        let empty = FrameHeader::new();
        assert_eq!(empty.frame_kind(), FrameKind::Science);
        assert_eq!(empty.bayer_pattern().unwrap(), None);

        let bad = FrameHeader::new().with(BAYER_PATTERN_KEY, "RGBW");
        assert!(matches!(bad.bayer_pattern(), Err(CalibrationError::InvalidPattern(_))));
    }

    #[test]
    fn test_into_grid_converts_integers() {
        let frame = RawFrame {
            width: 2,
            height: 2,
            samples: RawSamples::I16(vec![-32768, -1, 0, 32767]),
            header: FrameHeader::new(),
        };
        let grid = frame.into_grid().unwrap();
        assert_eq!(grid.data(), &[-32768.0, -1.0, 0.0, 32767.0]);
    }

    #[test]
    fn test_into_grid_checks_length() {
        let frame = RawFrame {
            width: 3,
            height: 2,
            samples: RawSamples::F32(vec![0.0; 5]),
            header: FrameHeader::new(),
        };
        assert!(matches!(
            frame.into_grid(),
            Err(CalibrationError::InvalidDimensions(3, 2))
        ));
    }
}
