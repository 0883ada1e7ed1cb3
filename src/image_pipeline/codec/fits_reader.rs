use std::path::Path;

use fitrs::{Fits, FitsData, FitsDataArray, HeaderValue, Hdu};
use tracing::debug;

use crate::image_pipeline::codec::reader::FrameReader;
use crate::image_pipeline::codec::types::{
    BAYER_PATTERN_KEY, FrameHeader, OBJECT_KEY, RawFrame, RawSamples,
};
use crate::image_pipeline::common::error::{CalibrationError, Result};

/// Keywords carried from the primary HDU into [`FrameHeader`].
const COPIED_KEYWORDS: &[&str] = &[
    OBJECT_KEY,
    BAYER_PATTERN_KEY,
    "IMAGETYP",
    "EXPTIME",
    "DATE-OBS",
    "INSTRUME",
    "FILTER",
    "CCD-TEMP",
    "XBINNING",
    "YBINNING",
];

/// Reads the primary HDU of a FITS file.
///
/// Only two-dimensional images with BITPIX 16 or -32 are accepted. BZERO and
/// BSCALE are not applied; samples are returned exactly as stored.
pub struct FitsFrameReader;

impl FrameReader for FitsFrameReader {
    fn read_frame(&self, path: &Path) -> Result<RawFrame> {
        debug!("Reading FITS frame {}", path.display());

        let fits = Fits::open(path).map_err(|e| {
            CalibrationError::InputReadError(format!("{}: {}", path.display(), e))
        })?;
        let hdu = fits
            .get(0)
            .ok_or_else(|| CalibrationError::DecodeError("no primary HDU".to_string()))?;

        let naxis = integer_keyword(&hdu, "NAXIS")?;
        if naxis != 2 {
            return Err(CalibrationError::UnsupportedFormat(format!(
                "expected a 2D image, got NAXIS={naxis}"
            )));
        }
        let width = dimension_keyword(&hdu, "NAXIS1")?;
        let height = dimension_keyword(&hdu, "NAXIS2")?;
        let bitpix = integer_keyword(&hdu, "BITPIX")?;

        let samples = match (bitpix, hdu.read_data()) {
            (16, FitsData::IntegersI32(FitsDataArray { data, .. })) => RawSamples::I16(
                data.iter()
                    .map(|v| v.unwrap_or(0).clamp(i16::MIN as i32, i16::MAX as i32) as i16)
                    .collect(),
            ),
            (-32, FitsData::FloatingPoint32(FitsDataArray { data, .. })) => {
                RawSamples::F32(data.iter().copied().collect())
            }
            (bitpix, _) => {
                return Err(CalibrationError::UnsupportedFormat(format!("BITPIX={bitpix}")));
            }
        };

        if samples.len() != width * height {
            return Err(CalibrationError::DecodeError(format!(
                "expected {} samples for {}x{}, got {}",
                width * height,
                width,
                height,
                samples.len()
            )));
        }

        let mut header = FrameHeader::new();
        for &key in COPIED_KEYWORDS {
            if let Some(value) = hdu.value(key).and_then(header_text) {
                header.insert(key, value);
            }
        }

        debug!(width, height, bitpix, keywords = header.len(), "Decoded FITS frame");
        Ok(RawFrame {
            width,
            height,
            samples,
            header,
        })
    }
}

fn integer_keyword(hdu: &Hdu, key: &str) -> Result<i32> {
    match hdu.value(key) {
        Some(HeaderValue::IntegerNumber(n)) => Ok(*n),
        Some(_) => Err(CalibrationError::DecodeError(format!("{key} is not an integer"))),
        None => Err(CalibrationError::MissingHeader(key.to_string())),
    }
}

fn dimension_keyword(hdu: &Hdu, key: &str) -> Result<usize> {
    let value = integer_keyword(hdu, key)?;
    usize::try_from(value)
        .map_err(|_| CalibrationError::DecodeError(format!("{key}={value} is negative")))
}

fn header_text(value: &HeaderValue) -> Option<String> {
    match value {
        HeaderValue::CharacterString(s) => Some(s.trim().to_string()),
        HeaderValue::IntegerNumber(n) => Some(n.to_string()),
        HeaderValue::RealFloatingNumber(f) => Some(f.to_string()),
        _ => None,
    }
}
