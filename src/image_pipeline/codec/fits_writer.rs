use std::fs;
use std::path::Path;

use fitrs::{Fits, HeaderValue, Hdu};
use tracing::debug;

use crate::image_pipeline::codec::types::FrameHeader;
use crate::image_pipeline::codec::writer::FrameWriter;
use crate::image_pipeline::common::error::{CalibrationError, Result};
use crate::image_pipeline::grid::PixelGrid;

/// Keywords owned by the container layout, never copied from a header.
const STRUCTURAL_KEYWORDS: &[&str] = &["SIMPLE", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "EXTEND", "END"];

/// Writes a grid as the 32-bit float primary HDU of a new FITS file.
///
/// Missing parent directories are created. Header values are written as
/// character strings.
pub struct FitsFrameWriter;

impl FrameWriter for FitsFrameWriter {
    fn write_frame(&self, path: &Path, frame: &PixelGrid, header: &FrameHeader) -> Result<()> {
        let (width, height) = frame.dimensions();
        debug!("Encoding FITS frame {}x{} to {}", width, height, path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut hdu = Hdu::new(&[width, height], frame.flatten());
        for (key, value) in header.iter() {
            if STRUCTURAL_KEYWORDS.contains(&key) {
                continue;
            }
            hdu.insert(key, HeaderValue::CharacterString(value.to_string()));
        }

        Fits::create(path, hdu).map_err(|e| {
            CalibrationError::OutputWriteError(format!("{}: {:?}", path.display(), e))
        })?;

        debug!("FITS encoding complete");
        Ok(())
    }
}
