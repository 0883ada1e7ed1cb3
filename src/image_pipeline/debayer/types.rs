//! Types for debayering operations

use std::fmt;
use std::str::FromStr;

use crate::image_pipeline::common::error::{CalibrationError, Result};
use crate::image_pipeline::grid::PixelGrid;

/// Role of one site in the 2x2 color filter tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfaSite {
    Red,
    Blue,
    /// Green with red neighbors to the left and right, blue above and below
    GreenRedRow,
    /// Green with red neighbors above and below, blue to the left and right
    GreenRedColumn,
}

/// Bayer color filter pattern, named by its tile read row by row from (0,0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BayerPattern {
    Rggb,
    Bggr,
    Grbg,
    Gbrg,
}

impl BayerPattern {
    /// Site assignment indexed as `tile()[row % 2][col % 2]`.
    pub fn tile(&self) -> [[CfaSite; 2]; 2] {
        use CfaSite::*;
        match self {
            BayerPattern::Rggb => [[Red, GreenRedRow], [GreenRedColumn, Blue]],
            BayerPattern::Bggr => [[Blue, GreenRedColumn], [GreenRedRow, Red]],
            BayerPattern::Grbg => [[GreenRedRow, Red], [Blue, GreenRedColumn]],
            BayerPattern::Gbrg => [[GreenRedColumn, Blue], [Red, GreenRedRow]],
        }
    }

    #[inline]
    pub fn site_at(&self, row: usize, col: usize) -> CfaSite {
        self.tile()[row & 1][col & 1]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BayerPattern::Rggb => "RGGB",
            BayerPattern::Bggr => "BGGR",
            BayerPattern::Grbg => "GRBG",
            BayerPattern::Gbrg => "GBRG",
        }
    }
}

impl FromStr for BayerPattern {
    type Err = CalibrationError;

    fn from_str(token: &str) -> Result<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "RGGB" => Ok(BayerPattern::Rggb),
            "BGGR" => Ok(BayerPattern::Bggr),
            "GRBG" => Ok(BayerPattern::Grbg),
            "GBRG" => Ok(BayerPattern::Gbrg),
            _ => Err(CalibrationError::InvalidPattern(token.to_string())),
        }
    }
}

impl fmt::Display for BayerPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Red, green and blue planes reconstructed from one mosaic.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorPlanes {
    pub red: PixelGrid,
    pub green: PixelGrid,
    pub blue: PixelGrid,
}

impl ColorPlanes {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            red: PixelGrid::new(width, height),
            green: PixelGrid::new(width, height),
            blue: PixelGrid::new(width, height),
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.red.dimensions()
    }
}
