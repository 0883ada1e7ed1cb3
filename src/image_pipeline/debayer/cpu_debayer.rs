use rayon::prelude::*;
use tracing::{info, instrument};

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::debayer::types::{BayerPattern, CfaSite, ColorPlanes};
use crate::image_pipeline::grid::PixelGrid;

/// Bilinear demosaic over a single-channel mosaic.
///
/// Every interior pixel keeps its own sample for its filter color and
/// averages its neighbors for the other two:
///
/// - red and blue sites take green from the 4-neighbor cross and the opposite
///   color from the 4 diagonals
/// - green sites take each missing color from the 2 neighbors that carry it
///
/// The one-pixel border of every plane stays 0.
pub struct CpuDebayer;

impl CpuDebayer {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, mosaic), fields(width = mosaic.width(), height = mosaic.height()))]
    pub fn process(&self, mosaic: &PixelGrid, pattern: BayerPattern) -> Result<ColorPlanes> {
        let (width, height) = mosaic.dimensions();
        info!("Starting CPU debayering for image {}x{} ({})", width, height, pattern);

        let mut planes = ColorPlanes::new(width, height);
        if width < 3 || height < 3 {
            return Ok(planes);
        }

        let ColorPlanes { red, green, blue } = &mut planes;
        red.data_mut()
            .par_chunks_mut(width)
            .zip(green.data_mut().par_chunks_mut(width))
            .zip(blue.data_mut().par_chunks_mut(width))
            .enumerate()
            .filter(|(y, _)| *y > 0 && *y < height - 1)
            .for_each(|(y, ((red_row, green_row), blue_row))| {
                for x in 1..width - 1 {
                    let (r, g, b) = interpolate(mosaic, pattern.site_at(y, x), x, y);
                    red_row[x] = r;
                    green_row[x] = g;
                    blue_row[x] = b;
                }
            });

        Ok(planes)
    }
}

impl Default for CpuDebayer {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns (red, green, blue) for the interior pixel at (x, y).
#[inline]
fn interpolate(mosaic: &PixelGrid, site: CfaSite, x: usize, y: usize) -> (f32, f32, f32) {
    let own = mosaic.get(x, y);
    let horizontal = (mosaic.get(x - 1, y) + mosaic.get(x + 1, y)) / 2.0;
    let vertical = (mosaic.get(x, y - 1) + mosaic.get(x, y + 1)) / 2.0;

    match site {
        CfaSite::Red => (own, cross(mosaic, x, y), diagonal(mosaic, x, y)),
        CfaSite::Blue => (diagonal(mosaic, x, y), cross(mosaic, x, y), own),
        CfaSite::GreenRedRow => (horizontal, own, vertical),
        CfaSite::GreenRedColumn => (vertical, own, horizontal),
    }
}

#[inline]
fn cross(mosaic: &PixelGrid, x: usize, y: usize) -> f32 {
    (mosaic.get(x - 1, y) + mosaic.get(x + 1, y) + mosaic.get(x, y - 1) + mosaic.get(x, y + 1)) / 4.0
}

#[inline]
fn diagonal(mosaic: &PixelGrid, x: usize, y: usize) -> f32 {
    (mosaic.get(x - 1, y - 1)
        + mosaic.get(x + 1, y - 1)
        + mosaic.get(x - 1, y + 1)
        + mosaic.get(x + 1, y + 1))
        / 4.0
}
