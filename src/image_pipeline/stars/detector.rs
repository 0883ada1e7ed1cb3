use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::image_pipeline::common::error::{CalibrationError, Result};
use crate::image_pipeline::grid::PixelGrid;

/// Smallest chunk side, keeping enough pixels for a background estimate.
pub const MIN_CHUNK_SIZE: usize = 11;

/// Peaks at or above this level are treated as saturated.
pub const SATURATION_LEVEL: f32 = 0.95;

pub const DEFAULT_RELATIVE_PEAK_LIMIT: f32 = 0.5;

/// Units in the last place a sample may differ from the chunk max and still
/// be reported as the peak.
const PEAK_TOLERANCE_ULPS: f32 = 5.0;

/// Candidate point source in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Candidate {
    pub x: usize,
    pub y: usize,
}

/// Chunked local-maximum detector for normalized images.
#[derive(Debug, Clone, Copy)]
pub struct StarDetector {
    relative_peak_limit: f32,
}

impl Default for StarDetector {
    fn default() -> Self {
        Self::new(DEFAULT_RELATIVE_PEAK_LIMIT)
    }
}

impl StarDetector {
    pub fn new(relative_peak_limit: f32) -> Self {
        Self {
            relative_peak_limit,
        }
    }

    pub fn relative_peak_limit(&self) -> f32 {
        self.relative_peak_limit
    }

    /// Chunk side for an image `width` pixels wide: `width / 100` bumped to
    /// odd, never below [`MIN_CHUNK_SIZE`].
    pub fn chunk_size(width: usize) -> usize {
        let side = width / 100;
        let side = if side % 2 == 0 { side + 1 } else { side };
        side.max(MIN_CHUNK_SIZE)
    }

    /// Tiles the image into `chunk x chunk` windows and reports at most one
    /// candidate per window.
    ///
    /// A window is rejected when its max is at or below the relative peak
    /// limit, saturated, or when its sample standard deviation is under a
    /// tenth of the limit. Windows are evaluated in parallel, so the order of
    /// the returned candidates is unspecified.
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn detect(&self, image: &PixelGrid) -> Result<Vec<Candidate>> {
        let chunk = Self::chunk_size(image.width());
        let half = chunk / 2;
        debug!(chunk, limit = self.relative_peak_limit, "Running star finder");

        let centers_x = chunk_centers(image.width(), chunk);
        let centers: Vec<(usize, usize)> = chunk_centers(image.height(), chunk)
            .into_iter()
            .flat_map(|cy| centers_x.iter().map(move |&cx| (cx, cy)))
            .collect();

        let results: Vec<Option<Candidate>> = centers
            .par_iter()
            .map(|&(cx, cy)| self.evaluate_chunk(image, cx, cy, half))
            .collect::<Result<_>>()?;

        let candidates: Vec<Candidate> = results.into_iter().flatten().collect();
        info!(
            chunks = centers.len(),
            candidates = candidates.len(),
            "Star candidates found"
        );
        Ok(candidates)
    }

    fn evaluate_chunk(
        &self,
        image: &PixelGrid,
        cx: usize,
        cy: usize,
        half: usize,
    ) -> Result<Option<Candidate>> {
        let x0 = cx - half;
        let y0 = cy - half;
        let side = 2 * half + 1;

        let window: Vec<f32> = (y0..y0 + side)
            .flat_map(|y| image.row(y)[x0..x0 + side].iter().copied())
            .collect();

        if window.is_empty() {
            return Err(CalibrationError::NoMaximumFound { x: cx, y: cy });
        }

        // NaN samples are left out of the statistics wherever they sit
        let valid: Vec<f32> = window.iter().copied().filter(|v| !v.is_nan()).collect();
        let Some(max) = valid.iter().copied().reduce(f32::max) else {
            return Ok(None);
        };

        if max <= self.relative_peak_limit || max >= SATURATION_LEVEL {
            return Ok(None);
        }
        if sample_std_dev(&valid) < self.relative_peak_limit * 0.1 {
            return Ok(None);
        }

        let tolerance = PEAK_TOLERANCE_ULPS * ulp(max);
        let peak = window
            .iter()
            .position(|&v| (v - max).abs() < tolerance)
            .ok_or(CalibrationError::NoMaximumFound { x: cx, y: cy })?;

        Ok(Some(Candidate {
            x: x0 + peak % side,
            y: y0 + peak / side,
        }))
    }
}

/// Centers `half, half + chunk, ...` strictly below `len - half`.
fn chunk_centers(len: usize, chunk: usize) -> Vec<usize> {
    let half = chunk / 2;
    (half..len.saturating_sub(half)).step_by(chunk).collect()
}

/// Standard deviation with the N - 1 denominator.
fn sample_std_dev(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|&v| v as f64).sum::<f64>() / n;
    let deviation: f64 = samples
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum();
    (deviation / (n - 1.0)).sqrt() as f32
}

/// Distance from `value` to the next larger representable magnitude.
fn ulp(value: f32) -> f32 {
    let abs = value.abs();
    if abs.is_nan() {
        f32::NAN
    } else if abs.is_infinite() {
        f32::INFINITY
    } else if abs == f32::MAX {
        abs - f32::from_bits(abs.to_bits() - 1)
    } else {
        f32::from_bits(abs.to_bits() + 1) - abs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_with_peaks(width: usize, height: usize, peaks: &[(usize, usize, f32)]) -> PixelGrid {
        let mut image = PixelGrid::filled(width, height, 0.1);
        for &(x, y, value) in peaks {
            image.set(x, y, value);
        }
        image
    }

    #[test]
    fn test_chunk_size() {
        assert_eq!(StarDetector::chunk_size(100), 11);
        assert_eq!(StarDetector::chunk_size(1500), 15);
        assert_eq!(StarDetector::chunk_size(1600), 17);
        assert_eq!(StarDetector::chunk_size(6000), 61);
    }

    #[test]
    fn test_chunk_centers_exclude_half_chunk_border() {
        assert_eq!(chunk_centers(40, 11), vec![5, 16, 27]);
        assert_eq!(chunk_centers(38, 11), vec![5, 16, 27]);
        assert_eq!(chunk_centers(32, 11), vec![5, 16]);
        assert!(chunk_centers(10, 11).is_empty());
    }

    #[test]
    fn test_single_injected_peak() {
        let image = flat_with_peaks(100, 100, &[(40, 60, 0.8)]);
        let candidates = StarDetector::new(0.5).detect(&image).unwrap();
        assert_eq!(candidates, vec![Candidate { x: 40, y: 60 }]);
    }

    #[test]
    fn test_one_candidate_per_chunk() {
        // Both peaks fall in the chunk centered at (38, 60); the first in
        // row-major order wins.
        let image = flat_with_peaks(100, 100, &[(41, 58, 0.8), (36, 62, 0.8)]);
        let candidates = StarDetector::new(0.5).detect(&image).unwrap();
        assert_eq!(candidates, vec![Candidate { x: 41, y: 58 }]);
    }

    #[test]
    fn test_rejected_chunks() {
        let detector = StarDetector::new(0.5);
        // At the limit
        let dim = flat_with_peaks(50, 50, &[(20, 20, 0.5)]);
        assert!(detector.detect(&dim).unwrap().is_empty());
        // Saturated
        let saturated = flat_with_peaks(50, 50, &[(20, 20, 0.97)]);
        assert!(detector.detect(&saturated).unwrap().is_empty());
        // Bright but too flat
        let flat = PixelGrid::filled(50, 50, 0.7);
        assert!(detector.detect(&flat).unwrap().is_empty());
    }

    #[test]
    fn test_separate_chunks_report_separately() {
        let image = flat_with_peaks(100, 100, &[(10, 10, 0.9), (80, 30, 0.7)]);
        let mut candidates = StarDetector::new(0.5).detect(&image).unwrap();
        candidates.sort();
        assert_eq!(candidates, vec![Candidate { x: 10, y: 10 }, Candidate { x: 80, y: 30 }]);
    }

    #[test]
    fn test_nan_samples_do_not_abort_detection() {
        let detector = StarDetector::new(0.5);
        // First sample of a window, a sample inside one, and the corner of
        // the window holding the star
        for (nx, ny) in [(0, 0), (1, 1), (33, 55)] {
            let mut image = flat_with_peaks(100, 100, &[(40, 60, 0.8)]);
            image.set(nx, ny, f32::NAN);
            let candidates = detector.detect(&image).unwrap();
            assert_eq!(candidates, vec![Candidate { x: 40, y: 60 }], "NaN at ({nx}, {ny})");
        }
    }

    #[test]
    fn test_all_nan_image_has_no_candidates() {
        let image = PixelGrid::filled(50, 50, f32::NAN);
        assert!(StarDetector::new(0.5).detect(&image).unwrap().is_empty());
    }

    #[test]
    fn test_image_smaller_than_chunk() {
        let image = flat_with_peaks(8, 8, &[(4, 4, 0.8)]);
        assert!(StarDetector::default().detect(&image).unwrap().is_empty());
    }

    #[test]
    fn test_sample_std_dev() {
        let std = sample_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((std - 2.138_09).abs() < 1e-4);
        assert_eq!(sample_std_dev(&[3.0]), 0.0);
    }

    #[test]
    fn test_ulp() {
        assert_eq!(ulp(1.0), f32::EPSILON);
        assert_eq!(ulp(-1.0), f32::EPSILON);
        assert_eq!(ulp(0.0), f32::from_bits(1));
        assert!(ulp(f32::NAN).is_nan());
    }
}
