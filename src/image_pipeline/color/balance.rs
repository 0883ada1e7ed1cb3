use tracing::{debug, instrument};

use crate::image_pipeline::color::histogram::{Histogram, HistogramStats};
use crate::image_pipeline::common::error::{CalibrationError, Result};
use crate::image_pipeline::debayer::ColorPlanes;
use crate::image_pipeline::grid::PixelGrid;

/// Perceptual luminance weights for red, green and blue.
pub const LUMINANCE_WEIGHTS: [f32; 3] = [0.222, 0.707, 0.071];

/// Linear map `v * scale + offset` applied to one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelTransform {
    pub scale: f32,
    pub offset: f32,
}

impl ChannelTransform {
    pub fn apply(&self, plane: &mut PixelGrid) {
        plane.multiply(self.scale);
        plane.add_scalar(self.offset);
    }
}

/// Per-channel transforms that align red and blue histograms on green.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorBalanceCoeffs {
    pub red: ChannelTransform,
    pub green: ChannelTransform,
    pub blue: ChannelTransform,
}

impl ColorBalanceCoeffs {
    /// Derives the transforms from the histogram of each plane.
    ///
    /// Green is the reference and keeps unit scale. Red and blue are scaled
    /// by `green_sigma / sigma` and shifted so their mean lands on green's.
    pub fn compute(planes: &ColorPlanes) -> Result<Self> {
        let red = channel_stats("red", &planes.red)?;
        let green = channel_stats("green", &planes.green)?;
        let blue = channel_stats("blue", &planes.blue)?;

        let match_green = |stats: &HistogramStats| {
            let scale = green.sigma / stats.sigma;
            ChannelTransform {
                scale,
                offset: green.mean - scale * stats.mean,
            }
        };

        Ok(Self {
            red: match_green(&red),
            green: ChannelTransform {
                scale: 1.0,
                offset: green.mean - green.mean,
            },
            blue: match_green(&blue),
        })
    }

    pub fn apply(&self, planes: &mut ColorPlanes) {
        self.red.apply(&mut planes.red);
        self.green.apply(&mut planes.green);
        self.blue.apply(&mut planes.blue);
    }
}

fn channel_stats(channel: &str, plane: &PixelGrid) -> Result<HistogramStats> {
    let stats = Histogram::from_grid(plane).stats();
    debug!(channel, mean = stats.mean, sigma = stats.sigma, "Channel histogram");
    if stats.sigma == 0.0 {
        return Err(CalibrationError::DegenerateStatistics(format!(
            "{channel} channel histogram has zero spread"
        )));
    }
    Ok(stats)
}

/// Balances `planes` in place and returns the coefficients used.
#[instrument(skip(planes))]
pub fn balance_colors(planes: &mut ColorPlanes) -> Result<ColorBalanceCoeffs> {
    let coeffs = ColorBalanceCoeffs::compute(planes)?;
    debug!(?coeffs, "Applying color balance");
    coeffs.apply(planes);
    Ok(coeffs)
}

/// Weighted sum of the three planes, recentered so its histogram mode sits
/// at 0.5 and clipped to `[0, 1]`. The planes are left untouched.
#[instrument(skip(planes))]
pub fn synthesize_luminance(planes: &ColorPlanes) -> Result<PixelGrid> {
    let [red_weight, green_weight, blue_weight] = LUMINANCE_WEIGHTS;

    let mut luminance = planes.red.clone();
    luminance.multiply(red_weight);

    let mut green = planes.green.clone();
    green.multiply(green_weight);
    luminance.add_grid(&green)?;

    let mut blue = planes.blue.clone();
    blue.multiply(blue_weight);
    luminance.add_grid(&blue)?;

    let stats = Histogram::from_grid(&luminance).stats();
    luminance.add_scalar(0.5 - stats.mean);
    luminance.clip(0.0, 1.0);
    Ok(luminance)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Gradient covering most of `[low, high]`.
    fn gradient(width: usize, height: usize, low: f32, high: f32) -> PixelGrid {
        let n = width * height;
        let data = (0..n)
            .map(|i| low + (high - low) * i as f32 / (n - 1) as f32)
            .collect();
        PixelGrid::from_vec(width, height, data).unwrap()
    }

    fn planes(red: PixelGrid, green: PixelGrid, blue: PixelGrid) -> ColorPlanes {
        ColorPlanes { red, green, blue }
    }

    #[test]
    fn test_identical_channels_balance_to_identity() {
        let plane = gradient(64, 64, 0.2, 0.6);
        let coeffs = ColorBalanceCoeffs::compute(&planes(plane.clone(), plane.clone(), plane)).unwrap();

        for transform in [coeffs.red, coeffs.green, coeffs.blue] {
            assert_eq!(transform.scale, 1.0);
            assert_eq!(transform.offset, 0.0);
        }
    }

    #[test]
    fn test_narrow_channel_is_stretched_onto_green() {
        let green = gradient(64, 64, 0.2, 0.6);
        let red = gradient(64, 64, 0.1, 0.3);
        let mut color = planes(red, green.clone(), green);

        let coeffs = balance_colors(&mut color).unwrap();
        assert!((coeffs.red.scale - 2.0).abs() < 0.01, "{:?}", coeffs.red);

        let (min, max) = color.red.min_max();
        assert!((max - min - 0.4).abs() < 0.01, "{min}..{max}");
    }

    #[test]
    fn test_zero_sigma_is_degenerate() {
        let spread = gradient(32, 32, 0.2, 0.6);
        let flat = PixelGrid::filled(32, 32, 0.4);
        for color in [
            planes(flat.clone(), spread.clone(), spread.clone()),
            planes(spread.clone(), flat.clone(), spread.clone()),
            planes(spread.clone(), spread.clone(), flat.clone()),
        ] {
            let err = ColorBalanceCoeffs::compute(&color).unwrap_err();
            assert!(matches!(err, CalibrationError::DegenerateStatistics(_)));
        }
    }

    #[test]
    fn test_apply_is_multiply_then_add() {
        let mut plane = PixelGrid::filled(2, 2, 0.5);
        ChannelTransform { scale: 2.0, offset: -0.25 }.apply(&mut plane);
        assert!(plane.data().iter().all(|&v| v == 0.75));
    }

    #[test]
    fn test_luminance_is_centered_and_clipped() {
        let mut red = PixelGrid::filled(16, 16, 0.2);
        red.set(3, 3, 1.0);
        let mut green = PixelGrid::filled(16, 16, 0.2);
        green.set(3, 3, 1.0);
        let blue = PixelGrid::filled(16, 16, 0.2);
        let color = planes(red, green, blue);
        let before = color.clone();

        let luminance = synthesize_luminance(&color).unwrap();
        assert_eq!(color, before);
        assert!((luminance.get(0, 0) - 0.5).abs() < 1e-3);
        assert_eq!(luminance.get(3, 3), 1.0);
        assert!(luminance.data().iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_luminance_rejects_mismatched_planes() {
        let color = planes(PixelGrid::new(4, 4), PixelGrid::new(4, 3), PixelGrid::new(4, 4));
        assert!(matches!(
            synthesize_luminance(&color),
            Err(CalibrationError::ShapeMismatch { .. })
        ));
    }
}
