use crate::image_pipeline::grid::PixelGrid;

/// Number of bins used for every intensity histogram.
pub const HISTOGRAM_BINS: usize = 4096;

/// Fraction of the peak count a bin must exceed to count as populated.
const RANGE_THRESHOLD: f32 = 0.01;

/// Intensity histogram over `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    counts: Vec<u32>,
}

/// Shape summary of a histogram, all values in `[0, 1)` intensity units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramStats {
    /// Mode bin divided by the bin count
    pub mean: f32,
    /// A sixth of the populated range
    pub sigma: f32,
    pub range_start: f32,
    pub range_end: f32,
}

impl Histogram {
    /// Bins every sample of `grid` over `[0, 1]`.
    ///
    /// Bin width is `1 / (bins - 1)` and samples are clamped to 0 or 1 before
    /// binning. The index is truncated in `f32`, so 1.0 lands in bin 4094 and
    /// the last bin stays empty.
    pub fn from_grid(grid: &PixelGrid) -> Self {
        Self::from_samples(grid.data(), 0.0, 1.0)
    }

    pub fn from_samples(samples: &[f32], min: f32, max: f32) -> Self {
        let mut counts = vec![0u32; HISTOGRAM_BINS];
        let bin_width = (max - min) / (HISTOGRAM_BINS - 1) as f32;

        for &sample in samples {
            let clamped = if sample > max {
                max
            } else if sample < min {
                min
            } else {
                sample
            };
            // NaN casts to bin 0
            let index = ((clamped - min) / bin_width) as usize;
            counts[index] += 1;
        }

        Self { counts }
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Estimates center and spread from the histogram shape.
    ///
    /// Bin 0 collects clipped and border samples and is skipped by every
    /// search. The populated range runs from the first to the last bin whose
    /// count exceeds 1% of the peak, and spans roughly six sigma.
    pub fn stats(&self) -> HistogramStats {
        let bins = HISTOGRAM_BINS as f32;

        let mut peak = 0u32;
        let mut mode = 0usize;
        for (i, &count) in self.counts.iter().enumerate().skip(1) {
            if count > peak {
                peak = count;
                mode = i;
            }
        }

        let threshold = peak as f32 * RANGE_THRESHOLD;
        let populated = |i: &usize| self.counts[*i] as f32 > threshold;

        let range_start = (1..HISTOGRAM_BINS)
            .find(populated)
            .map_or(0.0, |i| i as f32 / bins);
        let range_end = (1..HISTOGRAM_BINS)
            .rev()
            .find(populated)
            .map_or(0.0, |i| i as f32 / bins);

        HistogramStats {
            mean: mode as f32 / bins,
            sigma: (range_end - range_start) / 6.0,
            range_start,
            range_end,
        }
    }
}
