//! Per-pixel reductions over the samples of one coordinate across a frame set.

use crate::image_pipeline::combine::types::CombineMethod;

pub(super) fn reduce(samples: &mut [f32], method: CombineMethod) -> f32 {
    match method {
        CombineMethod::SigmaClipped { sigma } => sigma_clipped_mean(samples, sigma),
        CombineMethod::Mean => mean(samples),
        CombineMethod::Median => median(samples),
        CombineMethod::Sum => samples.iter().map(|&v| v as f64).sum::<f64>() as f32,
    }
}

// Statistics accumulate in f64 so that a constant sample column reproduces its
// value exactly.
pub(super) fn mean(samples: &[f32]) -> f32 {
    mean_f64(samples) as f32
}

fn mean_f64(samples: &[f32]) -> f64 {
    let total: f64 = samples.iter().map(|&v| v as f64).sum();
    total / samples.len() as f64
}

/// Population standard deviation (divides by N).
fn population_std_dev(samples: &[f32], mean: f64) -> f64 {
    let deviation: f64 = samples
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum();
    (deviation / samples.len() as f64).sqrt()
}

/// Mean of the samples within `sigma` population standard deviations of the
/// sample mean.
///
/// Survivors are folded in frame order with `mean' = (mean * (c - 1) + v) / c`.
/// When nothing survives (only possible with NaN input) the result is 0.
pub(super) fn sigma_clipped_mean(samples: &[f32], sigma: f32) -> f32 {
    let center = mean_f64(samples);
    let threshold = sigma as f64 * population_std_dev(samples, center);

    let mut running = 0.0f64;
    let mut count = 0u32;
    for &v in samples {
        let v = v as f64;
        if (v - center).abs() <= threshold {
            count += 1;
            running = (running * (count - 1) as f64 + v) / count as f64;
        }
    }
    running as f32
}

/// Sorts `samples` in place.
pub(super) fn median(samples: &mut [f32]) -> f32 {
    samples.sort_by(f32::total_cmp);
    let n = samples.len();
    if n % 2 == 0 {
        (samples[n / 2] + samples[(n - 1) / 2]) / 2.0
    } else {
        samples[n / 2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigma_clip_rejects_hot_sample() {
        let samples = [10.0, 10.0, 10.0, 10.0, 1000.0];
        let unclipped = mean(&samples);
        assert_eq!(unclipped, 208.0);

        let clipped = sigma_clipped_mean(&samples, 1.5);
        assert_eq!(clipped, 10.0);
        assert!((clipped - 10.0).abs() < (clipped - unclipped).abs());
    }

    #[test]
    fn test_sigma_clip_uniform_samples_for_any_sigma() {
        let samples = [0.42f32; 7];
        for sigma in [0.0, 0.5, 1.5, 3.0] {
            assert_eq!(sigma_clipped_mean(&samples, sigma), 0.42);
        }
    }

    #[test]
    fn test_sigma_clip_single_sample() {
        assert_eq!(sigma_clipped_mean(&[3.25], 1.5), 3.25);
    }

    #[test]
    fn test_sigma_clip_running_mean_matches_subset_mean() {
        let samples = [1.0, 2.0, 3.0, 4.0, 40.0];
        // 40 sits more than 1.5 sigma out; the rest survive.
        let clipped = sigma_clipped_mean(&samples, 1.5);
        assert!((clipped - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_sigma_clip_nan_has_no_survivors() {
        assert_eq!(sigma_clipped_mean(&[f32::NAN, 1.0, 2.0], 1.5), 0.0);
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&mut [5.0, 1.0, 3.0]), 3.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_reduce_dispatch() {
        let mut samples = [1.0, 2.0, 6.0];
        assert_eq!(reduce(&mut samples, CombineMethod::Sum), 9.0);
        assert_eq!(reduce(&mut samples, CombineMethod::Mean), 3.0);
        assert_eq!(reduce(&mut samples, CombineMethod::Median), 2.0);
    }
}
