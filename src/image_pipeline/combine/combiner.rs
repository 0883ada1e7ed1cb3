use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::image_pipeline::combine::reducers;
use crate::image_pipeline::combine::types::{CombineMethod, FrameSet};
use crate::image_pipeline::common::error::{CalibrationError, Result};
use crate::image_pipeline::grid::PixelGrid;

/// Reduces a frame set into one master frame, pixel by pixel.
///
/// Output rows are computed in parallel; each pixel sees the complete sample
/// column in frame order, so the result does not depend on the thread count.
#[instrument(skip(frames), fields(frame_count = frames.len(), width = frames.dimensions().0, height = frames.dimensions().1))]
pub fn combine(frames: &FrameSet, method: CombineMethod) -> Result<PixelGrid> {
    combine_frames(frames.frames(), method)
}

/// Fans batches of `batch_size` frames out to the rayon pool and joins the
/// per-batch partial grids.
///
/// Every batch is reduced with `method` independently. The join waits for all
/// batches, reports the first failing batch (in frame order) if any, and then
/// averages the partial grids with a plain unweighted mean. `Sum` partials are
/// summed instead.
#[instrument(skip(frames), fields(frame_count = frames.len()))]
pub fn combine_batched(
    frames: &FrameSet,
    method: CombineMethod,
    batch_size: usize,
) -> Result<PixelGrid> {
    if batch_size == 0 || frames.len() <= batch_size {
        return combine(frames, method);
    }

    join_batches(frames.frames(), method, batch_size)
}

fn join_batches(frames: &[PixelGrid], method: CombineMethod, batch_size: usize) -> Result<PixelGrid> {
    let partials: Vec<Result<PixelGrid>> = frames
        .par_chunks(batch_size)
        .map(|batch| combine_frames(batch, method))
        .collect();

    let partials = partials.into_iter().collect::<Result<Vec<_>>>()?;
    info!(batches = partials.len(), "Joining partial master frames");

    let refs: Vec<&PixelGrid> = partials.iter().collect();
    let mut joined = PixelGrid::sum_of(&refs)?;
    if method != CombineMethod::Sum {
        joined.multiply(1.0 / partials.len() as f32);
    }
    Ok(joined)
}

fn combine_frames(frames: &[PixelGrid], method: CombineMethod) -> Result<PixelGrid> {
    let first = frames.first().ok_or(CalibrationError::EmptyFrameSet)?;
    for frame in &frames[1..] {
        first.ensure_same_shape(frame)?;
    }

    let (width, height) = first.dimensions();
    debug!(frames = frames.len(), ?method, "Combining {}x{} frames", width, height);

    let mut master = PixelGrid::new(width, height);
    if master.is_empty() {
        return Ok(master);
    }

    master
        .data_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let mut samples = Vec::with_capacity(frames.len());
            for (x, out) in row.iter_mut().enumerate() {
                samples.clear();
                samples.extend(frames.iter().map(|frame| frame.get(x, y)));
                *out = reducers::reduce(&mut samples, method);
            }
        });

    Ok(master)
}

/// Subtracts a master calibration frame from a copy of `science`.
pub fn subtract_master(science: &PixelGrid, master: &PixelGrid) -> Result<PixelGrid> {
    let mut calibrated = science.clone();
    calibrated.subtract_grid(master)?;
    Ok(calibrated)
}

/// Divides `ccd` by the flat scaled to unit mean: `ccd / (flat / mean(flat))`.
pub fn flat_correct(ccd: &PixelGrid, flat: &PixelGrid) -> Result<PixelGrid> {
    ccd.ensure_same_shape(flat)?;

    let flat_mean = flat.mean_value();
    debug!(flat_mean, "Applying flat correction");

    let mut unit_flat = flat.clone();
    unit_flat.multiply(1.0 / flat_mean);

    let mut corrected = ccd.clone();
    corrected.divide_grid(&unit_flat)?;
    Ok(corrected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::combine::types::DEFAULT_CLIP_SIGMA;

    fn grid(width: usize, height: usize, data: &[f32]) -> PixelGrid {
        PixelGrid::from_vec(width, height, data.to_vec()).unwrap()
    }

    fn clipped() -> CombineMethod {
        CombineMethod::SigmaClipped {
            sigma: DEFAULT_CLIP_SIGMA,
        }
    }

    #[test]
    fn test_single_frame_is_returned_unchanged() {
        let frame = grid(3, 2, &[0.1, 0.7, 0.3, 0.0, 1.0, 0.55]);
        let set = FrameSet::new(vec![frame.clone()]).unwrap();
        assert_eq!(combine(&set, clipped()).unwrap(), frame);
    }

    #[test]
    fn test_uniform_frames_for_any_sigma() {
        let frames: Vec<PixelGrid> = (0..6).map(|_| PixelGrid::filled(4, 3, 0.3)).collect();
        let set = FrameSet::new(frames).unwrap();
        for sigma in [0.0, 1.0, 1.5, 4.0] {
            let master = combine(&set, CombineMethod::SigmaClipped { sigma }).unwrap();
            assert!(master.data().iter().all(|&v| v == 0.3));
        }
    }

    #[test]
    fn test_hot_pixel_is_clipped() {
        let mut frames: Vec<PixelGrid> = (0..4).map(|_| PixelGrid::filled(2, 2, 10.0)).collect();
        let mut hot = PixelGrid::filled(2, 2, 10.0);
        hot.set(1, 0, 1000.0);
        frames.push(hot);

        let set = FrameSet::new(frames).unwrap();
        let master = combine(&set, clipped()).unwrap();
        assert_eq!(master.get(1, 0), 10.0);

        let mean = combine(&set, CombineMethod::Mean).unwrap();
        assert_eq!(mean.get(1, 0), 208.0);
    }

    #[test]
    fn test_frame_set_rejects_mismatched_shapes() {
        let frames = vec![PixelGrid::new(4, 4), PixelGrid::new(4, 3)];
        let err = FrameSet::new(frames).unwrap_err();
        assert!(matches!(err, CalibrationError::ShapeMismatch { .. }));
        assert!(matches!(FrameSet::new(Vec::new()), Err(CalibrationError::EmptyFrameSet)));
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let frames = vec![grid(2, 1, &[3.0, 1.0]), grid(2, 1, &[1.0, 2.0]), grid(2, 1, &[2.0, 3.0])];
        let set = FrameSet::new(frames.clone()).unwrap();
        let median = combine(&set, CombineMethod::Median).unwrap();
        assert_eq!(median.data(), &[2.0, 2.0]);
        assert_eq!(set.frames(), frames.as_slice());
    }

    #[test]
    fn test_batched_join_is_plain_mean_of_batches() {
        // Batches: [1, 1, 1, 100] and [5, 5]
        let values = [1.0, 1.0, 1.0, 100.0, 5.0, 5.0];
        let frames: Vec<PixelGrid> = values.iter().map(|&v| PixelGrid::filled(3, 3, v)).collect();
        let set = FrameSet::new(frames).unwrap();

        let batched = combine_batched(&set, clipped(), 4).unwrap();
        let first = combine(&FrameSet::new(set.frames()[..4].to_vec()).unwrap(), clipped()).unwrap();
        assert_eq!(first.get(0, 0), 1.0);
        assert!(batched.data().iter().all(|&v| v == 3.0));

        let summed = combine_batched(&set, CombineMethod::Sum, 4).unwrap();
        assert!(summed.data().iter().all(|&v| v == 113.0));
    }

    #[test]
    fn test_failing_batch_reported_after_join_in_frame_order() {
        // Batch 1 mixes 4x4 with 4x3, batch 2 mixes 4x4 with 2x2
        let frames = vec![
            PixelGrid::filled(4, 4, 1.0),
            PixelGrid::filled(4, 4, 1.0),
            PixelGrid::filled(4, 4, 1.0),
            PixelGrid::new(4, 3),
            PixelGrid::filled(4, 4, 1.0),
            PixelGrid::new(2, 2),
        ];
        let err = join_batches(&frames, CombineMethod::Mean, 2).unwrap_err();
        assert!(matches!(
            err,
            CalibrationError::ShapeMismatch {
                expected_width: 4,
                expected_height: 4,
                width: 4,
                height: 3,
            }
        ));

        // Healthy batches alone still join normally
        let healthy = join_batches(&frames[..2], CombineMethod::Mean, 1).unwrap();
        assert!(healthy.data().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_batched_small_set_uses_single_pass() {
        let frames: Vec<PixelGrid> = (0..3).map(|i| PixelGrid::filled(2, 2, i as f32)).collect();
        let set = FrameSet::new(frames).unwrap();
        let batched = combine_batched(&set, CombineMethod::Mean, 50).unwrap();
        assert_eq!(batched, combine(&set, CombineMethod::Mean).unwrap());
    }

    #[test]
    fn test_subtract_master() {
        let science = grid(2, 1, &[0.75, 0.5]);
        let dark = grid(2, 1, &[0.25, 0.5]);
        assert_eq!(subtract_master(&science, &dark).unwrap().data(), &[0.5, 0.0]);
        assert!(subtract_master(&science, &PixelGrid::new(1, 2)).is_err());
    }

    #[test]
    fn test_flat_correct_scales_by_unit_mean_flat() {
        let ccd = grid(2, 2, &[10.0, 10.0, 10.0, 10.0]);
        let flat = grid(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let corrected = flat_correct(&ccd, &flat).unwrap();
        let expected = [25.0, 12.5, 25.0 / 3.0, 6.25];
        for (a, b) in corrected.data().iter().zip(expected) {
            assert!((a - b).abs() < 1e-4, "{a} != {b}");
        }
    }
}
