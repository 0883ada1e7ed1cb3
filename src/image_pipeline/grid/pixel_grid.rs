use crate::image_pipeline::common::error::{CalibrationError, Result};

/// Rectangular grid of `f32` samples stored row-major.
///
/// Depending on the pipeline stage the samples are raw counts or normalized
/// intensities in `[0, 1]`. Dimensions never change after construction; the
/// elementwise operations below mutate in place and refuse operands of a
/// different shape before touching any sample. NaN and infinities are not
/// special-cased.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelGrid {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

/// Range captured by [`PixelGrid::normalize`], needed to undo it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub min: f32,
    pub max: f32,
}

impl Normalization {
    pub fn range(&self) -> f32 {
        self.max - self.min
    }
}

impl PixelGrid {
    /// Zero-filled grid.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0.0)
    }

    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Reshapes a row-major buffer into a grid.
    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != width * height {
            return Err(CalibrationError::InvalidDimensions(width, height));
        }
        Ok(Self { width, height, data })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        self.data[y * self.width + x] = value;
    }

    pub fn row(&self, y: usize) -> &[f32] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Fails with `ShapeMismatch` unless `other` has the same dimensions.
    pub fn ensure_same_shape(&self, other: &PixelGrid) -> Result<()> {
        if self.dimensions() != other.dimensions() {
            return Err(CalibrationError::shape_mismatch(
                self.dimensions(),
                other.dimensions(),
            ));
        }
        Ok(())
    }

    pub fn add_scalar(&mut self, value: f32) {
        self.data.iter_mut().for_each(|v| *v += value);
    }

    pub fn multiply(&mut self, factor: f32) {
        self.data.iter_mut().for_each(|v| *v *= factor);
    }

    pub fn add_grid(&mut self, other: &PixelGrid) -> Result<()> {
        self.zip_apply(other, |a, b| a + b)
    }

    pub fn subtract_grid(&mut self, other: &PixelGrid) -> Result<()> {
        self.zip_apply(other, |a, b| a - b)
    }

    pub fn divide_grid(&mut self, other: &PixelGrid) -> Result<()> {
        self.zip_apply(other, |a, b| a / b)
    }

    fn zip_apply(&mut self, other: &PixelGrid, op: impl Fn(f32, f32) -> f32) -> Result<()> {
        self.ensure_same_shape(other)?;
        self.data
            .iter_mut()
            .zip(&other.data)
            .for_each(|(a, &b)| *a = op(*a, b));
        Ok(())
    }

    /// Clamps every sample into `[min, max]`. NaN samples are left as NaN.
    pub fn clip(&mut self, min: f32, max: f32) {
        for v in self.data.iter_mut() {
            if *v > max {
                *v = max;
            } else if *v < min {
                *v = min;
            }
        }
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Row-major copy of the samples.
    pub fn flatten(&self) -> Vec<f32> {
        self.data.clone()
    }

    /// Elementwise sum of all `grids` into a new grid.
    pub fn sum_of(grids: &[&PixelGrid]) -> Result<PixelGrid> {
        let first = grids.first().ok_or(CalibrationError::EmptyFrameSet)?;
        let mut result = PixelGrid::new(first.width, first.height);
        for grid in grids {
            result.add_grid(grid)?;
        }
        Ok(result)
    }

    pub fn mean_value(&self) -> f32 {
        let sum: f32 = self.data.iter().sum();
        sum / self.data.len() as f32
    }

    /// Smallest and largest sample, ignoring NaN.
    pub fn min_max(&self) -> (f32, f32) {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &v in &self.data {
            if v > max {
                max = v;
            }
            if v < min {
                min = v;
            }
        }
        (min, max)
    }

    /// Maps the grid onto `[0, 1]` via `(v - min) / (max - min)`.
    ///
    /// A constant grid has a zero range and turns into NaN.
    pub fn normalize(&mut self) -> Normalization {
        let (min, max) = self.min_max();
        let normalization = Normalization { min, max };
        let range = normalization.range();
        self.data.iter_mut().for_each(|v| *v = (*v - min) / range);
        normalization
    }

    pub fn denormalize(&mut self, normalization: &Normalization) {
        self.multiply(normalization.range());
        self.add_scalar(normalization.min);
    }
}
