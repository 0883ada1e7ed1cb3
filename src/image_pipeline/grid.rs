//! Array math kernel
//!
//! Elementwise operations over 2D `f32` grids shared by every other stage.

mod pixel_grid;

pub use pixel_grid::{Normalization, PixelGrid};
