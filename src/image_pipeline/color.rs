//! Histogram statistics, color balancing and luminance synthesis
//!
//! Demosaiced planes are summarized by 4096-bin histograms. Red and blue are
//! then stretched and shifted so their spread and center match green, and a
//! perceptual luminance plane is built from the balanced result.

mod balance;
mod histogram;

pub use balance::{
    ChannelTransform, ColorBalanceCoeffs, LUMINANCE_WEIGHTS, balance_colors, synthesize_luminance,
};
pub use histogram::{HISTOGRAM_BINS, Histogram, HistogramStats};
