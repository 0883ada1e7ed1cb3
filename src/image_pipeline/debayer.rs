//! Debayering module for reconstructing color planes from Bayer mosaics

pub mod cpu_debayer;
pub mod types;

pub use cpu_debayer::CpuDebayer;
pub use types::{BayerPattern, CfaSite, ColorPlanes};
