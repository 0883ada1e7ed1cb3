use std::path::PathBuf;

use anyhow::Context;
use astrocal_rs::image_pipeline::{
    BayerPattern, CpuDebayer, FitsFrameReader, FrameReader, Histogram, PixelGrid,
};

fn main() -> anyhow::Result<()> {
    let path = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| "input.fits".to_string()));

    let frame = FitsFrameReader
        .read_frame(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let kind = frame.header.frame_kind();
    let pattern = frame.header.bayer_pattern()?;

    println!("Frame: {}", path.display());
    println!("  Size: {}x{} pixels", frame.width, frame.height);
    println!("  BITPIX: {}", frame.samples.bitpix());
    println!("  Kind: {:?}", kind);
    println!("  Bayer pattern: {}", pattern.map_or("none".to_string(), |p| p.to_string()));

    let mut grid = frame.into_grid()?;
    let normalization = grid.normalize();
    println!("  Raw range: {} - {} (span: {})", normalization.min, normalization.max, normalization.range());

    let stats = Histogram::from_grid(&grid).stats();
    println!("\nMosaic histogram:");
    println!("  Mode: {:.4}", stats.mean);
    println!("  Populated range: {:.4} - {:.4}", stats.range_start, stats.range_end);
    println!("  Sigma estimate: {:.4}", stats.sigma);

    if let Some(pattern) = pattern {
        print_channel_stats(&grid, pattern)?;
    }

    Ok(())
}

fn print_channel_stats(mosaic: &PixelGrid, pattern: BayerPattern) -> anyhow::Result<()> {
    let planes = CpuDebayer::new().process(mosaic, pattern)?;
    for (name, plane) in [("Red", &planes.red), ("Green", &planes.green), ("Blue", &planes.blue)] {
        let stats = Histogram::from_grid(plane).stats();
        println!("\n{} channel:", name);
        println!("  Mode: {:.4}", stats.mean);
        println!("  Populated range: {:.4} - {:.4}", stats.range_start, stats.range_end);
        println!("  Sigma estimate: {:.4}", stats.sigma);
    }
    Ok(())
}
