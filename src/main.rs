use astrocal_rs::image_pipeline::{CalibrationPipeline, CombineMethod, PipelineConfig};
use astrocal_rs::logger::{self, error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logger::init();

    info!("Starting astrocal...");

    let config = PipelineConfig::builder()
        .combine_method(CombineMethod::default())
        .detect_stars(true)
        .build();
    let pipeline = CalibrationPipeline::new(config);

    info!("Calibration pipeline initialized");
    info!("Combine method: {:?}", pipeline.config().combine_method);
    info!("Batch size: {}", pipeline.config().batch_size);

    let darks = ["darks/dark_001.fits", "darks/dark_002.fits", "darks/dark_003.fits"];
    let master = match pipeline.build_master_file(&darks, "output/master_dark.fits") {
        Ok(master) => Some(master),
        Err(e) => {
            error!("Master dark failed: {}", e);
            None
        }
    };

    match pipeline.calibrate_file_with_timings("lights/light_001.fits", master.as_ref(), "output") {
        Ok((exposure, timings)) => {
            timings.log_summary();
            info!(
                candidates = exposure.candidates.len(),
                "Calibration successful!"
            );
        }
        Err(e) => error!("Calibration failed: {}", e),
    }

    match pipeline.make_flat_views(&["flats/flat_001.fits"], "output/flats") {
        Ok(count) => info!("Wrote views for {} flat frames", count),
        Err(e) => error!("Flat views failed: {}", e),
    }

    Ok(())
}
