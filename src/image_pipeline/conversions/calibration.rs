use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::image_pipeline::{
    codec::{
        FitsFrameReader, FitsFrameWriter, FrameHeader, FrameReader, FrameWriter,
        types::BAYER_PATTERN_KEY,
    },
    color::{ColorBalanceCoeffs, balance_colors, synthesize_luminance},
    combine::{FrameSet, combine_batched},
    common::{CalibrationError, PipelineTimings, Result, Timer},
    conversions::config::PipelineConfig,
    debayer::{BayerPattern, ColorPlanes, CpuDebayer},
    grid::{Normalization, PixelGrid},
    stars::{Candidate, StarDetector},
};

/// A frame as read from disk, converted to `f32` but not yet normalized.
#[derive(Debug, Clone)]
pub struct LoadedFrame {
    pub grid: PixelGrid,
    pub header: FrameHeader,
}

/// Result of calibrating one science exposure.
#[derive(Debug, Clone)]
pub struct CalibratedExposure {
    /// Normalized mosaic with the master frame subtracted
    pub calibrated: PixelGrid,
    /// Range that mapped the input onto `[0, 1]`
    pub normalization: Normalization,
    pub pattern: Option<BayerPattern>,
    pub planes: Option<ColorPlanes>,
    pub coefficients: Option<ColorBalanceCoeffs>,
    pub luminance: Option<PixelGrid>,
    pub candidates: Vec<Candidate>,
}

pub struct CalibrationPipeline<R: FrameReader, W: FrameWriter> {
    reader: R,
    writer: W,
    config: PipelineConfig,
}

impl CalibrationPipeline<FitsFrameReader, FitsFrameWriter> {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            reader: FitsFrameReader,
            writer: FitsFrameWriter,
            config,
        }
    }
}

impl<R: FrameReader, W: FrameWriter> CalibrationPipeline<R, W> {
    pub fn with_custom(reader: R, writer: W, config: PipelineConfig) -> Self {
        Self {
            reader,
            writer,
            config,
        }
    }

    fn validate_dimensions(&self, width: usize, height: usize) -> Result<()> {
        if !self.config.validate_dimensions {
            return Ok(());
        }

        if width == 0 || height == 0 {
            return Err(CalibrationError::InvalidDimensions(width, height));
        }

        if let Some(max) = self.config.max_dimension {
            if width > max || height > max {
                warn!("Image dimensions {}x{} exceed maximum {}", width, height, max);
                return Err(CalibrationError::InvalidDimensions(width, height));
            }
        }

        Ok(())
    }

    /// Bayer layout from the header, or the configured fallback.
    fn resolve_pattern(&self, header: &FrameHeader) -> Result<Option<BayerPattern>> {
        Ok(header.bayer_pattern()?.or(self.config.fallback_pattern))
    }

    /// Reads one frame and converts its samples to `f32`.
    pub fn load_frame(&self, path: &Path) -> Result<LoadedFrame> {
        let mut raw = {
            let _span = tracing::info_span!("read_frame", path = %path.display()).entered();
            self.reader.read_frame(path)?
        };

        {
            let _span = tracing::info_span!("validate_dimensions",
                width = raw.width,
                height = raw.height
            ).entered();
            self.validate_dimensions(raw.width, raw.height)?;
        }

        let header = std::mem::take(&mut raw.header);
        Ok(LoadedFrame {
            grid: raw.into_grid()?,
            header,
        })
    }

    /// Combines the frames at `paths` into a master calibration frame.
    ///
    /// Every frame is normalized to `[0, 1]` before combination.
    pub fn build_master<P: AsRef<Path>>(&self, paths: &[P]) -> Result<PixelGrid> {
        self.build_master_with_timings(paths).map(|(master, _)| master)
    }

    pub fn build_master_with_timings<P: AsRef<Path>>(
        &self,
        paths: &[P],
    ) -> Result<(PixelGrid, PipelineTimings)> {
        let mut timings = PipelineTimings::new();
        let (master, _) = self.stack(paths, &mut timings)?;
        Ok((master, timings))
    }

    /// Builds a master frame and writes it to `output`.
    ///
    /// The header of the first input is carried over with an added
    /// `NCOMBINE` count.
    #[instrument(skip(self, paths, output))]
    pub fn build_master_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        paths: &[P],
        output: Q,
    ) -> Result<PixelGrid> {
        let output = output.as_ref();
        let mut timings = PipelineTimings::new();
        let (master, mut header) = self.stack(paths, &mut timings)?;
        header.insert("NCOMBINE", paths.len().to_string());

        {
            let _span = tracing::info_span!("write_master", output = %output.display()).entered();
            self.writer.write_frame(output, &master, &header)?;
        }
        timings.log_summary();
        Ok(master)
    }

    #[instrument(skip(self, paths, timings), fields(frame_count = paths.len()))]
    fn stack<P: AsRef<Path>>(
        &self,
        paths: &[P],
        timings: &mut PipelineTimings,
    ) -> Result<(PixelGrid, FrameHeader)> {
        info!("Building master frame");

        let mut frames = Vec::with_capacity(paths.len());
        let mut first_header = None;
        for path in paths {
            let timer = Timer::start("read_frame");
            let LoadedFrame { mut grid, header } = self.load_frame(path.as_ref())?;
            grid.normalize();
            frames.push(grid);
            first_header.get_or_insert(header);
            timings.record(timer);
        }

        let timer = Timer::start("combine");
        let set = FrameSet::new(frames)?;
        let (width, height) = set.dimensions();
        let master = {
            let _span = tracing::info_span!("combine", frames = set.len()).entered();
            combine_batched(&set, self.config.combine_method, self.config.batch_size)?
        };
        timings.record(timer);

        info!(
            width,
            height,
            frames = set.len(),
            "Master frame complete in {:.3}ms",
            timings.total_duration().as_secs_f64() * 1000.0
        );
        Ok((master, first_header.unwrap_or_default()))
    }

    /// Normalizes a science frame, subtracts `master`, reconstructs color when
    /// a pattern is known and looks for star candidates.
    pub fn process_science(
        &self,
        science: PixelGrid,
        master: Option<&PixelGrid>,
        pattern: Option<BayerPattern>,
    ) -> Result<CalibratedExposure> {
        self.process_science_with_timings(science, master, pattern)
            .map(|(exposure, _)| exposure)
    }

    #[instrument(skip(self, science, master), fields(width = science.width(), height = science.height()))]
    pub fn process_science_with_timings(
        &self,
        science: PixelGrid,
        master: Option<&PixelGrid>,
        pattern: Option<BayerPattern>,
    ) -> Result<(CalibratedExposure, PipelineTimings)> {
        let mut timings = PipelineTimings::new();
        let mut calibrated = science;

        let timer = Timer::start("normalize");
        let normalization = calibrated.normalize();
        timings.record(timer);
        debug!(min = normalization.min, max = normalization.max, "Normalized science frame");

        if let Some(master) = master {
            let timer = Timer::start("subtract_master");
            {
                let _span = tracing::info_span!("subtract_master").entered();
                calibrated.subtract_grid(master)?;
            }
            timings.record(timer);
        }

        let (planes, coefficients, luminance) = match pattern {
            Some(pattern) => {
                let timer = Timer::start("demosaic");
                let mut planes = CpuDebayer::new().process(&calibrated, pattern)?;
                timings.record(timer);

                let timer = Timer::start("color_balance");
                let coefficients = balance_colors(&mut planes)?;
                timings.record(timer);

                let timer = Timer::start("luminance");
                let luminance = synthesize_luminance(&planes)?;
                timings.record(timer);

                (Some(planes), Some(coefficients), Some(luminance))
            }
            None => {
                debug!("No Bayer pattern, skipping color reconstruction");
                (None, None, None)
            }
        };

        let candidates = if self.config.detect_stars {
            let timer = Timer::start("detect_stars");
            let target = match (&luminance, self.config.detect_on_luminance) {
                (Some(luminance), true) => luminance,
                _ => &calibrated,
            };
            let candidates = StarDetector::new(self.config.relative_peak_limit).detect(target)?;
            timings.record(timer);
            candidates
        } else {
            Vec::new()
        };

        info!(
            candidates = candidates.len(),
            color = pattern.is_some(),
            "Science frame calibrated in {:.3}ms",
            timings.total_duration().as_secs_f64() * 1000.0
        );

        let exposure = CalibratedExposure {
            calibrated,
            normalization,
            pattern,
            planes,
            coefficients,
            luminance,
            candidates,
        };
        Ok((exposure, timings))
    }

    /// Calibrates the science frame at `science_path` and writes the results
    /// under `output_dir`.
    ///
    /// The calibrated mosaic goes to `Calibrated/`; color frames also get
    /// `Red/`, `Green/`, `Blue/` and `Luminance/` planes. Files keep the input
    /// file name.
    pub fn calibrate_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        science_path: P,
        master: Option<&PixelGrid>,
        output_dir: Q,
    ) -> Result<CalibratedExposure> {
        self.calibrate_file_with_timings(science_path, master, output_dir)
            .map(|(exposure, _)| exposure)
    }

    #[instrument(skip(self, science_path, master, output_dir))]
    pub fn calibrate_file_with_timings<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        science_path: P,
        master: Option<&PixelGrid>,
        output_dir: Q,
    ) -> Result<(CalibratedExposure, PipelineTimings)> {
        let science_path = science_path.as_ref();
        let output_dir = output_dir.as_ref();
        let mut timings = PipelineTimings::new();

        info!(
            input = %science_path.display(),
            output = %output_dir.display(),
            "Calibrating file"
        );

        let timer = Timer::start("read_frame");
        let LoadedFrame { grid, header } = self.load_frame(science_path)?;
        timings.record(timer);

        let pattern = self.resolve_pattern(&header)?;
        let (exposure, steps) = self.process_science_with_timings(grid, master, pattern)?;
        timings.merge(steps);

        let timer = Timer::start("write_outputs");
        let file_name = file_name(science_path)?;
        self.writer.write_frame(
            &output_dir.join("Calibrated").join(&file_name),
            &exposure.calibrated,
            &header,
        )?;
        if let (Some(planes), Some(luminance)) = (&exposure.planes, &exposure.luminance) {
            self.write_planes(output_dir, "", &file_name, planes, luminance, &header)?;
        }
        timings.record(timer);

        Ok((exposure, timings))
    }

    /// Writes balanced red, green, blue and luminance views of every flat
    /// frame to `RedFlat/`, `GreenFlat/`, `BlueFlat/` and `LuminanceFlat/`
    /// under `output_dir`. Returns the number of flats processed.
    ///
    /// All flats must share one size. Each is demosaiced with its own
    /// `BAYERPAT`, falling back to the configured pattern.
    #[instrument(skip(self, paths, output_dir), fields(frame_count = paths.len()))]
    pub fn make_flat_views<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        paths: &[P],
        output_dir: Q,
    ) -> Result<usize> {
        let output_dir = output_dir.as_ref();
        if paths.is_empty() {
            return Ok(0);
        }

        let frames = paths
            .iter()
            .map(|path| self.load_frame(path.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        for frame in &frames[1..] {
            frames[0].grid.ensure_same_shape(&frame.grid)?;
        }
        let (width, height) = frames[0].grid.dimensions();
        info!(width, height, "Creating flat views");

        let debayer = CpuDebayer::new();
        for (path, frame) in paths.iter().zip(frames) {
            let path = path.as_ref();
            let pattern = self.resolve_pattern(&frame.header)?.ok_or_else(|| {
                CalibrationError::MissingHeader(format!(
                    "{} in {}",
                    BAYER_PATTERN_KEY,
                    path.display()
                ))
            })?;

            let mut mosaic = frame.grid;
            mosaic.normalize();
            let mut planes = debayer.process(&mosaic, pattern)?;
            balance_colors(&mut planes)?;
            let luminance = synthesize_luminance(&planes)?;

            self.write_planes(output_dir, "Flat", &file_name(path)?, &planes, &luminance, &frame.header)?;
        }

        Ok(paths.len())
    }

    fn write_planes(
        &self,
        output_dir: &Path,
        suffix: &str,
        file_name: &Path,
        planes: &ColorPlanes,
        luminance: &PixelGrid,
        header: &FrameHeader,
    ) -> Result<()> {
        let outputs = [
            ("Red", &planes.red),
            ("Green", &planes.green),
            ("Blue", &planes.blue),
            ("Luminance", luminance),
        ];
        for (channel, plane) in outputs {
            let mut plane_header = header.clone();
            plane_header.remove(BAYER_PATTERN_KEY);
            plane_header.insert("CHANNEL", channel.to_ascii_uppercase());

            let path = output_dir.join(format!("{channel}{suffix}")).join(file_name);
            debug!(path = %path.display(), "Writing {} plane", channel);
            self.writer.write_frame(&path, plane, &plane_header)?;
        }
        Ok(())
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PipelineConfig) {
        self.config = config;
    }
}

fn file_name(path: &Path) -> Result<PathBuf> {
    path.file_name().map(PathBuf::from).ok_or_else(|| {
        CalibrationError::InputReadError(format!("{} has no file name", path.display()))
    })
}
