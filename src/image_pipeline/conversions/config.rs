use crate::image_pipeline::combine::CombineMethod;
use crate::image_pipeline::debayer::BayerPattern;
use crate::image_pipeline::stars::DEFAULT_RELATIVE_PEAK_LIMIT;

/// Frames per parallel batch when building a master frame.
pub const DEFAULT_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub combine_method: CombineMethod,
    /// Frames per rayon batch; 0 combines everything in one pass
    pub batch_size: usize,
    pub relative_peak_limit: f32,
    pub detect_stars: bool,
    /// Run detection on the luminance plane when one exists, otherwise on
    /// the calibrated mosaic
    pub detect_on_luminance: bool,
    pub validate_dimensions: bool,
    pub max_dimension: Option<usize>,
    /// Used when a frame carries no `BAYERPAT` keyword
    pub fallback_pattern: Option<BayerPattern>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            combine_method: CombineMethod::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            relative_peak_limit: DEFAULT_RELATIVE_PEAK_LIMIT,
            detect_stars: true,
            detect_on_luminance: true,
            validate_dimensions: true,
            max_dimension: Some(50000),
            fallback_pattern: None,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct PipelineConfigBuilder {
    combine_method: Option<CombineMethod>,
    batch_size: Option<usize>,
    relative_peak_limit: Option<f32>,
    detect_stars: Option<bool>,
    detect_on_luminance: Option<bool>,
    validate_dimensions: Option<bool>,
    max_dimension: Option<Option<usize>>,
    fallback_pattern: Option<Option<BayerPattern>>,
}

impl PipelineConfigBuilder {
    pub fn combine_method(mut self, method: CombineMethod) -> Self {
        self.combine_method = Some(method);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn relative_peak_limit(mut self, limit: f32) -> Self {
        self.relative_peak_limit = Some(limit);
        self
    }

    pub fn detect_stars(mut self, detect: bool) -> Self {
        self.detect_stars = Some(detect);
        self
    }

    pub fn detect_on_luminance(mut self, on_luminance: bool) -> Self {
        self.detect_on_luminance = Some(on_luminance);
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn max_dimension(mut self, max: Option<usize>) -> Self {
        self.max_dimension = Some(max);
        self
    }

    pub fn fallback_pattern(mut self, pattern: Option<BayerPattern>) -> Self {
        self.fallback_pattern = Some(pattern);
        self
    }

    pub fn build(self) -> PipelineConfig {
        let default = PipelineConfig::default();
        PipelineConfig {
            combine_method: self.combine_method.unwrap_or(default.combine_method),
            batch_size: self.batch_size.unwrap_or(default.batch_size),
            relative_peak_limit: self.relative_peak_limit.unwrap_or(default.relative_peak_limit),
            detect_stars: self.detect_stars.unwrap_or(default.detect_stars),
            detect_on_luminance: self.detect_on_luminance.unwrap_or(default.detect_on_luminance),
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
            max_dimension: self.max_dimension.unwrap_or(default.max_dimension),
            fallback_pattern: self.fallback_pattern.unwrap_or(default.fallback_pattern),
        }
    }
}
