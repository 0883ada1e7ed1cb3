use std::path::Path;

use crate::image_pipeline::codec::types::FrameHeader;
use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::grid::PixelGrid;

pub trait FrameWriter {
    fn write_frame(&self, path: &Path, frame: &PixelGrid, header: &FrameHeader) -> Result<()>;
}
