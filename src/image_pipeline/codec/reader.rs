use std::path::Path;

use crate::image_pipeline::codec::types::RawFrame;
use crate::image_pipeline::common::error::Result;

pub trait FrameReader {
    fn read_frame(&self, path: &Path) -> Result<RawFrame>;
}
