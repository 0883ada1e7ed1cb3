//! Frame codec boundary
//!
//! Reading and writing of single-plane frames in the FITS container. The
//! container itself is handled by `fitrs`; this module only maps its HDUs to
//! [`RawFrame`]s and back.

mod fits_reader;
mod fits_writer;
mod reader;
pub mod types;
mod writer;

pub use fits_reader::FitsFrameReader;
pub use fits_writer::FitsFrameWriter;
pub use reader::FrameReader;
pub use types::{FrameHeader, FrameKind, RawFrame, RawSamples};
pub use writer::FrameWriter;
