//! Photoshop pattern (.pat) codec
//!
//! Decodes pattern files into RGBA rasters and encodes host rasters back into
//! pattern files:
//! - Big-endian stream primitives with backpatched length regions
//! - PackBits row compression
//! - Channel planes, 8- and 16-bit
//! - Grayscale, Indexed and RGB reconstruction with optional alpha

pub mod channel;
pub mod color;
pub mod compression;
pub mod depth;
pub mod document;
pub mod error;
pub mod pat;
pub mod raster;
pub mod stream;
pub mod types;
pub mod writer;

pub use document::{PatternDocument, PatternLayer, PatternSink};
pub use error::PatError;
pub use pat::{decode_pat, load_pat_file, parse_pat_data, parse_pat_file, read_patterns, ParsedPattern};
pub use raster::{ChannelOrder, Raster, RasterImage, RasterMut, RasterView};
pub use types::{ColorModel, Compression, PatternResource, Rect};
pub use writer::{save_pat_file, write_pat, EncodeOptions, NamedRaster};
