//! Sutu pattern codec - Photoshop .pat files
//!
//! Reads pattern files into RGBA rasters and writes host rasters back out as
//! patterns, for the pattern library and texture brushes.

pub mod pattern;

pub use pattern::{
    decode_pat, load_pat_file, parse_pat_data, parse_pat_file, save_pat_file, write_pat,
    ColorModel, Compression, EncodeOptions, NamedRaster, ParsedPattern, PatError,
    PatternDocument, PatternResource, PatternSink, Raster, RasterImage, RasterMut, Rect,
};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the default log subscriber. Safe to call more than once.
pub fn init_logging() {
    // Setup logging
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sutu_pat=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
