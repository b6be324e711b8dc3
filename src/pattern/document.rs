//! Decoded patterns as a layered document
//!
//! The decoder hands each pattern to a [`PatternSink`]. [`PatternDocument`]
//! is the default sink: one transparent canvas-sized layer per pattern, with
//! the pattern placed at the origin.

use image::RgbaImage;

use super::error::PatError;
use super::pat::ParsedPattern;

/// Host-side consumer of decoded patterns
pub trait PatternSink {
    /// Called once, before any pattern, with the largest pattern extents
    fn begin(&mut self, width: u32, height: u32) -> Result<(), PatError>;

    /// Called once per pattern, in file order
    fn add_pattern(&mut self, pattern: ParsedPattern) -> Result<(), PatError>;
}

/// One pattern placed on the document canvas
#[derive(Debug, Clone)]
pub struct PatternLayer {
    pub name: String,
    pub image: RgbaImage,
}

/// Every pattern of a .pat file on a shared canvas
#[derive(Debug, Clone, Default)]
pub struct PatternDocument {
    pub width: u32,
    pub height: u32,
    pub layers: Vec<PatternLayer>,
}

impl PatternSink for PatternDocument {
    fn begin(&mut self, width: u32, height: u32) -> Result<(), PatError> {
        self.width = width;
        self.height = height;
        self.layers.clear();
        Ok(())
    }

    fn add_pattern(&mut self, pattern: ParsedPattern) -> Result<(), PatError> {
        let mut canvas = RgbaImage::new(self.width, self.height);
        let src = &pattern.image;
        let w = src.width.min(self.width) as usize;
        let h = src.height.min(self.height) as usize;

        let dst_stride = self.width as usize * 4;
        let src_stride = src.width as usize * 4;
        let dst: &mut [u8] = &mut canvas;
        for y in 0..h {
            let d = y * dst_stride;
            let s = y * src_stride;
            dst[d..d + w * 4].copy_from_slice(&src.data[s..s + w * 4]);
        }

        self.layers.push(PatternLayer {
            name: pattern.name,
            image: canvas,
        });
        Ok(())
    }
}
