//! Color-model reconstruction
//!
//! Decode: turn the planes of one pattern record into an RGBA raster.
//! Encode: scan a host raster for its visible area and split it into planes.

use super::channel::Channel;
use super::error::PatError;
use super::raster::{Raster, RasterImage};
use super::types::{ColorModel, Rect};

/// Palette size for Indexed patterns: 256 RGB triples
pub const PALETTE_SIZE: usize = 768;

/// Build the RGBA raster for a record.
///
/// `channels` holds the model's color planes in file order. Without an
/// `alpha` plane every pixel is fully opaque.
pub fn reconstruct(
    model: ColorModel,
    width: u32,
    height: u32,
    channels: &[Channel],
    alpha: Option<&Channel>,
    palette: Option<&[u8]>,
) -> Result<RasterImage, PatError> {
    let expected = model.channels().ok_or_else(|| {
        PatError::InvalidFile(format!("Cannot reconstruct {} patterns", model.name()))
    })?;
    if channels.len() != expected {
        return Err(PatError::InvalidFile(format!(
            "{} pattern needs {} channels, got {}",
            model.name(),
            expected,
            channels.len()
        )));
    }

    let pixels = width as usize * height as usize;
    for channel in channels.iter().chain(alpha) {
        if channel.width() * channel.height() != pixels {
            return Err(PatError::InvalidFile(format!(
                "Channel bounds {:?} do not match pattern size {}x{}",
                channel.bounds, width, height
            )));
        }
    }

    let mut rgba = vec![0u8; pixels * 4];

    match model {
        ColorModel::Grayscale => {
            let gray = &channels[0];
            for (i, px) in rgba.chunks_exact_mut(4).enumerate() {
                let v = gray.sample(i);
                px[..3].fill(v);
            }
        }
        ColorModel::Indexed => {
            let palette = palette
                .filter(|p| p.len() >= PALETTE_SIZE)
                .ok_or_else(|| PatError::InvalidFile("Indexed pattern without palette".into()))?;
            let index = &channels[0];
            for (i, px) in rgba.chunks_exact_mut(4).enumerate() {
                let entry = index.index_byte(i) as usize * 3;
                px[..3].copy_from_slice(&palette[entry..entry + 3]);
            }
        }
        ColorModel::RGB => {
            for (i, px) in rgba.chunks_exact_mut(4).enumerate() {
                px[0] = channels[0].sample(i);
                px[1] = channels[1].sample(i);
                px[2] = channels[2].sample(i);
            }
        }
        other => {
            return Err(PatError::InvalidFile(format!(
                "Cannot reconstruct {} patterns",
                other.name()
            )))
        }
    }

    match alpha {
        Some(alpha) => {
            for (i, px) in rgba.chunks_exact_mut(4).enumerate() {
                px[3] = alpha.sample(i);
            }
        }
        None => {
            for px in rgba.chunks_exact_mut(4) {
                px[3] = 255;
            }
        }
    }

    Ok(RasterImage {
        width,
        height,
        data: rgba,
    })
}

/// Logical plane of an RGBA raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    Red,
    Green,
    Blue,
    Alpha,
}

impl Plane {
    fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
            Self::Alpha => 3,
        }
    }
}

/// Smallest rectangle enclosing every pixel with alpha > 0.
///
/// `None` when the raster has no visible pixel.
pub fn visible_bounds<R: Raster + ?Sized>(raster: &R) -> Option<Rect> {
    let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
    let (mut max_x, mut max_y) = (0u32, 0u32);
    let mut found = false;

    for y in 0..raster.height() {
        for x in 0..raster.width() {
            if raster.pixel(x, y)[3] > 0 {
                found = true;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
    }

    found.then(|| Rect::new(min_y as i32, min_x as i32, max_y as i32 + 1, max_x as i32 + 1))
}

fn pixels_in<'a, R: Raster + ?Sized + 'a>(
    raster: &'a R,
    bounds: &Rect,
) -> impl Iterator<Item = [u8; 4]> + 'a {
    let (top, left) = (bounds.top.max(0) as u32, bounds.left.max(0) as u32);
    let (bottom, right) = (bounds.bottom.max(0) as u32, bounds.right.max(0) as u32);
    (top..bottom).flat_map(move |y| (left..right).map(move |x| raster.pixel(x, y)))
}

/// True when every visible pixel inside `bounds` has R == G == B
pub fn is_grayscale<R: Raster + ?Sized>(raster: &R, bounds: &Rect) -> bool {
    pixels_in(raster, bounds)
        .filter(|p| p[3] > 0)
        .all(|p| p[0] == p[1] && p[1] == p[2])
}

/// True when any pixel inside `bounds` is not fully opaque
pub fn has_transparency<R: Raster + ?Sized>(raster: &R, bounds: &Rect) -> bool {
    pixels_in(raster, bounds).any(|p| p[3] < 255)
}

/// Copy one logical plane of the area inside `bounds`, row-major
pub fn extract_plane<R: Raster + ?Sized>(raster: &R, bounds: &Rect, plane: Plane) -> Vec<u8> {
    let i = plane.index();
    pixels_in(raster, bounds).map(|p| p[i]).collect()
}

/// Color planes to store for `model`, in file order
pub fn planes_for(model: ColorModel) -> &'static [Plane] {
    match model {
        ColorModel::Grayscale => &[Plane::Red],
        _ => &[Plane::Red, Plane::Green, Plane::Blue],
    }
}
