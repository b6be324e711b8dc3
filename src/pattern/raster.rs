//! Raster access at the host boundary
//!
//! The codec never touches a host document type directly. Hosts hand rasters
//! in through [`Raster`] and receive decoded patterns as [`RasterImage`].

use image::RgbaImage;

/// Read access to an RGBA8 raster
pub trait Raster {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Logical `[r, g, b, a]` at `(x, y)`; coordinates are in bounds
    fn pixel(&self, x: u32, y: u32) -> [u8; 4];
}

/// Write access to an RGBA8 raster
pub trait RasterMut: Raster {
    fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]);
}

/// Owned interleaved RGBA8 raster produced by the decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes, row-major RGBA
    pub data: Vec<u8>,
}

impl RasterImage {
    /// Fully transparent raster
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Wrap existing RGBA samples; `None` if the buffer size does not match
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    pub fn rgba(&self) -> &[u8] {
        &self.data
    }

    pub fn into_rgba_image(self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data)
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }
}

impl Raster for RasterImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }
}

impl RasterMut for RasterImage {
    fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&rgba);
    }
}

impl Raster for RgbaImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.get_pixel(x, y).0
    }
}

impl RasterMut for RgbaImage {
    fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        self.put_pixel(x, y, image::Rgba(rgba));
    }
}

/// Physical order of the four samples of an interleaved host pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgba,
    Bgra,
    Argb,
}

impl ChannelOrder {
    /// Physical offsets of logical R, G, B, A within one pixel
    pub fn offsets(&self) -> [usize; 4] {
        match self {
            Self::Rgba => [0, 1, 2, 3],
            Self::Bgra => [2, 1, 0, 3],
            Self::Argb => [1, 2, 3, 0],
        }
    }
}

/// Borrowed view of a host's interleaved 4-byte-per-pixel surface
#[derive(Debug, Clone, Copy)]
pub struct RasterView<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    /// Bytes per row, at least `width * 4`
    stride: usize,
    order: ChannelOrder,
}

impl<'a> RasterView<'a> {
    /// `None` if `data` is too small for the given geometry
    pub fn new(
        data: &'a [u8],
        width: u32,
        height: u32,
        stride: usize,
        order: ChannelOrder,
    ) -> Option<Self> {
        if stride < width as usize * 4 {
            return None;
        }
        let needed = if height == 0 {
            0
        } else {
            stride * (height as usize - 1) + width as usize * 4
        };
        if data.len() < needed {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
            stride,
            order,
        })
    }
}

impl Raster for RasterView<'_> {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let base = y as usize * self.stride + x as usize * 4;
        let [r, g, b, a] = self.order.offsets();
        [
            self.data[base + r],
            self.data[base + g],
            self.data[base + b],
            self.data[base + a],
        ]
    }
}
