//! Pattern types shared by the decoder and encoder

use serde::{Deserialize, Serialize};

/// Photoshop color model stored in every pattern record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorModel {
    Bitmap,
    Grayscale,
    Indexed,
    RGB,
    CMYK,
    Multichannel,
    Duotone,
    Lab,
}

impl ColorModel {
    /// Convert from Photoshop mode number
    pub fn from_ps_mode(mode: u32) -> Option<Self> {
        match mode {
            0 => Some(Self::Bitmap),
            1 => Some(Self::Grayscale),
            2 => Some(Self::Indexed),
            3 => Some(Self::RGB),
            4 => Some(Self::CMYK),
            7 => Some(Self::Multichannel),
            8 => Some(Self::Duotone),
            9 => Some(Self::Lab),
            _ => None,
        }
    }

    /// Photoshop mode number
    pub fn ps_mode(&self) -> u32 {
        match self {
            Self::Bitmap => 0,
            Self::Grayscale => 1,
            Self::Indexed => 2,
            Self::RGB => 3,
            Self::CMYK => 4,
            Self::Multichannel => 7,
            Self::Duotone => 8,
            Self::Lab => 9,
        }
    }

    /// Get display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bitmap => "Bitmap",
            Self::Grayscale => "Grayscale",
            Self::Indexed => "Indexed",
            Self::RGB => "RGB",
            Self::CMYK => "CMYK",
            Self::Multichannel => "Multichannel",
            Self::Duotone => "Duotone",
            Self::Lab => "Lab",
        }
    }

    /// Number of color channels stored before the optional alpha channel.
    ///
    /// `None` for models the codec does not reconstruct.
    pub fn channels(&self) -> Option<usize> {
        match self {
            Self::Grayscale | Self::Indexed => Some(1),
            Self::RGB => Some(3),
            _ => None,
        }
    }

    /// Bytes of reserved data between the color channels and the alpha channel.
    ///
    /// Indexed patterns never carry alpha.
    pub fn alpha_padding(&self) -> Option<u64> {
        match self {
            Self::Grayscale => Some(96),
            Self::RGB => Some(88),
            _ => None,
        }
    }
}

/// Integer rectangle stored as (top, left, bottom, right)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

impl Rect {
    pub fn new(top: i32, left: i32, bottom: i32, right: i32) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    /// Rectangle at `(x, y)` with the given size
    pub fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(y, x, y + height, x + width)
    }

    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }

    /// True when the rectangle covers no pixels
    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}

/// Channel payload compression
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Raw,
    #[default]
    Rle,
}

impl Compression {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Raw),
            1 => Some(Self::Rle),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Self::Raw => 0,
            Self::Rle => 1,
        }
    }
}

/// Pattern resource metadata, as stored by a pattern library
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternResource {
    /// Unique identifier (record tag, or content hash prefix when the tag is empty)
    pub id: String,

    /// Display name
    pub name: String,

    /// Content hash (SHA-256 of the RGBA samples), used for deduplication
    pub content_hash: String,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Color model the pattern was stored with
    pub mode: ColorModel,

    /// Source (.pat path or "memory")
    pub source: String,
}
