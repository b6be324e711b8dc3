//! Channel (image plane) codec
//!
//! Each channel starts with a 31-byte header:
//! enabled(4) · length(4) · depth echo(4) · bounds(16) · depth(2) · compression(1)
//!
//! The length field counts every byte after itself. RLE channels carry a
//! table of per-row byte counts ahead of the packed rows.

use std::io::{Read, Seek, Write};

use super::compression::{decode_row, encode_row};
use super::depth::sample_16_to_8;
use super::error::PatError;
use super::stream::{PatReader, PatWriter};
use super::types::{Compression, Rect};

/// Size of the channel header, including the enabled flag and length field
pub const CHANNEL_HEADER_SIZE: u64 = 31;

/// Depth echo written on encode; decoders ignore it
const DEPTH_ECHO: u32 = 8;

/// A decoded image plane
#[derive(Debug, Clone)]
pub struct Channel {
    pub enabled: bool,
    /// Declared payload length (bytes after the length field)
    pub size: u32,
    /// Bits per sample, 8 or 16
    pub depth: u16,
    pub bounds: Rect,
    pub compression: Compression,
    /// Row-major samples, `stride() * height()` bytes
    pub data: Vec<u8>,
}

impl Channel {
    pub fn width(&self) -> usize {
        self.bounds.width().max(0) as usize
    }

    pub fn height(&self) -> usize {
        self.bounds.height().max(0) as usize
    }

    pub fn bytes_per_sample(&self) -> usize {
        if self.depth == 16 {
            2
        } else {
            1
        }
    }

    pub fn stride(&self) -> usize {
        self.width() * self.bytes_per_sample()
    }

    /// 8-bit value of sample `index`, reducing 16-bit samples
    #[inline]
    pub fn sample(&self, index: usize) -> u8 {
        if self.depth == 16 {
            let hi = self.data[index * 2];
            let lo = self.data[index * 2 + 1];
            sample_16_to_8(u16::from_be_bytes([hi, lo]))
        } else {
            self.data[index]
        }
    }

    /// Raw byte at sample `index`, ignoring depth. Used for palette indices.
    #[inline]
    pub fn index_byte(&self, index: usize) -> u8 {
        self.data[index]
    }
}

/// Enabled flag and length of a channel, read without consuming its body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelHeader {
    pub enabled: bool,
    pub size: u32,
}

impl ChannelHeader {
    /// A probed channel is usable only when enabled and non-empty
    pub fn is_present(&self) -> bool {
        self.enabled && self.size > 0
    }
}

/// Read the enabled flag and length, then restore the position
pub fn peek_channel_header<R: Read + Seek>(
    r: &mut PatReader<R>,
) -> Result<ChannelHeader, PatError> {
    let start = r.position()?;
    let enabled = r.read_u32()? != 0;
    let size = r.read_u32()?;
    r.set_position(start)?;
    Ok(ChannelHeader { enabled, size })
}

/// Read one channel
pub fn read_channel<R: Read + Seek>(r: &mut PatReader<R>) -> Result<Channel, PatError> {
    let enabled = r.read_u32()? != 0;
    let size = r.read_u32()?;
    let _depth_echo = r.read_u32()?;
    let bounds = r.read_rect()?;
    let depth = r.read_u16()?;
    let compression_byte = r.read_u8()?;

    if depth != 8 && depth != 16 {
        return Err(PatError::UnsupportedDepth(depth));
    }
    let compression = Compression::from_byte(compression_byte).ok_or_else(|| {
        PatError::InvalidFile(format!("Unknown compression mode: {}", compression_byte))
    })?;

    let mut channel = Channel {
        enabled,
        size,
        depth,
        bounds,
        compression,
        data: Vec::new(),
    };

    let stride = channel.stride();
    let height = channel.height();
    let total = stride
        .checked_mul(height)
        .ok_or_else(|| PatError::InvalidFile(format!("Channel too large: {:?}", bounds)))?;

    tracing::trace!(
        "Channel: {}x{} depth={} {:?} size={}",
        channel.width(),
        height,
        depth,
        compression,
        size
    );

    channel.data = match compression {
        Compression::Raw => r.read_bytes(total)?,
        Compression::Rle => {
            // Each 2-byte packet expands to at most 128 bytes
            let remaining = r.remaining()?;
            if total as u64 > remaining.saturating_mul(64) {
                return Err(PatError::UnexpectedEof);
            }

            // Packets are self-delimiting; the row byte counts are not needed
            r.skip(height as u64 * 2)?;

            let mut data = vec![0u8; total];
            if stride > 0 {
                for row in data.chunks_exact_mut(stride) {
                    decode_row(r, row)?;
                }
            }
            data
        }
    };

    Ok(channel)
}

/// Write one 8-bit channel covering `bounds`
pub fn write_channel<W: Write + Seek>(
    w: &mut PatWriter<W>,
    bounds: &Rect,
    plane: &[u8],
    compression: Compression,
) -> Result<(), PatError> {
    let width = bounds.width().max(0) as usize;
    let height = bounds.height().max(0) as usize;
    if plane.len() != width * height {
        return Err(PatError::InvalidFile(format!(
            "Plane holds {} bytes, expected {}x{}",
            plane.len(),
            width,
            height
        )));
    }

    w.write_u32(1)?;
    let mut scope = w.begin_length()?;
    scope.write_u32(DEPTH_ECHO)?;
    scope.write_rect(bounds)?;
    scope.write_u16(8)?;
    scope.write_u8(compression.to_byte())?;

    match compression {
        Compression::Raw => scope.write_bytes(plane)?,
        Compression::Rle => {
            let table_pos = scope.position()?;
            for _ in 0..height {
                scope.write_i16(0)?;
            }

            let mut row_counts = Vec::with_capacity(height);
            if width > 0 {
                for row in plane.chunks_exact(width) {
                    let count = encode_row(&mut *scope, row)?;
                    let count = i16::try_from(count).map_err(|_| {
                        PatError::InvalidFile(format!("RLE row too long: {} bytes", count))
                    })?;
                    row_counts.push(count);
                }
            }

            let end = scope.position()?;
            scope.set_position(table_pos)?;
            for count in row_counts {
                scope.write_i16(count)?;
            }
            scope.set_position(end)?;
        }
    }

    scope.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(bounds: Rect, plane: &[u8], compression: Compression) -> Vec<u8> {
        let mut w = PatWriter::new(Cursor::new(Vec::new()));
        write_channel(&mut w, &bounds, plane, compression).unwrap();
        w.into_inner().into_inner()
    }

    fn decode(bytes: Vec<u8>) -> Result<Channel, PatError> {
        let mut r = PatReader::new(Cursor::new(bytes)).unwrap();
        read_channel(&mut r)
    }

    #[test]
    fn test_raw_layout() {
        let bounds = Rect::new(0, 0, 2, 2);
        let bytes = encode(bounds, &[1, 2, 3, 4], Compression::Raw);

        assert_eq!(bytes.len(), CHANNEL_HEADER_SIZE as usize + 4);
        assert_eq!(&bytes[0..4], &[0, 0, 0, 1]);
        // Length counts everything after itself
        assert_eq!(&bytes[4..8], &[0, 0, 0, 27]);
        assert_eq!(&bytes[8..12], &[0, 0, 0, 8]);
        assert_eq!(&bytes[28..30], &[0, 8]);
        assert_eq!(bytes[30], 0);
        assert_eq!(&bytes[31..], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_rle_row_table_is_backpatched() {
        let bounds = Rect::new(0, 0, 2, 4);
        let plane = [7, 7, 7, 7, 1, 2, 3, 4];
        let bytes = encode(bounds, &plane, Compression::Rle);

        // Row 0: [0xFD, 7] = 2 bytes; row 1: literal of 4 = 5 bytes
        assert_eq!(&bytes[31..35], &[0, 2, 0, 5]);
        assert_eq!(&bytes[35..37], &[0xFD, 7]);
        let size = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        assert_eq!(size, bytes.len() - 8);
    }

    #[test]
    fn test_roundtrip_raw_and_rle() {
        let bounds = Rect::new(10, 20, 13, 24);
        let plane: Vec<u8> = (0..12).map(|i| (i / 3) as u8).collect();

        for compression in [Compression::Raw, Compression::Rle] {
            let channel = decode(encode(bounds, &plane, compression)).unwrap();
            assert!(channel.enabled);
            assert_eq!(channel.depth, 8);
            assert_eq!(channel.bounds, bounds);
            assert_eq!(channel.compression, compression);
            assert_eq!(channel.data, plane);
        }
    }

    #[test]
    fn test_rejects_bad_depth() {
        let mut bytes = encode(Rect::new(0, 0, 1, 1), &[5], Compression::Raw);
        bytes[29] = 12;
        assert!(matches!(decode(bytes), Err(PatError::UnsupportedDepth(12))));
    }

    #[test]
    fn test_sixteen_bit_samples() {
        let mut w = PatWriter::new(Cursor::new(Vec::new()));
        w.write_u32(1).unwrap();
        w.write_u32(27).unwrap();
        w.write_u32(16).unwrap();
        w.write_rect(&Rect::new(0, 0, 1, 2)).unwrap();
        w.write_u16(16).unwrap();
        w.write_u8(0).unwrap();
        w.write_u16(32768).unwrap();
        w.write_u16(0).unwrap();

        let channel = decode(w.into_inner().into_inner()).unwrap();
        assert_eq!(channel.stride(), 4);
        assert_eq!(channel.sample(0), 255);
        assert_eq!(channel.sample(1), 0);
    }

    #[test]
    fn test_truncated_body() {
        let mut bytes = encode(Rect::new(0, 0, 2, 2), &[1, 2, 3, 4], Compression::Raw);
        bytes.truncate(bytes.len() - 1);
        assert!(matches!(decode(bytes), Err(PatError::UnexpectedEof)));
    }

    #[test]
    fn test_peek_restores_position() {
        let bytes = encode(Rect::new(0, 0, 1, 1), &[5], Compression::Raw);
        let mut r = PatReader::new(Cursor::new(bytes)).unwrap();
        let header = peek_channel_header(&mut r).unwrap();
        assert!(header.is_present());
        assert_eq!(r.position().unwrap(), 0);
    }

    #[test]
    fn test_rle_row_counts_fit_signed_table() {
        // No repeated neighbours: every 128 bytes cost 129
        let fits: Vec<u8> = (0..32_000u32).map(|i| i as u8).collect();
        let bounds = Rect::new(0, 0, 1, fits.len() as i32);
        let bytes = encode(bounds, &fits, Compression::Rle);
        let count = i16::from_be_bytes([bytes[31], bytes[32]]);
        assert_eq!(count, 32_250);

        let too_long: Vec<u8> = (0..33_000u32).map(|i| i as u8).collect();
        let bounds = Rect::new(0, 0, 1, too_long.len() as i32);
        let mut w = PatWriter::new(Cursor::new(Vec::new()));
        assert!(matches!(
            write_channel(&mut w, &bounds, &too_long, Compression::Rle),
            Err(PatError::InvalidFile(_))
        ));
    }
}
