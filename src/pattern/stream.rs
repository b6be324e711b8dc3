//! Big-endian primitive I/O for the .pat container
//!
//! Every multi-byte value in a pattern file is stored most-significant byte
//! first. [`PatReader`] and [`PatWriter`] wrap any seekable stream and add the
//! string and rectangle encodings used by pattern records. [`LengthScope`]
//! implements the backpatched 32-bit length prefix that wraps pattern payloads
//! and channels.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::ops::{Deref, DerefMut};

use super::error::PatError;
use super::types::Rect;

/// Value written into a length field before its region is closed
pub const LENGTH_PLACEHOLDER: u32 = 0xFEED_FEED;

/// Big-endian reader over a seekable byte stream
pub struct PatReader<R> {
    inner: R,
    len: u64,
}

impl<R: Read + Seek> PatReader<R> {
    /// Wrap a stream. Reading starts at the stream's current position.
    pub fn new(mut inner: R) -> Result<Self, PatError> {
        let start = inner.stream_position()?;
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(start))?;
        Ok(Self { inner, len })
    }

    /// Total length of the underlying stream
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn position(&mut self) -> Result<u64, PatError> {
        Ok(self.inner.stream_position()?)
    }

    /// Move to an absolute position. Positions past the end of data are rejected.
    pub fn set_position(&mut self, pos: u64) -> Result<(), PatError> {
        if pos > self.len {
            return Err(PatError::UnexpectedEof);
        }
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    /// Bytes left between the current position and the end of data
    pub fn remaining(&mut self) -> Result<u64, PatError> {
        Ok(self.len.saturating_sub(self.position()?))
    }

    pub fn skip(&mut self, count: u64) -> Result<(), PatError> {
        let pos = self.position()?;
        let target = pos.checked_add(count).ok_or(PatError::UnexpectedEof)?;
        self.set_position(target)
    }

    pub fn read_u8(&mut self) -> Result<u8, PatError> {
        Ok(self.inner.read_u8()?)
    }

    pub fn read_i8(&mut self) -> Result<i8, PatError> {
        Ok(self.inner.read_i8()?)
    }

    pub fn read_u16(&mut self) -> Result<u16, PatError> {
        Ok(self.inner.read_u16::<BigEndian>()?)
    }

    pub fn read_i16(&mut self) -> Result<i16, PatError> {
        Ok(self.inner.read_i16::<BigEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32, PatError> {
        Ok(self.inner.read_u32::<BigEndian>()?)
    }

    pub fn read_i32(&mut self) -> Result<i32, PatError> {
        Ok(self.inner.read_i32::<BigEndian>()?)
    }

    pub fn read_u64(&mut self) -> Result<u64, PatError> {
        Ok(self.inner.read_u64::<BigEndian>()?)
    }

    pub fn read_i64(&mut self) -> Result<i64, PatError> {
        Ok(self.inner.read_i64::<BigEndian>()?)
    }

    pub fn read_f32(&mut self) -> Result<f32, PatError> {
        Ok(self.inner.read_f32::<BigEndian>()?)
    }

    pub fn read_f64(&mut self) -> Result<f64, PatError> {
        Ok(self.inner.read_f64::<BigEndian>()?)
    }

    /// Fill `buf` completely, looping over short reads
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<(), PatError> {
        self.inner.read_exact(buf)?;
        Ok(())
    }

    /// Read exactly `count` bytes.
    ///
    /// The count is checked against the remaining data before allocating.
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, PatError> {
        if count as u64 > self.remaining()? {
            return Err(PatError::UnexpectedEof);
        }
        let mut buf = vec![0u8; count];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// One length byte followed by that many ASCII bytes
    pub fn read_pascal_string(&mut self) -> Result<String, PatError> {
        let len = self.read_u8()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// 32-bit code unit count followed by UTF-16BE code units.
    ///
    /// Trailing NUL code units are stripped.
    pub fn read_unicode_string(&mut self) -> Result<String, PatError> {
        let count = self.read_u32()? as u64;
        if count * 2 > self.remaining()? {
            return Err(PatError::UnexpectedEof);
        }

        let mut units = Vec::with_capacity(count as usize);
        for _ in 0..count {
            units.push(self.read_u16()?);
        }
        while units.last() == Some(&0) {
            units.pop();
        }

        String::from_utf16(&units).map_err(|e| PatError::StringDecode(e.to_string()))
    }

    /// Four signed 32-bit values: top, left, bottom, right
    pub fn read_rect(&mut self) -> Result<Rect, PatError> {
        let top = self.read_i32()?;
        let left = self.read_i32()?;
        let bottom = self.read_i32()?;
        let right = self.read_i32()?;
        Ok(Rect::new(top, left, bottom, right))
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for PatReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Big-endian writer over a seekable byte sink
pub struct PatWriter<W> {
    inner: W,
}

impl<W: Write + Seek> PatWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn position(&mut self) -> Result<u64, PatError> {
        Ok(self.inner.stream_position()?)
    }

    /// Move to an absolute position, backward or forward
    pub fn set_position(&mut self, pos: u64) -> Result<(), PatError> {
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    pub fn write_u8(&mut self, v: u8) -> Result<(), PatError> {
        Ok(self.inner.write_u8(v)?)
    }

    pub fn write_i8(&mut self, v: i8) -> Result<(), PatError> {
        Ok(self.inner.write_i8(v)?)
    }

    pub fn write_u16(&mut self, v: u16) -> Result<(), PatError> {
        Ok(self.inner.write_u16::<BigEndian>(v)?)
    }

    pub fn write_i16(&mut self, v: i16) -> Result<(), PatError> {
        Ok(self.inner.write_i16::<BigEndian>(v)?)
    }

    pub fn write_u32(&mut self, v: u32) -> Result<(), PatError> {
        Ok(self.inner.write_u32::<BigEndian>(v)?)
    }

    pub fn write_i32(&mut self, v: i32) -> Result<(), PatError> {
        Ok(self.inner.write_i32::<BigEndian>(v)?)
    }

    pub fn write_u64(&mut self, v: u64) -> Result<(), PatError> {
        Ok(self.inner.write_u64::<BigEndian>(v)?)
    }

    pub fn write_i64(&mut self, v: i64) -> Result<(), PatError> {
        Ok(self.inner.write_i64::<BigEndian>(v)?)
    }

    pub fn write_f32(&mut self, v: f32) -> Result<(), PatError> {
        Ok(self.inner.write_f32::<BigEndian>(v)?)
    }

    pub fn write_f64(&mut self, v: f64) -> Result<(), PatError> {
        Ok(self.inner.write_f64::<BigEndian>(v)?)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), PatError> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    /// Length byte plus ASCII bytes, truncated to 255 bytes
    pub fn write_pascal_string(&mut self, s: &str) -> Result<(), PatError> {
        let bytes = s.as_bytes();
        let len = bytes.len().min(255);
        self.write_u8(len as u8)?;
        self.write_bytes(&bytes[..len])
    }

    /// Code unit count, UTF-16BE code units, then one NUL terminator.
    ///
    /// The stored count includes the terminator.
    pub fn write_unicode_string(&mut self, s: &str) -> Result<(), PatError> {
        let units: Vec<u16> = s.encode_utf16().collect();
        let count = u32::try_from(units.len() + 1)
            .map_err(|_| PatError::InvalidFile(format!("String too long: {} units", units.len())))?;
        self.write_u32(count)?;
        for unit in units {
            self.write_u16(unit)?;
        }
        self.write_u16(0)
    }

    pub fn write_rect(&mut self, rect: &Rect) -> Result<(), PatError> {
        self.write_i32(rect.top)?;
        self.write_i32(rect.left)?;
        self.write_i32(rect.bottom)?;
        self.write_i32(rect.right)
    }

    /// Open a region prefixed by a 32-bit length that is filled in when the
    /// returned scope is finished or dropped.
    pub fn begin_length(&mut self) -> Result<LengthScope<'_, W>, PatError> {
        let placeholder = self.position()?;
        self.write_u32(LENGTH_PLACEHOLDER)?;
        let start = self.position()?;
        Ok(LengthScope {
            writer: self,
            placeholder,
            start,
            closed: false,
        })
    }

    pub fn flush(&mut self) -> Result<(), PatError> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for PatWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A length-prefixed output region.
///
/// The length is patched exactly once: by [`LengthScope::finish`], or on drop
/// when the scope is abandoned by an early return.
pub struct LengthScope<'a, W: Write + Seek> {
    writer: &'a mut PatWriter<W>,
    placeholder: u64,
    start: u64,
    closed: bool,
}

impl<W: Write + Seek> LengthScope<'_, W> {
    /// Close the region and return the patched length
    pub fn finish(mut self) -> Result<u32, PatError> {
        self.close()
    }

    fn close(&mut self) -> Result<u32, PatError> {
        self.closed = true;

        let end = self.writer.position()?;
        let length = u32::try_from(end.saturating_sub(self.start))
            .map_err(|_| PatError::InvalidFile("Region exceeds 4 GiB".into()))?;

        self.writer.set_position(self.placeholder)?;
        self.writer.write_u32(length)?;
        self.writer.set_position(end)?;
        Ok(length)
    }
}

impl<W: Write + Seek> Deref for LengthScope<'_, W> {
    type Target = PatWriter<W>;

    fn deref(&self) -> &Self::Target {
        self.writer
    }
}

impl<W: Write + Seek> DerefMut for LengthScope<'_, W> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.writer
    }
}

impl<W: Write + Seek> Drop for LengthScope<'_, W> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                tracing::warn!("Failed to patch region length: {}", e);
            }
        }
    }
}
