//! PackBits RLE compression/decompression
//!
//! Pattern channels are compressed one row at a time. Control bytes:
//! - N < 128: next N+1 bytes are literal (copy as-is)
//! - N > 128: repeat next byte (257 - N) times
//! - N = 128: no operation, consumes nothing else
//!
//! Packets hold at most 128 bytes and never cross a row boundary.

use std::io::{self, Read, Write};

use super::error::PatError;

/// Longest run a single packet can describe
pub const MAX_PACKET_LEN: usize = 128;

/// Decode one row of `dst.len()` bytes from `src`
pub fn decode_row<R: Read>(src: &mut R, dst: &mut [u8]) -> Result<(), PatError> {
    let mut pos = 0;
    let mut control = [0u8; 1];

    while pos < dst.len() {
        src.read_exact(&mut control)?;
        let b = control[0];

        match b {
            0..=127 => {
                let count = b as usize + 1;
                if pos + count > dst.len() {
                    return Err(overrun(pos + count, dst.len()));
                }
                src.read_exact(&mut dst[pos..pos + count])?;
                pos += count;
            }
            128 => {}
            _ => {
                let count = 257 - b as usize;
                if pos + count > dst.len() {
                    return Err(overrun(pos + count, dst.len()));
                }
                src.read_exact(&mut control)?;
                dst[pos..pos + count].fill(control[0]);
                pos += count;
            }
        }
    }

    Ok(())
}

fn overrun(needed: usize, row_len: usize) -> PatError {
    PatError::InvalidFile(format!(
        "RLE packet overruns row: {} bytes into a {}-byte row",
        needed, row_len
    ))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Packet {
    Empty,
    /// One byte seen, kind not decided yet
    Pending,
    Literal,
    Replicated,
}

/// Encode one row and return the number of bytes written
pub fn encode_row<W: Write>(dst: &mut W, row: &[u8]) -> io::Result<usize> {
    let mut written = 0;
    let mut state = Packet::Empty;
    let mut start = 0;
    let mut len = 0;

    for (i, &byte) in row.iter().enumerate() {
        match state {
            Packet::Empty => {
                start = i;
                len = 1;
                state = Packet::Pending;
            }
            Packet::Pending => {
                len = 2;
                state = if byte == row[start] {
                    Packet::Replicated
                } else {
                    Packet::Literal
                };
            }
            Packet::Replicated => {
                if byte == row[start] {
                    len += 1;
                } else {
                    written += write_replicated(dst, row[start], len)?;
                    start = i;
                    len = 1;
                    state = Packet::Pending;
                }
            }
            Packet::Literal => {
                if byte != row[i - 1] {
                    len += 1;
                } else {
                    // The repeated byte moves into a new replicated packet
                    written += write_literal(dst, &row[start..start + len - 1])?;
                    start = i - 1;
                    len = 2;
                    state = Packet::Replicated;
                }
            }
        }

        if len == MAX_PACKET_LEN {
            written += flush(dst, state, row, start, len)?;
            state = Packet::Empty;
            len = 0;
        }
    }

    written += flush(dst, state, row, start, len)?;
    Ok(written)
}

fn flush<W: Write>(
    dst: &mut W,
    state: Packet,
    row: &[u8],
    start: usize,
    len: usize,
) -> io::Result<usize> {
    match state {
        Packet::Empty => Ok(0),
        Packet::Replicated => write_replicated(dst, row[start], len),
        Packet::Pending | Packet::Literal => write_literal(dst, &row[start..start + len]),
    }
}

fn write_replicated<W: Write>(dst: &mut W, value: u8, len: usize) -> io::Result<usize> {
    // -(len - 1) as a signed control byte
    let control = (1 - len as i16) as i8 as u8;
    dst.write_all(&[control, value])?;
    Ok(2)
}

fn write_literal<W: Write>(dst: &mut W, bytes: &[u8]) -> io::Result<usize> {
    dst.write_all(&[(bytes.len() - 1) as u8])?;
    dst.write_all(bytes)?;
    Ok(bytes.len() + 1)
}

/// Encode a row into a fresh buffer
pub fn packbits_encode(row: &[u8]) -> Result<Vec<u8>, PatError> {
    let mut out = Vec::with_capacity(row.len() + row.len() / 128 + 1);
    encode_row(&mut out, row)?;
    Ok(out)
}

/// Decode a buffer holding exactly one row of `expected_len` bytes
pub fn packbits_decode(input: &[u8], expected_len: usize) -> Result<Vec<u8>, PatError> {
    let mut out = vec![0u8; expected_len];
    let mut src = input;
    decode_row(&mut src, &mut out)?;
    Ok(out)
}
