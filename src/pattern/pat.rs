//! .pat file decoder
//!
//! Layout (big-endian):
//! - "8BPT" signature, u16 version (1), u32 pattern count
//! - per pattern: u32 version (1), u32 color model, u16 height, u16 width,
//!   UTF-16 name, Pascal tag, [Indexed: 768-byte palette + 4 bytes],
//!   u32 sub-version (3), u32 payload size, payload
//! - payload: bounds, u32 reserved, color channels, optional padding + alpha
//!   channel, slack

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use super::channel::{peek_channel_header, read_channel, Channel, CHANNEL_HEADER_SIZE};
use super::color::{reconstruct, PALETTE_SIZE};
use super::document::{PatternDocument, PatternSink};
use super::error::PatError;
use super::raster::RasterImage;
use super::stream::PatReader;
use super::types::{ColorModel, PatternResource, Rect};

/// File signature
pub const PAT_SIGNATURE: &[u8; 4] = b"8BPT";
/// File version
pub const PAT_VERSION: u16 = 1;
/// Version stored at the start of every pattern record
pub const RECORD_VERSION: u32 = 1;
/// Version stored ahead of every pattern payload
pub const RECORD_SUB_VERSION: u32 = 3;
/// Reserved bytes following the Indexed palette
const PALETTE_TRAILER: u64 = 4;

/// Decoded pattern with its RGBA raster
#[derive(Debug, Clone)]
pub struct ParsedPattern {
    /// Pattern name, or "Pattern N" when the file stores none
    pub name: String,
    /// Opaque record tag
    pub tag: String,
    /// Color model the pattern was stored with
    pub mode: ColorModel,
    /// Size declared in the record header; informational only
    pub display_width: u16,
    pub display_height: u16,
    /// Pattern bounds from the payload
    pub bounds: Rect,
    /// Decoded RGBA raster, `bounds` sized
    pub image: RasterImage,
}

impl ParsedPattern {
    pub fn width(&self) -> u32 {
        self.image.width
    }

    pub fn height(&self) -> u32 {
        self.image.height
    }

    /// Get raw RGBA data
    pub fn rgba(&self) -> &[u8] {
        &self.image.data
    }

    /// Convert to PatternResource with content hash
    pub fn into_resource(self, source: &str) -> PatternResource {
        let mut hasher = Sha256::new();
        hasher.update(&self.image.data);
        let content_hash = hex::encode(hasher.finalize());

        // Use content hash as ID if the record carries no tag
        let id = if self.tag.is_empty() {
            content_hash[..16].to_string()
        } else {
            self.tag
        };

        PatternResource {
            id,
            name: self.name,
            content_hash,
            width: self.image.width,
            height: self.image.height,
            mode: self.mode,
            source: source.to_string(),
        }
    }
}

/// Parse a .pat file and return all patterns
pub fn parse_pat_file(path: &Path) -> Result<Vec<ParsedPattern>, PatError> {
    tracing::info!("Loading PAT file: {:?}", path);
    let file = File::open(path)?;
    read_patterns(BufReader::new(file))
}

/// Parse .pat data from bytes
pub fn parse_pat_data(data: &[u8]) -> Result<Vec<ParsedPattern>, PatError> {
    read_patterns(Cursor::new(data))
}

/// Load a .pat file into a layered document
pub fn load_pat_file(path: &Path) -> Result<PatternDocument, PatError> {
    let mut doc = PatternDocument::default();
    let file = File::open(path)?;
    decode_pat(BufReader::new(file), &mut doc)?;
    Ok(doc)
}

/// Decode every pattern and hand them to `sink` on a canvas sized to the
/// largest pattern. Returns the number of patterns delivered.
pub fn decode_pat<R: Read + Seek, S: PatternSink + ?Sized>(
    reader: R,
    sink: &mut S,
) -> Result<usize, PatError> {
    let patterns = read_patterns(reader)?;

    let width = patterns.iter().map(|p| p.width()).max().unwrap_or(0);
    let height = patterns.iter().map(|p| p.height()).max().unwrap_or(0);
    tracing::debug!("PAT canvas: {}x{}", width, height);

    sink.begin(width, height)?;
    let count = patterns.len();
    for pattern in patterns {
        sink.add_pattern(pattern)?;
    }
    Ok(count)
}

/// Decode every usable pattern from a stream.
///
/// Records with empty bounds, empty payloads, or unsupported color models are
/// skipped. Fails with [`PatError::NoPatterns`] when nothing usable remains.
pub fn read_patterns<R: Read + Seek>(reader: R) -> Result<Vec<ParsedPattern>, PatError> {
    let mut r = PatReader::new(reader)?;

    let mut signature = [0u8; 4];
    r.read_into(&mut signature)?;
    if &signature != PAT_SIGNATURE {
        return Err(PatError::InvalidSignature(signature));
    }

    let version = r.read_u16()?;
    if version != PAT_VERSION {
        return Err(PatError::UnsupportedVersion(version));
    }

    let count = r.read_u32()?;
    tracing::debug!("PAT file: version={}, count={}", version, count);

    let mut patterns = Vec::new();
    for i in 0..count {
        if let Some(pattern) = read_record(&mut r, i)? {
            tracing::debug!(
                "Parsed pattern {}/{}: '{}' ({}x{}, {})",
                i + 1,
                count,
                pattern.name,
                pattern.width(),
                pattern.height(),
                pattern.mode.name()
            );
            patterns.push(pattern);
        }
    }

    if patterns.is_empty() {
        return Err(PatError::NoPatterns);
    }

    tracing::info!("Parsed {} patterns from .pat file", patterns.len());
    Ok(patterns)
}

/// Read one record. `Ok(None)` means the record was skipped.
fn read_record<R: Read + Seek>(
    r: &mut PatReader<R>,
    index: u32,
) -> Result<Option<ParsedPattern>, PatError> {
    let version = r.read_u32()?;
    if version != RECORD_VERSION {
        tracing::warn!("Pattern {}: unexpected record version {}", index + 1, version);
    }

    let mode_num = r.read_u32()?;
    let display_height = r.read_u16()?;
    let display_width = r.read_u16()?;
    let mut name = r.read_unicode_string()?;
    let tag = r.read_pascal_string()?;
    let mode = ColorModel::from_ps_mode(mode_num);

    let palette = if mode == Some(ColorModel::Indexed) {
        let palette = r.read_bytes(PALETTE_SIZE)?;
        r.skip(PALETTE_TRAILER)?;
        Some(palette)
    } else {
        None
    };

    let sub_version = r.read_u32()?;
    if sub_version != RECORD_SUB_VERSION {
        return Err(PatError::UnsupportedSubVersion(sub_version));
    }

    let payload_size = r.read_u32()? as u64;
    if name.is_empty() {
        name = format!("Pattern {}", index + 1);
    }

    if payload_size == 0 {
        tracing::debug!("Pattern '{}' has no pixel data, skipping", name);
        return Ok(None);
    }

    let next_offset = r.position()? + payload_size;
    if next_offset > r.len() {
        return Err(PatError::UnexpectedEof);
    }

    let mode = match mode.filter(|m| m.channels().is_some()) {
        Some(mode) => mode,
        None => {
            tracing::warn!(
                "Pattern '{}': unsupported color mode {}, skipping {} bytes",
                name,
                mode.map(|m| m.name()).unwrap_or("Unknown"),
                payload_size
            );
            r.skip(payload_size)?;
            return Ok(None);
        }
    };

    let bounds = r.read_rect()?;
    let _reserved = r.read_u32()?;
    if r.position()? > next_offset {
        return Err(PatError::InvalidFile(format!(
            "Pattern '{}': payload of {} bytes is too short",
            name, payload_size
        )));
    }

    if bounds.is_empty() {
        tracing::warn!("Pattern '{}': empty bounds {:?}, skipping", name, bounds);
        r.set_position(next_offset)?;
        return Ok(None);
    }

    let n_channels = mode.channels().unwrap_or(1);
    let mut channels = Vec::with_capacity(n_channels);
    for _ in 0..n_channels {
        channels.push(read_channel(r)?);
    }
    let color_end = r.position()?;
    if color_end > next_offset {
        return Err(PatError::InvalidFile(format!(
            "Pattern '{}': channels overrun payload by {} bytes",
            name,
            color_end - next_offset
        )));
    }

    let alpha = match mode.alpha_padding() {
        Some(padding) => probe_alpha(r, padding, next_offset)?,
        None => None,
    };

    let width = bounds.width() as u32;
    let height = bounds.height() as u32;
    let image = reconstruct(
        mode,
        width,
        height,
        &channels,
        alpha.as_ref(),
        palette.as_deref(),
    )?;

    let end = r.position()?;
    if end < next_offset {
        tracing::trace!("Pattern '{}': {} bytes of slack", name, next_offset - end);
        r.set_position(next_offset)?;
    }

    Ok(Some(ParsedPattern {
        name,
        tag,
        mode,
        display_width,
        display_height,
        bounds,
        image,
    }))
}

/// Look for an alpha channel after `padding` reserved bytes.
///
/// The position is restored when no usable channel is found.
fn probe_alpha<R: Read + Seek>(
    r: &mut PatReader<R>,
    padding: u64,
    next_offset: u64,
) -> Result<Option<Channel>, PatError> {
    let probe_start = r.position()?;
    if probe_start + padding + CHANNEL_HEADER_SIZE > next_offset {
        return Ok(None);
    }

    r.skip(padding)?;
    let header_start = r.position()?;
    let header = peek_channel_header(r)?;
    // Length counts everything after the enabled flag and itself
    let declared_end = header_start + 8 + u64::from(header.size);
    if !header.is_present() || declared_end > next_offset {
        tracing::debug!("Alpha probe rejected: {:?}", header);
        r.set_position(probe_start)?;
        return Ok(None);
    }

    let alpha = read_channel(r)?;
    if r.position()? > next_offset {
        tracing::debug!("Alpha channel runs past payload end, ignoring");
        r.set_position(probe_start)?;
        return Ok(None);
    }
    Ok(Some(alpha))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_signature() {
        let data = b"8BPS\x00\x01\x00\x00\x00\x00";
        assert!(matches!(
            parse_pat_data(data),
            Err(PatError::InvalidSignature(sig)) if &sig == b"8BPS"
        ));
    }

    #[test]
    fn test_rejects_bad_version() {
        let data = b"8BPT\x00\x02\x00\x00\x00\x00";
        assert!(matches!(
            parse_pat_data(data),
            Err(PatError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_empty_file_has_no_patterns() {
        let data = b"8BPT\x00\x01\x00\x00\x00\x00";
        assert!(matches!(parse_pat_data(data), Err(PatError::NoPatterns)));
    }

    #[test]
    fn test_truncated_header() {
        let data = b"8BPT\x00\x01\x00\x00";
        assert!(matches!(parse_pat_data(data), Err(PatError::UnexpectedEof)));
    }

    #[test]
    fn test_into_resource_uses_hash_without_tag() {
        let pattern = ParsedPattern {
            name: "p".into(),
            tag: String::new(),
            mode: ColorModel::Grayscale,
            display_width: 1,
            display_height: 1,
            bounds: Rect::new(0, 0, 1, 1),
            image: RasterImage::from_rgba(1, 1, vec![0, 0, 0, 255]).unwrap(),
        };
        let resource = pattern.into_resource("memory");
        assert_eq!(resource.content_hash.len(), 64);
        assert_eq!(resource.id, resource.content_hash[..16]);
        assert_eq!(resource.mode, ColorModel::Grayscale);
        assert_eq!(resource.source, "memory");
    }
}
