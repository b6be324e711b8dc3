//! .pat file writer
//!
//! Each non-empty raster becomes one pattern record cropped to its visible
//! area. Rasters whose visible pixels are all gray are stored as Grayscale,
//! everything else as RGB. An alpha channel is added only when the visible
//! area is not fully opaque.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use super::channel::write_channel;
use super::color::{extract_plane, has_transparency, is_grayscale, planes_for, visible_bounds, Plane};
use super::error::PatError;
use super::pat::{PAT_SIGNATURE, PAT_VERSION, RECORD_SUB_VERSION, RECORD_VERSION};
use super::raster::Raster;
use super::stream::PatWriter;
use super::types::{ColorModel, Compression, Rect};

/// Reserved field written after the payload bounds
const PAYLOAD_RESERVED: u32 = 24;

static TAG_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Save-time options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncodeOptions {
    /// Channel compression; RLE unless the host asks for raw
    pub compression: Compression,
}

impl EncodeOptions {
    /// Options from a host's "RLE compress" checkbox
    pub fn with_rle(rle: bool) -> Self {
        Self {
            compression: if rle { Compression::Rle } else { Compression::Raw },
        }
    }
}

/// A host raster to be stored as one pattern
#[derive(Clone, Copy)]
pub struct NamedRaster<'a> {
    pub name: &'a str,
    pub raster: &'a dyn Raster,
}

impl<'a> NamedRaster<'a> {
    pub fn new(name: &'a str, raster: &'a dyn Raster) -> Self {
        Self { name, raster }
    }
}

/// Save rasters to a .pat file. Returns the number of patterns written.
pub fn save_pat_file<F>(
    path: &Path,
    layers: &[NamedRaster<'_>],
    options: &EncodeOptions,
    progress: F,
) -> Result<usize, PatError>
where
    F: FnMut(u8) -> Result<(), PatError>,
{
    tracing::info!("Saving PAT file: {:?}", path);

    let file = File::create(path)?;
    let count = write_pat(BufWriter::new(file), layers, options, progress)?;

    tracing::info!("PAT file saved successfully ({} patterns)", count);
    Ok(count)
}

/// Write rasters as a .pat stream.
///
/// `progress` receives the cumulative percentage after each pattern; an error
/// returned from it aborts the write and is passed through.
pub fn write_pat<W, F>(
    writer: W,
    layers: &[NamedRaster<'_>],
    options: &EncodeOptions,
    mut progress: F,
) -> Result<usize, PatError>
where
    W: Write + Seek,
    F: FnMut(u8) -> Result<(), PatError>,
{
    // 1. Find the visible area of every layer, dropping empty ones
    let mut prepared = Vec::with_capacity(layers.len());
    for layer in layers {
        match visible_bounds(layer.raster) {
            Some(bounds) => {
                check_dimensions(layer.name, &bounds)?;
                prepared.push((layer, bounds));
            }
            None => tracing::debug!("Layer '{}' is fully transparent, skipping", layer.name),
        }
    }

    if prepared.is_empty() {
        tracing::warn!("No visible layers to save");
    }

    // 2. File header
    let mut w = PatWriter::new(writer);
    w.write_bytes(PAT_SIGNATURE)?;
    w.write_u16(PAT_VERSION)?;
    w.write_u32(prepared.len() as u32)?;

    // 3. One record per visible layer
    let total = prepared.len();
    for (i, (layer, bounds)) in prepared.iter().enumerate() {
        write_record(&mut w, layer, bounds, i, options.compression)?;
        progress(((i + 1) * 100 / total) as u8)?;
    }

    w.flush()?;
    Ok(total)
}

fn check_dimensions(name: &str, bounds: &Rect) -> Result<(), PatError> {
    let width = bounds.width() as u32;
    let height = bounds.height() as u32;
    if width > u16::MAX as u32 || height > u16::MAX as u32 {
        return Err(PatError::DimensionsTooLarge {
            name: name.to_string(),
            width,
            height,
        });
    }
    Ok(())
}

fn write_record<W: Write + Seek>(
    w: &mut PatWriter<W>,
    layer: &NamedRaster<'_>,
    bounds: &Rect,
    index: usize,
    compression: Compression,
) -> Result<(), PatError> {
    let raster = layer.raster;
    let model = if is_grayscale(raster, bounds) {
        ColorModel::Grayscale
    } else {
        ColorModel::RGB
    };
    let with_alpha = has_transparency(raster, bounds);

    tracing::debug!(
        "Writing pattern '{}': {}x{} at ({}, {}), {}{}",
        layer.name,
        bounds.width(),
        bounds.height(),
        bounds.left,
        bounds.top,
        model.name(),
        if with_alpha { " + alpha" } else { "" }
    );

    w.write_u32(RECORD_VERSION)?;
    w.write_u32(model.ps_mode())?;
    w.write_u16(bounds.height() as u16)?;
    w.write_u16(bounds.width() as u16)?;
    w.write_unicode_string(layer.name)?;
    w.write_pascal_string(&generate_tag(layer.name, index))?;
    w.write_u32(RECORD_SUB_VERSION)?;

    let mut payload = w.begin_length()?;
    payload.write_rect(bounds)?;
    payload.write_u32(PAYLOAD_RESERVED)?;

    for &plane in planes_for(model) {
        let data = extract_plane(raster, bounds, plane);
        write_channel(&mut *payload, bounds, &data, compression)?;
    }

    if with_alpha {
        let padding = model.alpha_padding().unwrap_or(0) as usize;
        payload.write_bytes(&vec![0u8; padding])?;
        let data = extract_plane(raster, bounds, Plane::Alpha);
        write_channel(&mut *payload, bounds, &data, compression)?;
    }

    payload.finish()?;
    Ok(())
}

/// Fresh UUID-formatted tag for a new pattern record
fn generate_tag(name: &str, index: usize) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let counter = TAG_COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update((index as u64).to_be_bytes());
    hasher.update(nanos.to_be_bytes());
    hasher.update(counter.to_be_bytes());
    hasher.update(std::process::id().to_be_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    // Version 4, RFC 4122 variant
    bytes[6] = (bytes[6] & 0x0F) | 0x40;
    bytes[8] = (bytes[8] & 0x3F) | 0x80;

    let h = hex::encode(bytes);
    format!(
        "{}-{}-{}-{}-{}",
        &h[0..8],
        &h[8..12],
        &h[12..16],
        &h[16..20],
        &h[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::raster::{RasterImage, RasterMut};
    use std::io::Cursor;

    fn encode(layers: &[NamedRaster<'_>], options: EncodeOptions) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        write_pat(&mut cursor, layers, &options, |_| Ok(())).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_tags_are_unique_uuids() {
        let a = generate_tag("p", 0);
        let b = generate_tag("p", 0);
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
        assert_eq!(a.as_bytes()[14], b'4');
        assert!(a.is_ascii());
    }

    #[test]
    fn test_header_layout() {
        let mut img = RasterImage::new(2, 2);
        img.set_pixel(0, 0, [9, 9, 9, 255]);
        let bytes = encode(&[NamedRaster::new("g", &img)], EncodeOptions::default());

        assert_eq!(&bytes[0..4], b"8BPT");
        assert_eq!(&bytes[4..6], &[0, 1]);
        assert_eq!(&bytes[6..10], &[0, 0, 0, 1]);
        // Record version, Grayscale model, 1x1 display size
        assert_eq!(&bytes[10..14], &[0, 0, 0, 1]);
        assert_eq!(&bytes[14..18], &[0, 0, 0, 1]);
        assert_eq!(&bytes[18..22], &[0, 1, 0, 1]);
    }

    #[test]
    fn test_transparent_layers_are_dropped() {
        let empty = RasterImage::new(4, 4);
        let mut dot = RasterImage::new(4, 4);
        dot.set_pixel(1, 2, [255, 0, 0, 255]);

        let bytes = encode(
            &[NamedRaster::new("empty", &empty), NamedRaster::new("dot", &dot)],
            EncodeOptions::default(),
        );
        assert_eq!(&bytes[6..10], &[0, 0, 0, 1]);
        // RGB model
        assert_eq!(&bytes[14..18], &[0, 0, 0, 3]);
    }

    #[test]
    fn test_progress_reports_and_cancels() {
        let mut a = RasterImage::new(1, 1);
        a.set_pixel(0, 0, [1, 1, 1, 255]);
        let b = a.clone();
        let layers = [NamedRaster::new("a", &a), NamedRaster::new("b", &b)];

        let mut seen = Vec::new();
        write_pat(Cursor::new(Vec::new()), &layers, &EncodeOptions::default(), |p| {
            seen.push(p);
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec![50, 100]);

        let result = write_pat(
            Cursor::new(Vec::new()),
            &layers,
            &EncodeOptions::default(),
            |_| Err(PatError::Cancelled),
        );
        assert!(matches!(result, Err(PatError::Cancelled)));
    }

    #[test]
    fn test_rejects_oversized_layer() {
        let bounds = Rect::new(0, 0, 1, 70_000);
        assert!(matches!(
            check_dimensions("wide", &bounds),
            Err(PatError::DimensionsTooLarge { width: 70_000, .. })
        ));
    }

    #[test]
    fn test_options_from_json() {
        let opts: EncodeOptions = serde_json::from_str(r#"{"compression":"raw"}"#).unwrap();
        assert_eq!(opts, EncodeOptions::with_rle(false));
        let opts: EncodeOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts.compression, Compression::Rle);
    }
}
