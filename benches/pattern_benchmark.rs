//! Pattern codec benchmarks
#![allow(clippy::unwrap_used)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::io::Cursor;
use sutu_pat::pattern::compression::{packbits_decode, packbits_encode};
use sutu_pat::{
    parse_pat_data, write_pat, Compression, EncodeOptions, NamedRaster, RasterImage, RasterMut,
};

fn generate_row(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| if (i / 16) % 2 == 0 { 0 } else { (i * 7) as u8 })
        .collect()
}

fn generate_raster(size: u32) -> RasterImage {
    let mut img = RasterImage::new(size, size);
    for y in 0..size {
        for x in 0..size {
            let v = ((x ^ y) & 0xFF) as u8;
            img.set_pixel(x, y, [v, v / 2, 255 - v, if x < size / 2 { 255 } else { v }]);
        }
    }
    img
}

fn benchmark_packbits(c: &mut Criterion) {
    let mut group = c.benchmark_group("PackBits Row");

    for len in [64, 512, 4096].iter() {
        let row = generate_row(*len);
        let encoded = packbits_encode(&row).unwrap();

        group.bench_with_input(BenchmarkId::new("encode", len), &row, |b, row| {
            b.iter(|| packbits_encode(row))
        });
        group.bench_with_input(BenchmarkId::new("decode", len), &encoded, |b, encoded| {
            b.iter(|| packbits_decode(encoded, *len))
        });
    }

    group.finish();
}

fn benchmark_container(c: &mut Criterion) {
    let mut group = c.benchmark_group("PAT Container");

    for size in [64u32, 256].iter() {
        let img = generate_raster(*size);
        let layers = [NamedRaster::new("bench", &img)];

        for compression in [Compression::Raw, Compression::Rle] {
            let options = EncodeOptions { compression };
            let mut encoded = Cursor::new(Vec::new());
            let _ = write_pat(&mut encoded, &layers, &options, |_| Ok(()));
            let encoded = encoded.into_inner();
            let label = format!("{:?}", compression);

            group.bench_with_input(
                BenchmarkId::new(format!("encode/{}", label), size),
                &layers,
                |b, layers| {
                    b.iter(|| {
                        let mut out = Cursor::new(Vec::new());
                        write_pat(&mut out, layers, &options, |_| Ok(()))
                    })
                },
            );
            group.bench_with_input(
                BenchmarkId::new(format!("decode/{}", label), size),
                &encoded,
                |b, encoded| b.iter(|| parse_pat_data(encoded)),
            );
        }
    }

    group.finish();
}

criterion_group!(benches, benchmark_packbits, benchmark_container);
criterion_main!(benches);
