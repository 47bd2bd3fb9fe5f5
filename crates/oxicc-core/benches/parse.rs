//! Parser and fitter benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use oxicc_core::{Curve, Profile, TagSignature, TransferFunction};

const HEADER_SIZE: usize = 132;
const TAG_ENTRY_SIZE: usize = 12;

/// Assemble a matrix/TRC display profile with 256-entry sRGB tone tables.
fn build_profile() -> Vec<u8> {
    let srgb = TransferFunction::srgb();
    let table: Vec<u16> = (0..256)
        .map(|i| {
            let x = i as f64 / 255.0;
            (srgb.eval(x) * 65535.0).round() as u16
        })
        .collect();

    let mut curv = Vec::new();
    curv.extend_from_slice(b"curv");
    curv.extend_from_slice(&[0; 4]);
    curv.extend_from_slice(&(table.len() as u32).to_be_bytes());
    for &v in &table {
        curv.extend_from_slice(&v.to_be_bytes());
    }

    let xyz = |x: f64, y: f64, z: f64| {
        let mut data = Vec::new();
        data.extend_from_slice(b"XYZ ");
        data.extend_from_slice(&[0; 4]);
        for v in [x, y, z] {
            data.extend_from_slice(&((v * 65536.0).round() as i32).to_be_bytes());
        }
        data
    };

    let tags: Vec<([u8; 4], Vec<u8>)> = vec![
        (*b"rTRC", curv.clone()),
        (*b"gTRC", curv.clone()),
        (*b"bTRC", curv),
        (*b"rXYZ", xyz(0.4361, 0.2225, 0.0139)),
        (*b"gXYZ", xyz(0.3851, 0.7169, 0.0971)),
        (*b"bXYZ", xyz(0.1431, 0.0606, 0.7141)),
    ];

    let mut offset = HEADER_SIZE + TAG_ENTRY_SIZE * tags.len();
    let mut directory = Vec::new();
    let mut payloads = Vec::new();
    for (signature, payload) in &tags {
        directory.extend_from_slice(signature);
        directory.extend_from_slice(&(offset as u32).to_be_bytes());
        directory.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        payloads.extend_from_slice(payload);
        offset += payload.len();
    }

    let mut data = vec![0u8; HEADER_SIZE];
    data[0..4].copy_from_slice(&(offset as u32).to_be_bytes());
    data[8] = 4;
    data[12..16].copy_from_slice(b"mntr");
    data[16..20].copy_from_slice(b"RGB ");
    data[20..24].copy_from_slice(b"XYZ ");
    data[36..40].copy_from_slice(b"acsp");
    data[68..72].copy_from_slice(&0x0000F6D6u32.to_be_bytes());
    data[72..76].copy_from_slice(&0x00010000u32.to_be_bytes());
    data[76..80].copy_from_slice(&0x0000D32Du32.to_be_bytes());
    data[128..132].copy_from_slice(&(tags.len() as u32).to_be_bytes());
    data.extend_from_slice(&directory);
    data.extend_from_slice(&payloads);
    data
}

fn bench_parse(c: &mut Criterion) {
    let data = build_profile();

    c.bench_function("parse_matrix_shaper", |b| {
        b.iter(|| Profile::parse(black_box(&data)).unwrap())
    });
}

fn bench_eval(c: &mut Criterion) {
    let data = build_profile();
    let profile = Profile::parse(&data).unwrap();
    let tag = profile.tag_by_signature(TagSignature::RED_TRC).unwrap();
    let curve = Curve::from_tag(&tag).unwrap();

    c.bench_function("eval_table_sweep", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for i in 0..1024 {
                acc += curve.eval(black_box(i as f64 / 1023.0));
            }
            acc
        })
    });
}

fn bench_approximate(c: &mut Criterion) {
    let data = build_profile();
    let profile = Profile::parse(&data).unwrap();
    let trc = profile.trc.as_ref().unwrap();

    c.bench_function("approximate_srgb_table", |b| {
        b.iter(|| trc[0].approximate(black_box(None)).unwrap())
    });
}

criterion_group!(benches, bench_parse, bench_eval, bench_approximate);
criterion_main!(benches);
