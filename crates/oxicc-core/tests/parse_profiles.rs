//! End-to-end profile parsing scenarios
//!
//! These tests assemble profiles byte by byte, the way a writer would lay
//! them out on disk, and check the parsed view against the wire content.

use oxicc_core::{are_approximate_inverses, Matrix3x3, Profile, TagSignature, TransferFunction};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const HEADER_SIZE: usize = 132;
const TAG_ENTRY_SIZE: usize = 12;

/// Byte-level profile builder: valid v4 display header, D50 illuminant,
/// tags appended behind a self-consistent directory.
#[derive(Default)]
struct ProfileBuilder {
    tags: Vec<([u8; 4], Vec<u8>)>,
}

impl ProfileBuilder {
    fn new() -> Self {
        Self::default()
    }

    fn tag(mut self, signature: [u8; 4], payload: Vec<u8>) -> Self {
        self.tags.push((signature, payload));
        self
    }

    fn build(&self) -> Vec<u8> {
        let mut offset = HEADER_SIZE + TAG_ENTRY_SIZE * self.tags.len();
        let mut directory = Vec::new();
        let mut payloads = Vec::new();
        for (signature, payload) in &self.tags {
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
        data[68..72].copy_from_slice(&0x0000F6D6u32.to_be_bytes()); // 0.9642
        data[72..76].copy_from_slice(&0x00010000u32.to_be_bytes()); // 1.0
        data[76..80].copy_from_slice(&0x0000D32Du32.to_be_bytes()); // 0.8249
        data[128..132].copy_from_slice(&(self.tags.len() as u32).to_be_bytes());
        data.extend_from_slice(&directory);
        data.extend_from_slice(&payloads);
        data
    }
}

fn curv(values: &[u16]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(b"curv");
    data.extend_from_slice(&[0; 4]);
    data.extend_from_slice(&(values.len() as u32).to_be_bytes());
    for &v in values {
        data.extend_from_slice(&v.to_be_bytes());
    }
    data
}

fn xyz(x: f64, y: f64, z: f64) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(b"XYZ ");
    data.extend_from_slice(&[0; 4]);
    for v in [x, y, z] {
        data.extend_from_slice(&((v * 65536.0).round() as i32).to_be_bytes());
    }
    data
}

/// mft2 A2B payload: 3→3 channels, 2-entry tables, identity-ish content.
fn mft2(grid: u8) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(b"mft2");
    data.extend_from_slice(&[0; 4]);
    data.push(3);
    data.push(3);
    data.push(grid);
    data.push(0);
    data.extend_from_slice(&[0; 36]);
    data.extend_from_slice(&2u16.to_be_bytes());
    data.extend_from_slice(&2u16.to_be_bytes());
    for _ in 0..3 {
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&0xFFFFu16.to_be_bytes());
    }
    for _ in 0..3 * (grid as usize).pow(3) {
        data.extend_from_slice(&0x8000u16.to_be_bytes());
    }
    for _ in 0..3 {
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&0xFFFFu16.to_be_bytes());
    }
    data
}

#[test]
fn zeroed_buffer_is_rejected() {
    let data = vec![0u8; 132];
    assert!(Profile::parse(&data).is_err());
}

#[test]
fn short_buffer_is_rejected() {
    let data = ProfileBuilder::new().build();
    assert!(Profile::parse(&data[..131]).is_err());
    assert!(Profile::parse(&[]).is_err());
}

#[test]
fn minimal_profile_parses_with_nothing_materialized() {
    let data = ProfileBuilder::new().build();
    assert_eq!(data.len(), 132);

    let profile = Profile::parse(&data).unwrap();
    assert_eq!(profile.header.size as usize, data.len());
    assert_eq!(profile.tag_count(), 0);
    assert!(profile.trc.is_none());
    assert!(profile.to_xyz_d50.is_none());
    assert!(profile.a2b.is_none());
}

#[test]
fn empty_curv_trcs_are_identity() {
    let data = ProfileBuilder::new()
        .tag(*b"rTRC", curv(&[]))
        .tag(*b"gTRC", curv(&[]))
        .tag(*b"bTRC", curv(&[]))
        .build();
    let profile = Profile::parse(&data).unwrap();

    let trc = profile.trc.as_ref().expect("three empty curves still count");
    for curve in trc {
        for i in 0..=16 {
            let x = i as f64 / 16.0;
            assert!((curve.eval(x) - x).abs() < 1e-12);
        }
    }
}

#[test]
fn single_entry_curv_trcs_are_gamma() {
    // 0x0200 is 2.0 in u8Fixed8
    let data = ProfileBuilder::new()
        .tag(*b"rTRC", curv(&[0x0200]))
        .tag(*b"gTRC", curv(&[0x0200]))
        .tag(*b"bTRC", curv(&[0x0200]))
        .build();
    let profile = Profile::parse(&data).unwrap();

    let trc = profile.trc.as_ref().unwrap();
    for curve in trc {
        assert!((curve.eval(0.5) - 0.25).abs() < 1e-9);
        assert!((curve.eval(1.0) - 1.0).abs() < 1e-12);
    }
}

#[test]
fn gray_trc_builds_diagonal_matrix() {
    let data = ProfileBuilder::new()
        .tag(*b"kTRC", curv(&[0x0100]))
        .build();
    let profile = Profile::parse(&data).unwrap();

    assert!(profile.trc.is_some());
    let matrix = profile.to_xyz_d50.expect("kTRC implies a colorant matrix");
    assert!(matrix.approx_eq(&Matrix3x3::diagonal(0.9642, 1.0, 0.8249), 1e-4));
}

#[test]
fn a2b1_mft2_materializes() {
    let data = ProfileBuilder::new().tag(*b"A2B1", mft2(2)).build();
    let profile = Profile::parse(&data).unwrap();

    let a2b = profile.a2b.as_ref().unwrap();
    assert_eq!(a2b.input_channels(), 3);
    assert_eq!(a2b.output_channels(), 3);
    assert_eq!(a2b.grid_points(), [2, 2, 2, 0]);
}

#[test]
fn srgb_like_matrix_shaper_profile() {
    // A realistic matrix/TRC display profile: sRGB primaries and a
    // 256-entry sRGB tone curve, repeated for all three channels.
    let srgb = TransferFunction::srgb();
    let table: Vec<u16> = (0..256)
        .map(|i| {
            let x = i as f64 / 255.0;
            (srgb.eval(x) * 65535.0).round() as u16
        })
        .collect();

    let data = ProfileBuilder::new()
        .tag(*b"rTRC", curv(&table))
        .tag(*b"gTRC", curv(&table))
        .tag(*b"bTRC", curv(&table))
        .tag(*b"rXYZ", xyz(0.4361, 0.2225, 0.0139))
        .tag(*b"gXYZ", xyz(0.3851, 0.7169, 0.0971))
        .tag(*b"bXYZ", xyz(0.1431, 0.0606, 0.7141))
        .build();
    let profile = Profile::parse(&data).unwrap();

    // The tone curve round-trips through the fitter
    let trc = profile.trc.as_ref().unwrap();
    let (tf, max_error) = trc[0].approximate(None).expect("sRGB table must fit");
    assert!(max_error < 1.0 / 512.0, "fit error {max_error}");
    assert!(tf.a > 0.0 && tf.g > 0.0);

    // Matrix columns hold the colorants; white lands on D50
    let matrix = profile.to_xyz_d50.unwrap();
    let white = matrix.multiply_vec([1.0, 1.0, 1.0]);
    assert!((white[1] - 1.0).abs() < 0.01);

    // Full complement of tags is visible through the directory
    assert_eq!(profile.tag_count(), 6);
    let tag = profile.tag_by_signature(TagSignature::RED_TRC).unwrap();
    assert_eq!(&tag.data[..4], b"curv");
}

#[test]
fn fitted_inverse_round_trips() {
    // Sample the sRGB encode direction, fit it, and check it inverts a
    // decode-direction table.
    let srgb = TransferFunction::srgb();
    let decode_table: Vec<u16> = (0..256)
        .map(|i| {
            let x = i as f64 / 255.0;
            (srgb.eval(x) * 65535.0).round() as u16
        })
        .collect();
    let encode_table: Vec<u16> = (0..256)
        .map(|i| {
            let y = i as f64 / 255.0;
            let x = if y < srgb.c * srgb.d {
                y / srgb.c
            } else {
                (y.powf(1.0 / srgb.g) - srgb.b) / srgb.a
            };
            (x.clamp(0.0, 1.0) * 65535.0).round() as u16
        })
        .collect();

    let data = ProfileBuilder::new()
        .tag(*b"rTRC", curv(&decode_table))
        .tag(*b"gTRC", curv(&decode_table))
        .tag(*b"bTRC", curv(&decode_table))
        .tag(*b"kTRC", curv(&encode_table))
        .build();
    let profile = Profile::parse(&data).unwrap();

    // kTRC wins the pre-parse, so trc[0] is the encode table
    let encode_curve = &profile.trc.as_ref().unwrap()[0];
    let (encode_tf, _) = encode_curve.approximate(None).unwrap();

    let decode_curve_data = profile.tag_by_signature(TagSignature::RED_TRC).unwrap();
    let decode_curve = oxicc_core::Curve::from_tag(&decode_curve_data).unwrap();
    assert!(are_approximate_inverses(&decode_curve, &encode_tf));
}

#[test]
fn directory_bounds_are_exact() {
    let template = ProfileBuilder::new().tag(*b"rTRC", curv(&[])).build();

    // offset + size == profile.size parses
    Profile::parse(&template).unwrap();

    // one byte over fails
    let mut data = template.clone();
    let size = u32::from_be_bytes(data[140..144].try_into().unwrap());
    data[140..144].copy_from_slice(&(size + 1).to_be_bytes());
    assert!(Profile::parse(&data).is_err());

    // undersized entries fail
    let mut data = template;
    data[140..144].copy_from_slice(&3u32.to_be_bytes());
    assert!(Profile::parse(&data).is_err());
}

#[test]
fn mft2_table_entry_bounds_are_enforced() {
    for entries in [1u16, 4097] {
        let mut payload = mft2(2);
        payload[48..50].copy_from_slice(&entries.to_be_bytes());
        let data = ProfileBuilder::new().tag(*b"A2B1", payload).build();
        assert!(Profile::parse(&data).is_err());
    }
}

#[test]
fn repeated_parses_agree() {
    let data = ProfileBuilder::new()
        .tag(*b"kTRC", curv(&[0x0233]))
        .tag(*b"A2B0", mft2(2))
        .build();

    let first = Profile::parse(&data).unwrap();
    let second = Profile::parse(&data).unwrap();
    assert_eq!(first.header, second.header);
    assert_eq!(
        first.trc.as_ref().unwrap()[0].eval(0.5),
        second.trc.as_ref().unwrap()[0].eval(0.5)
    );
    assert_eq!(
        first.a2b.as_ref().unwrap().grid_points(),
        second.a2b.as_ref().unwrap().grid_points()
    );
}

#[test]
fn mutated_profiles_never_panic() {
    let template = ProfileBuilder::new()
        .tag(*b"rTRC", curv(&[0, 0x4000, 0x8000, 0xC000, 0xFFFF]))
        .tag(*b"gTRC", curv(&[0x0200]))
        .tag(*b"bTRC", curv(&[]))
        .tag(*b"rXYZ", xyz(0.4361, 0.2225, 0.0139))
        .tag(*b"gXYZ", xyz(0.3851, 0.7169, 0.0971))
        .tag(*b"bXYZ", xyz(0.1431, 0.0606, 0.7141))
        .tag(*b"A2B1", mft2(2))
        .build();
    Profile::parse(&template).unwrap();

    let mut rng = ChaCha8Rng::seed_from_u64(0x1CC);
    for _ in 0..2000 {
        let mut data = template.clone();
        match rng.gen_range(0..3) {
            // single byte flip
            0 => {
                let at = rng.gen_range(0..data.len());
                data[at] ^= 1 << rng.gen_range(0..8);
            }
            // truncation
            1 => {
                let len = rng.gen_range(0..data.len());
                data.truncate(len);
            }
            // byte overwrite
            _ => {
                let at = rng.gen_range(0..data.len());
                data[at] = rng.gen();
            }
        }

        // Any outcome is fine as long as it is not a panic, and whatever
        // parses still honors its own invariants.
        if let Ok(profile) = Profile::parse(&data) {
            assert!(profile.header.size as usize <= data.len());
            for tag in profile.tags() {
                assert!(tag.data.len() >= 4);
            }
            if let Some(trc) = &profile.trc {
                for curve in trc {
                    assert!(curve.eval(0.5).is_finite());
                }
            }
        }
    }
}
