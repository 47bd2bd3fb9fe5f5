//! A2B (device to PCS) pipeline decoding
//!
//! Three payload types feed the same record:
//! - `mft1` (Lut8Type): 8-bit tables, fixed 256-entry curves
//! - `mft2` (Lut16Type): 16-bit tables, 2..=4096 entries per curve
//! - `mAB ` (lutAToBType): v4 layout with five sub-offsets
//!
//! The decoded pipeline runs input curves → CLUT → matrix (with its own
//! curves) → output curves. Stages a payload does not carry are `None`.
//! All table data stays borrowed from the profile buffer; size arithmetic
//! is done in u64 so attacker-controlled counts cannot wrap.

use crate::error::{Error, Result};
use crate::icc::bytes;
use crate::icc::curve::Curve;
use crate::icc::profile::Tag;
use crate::icc::types::TypeSignature;
use crate::math::matrix::Matrix3x4;

/// A2B pipelines always produce three PCS channels.
pub const OUTPUT_CHANNELS: usize = 3;

/// At most four device channels (CMYK) feed the pipeline.
pub const MAX_INPUT_CHANNELS: usize = 4;

/// Borrowed multidimensional grid entries
#[derive(Debug, Clone)]
pub enum ClutTable<'a> {
    /// One byte per entry
    U8(&'a [u8]),
    /// Two bytes per entry, big-endian
    U16(&'a [u8]),
}

/// The input stage: per-channel curves feeding a multidimensional grid
#[derive(Debug, Clone)]
pub struct ClutStage<'a> {
    /// Device channels feeding the grid, 1..=4
    pub input_channels: u8,
    /// Grid points along each used axis
    pub grid_points: [u8; 4],
    /// One curve per input channel
    pub input_curves: Vec<Curve<'a>>,
    /// The grid entries
    pub grid: ClutTable<'a>,
}

/// The matrix stage: three curves followed by an affine 3x4 matrix
#[derive(Debug, Clone)]
pub struct MatrixStage<'a> {
    /// One curve per channel
    pub curves: Vec<Curve<'a>>,
    /// Row-major 3x3 with the fourth column as translation
    pub matrix: Matrix3x4,
}

/// A decoded device-to-PCS pipeline
///
/// `clut: None` means the input stage is elided (identity on three
/// channels); `matrix: None` means the matrix stage is elided. The output
/// curves are always present.
#[derive(Debug, Clone)]
pub struct A2b<'a> {
    /// Input curves and grid, when the payload carries them
    pub clut: Option<ClutStage<'a>>,
    /// Matrix stage, when the payload carries one
    pub matrix: Option<MatrixStage<'a>>,
    /// The three output ("B") curves
    pub output_curves: Vec<Curve<'a>>,
}

impl<'a> A2b<'a> {
    /// Decode an A2B pipeline from a tag payload.
    pub fn from_tag(tag: &Tag<'a>) -> Result<Self> {
        match tag.type_sig {
            TypeSignature::LUT8 => decode_mft(tag, 1),
            TypeSignature::LUT16 => decode_mft(tag, 2),
            TypeSignature::LUTA2B => decode_mab(tag),
            other => Err(Error::InvalidTagType {
                tag: tag.signature.0,
                type_sig: other.0,
            }),
        }
    }

    /// Device channels feeding the pipeline; zero when the input stage
    /// is elided.
    pub fn input_channels(&self) -> u8 {
        self.clut.as_ref().map_or(0, |c| c.input_channels)
    }

    /// PCS channels leaving the pipeline.
    pub fn output_channels(&self) -> u8 {
        OUTPUT_CHANNELS as u8
    }

    /// Grid points along each axis; zeros when the input stage is elided.
    pub fn grid_points(&self) -> [u8; 4] {
        self.clut.as_ref().map_or([0; 4], |c| c.grid_points)
    }
}

/// Decode `mft1`/`mft2`, which share one layout: a fixed header with a
/// single grid size for all axes, then input tables, grid, and output
/// tables packed contiguously.
fn decode_mft<'a>(tag: &Tag<'a>, byte_width: usize) -> Result<A2b<'a>> {
    let data = tag.data;
    let header_len = if byte_width == 1 { 48 } else { 52 };
    if data.len() < header_len {
        return Err(Error::CorruptedData("mft header truncated".to_string()));
    }

    let input_channels = data[8] as usize;
    let output_channels = data[9] as usize;
    let grid = data[10];

    if output_channels != OUTPUT_CHANNELS {
        return Err(Error::CorruptedData(format!(
            "mft output channels must be 3, got {output_channels}"
        )));
    }
    if input_channels < 1 || input_channels > MAX_INPUT_CHANNELS {
        return Err(Error::CorruptedData(format!(
            "mft input channels out of range: {input_channels}"
        )));
    }
    if grid < 2 {
        return Err(Error::CorruptedData(
            "mft grid needs at least two points per axis".to_string(),
        ));
    }

    // The embedded 3x3 matrix at bytes 12..48 applies before the input
    // curves and must be identity unless the device space is PCSXYZ,
    // which this parser does not accept. It is skipped.

    let (input_entries, output_entries) = if byte_width == 1 {
        (256usize, 256usize)
    } else {
        let input_entries = bytes::read_u16(data, 48) as usize;
        let output_entries = bytes::read_u16(data, 50) as usize;
        if !(2..=4096).contains(&input_entries) || !(2..=4096).contains(&output_entries) {
            return Err(Error::CorruptedData(format!(
                "mft2 table entries out of range: {input_entries}/{output_entries}"
            )));
        }
        (input_entries, output_entries)
    };

    let mut grid_points = [0u8; 4];
    grid_points[..input_channels].fill(grid);

    let tables = &data[header_len..];
    let per_input = input_entries * byte_width;
    let per_output = output_entries * byte_width;
    let all_input = input_channels * per_input;
    let all_output = OUTPUT_CHANNELS * per_output;
    let mut grid_bytes = (OUTPUT_CHANNELS * byte_width) as u64;
    for _ in 0..input_channels {
        grid_bytes *= grid as u64;
    }

    if (tables.len() as u64) < all_input as u64 + grid_bytes + all_output as u64 {
        return Err(Error::CorruptedData(
            "mft tables run past the tag".to_string(),
        ));
    }
    let grid_bytes = grid_bytes as usize;

    let table_curve = |slice| {
        if byte_width == 1 {
            Curve::Table8(slice)
        } else {
            Curve::Table16(slice)
        }
    };

    let input_curves = (0..input_channels)
        .map(|i| table_curve(&tables[i * per_input..(i + 1) * per_input]))
        .collect();

    let grid_slice = &tables[all_input..all_input + grid_bytes];
    let grid_table = if byte_width == 1 {
        ClutTable::U8(grid_slice)
    } else {
        ClutTable::U16(grid_slice)
    };

    let output_base = all_input + grid_bytes;
    let output_curves = (0..OUTPUT_CHANNELS)
        .map(|i| table_curve(&tables[output_base + i * per_output..output_base + (i + 1) * per_output]))
        .collect();

    Ok(A2b {
        clut: Some(ClutStage {
            input_channels: input_channels as u8,
            grid_points,
            input_curves,
            grid: grid_table,
        }),
        matrix: None,
        output_curves,
    })
}

/// Decode `mAB `: five sub-offsets relative to the tag start, with
/// both-or-neither pairing between M-curves/matrix and A-curves/CLUT.
fn decode_mab<'a>(tag: &Tag<'a>) -> Result<A2b<'a>> {
    let data = tag.data;
    if data.len() < 32 {
        return Err(Error::CorruptedData("mAB header truncated".to_string()));
    }

    let input_channels = data[8] as usize;
    let output_channels = data[9] as usize;
    if output_channels != OUTPUT_CHANNELS {
        return Err(Error::CorruptedData(format!(
            "mAB output channels must be 3, got {output_channels}"
        )));
    }
    if input_channels > MAX_INPUT_CHANNELS {
        return Err(Error::CorruptedData(format!(
            "mAB input channels out of range: {input_channels}"
        )));
    }

    let b_curve_offset = bytes::read_u32(data, 12);
    let matrix_offset = bytes::read_u32(data, 16);
    let m_curve_offset = bytes::read_u32(data, 20);
    let clut_offset = bytes::read_u32(data, 24);
    let a_curve_offset = bytes::read_u32(data, 28);

    // "B" curves are the one mandatory stage
    if b_curve_offset == 0 {
        return Err(Error::CorruptedData("mAB without B curves".to_string()));
    }
    let output_curves = read_curve_chain(data, b_curve_offset, OUTPUT_CHANNELS)?;

    // "M" curves and the matrix come together or not at all
    let matrix = if m_curve_offset != 0 {
        if matrix_offset == 0 {
            return Err(Error::CorruptedData(
                "mAB has M curves but no matrix".to_string(),
            ));
        }
        let curves = read_curve_chain(data, m_curve_offset, OUTPUT_CHANNELS)?;
        if matrix_offset as u64 + 48 > data.len() as u64 {
            return Err(Error::CorruptedData("mAB matrix truncated".to_string()));
        }
        let o = matrix_offset as usize;
        let fx = |i: usize| bytes::read_fixed(data, o + 4 * i);
        // Row-major 3x3, then the fourth column
        let matrix = Matrix3x4::new([
            [fx(0), fx(1), fx(2), fx(9)],
            [fx(3), fx(4), fx(5), fx(10)],
            [fx(6), fx(7), fx(8), fx(11)],
        ]);
        Some(MatrixStage { curves, matrix })
    } else {
        if matrix_offset != 0 {
            return Err(Error::CorruptedData(
                "mAB has a matrix but no M curves".to_string(),
            ));
        }
        None
    };

    // "A" curves and the CLUT come together or not at all
    let clut = if a_curve_offset != 0 {
        if clut_offset == 0 {
            return Err(Error::CorruptedData(
                "mAB has A curves but no CLUT".to_string(),
            ));
        }
        let input_curves = read_curve_chain(data, a_curve_offset, input_channels)?;

        // 16 grid-point bytes, byte width, three reserved bytes
        if clut_offset as u64 + 20 > data.len() as u64 {
            return Err(Error::CorruptedData("mAB CLUT header truncated".to_string()));
        }
        let o = clut_offset as usize;
        let byte_width = data[o + 16];
        if byte_width != 1 && byte_width != 2 {
            return Err(Error::CorruptedData(format!(
                "mAB CLUT byte width must be 1 or 2, got {byte_width}"
            )));
        }

        let mut grid_points = [0u8; 4];
        let mut grid_bytes = (OUTPUT_CHANNELS as u64) * byte_width as u64;
        for (axis, slot) in grid_points.iter_mut().enumerate().take(input_channels) {
            let points = data[o + axis];
            if points < 2 {
                return Err(Error::CorruptedData(
                    "mAB grid needs at least two points per axis".to_string(),
                ));
            }
            *slot = points;
            grid_bytes *= points as u64;
        }
        if clut_offset as u64 + 20 + grid_bytes > data.len() as u64 {
            return Err(Error::CorruptedData("mAB grid runs past the tag".to_string()));
        }

        let grid_slice = &data[o + 20..o + 20 + grid_bytes as usize];
        let grid = if byte_width == 1 {
            ClutTable::U8(grid_slice)
        } else {
            ClutTable::U16(grid_slice)
        };
        Some(ClutStage {
            input_channels: input_channels as u8,
            grid_points,
            input_curves,
            grid,
        })
    } else {
        if clut_offset != 0 {
            return Err(Error::CorruptedData(
                "mAB has a CLUT but no A curves".to_string(),
            ));
        }
        // Without a CLUT the stage is an identity, which only makes
        // sense when it does not change the channel count.
        if input_channels != output_channels {
            return Err(Error::CorruptedData(format!(
                "mAB without CLUT cannot map {input_channels} channels to {output_channels}"
            )));
        }
        None
    };

    Ok(A2b {
        clut,
        matrix,
        output_curves,
    })
}

/// Decode `count` packed curves starting at `offset`, each advanced to a
/// four-byte boundary.
fn read_curve_chain<'a>(data: &'a [u8], offset: u32, count: usize) -> Result<Vec<Curve<'a>>> {
    let mut curves = Vec::with_capacity(count);
    let mut cursor = offset as u64;
    for _ in 0..count {
        if cursor > data.len() as u64 {
            return Err(Error::CorruptedData(
                "mAB curve offset out of range".to_string(),
            ));
        }
        let (curve, consumed) = Curve::decode(&data[cursor as usize..])?;
        let aligned = consumed
            .checked_add(3)
            .ok_or_else(|| Error::CorruptedData("mAB curve size overflow".to_string()))?
            & !3;
        cursor = cursor
            .checked_add(aligned as u64)
            .ok_or_else(|| Error::CorruptedData("mAB curve offset overflow".to_string()))?;
        curves.push(curve);
    }
    Ok(curves)
}
