//! Tonal curve decoding and evaluation
//!
//! ICC profiles carry tone reproduction curves in two payload types:
//! - `para`: one of five parametric variants (G, GAB, GABC, GABCD, GABCDEF)
//! - `curv`: a sampled table, or the shorthand forms for identity and
//!   pure gamma
//!
//! Sampled tables borrow the profile buffer; nothing is copied. 8-bit
//! tables only occur inside `mft1` LUTs, 16-bit tables come from `curv`
//! payloads and `mft2` LUTs.

use crate::error::{Error, Result};
use crate::icc::bytes;
use crate::icc::profile::Tag;
use crate::icc::types::{TypeSignature, U8Fixed8};
use crate::math::transfer::{fit_samples, TransferFunction};

/// Extra parameter bytes for `para` function types 0..=4.
const PARA_PARAM_BYTES: [usize; 5] = [4, 12, 16, 20, 28];

/// Fitting and inverse checks never look at fewer points than this.
const MIN_FIT_SAMPLES: usize = 256;

/// A decoded tonal curve
///
/// Table variants borrow the raw big-endian bytes from the profile buffer.
#[derive(Debug, Clone)]
pub enum Curve<'a> {
    /// A seven-parameter parametric curve
    Parametric(TransferFunction),
    /// A sampled table of 8-bit entries, one byte each
    Table8(&'a [u8]),
    /// A sampled table of big-endian 16-bit entries, two bytes each
    Table16(&'a [u8]),
}

impl<'a> Curve<'a> {
    /// Decode a curve from a tag payload.
    pub fn from_tag(tag: &Tag<'a>) -> Result<Self> {
        Ok(Self::decode(tag.data)?.0)
    }

    /// Decode a `para` or `curv` payload.
    ///
    /// Returns the curve and the number of payload bytes it occupies, so
    /// callers walking packed curve sequences (mAB) can advance.
    pub fn decode(data: &'a [u8]) -> Result<(Self, usize)> {
        if data.len() < 4 {
            return Err(Error::CorruptedData(
                "curve payload shorter than its type signature".to_string(),
            ));
        }

        match TypeSignature(bytes::read_u32(data, 0)) {
            TypeSignature::PARA => decode_para(data),
            TypeSignature::CURVE => decode_curv(data),
            other => Err(Error::CorruptedData(format!(
                "unknown curve type: {:08X}",
                other.0
            ))),
        }
    }

    /// Number of table entries; zero for parametric curves.
    pub fn table_entries(&self) -> usize {
        match self {
            Curve::Parametric(_) => 0,
            Curve::Table8(table) => table.len(),
            Curve::Table16(table) => table.len() / 2,
        }
    }

    /// Evaluate the curve.
    ///
    /// Sampled tables clamp the input to [0, 1] and interpolate linearly
    /// between normalized entries; parametric curves evaluate the piecewise
    /// form directly.
    pub fn eval(&self, x: f64) -> f64 {
        match self {
            Curve::Parametric(tf) => tf.eval(x),
            Curve::Table8(table) => {
                let (lo, hi, t) = table_slots(table.len(), x);
                let l = table[lo] as f64 / 255.0;
                let h = table[hi] as f64 / 255.0;
                l + (h - l) * t
            }
            Curve::Table16(table) => {
                let (lo, hi, t) = table_slots(table.len() / 2, x);
                let l = bytes::read_u16(table, 2 * lo) as f64 / 65535.0;
                let h = bytes::read_u16(table, 2 * hi) as f64 / 65535.0;
                l + (h - l) * t
            }
        }
    }

    /// Approximate a sampled curve with a seven-parameter transfer function.
    ///
    /// Returns the fit and its maximum absolute error, or `None` for
    /// parametric curves and curves the solver cannot fit (including fits
    /// whose error exceeds `tolerance`, when one is given).
    pub fn approximate(&self, tolerance: Option<f64>) -> Option<(TransferFunction, f64)> {
        let entries = self.table_entries();
        if entries == 0 {
            return None;
        }
        let n = entries.max(MIN_FIT_SAMPLES);
        let dx = 1.0 / (n - 1) as f64;
        let ys: Vec<f64> = (0..n).map(|i| self.eval(i as f64 * dx)).collect();
        fit_samples(&ys, tolerance)
    }
}

/// Check whether `inverse` undoes `curve` to within 1/512 across the
/// unit interval.
pub fn are_approximate_inverses(curve: &Curve<'_>, inverse: &TransferFunction) -> bool {
    const SLACK: f64 = 1.0 / 512.0;
    let n = curve.table_entries().max(MIN_FIT_SAMPLES);
    let dx = 1.0 / (n - 1) as f64;
    (0..n).all(|i| {
        let x = i as f64 * dx;
        (x - inverse.eval(curve.eval(x))).abs() <= SLACK
    })
}

/// Index pair and interpolation weight for an `n`-entry table.
///
/// The upper index comes from the largest float below `ix + 1`, which keeps
/// it in range at x = 1 without a branch.
fn table_slots(n: usize, x: f64) -> (usize, usize, f64) {
    let ix = x.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = ix as usize;
    let hi = f64::from_bits((ix + 1.0).to_bits() - 1) as usize;
    (lo, hi, ix - lo as f64)
}

fn decode_para(data: &[u8]) -> Result<(Curve<'_>, usize)> {
    if data.len() < 12 {
        return Err(Error::CorruptedData(
            "parametric curve header truncated".to_string(),
        ));
    }

    let function_type = bytes::read_u16(data, 8) as usize;
    if function_type >= PARA_PARAM_BYTES.len() {
        return Err(Error::CorruptedData(format!(
            "unknown parametric function type: {function_type}"
        )));
    }
    let param_bytes = PARA_PARAM_BYTES[function_type];
    if data.len() < 12 + param_bytes {
        return Err(Error::CorruptedData(format!(
            "parametric curve type {function_type} needs {param_bytes} parameter bytes"
        )));
    }

    let param = |i: usize| bytes::read_fixed(data, 12 + 4 * i);
    let mut tf = TransferFunction {
        g: param(0),
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 0.0,
        e: 0.0,
        f: 0.0,
    };
    match function_type {
        0 => {}
        1 => {
            tf.a = param(1);
            tf.b = param(2);
            if tf.a == 0.0 {
                return Err(Error::CorruptedData(
                    "parametric curve with a = 0".to_string(),
                ));
            }
            tf.d = -tf.b / tf.a;
        }
        2 => {
            tf.a = param(1);
            tf.b = param(2);
            tf.e = param(3);
            if tf.a == 0.0 {
                return Err(Error::CorruptedData(
                    "parametric curve with a = 0".to_string(),
                ));
            }
            tf.d = -tf.b / tf.a;
            tf.f = tf.e;
        }
        3 => {
            tf.a = param(1);
            tf.b = param(2);
            tf.c = param(3);
            tf.d = param(4);
        }
        4 => {
            tf.a = param(1);
            tf.b = param(2);
            tf.c = param(3);
            tf.d = param(4);
            tf.e = param(5);
            tf.f = param(6);
        }
        _ => unreachable!(),
    }

    Ok((Curve::Parametric(tf), 12 + param_bytes))
}

fn decode_curv(data: &[u8]) -> Result<(Curve<'_>, usize)> {
    if data.len() < 12 {
        return Err(Error::CorruptedData("curv header truncated".to_string()));
    }

    let value_count = bytes::read_u32(data, 8);
    // Widened so a huge count cannot wrap the size check.
    if (data.len() as u64) < 12 + 2 * value_count as u64 {
        return Err(Error::CorruptedData(format!(
            "curv table needs {value_count} entries"
        )));
    }

    match value_count {
        // Empty tables are shorthand for linear
        0 => Ok((Curve::Parametric(TransferFunction::identity()), 12)),
        // Single entry tables are shorthand for simple gamma
        1 => {
            let gamma = U8Fixed8::from_be_bytes([data[12], data[13]]).to_f64();
            Ok((Curve::Parametric(TransferFunction::with_gamma(gamma)), 14))
        }
        _ => {
            let end = 12 + 2 * value_count as usize;
            Ok((Curve::Table16(&data[12..end]), end))
        }
    }
}
