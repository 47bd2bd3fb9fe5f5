//! Seven-parameter transfer functions and curve fitting
//!
//! The transfer function is the piecewise form used by ICC parametric
//! curves:
//!
//! ```text
//! y = (a·x + b)^g + e   for x ≥ d
//! y = c·x + f           for x < d
//! ```
//!
//! `fit_samples` approximates a sampled tonal curve with this form. The
//! breakpoint and the linear segment are solved outside the nonlinear
//! problem: candidate breakpoints are swept, the linear head is fit by
//! ordinary least squares, and the exponential segment is refined by
//! Gauss–Newton with the additive term pinned so the two pieces meet at
//! the breakpoint.

use crate::math::matrix::Matrix3x3;

/// Upper bound on Gauss–Newton refinement passes per breakpoint candidate.
const MAX_REFINE_STEPS: usize = 10;

/// Step-halving attempts before a refinement pass gives up.
const MAX_BACKTRACKS: usize = 4;

/// How far a sample may sit from the least-squares line before the prefix
/// stops being a plausible linear head.
const LINEAR_SLACK: f64 = 1.0 / 256.0;

/// A seven-parameter piecewise transfer function
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferFunction {
    pub g: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl TransferFunction {
    /// The identity map `y = x`
    pub const fn identity() -> Self {
        Self {
            g: 1.0,
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 0.0,
            e: 0.0,
            f: 0.0,
        }
    }

    /// A pure power curve `y = x^g`
    pub const fn with_gamma(g: f64) -> Self {
        Self {
            g,
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 0.0,
            e: 0.0,
            f: 0.0,
        }
    }

    /// The sRGB (IEC 61966-2-1) transfer function
    pub fn srgb() -> Self {
        Self {
            g: 2.4,
            a: 1.0 / 1.055,
            b: 0.055 / 1.055,
            c: 1.0 / 12.92,
            d: 0.04045,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Evaluate the transfer function
    ///
    /// The input is not clamped. A negative power base is clamped to zero
    /// so finite coefficients never produce NaN on [0, 1].
    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        if x < self.d {
            self.c * x + self.f
        } else {
            (self.a * x + self.b).max(0.0).powf(self.g) + self.e
        }
    }

    /// True when every coefficient is finite
    pub fn is_finite(&self) -> bool {
        [self.g, self.a, self.b, self.c, self.d, self.e, self.f]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Fit a transfer function to uniformly spaced samples of a curve on [0, 1].
///
/// Returns the fitted function and its maximum absolute error over the
/// samples, or `None` when no acceptable fit exists (divergence, non-finite
/// intermediates, non-positive `a`/`g`, or an error above `tolerance`).
pub(crate) fn fit_samples(
    ys: &[f64],
    tolerance: Option<f64>,
) -> Option<(TransferFunction, f64)> {
    let n = ys.len();
    if n < 2 || ys.iter().any(|y| !y.is_finite()) {
        return None;
    }
    let dx = 1.0 / (n - 1) as f64;

    let mut best: Option<(TransferFunction, f64)> = None;
    for linear_len in 0..=linear_prefix_len(ys, dx) {
        let Some(tf) = fit_with_break(ys, dx, linear_len) else {
            continue;
        };
        if !tf.is_finite() || tf.a <= 0.0 || tf.g <= 0.0 {
            continue;
        }
        let err = max_abs_error(ys, dx, &tf);
        if !err.is_finite() {
            continue;
        }
        if best.as_ref().is_none_or(|(_, e)| err < *e) {
            best = Some((tf, err));
        }
    }

    match (best, tolerance) {
        (Some((_, err)), Some(tol)) if err > tol => None,
        (best, _) => best,
    }
}

/// Longest sample prefix that still fits one line to within `LINEAR_SLACK`.
///
/// Every breakpoint candidate up to this length is worth trying; beyond it
/// the head is demonstrably curved.
fn linear_prefix_len(ys: &[f64], dx: f64) -> usize {
    let n = ys.len();
    let mut len = 2;
    while len < n {
        let Some((c, f)) = linear_least_squares(ys, dx, len + 1) else {
            break;
        };
        let worst = (0..=len)
            .map(|i| (ys[i] - (c * i as f64 * dx + f)).abs())
            .fold(0.0, f64::max);
        if worst > LINEAR_SLACK {
            break;
        }
        len += 1;
    }
    len.min(n)
}

/// Ordinary least squares over the first `count` samples.
fn linear_least_squares(ys: &[f64], dx: f64, count: usize) -> Option<(f64, f64)> {
    let cf = count as f64;
    let mut sx = 0.0;
    let mut sy = 0.0;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (i, y) in ys.iter().take(count).enumerate() {
        let x = i as f64 * dx;
        sx += x;
        sy += y;
        sxx += x * x;
        sxy += x * y;
    }
    let det = cf * sxx - sx * sx;
    if det.abs() < 1e-15 {
        return None;
    }
    let c = (cf * sxy - sx * sy) / det;
    let f = (sy - c * sx) / cf;
    Some((c, f))
}

/// Fit with the first `linear_len` samples on the linear segment.
fn fit_with_break(ys: &[f64], dx: f64, linear_len: usize) -> Option<TransferFunction> {
    let n = ys.len();

    let (c, f, d) = if linear_len < 2 {
        // No usable linear head; everything goes through the power segment.
        (0.0, 0.0, 0.0)
    } else {
        let (c, f) = linear_least_squares(ys, dx, linear_len)?;
        (c, f, (linear_len - 1) as f64 * dx)
    };

    if linear_len == n {
        // The whole curve is the line. Keep the power branch continuous at
        // x = 1 where it takes over.
        return Some(TransferFunction {
            g: 1.0,
            a: 1.0,
            b: 0.0,
            c,
            d: 1.0,
            e: c + f - 1.0,
            f,
        });
    }

    // A three-parameter solve needs a few samples to push against.
    if n - linear_len < 4 {
        return None;
    }

    refine_exponential(ys, dx, linear_len, c, d, f)
}

/// The power segment with a clamped base.
#[inline]
fn power_term(g: f64, a: f64, b: f64, x: f64) -> f64 {
    let base = a * x + b;
    if base > 0.0 { base.powf(g) } else { 0.0 }
}

/// Gauss–Newton refinement of (g, a, b) over the samples past the linear
/// head. The additive term is pinned by continuity: the power segment must
/// pass through the linear segment's value at the breakpoint, so it moves
/// with every step but cannot detach the two pieces.
fn refine_exponential(
    ys: &[f64],
    dx: f64,
    start: usize,
    c: f64,
    d: f64,
    f_lin: f64,
) -> Option<TransferFunction> {
    let n = ys.len();
    // Value the power segment must take at the breakpoint.
    let k = c * d + f_lin;

    let mid = (start + n - 1) / 2;
    let xm = mid as f64 * dx;
    let ym = ys[mid];
    let mut g = if xm > 0.0 && xm < 1.0 && ym > 1e-6 {
        (ym.ln() / xm.ln()).clamp(0.2, 10.0)
    } else {
        2.0
    };
    let mut a = 1.0;
    let mut b = 0.0;

    let mut resid = residual_norm(ys, dx, start, g, a, b, d, k)?;
    for _ in 0..MAX_REFINE_STEPS {
        let (lhs, rhs) = normal_equations(ys, dx, start, g, a, b, d, k)?;
        let step = lhs.inverse()?.multiply_vec(rhs);
        if step.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let mut scale = 1.0;
        let mut accepted = false;
        for _ in 0..MAX_BACKTRACKS {
            let (tg, ta, tb) = (g + scale * step[0], a + scale * step[1], b + scale * step[2]);
            if let Some(r) = residual_norm(ys, dx, start, tg, ta, tb, d, k) {
                if r < resid {
                    g = tg;
                    a = ta;
                    b = tb;
                    resid = r;
                    accepted = true;
                    break;
                }
            }
            scale *= 0.5;
        }
        if !accepted || resid < 1e-14 {
            break;
        }
    }

    let e = k - power_term(g, a, b, d);
    if !(g.is_finite() && a.is_finite() && b.is_finite() && e.is_finite()) {
        return None;
    }
    Some(TransferFunction {
        g,
        a,
        b,
        c,
        d,
        e,
        f: f_lin,
    })
}

/// Squared L2 residual of the pinned power model over samples [start, n).
fn residual_norm(
    ys: &[f64],
    dx: f64,
    start: usize,
    g: f64,
    a: f64,
    b: f64,
    d: f64,
    k: f64,
) -> Option<f64> {
    let anchor = power_term(g, a, b, d);
    let mut sum = 0.0;
    for (i, y) in ys.iter().enumerate().skip(start) {
        let x = i as f64 * dx;
        let r = y - (power_term(g, a, b, x) - anchor + k);
        sum += r * r;
    }
    sum.is_finite().then_some(sum)
}

/// Build the 3x3 normal equations JᵀJ·Δ = Jᵀr for one Gauss–Newton step.
fn normal_equations(
    ys: &[f64],
    dx: f64,
    start: usize,
    g: f64,
    a: f64,
    b: f64,
    d: f64,
    k: f64,
) -> Option<(Matrix3x3, [f64; 3])> {
    // Partials of the anchor term, reused for every sample.
    let anchor = power_term(g, a, b, d);
    let base_d = a * d + b;
    let (anchor_dg, anchor_da, anchor_db) = if base_d > 0.0 {
        let p1 = base_d.powf(g - 1.0);
        (anchor * base_d.ln(), g * d * p1, g * p1)
    } else {
        (0.0, 0.0, 0.0)
    };

    let mut lhs = Matrix3x3::zero();
    let mut rhs = [0.0; 3];
    for (i, y) in ys.iter().enumerate().skip(start) {
        let x = i as f64 * dx;
        let base = a * x + b;
        let (value, jg, ja, jb) = if base > 0.0 {
            let p = base.powf(g);
            let p1 = base.powf(g - 1.0);
            (p, p * base.ln(), g * x * p1, g * p1)
        } else {
            (0.0, 0.0, 0.0, 0.0)
        };
        let r = y - (value - anchor + k);
        let j = [jg - anchor_dg, ja - anchor_da, jb - anchor_db];
        for row in 0..3 {
            for col in 0..3 {
                lhs.m[row][col] += j[row] * j[col];
            }
            rhs[row] += j[row] * r;
        }
    }

    let finite = lhs.m.iter().flatten().all(|v| v.is_finite())
        && rhs.iter().all(|v| v.is_finite());
    finite.then_some((lhs, rhs))
}

/// Maximum absolute error of the fit across all samples.
fn max_abs_error(ys: &[f64], dx: f64, tf: &TransferFunction) -> f64 {
    ys.iter()
        .enumerate()
        .map(|(i, y)| (y - tf.eval(i as f64 * dx)).abs())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tf: &TransferFunction, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| tf.eval(i as f64 / (n - 1) as f64))
            .collect()
    }

    #[test]
    fn test_eval_identity() {
        let id = TransferFunction::identity();
        for i in 0..=16 {
            let x = i as f64 / 16.0;
            assert_eq!(id.eval(x), x);
        }
    }

    #[test]
    fn test_eval_srgb_piecewise() {
        let srgb = TransferFunction::srgb();
        // Linear segment below the breakpoint
        assert!((srgb.eval(0.02) - 0.02 / 12.92).abs() < 1e-12);
        // Power segment above it
        let expected = ((0.5 + 0.055) / 1.055_f64).powf(2.4);
        assert!((srgb.eval(0.5) - expected).abs() < 1e-12);
        // Endpoints
        assert_eq!(srgb.eval(0.0), 0.0);
        assert!((srgb.eval(1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_eval_never_nan_on_unit_interval() {
        // A negative power base must not leak NaN.
        let tf = TransferFunction {
            g: 2.0,
            a: 1.0,
            b: -0.5,
            c: 0.0,
            d: 0.0,
            e: 0.0,
            f: 0.0,
        };
        for i in 0..=64 {
            let x = i as f64 / 64.0;
            assert!(tf.eval(x).is_finite());
        }
    }

    #[test]
    fn test_fit_identity_samples() {
        let ys: Vec<f64> = (0..256).map(|i| i as f64 / 255.0).collect();
        let (tf, err) = fit_samples(&ys, None).unwrap();
        assert!(err < 1e-9, "identity fit error {err}");
        for i in 0..256 {
            let x = i as f64 / 255.0;
            assert!((tf.eval(x) - x).abs() < 1e-6);
        }
    }

    #[test]
    fn test_fit_pure_gamma() {
        let ys = sample(&TransferFunction::with_gamma(2.2), 256);
        let (tf, err) = fit_samples(&ys, None).unwrap();
        assert!(err < 1e-4, "gamma fit error {err}");
        assert!(tf.g > 0.0 && tf.a > 0.0);
        assert!((tf.g - 2.2).abs() < 0.05, "fitted g = {}", tf.g);
    }

    #[test]
    fn test_fit_srgb_samples() {
        let ys = sample(&TransferFunction::srgb(), 256);
        let (tf, err) = fit_samples(&ys, None).unwrap();
        assert!(err < 1.0 / 512.0, "srgb fit error {err}");
        assert!(tf.a > 0.0 && tf.g > 0.0);
        // The fitted curve tracks the original everywhere, not just at
        // the fit samples.
        for i in 0..=1000 {
            let x = i as f64 / 1000.0;
            assert!((tf.eval(x) - TransferFunction::srgb().eval(x)).abs() < 1.0 / 256.0);
        }
    }

    #[test]
    fn test_fit_respects_tolerance() {
        let ys = sample(&TransferFunction::srgb(), 256);
        assert!(fit_samples(&ys, Some(1e-12)).is_none());
        assert!(fit_samples(&ys, Some(0.5)).is_some());
    }

    #[test]
    fn test_fit_rejects_garbage() {
        assert!(fit_samples(&[], None).is_none());
        assert!(fit_samples(&[0.5], None).is_none());
        assert!(fit_samples(&[0.0, f64::NAN, 1.0], None).is_none());
    }

    #[test]
    fn test_fit_two_point_table() {
        let (tf, err) = fit_samples(&[0.0, 1.0], None).unwrap();
        assert!(err < 1e-9);
        assert!((tf.eval(0.5) - 0.5).abs() < 1e-6);
    }
}
