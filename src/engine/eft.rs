//! The error-free-transformation engine.
//!
//! Each operation is decomposed into a pair `(high, low)` where `high` is the round-to-nearest
//! double result and `low` the signed residual, with `high + low` equal to the exact result
//! (for add/sub/mul exactly; for div/sqrt/fma the residual is accurate enough to carry the
//! exact result's sign and sticky information, which is all round-to-odd needs). The pair is
//! then collapsed to the round-to-odd result by pure bit manipulation. No FPU state is ever
//! touched, which makes this the portable engine of choice.

use super::Engine;
use crate::utl::unlikely;

/// Marker type for the error-free-transformation engine.
pub struct Eft;

/// Knuth's TwoSum with the magnitude-ordering branch: `s + t == x + y` exactly, `s` is the
/// round-to-nearest sum, `|t| ≤ ulp(s)/2`.
#[inline]
pub(super) fn two_sum(x: f64, y: f64) -> (f64, f64) {
  let swap = x.abs() < y.abs();
  let a = if swap { y } else { x };
  let b = if swap { x } else { y };

  let s = a + b;
  let t = b - (s - a);
  (s, t)
}

/// TwoProd via FMA: `p + e == x · y` exactly.
#[inline]
pub(super) fn two_prod(x: f64, y: f64) -> (f64, f64) {
  let p = x * y;
  let e = x.mul_add(y, -p);
  (p, e)
}

/// Division with residual: `q` is the round-to-nearest quotient and `r` approximates
/// `(x - q·y) / y`. The numerator is exact (a classical fact about the division residual), so
/// `r` has the exact error's sign and is zero iff the division was exact.
#[inline]
pub(super) fn two_div(x: f64, y: f64) -> (f64, f64) {
  let q = x / y;
  let r = -q.mul_add(y, -x) / y;
  (q, r)
}

/// Square root with residual: `r1` is the round-to-nearest root and `r2` approximates
/// `(x - r1²) / 2r1`, again with an exact numerator.
#[inline]
pub(super) fn two_sqrt(x: f64) -> (f64, f64) {
  let r1 = x.sqrt();
  let r2 = (-r1).mul_add(r1, x) / (2.0 * r1);
  (r1, r2)
}

/// Fused multiply-add with residual, after Boldo and Muller: `r1` is the round-to-nearest
/// result of `x·y + z` and `r2` a bounded-error approximation of the remainder.
#[inline]
pub(super) fn two_fma(x: f64, y: f64, z: f64) -> (f64, f64) {
  let r1 = x.mul_add(y, z);
  let (u1, u2) = two_prod(x, y);
  let (a1, a2) = two_sum(z, u2);
  let (b1, b2) = two_sum(u1, a1);
  let g = (b1 - r1) + b2;
  let r2 = g + a2;
  (r1, r2)
}

/// Collapses an EFT pair to the round-to-odd result.
///
/// Write rtz for the 53-bit round-toward-zero of the exact result `high + low`. Three cases:
///
///   - `low == 0`: the result is exact, nothing to round.
///   - `low` has `high`'s sign: the exact result lies between `high` and the next double away
///     from zero, so `high` *is* rtz; jam its LSB to 1 and we have round-to-odd (if the LSB was
///     already 1, `high` itself is the odd neighbor).
///   - `low` has the opposite sign: the exact result lies between `high` and the next double
///     toward zero, so `high` is one ulp past rtz toward infinity; step its magnitude down one
///     ulp (a plain decrement of the payload bits, whatever the sign), then jam.
#[inline]
fn finalize_odd(high: f64, low: f64) -> f64 {
  debug_assert!(high.is_finite(), "finalize_odd: high part is not finite");
  debug_assert!(low.is_finite(), "finalize_odd: low part is not finite");

  if low == 0.0 {
    return high;
  }

  let mut b = high.to_bits();
  if high.is_sign_negative() != low.is_sign_negative() {
    b -= 1;
  }
  f64::from_bits(b | 1)
}

impl Engine for Eft {
  fn add(x: f64, y: f64, p: u32) -> f64 {
    debug_assert!(p <= 53, "add: requested precision exceeds double-precision capability");
    if unlikely(!x.is_finite() || !y.is_finite()) {
      return x + y;
    }
    let (s, t) = two_sum(x, y);
    finalize_odd(s, t)
  }

  fn sub(x: f64, y: f64, p: u32) -> f64 {
    debug_assert!(p <= 53, "sub: requested precision exceeds double-precision capability");
    if unlikely(!x.is_finite() || !y.is_finite()) {
      return x - y;
    }
    let (s, t) = two_sum(x, -y);
    finalize_odd(s, t)
  }

  fn mul(x: f64, y: f64, p: u32) -> f64 {
    debug_assert!(p <= 53, "mul: requested precision exceeds double-precision capability");
    if unlikely(!x.is_finite() || !y.is_finite()) {
      return x * y;
    }
    let (s, t) = two_prod(x, y);
    finalize_odd(s, t)
  }

  fn div(x: f64, y: f64, p: u32) -> f64 {
    debug_assert!(p <= 53, "div: requested precision exceeds double-precision capability");
    if unlikely(!x.is_finite() || !y.is_finite() || y == 0.0) {
      return x / y;
    }
    let (q, r) = two_div(x, y);
    finalize_odd(q, r)
  }

  fn sqrt(x: f64, p: u32) -> f64 {
    debug_assert!(p <= 53, "sqrt: requested precision exceeds double-precision capability");
    if unlikely(!x.is_finite() || x <= 0.0) {
      return x.sqrt();
    }
    let (r1, r2) = two_sqrt(x);
    finalize_odd(r1, r2)
  }

  fn fma(x: f64, y: f64, z: f64, p: u32) -> f64 {
    debug_assert!(p <= 53, "fma: requested precision exceeds double-precision capability");
    if unlikely(!x.is_finite() || !y.is_finite() || !z.is_finite()) {
      return x.mul_add(y, z);
    }
    let (r1, r2) = two_fma(x, y, z);
    finalize_odd(r1, r2)
  }
}
