//! The fixed-point engine.
//!
//! Multiplication only: both inputs are decomposed to minimal-precision sign-magnitude fixed
//! point, the significands are multiplied in 64-bit integer arithmetic, and the exponents are
//! added. The exponent is exact always; the significand is exact as long as the product fits
//! in 63 bits, which the caller guarantees by pre-rounding the inputs (the multiply silently
//! wraps otherwise). The result feeds the kernel's integer-significand entry point.

use crate::codec;

/// Computes `x · y` as `(m, exp)` with the product equal to `m · 2^exp`.
///
/// Both inputs must be finite. The caller must ensure the significand product fits 63 bits and
/// must not rely on more than `p ≤ 63` bits.
#[inline]
pub fn mul(x: f64, y: f64, p: u32) -> (i64, i32) {
  debug_assert!(p <= 63, "mul: requested precision exceeds the fixed-point capability");

  let (xm, xexp) = codec::to_fixed(x);
  let (ym, yexp) = codec::to_fixed(y);

  (xm.wrapping_mul(ym), xexp + yexp)
}
