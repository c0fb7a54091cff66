//! Packing and unpacking of IEEE 754 doubles (and floats).
//!
//! The representation used throughout the crate is the triple `(s, exp, c)` with
//! `x = (-1)^s · c · 2^exp`, where `c` is an unsigned integer significand and `exp` is the
//! base-2 exponent *of the least significant bit of `c`*. The *normalized* exponent `e`, the
//! one in `(-1)^s · 1.m · 2^e`, relates to it by `e = exp + bit_width(c) - 1`.

use crate::utl::unlikely;

/// Significand bits of an `f64`, counting the implicit leading 1.
pub const P: u32 = 53;

/// Stored mantissa bits of an `f64`.
pub const M: u32 = 52;

/// Exponent bias of an `f64`.
pub const BIAS: i32 = 1023;

/// Minimum normalized exponent of an `f64`.
pub const EMIN: i32 = -1022;

/// Maximum normalized exponent of an `f64`.
pub const EMAX: i32 = 1023;

/// LSB exponent of every zero or subnormal `f64`: `EMIN - (P - 1)`.
pub const EXPMIN: i32 = EMIN - (P as i32 - 1);

pub(crate) const MANT_MASK: u64 = (1 << M) - 1;
pub(crate) const IMPLICIT1: u64 = 1 << M;

/// Unpacks a finite double into `(s, exp, c)` with `x = (-1)^s · c · 2^exp`.
///
/// For zeros and subnormals `exp == EXPMIN`; for normals the implicit leading 1 is materialized
/// in `c`, so `c` is either 0 or has bit width in `1..=53`.
#[inline]
pub fn unpack(x: f64) -> (bool, i32, u64) {
  debug_assert!(x.is_finite(), "unpack: input must be finite");

  let b = x.to_bits();
  let s = b >> 63 != 0;
  let ebits = (b >> M) & 0x7ff;
  let mbits = b & MANT_MASK;

  if unlikely(ebits == 0) {
    // Zero or subnormal: no implicit bit, fixed LSB exponent.
    (s, EXPMIN, mbits)
  } else {
    (s, ebits as i32 - BIAS - M as i32, IMPLICIT1 | mbits)
  }
}

/// Packs `(s, e, c)` into a double, where `e` is the **normalized** exponent and `c` is either
/// zero or exactly [`P`] bits wide.
///
/// No rounding happens here: callers must already have reduced `c` to the bits the format
/// keeps. Results below the minimum normal exponent are subnormalized (the discarded low bits
/// must be zero); results above [`EMAX`] saturate to `±∞`, since a rounding that carries out of
/// the top binade has no finite encoding.
pub fn pack(s: bool, e: i32, c: u64) -> f64 {
  if c == 0 {
    return if s { -0.0 } else { 0.0 };
  }
  debug_assert!(c >> (P - 1) == 1, "pack: significand must be exactly 53 bits wide");

  let (ebits, mbits) = if unlikely(e < EMIN) {
    // Subnormal: the leading bit moves into the stored mantissa.
    let shift = (EMIN - e) as u32;
    if unlikely(shift >= P) {
      debug_assert!(false, "pack: value below the subnormal range");
      return if s { -0.0 } else { 0.0 };
    }
    debug_assert!(c & ((1 << shift) - 1) == 0, "pack: losing digits in subnormalization");
    (0, c >> shift)
  } else if unlikely(e > EMAX) {
    (0x7ff, 0)
  } else {
    ((e + BIAS) as u64, c & MANT_MASK)
  };

  let b = ((s as u64) << 63) | (ebits << M) | mbits;
  f64::from_bits(b)
}

/// Converts a finite double to minimal-precision sign-magnitude fixed point: `(m, exp)` with
/// `x = m · 2^exp` and `m` odd (or zero).
#[inline]
pub fn to_fixed(x: f64) -> (i64, i32) {
  debug_assert!(x.is_finite(), "to_fixed: input must be finite");

  if x == 0.0 {
    return (0, EXPMIN);
  }

  let (s, exp, c) = unpack(x);

  // Strip trailing zeros so that multiplying two of these wastes none of the 63-bit budget.
  let tz = c.trailing_zeros();
  let c = c >> tz;
  let exp = exp + tz as i32;

  let m = if s { -(c as i64) } else { c as i64 };
  (m, exp)
}

/// The normalized exponent of a finite non-zero double (what C's `ilogb` returns).
#[inline]
pub fn ilogb(x: f64) -> i32 {
  debug_assert!(x.is_finite() && x != 0.0, "ilogb: input must be finite and non-zero");
  let (_, exp, c) = unpack(x);
  exp + (63 - c.leading_zeros() as i32)
}

/// Significand bits of an `f32`, counting the implicit leading 1.
pub const P32: u32 = 24;

/// Stored mantissa bits of an `f32`.
pub const M32: u32 = 23;

/// Exponent bias of an `f32`.
pub const BIAS32: i32 = 127;

/// Minimum normalized exponent of an `f32`.
pub const EMIN32: i32 = -126;

/// Maximum normalized exponent of an `f32`.
pub const EMAX32: i32 = 127;

/// LSB exponent of every zero or subnormal `f32`.
pub const EXPMIN32: i32 = EMIN32 - (P32 as i32 - 1);

/// As [`unpack`], for `f32`.
#[inline]
pub fn unpack32(x: f32) -> (bool, i32, u32) {
  debug_assert!(x.is_finite(), "unpack32: input must be finite");

  let b = x.to_bits();
  let s = b >> 31 != 0;
  let ebits = (b >> M32) & 0xff;
  let mbits = b & ((1 << M32) - 1);

  if unlikely(ebits == 0) {
    (s, EXPMIN32, mbits)
  } else {
    (s, ebits as i32 - BIAS32 - M32 as i32, (1 << M32) | mbits)
  }
}

/// As [`pack`], for `f32`: `e` is the normalized exponent, `c` zero or exactly [`P32`] bits.
pub fn pack32(s: bool, e: i32, c: u32) -> f32 {
  if c == 0 {
    return if s { -0.0 } else { 0.0 };
  }
  debug_assert!(c >> (P32 - 1) == 1, "pack32: significand must be exactly 24 bits wide");

  let (ebits, mbits) = if unlikely(e < EMIN32) {
    let shift = (EMIN32 - e) as u32;
    if unlikely(shift >= P32) {
      debug_assert!(false, "pack32: value below the subnormal range");
      return if s { -0.0 } else { 0.0 };
    }
    debug_assert!(c & ((1 << shift) - 1) == 0, "pack32: losing digits in subnormalization");
    (0, c >> shift)
  } else if unlikely(e > EMAX32) {
    (0xff, 0)
  } else {
    ((e + BIAS32) as u32, c & ((1 << M32) - 1))
  };

  let b = ((s as u32) << 31) | (ebits << M32) | mbits;
  f32::from_bits(b)
}

#[cfg(test)]
mod tests {
  use super::*;

  use proptest::prelude::*;

  fn finite_f64() -> impl Strategy<Value = f64> {
    use proptest::num::f64::{NEGATIVE, NORMAL, POSITIVE, SUBNORMAL, ZERO};
    POSITIVE | NEGATIVE | NORMAL | SUBNORMAL | ZERO
  }

  fn finite_f32() -> impl Strategy<Value = f32> {
    use proptest::num::f32::{NEGATIVE, NORMAL, POSITIVE, SUBNORMAL, ZERO};
    POSITIVE | NEGATIVE | NORMAL | SUBNORMAL | ZERO
  }

  #[test]
  fn unpack_examples() {
    assert_eq!(unpack(0.0), (false, EXPMIN, 0));
    assert_eq!(unpack(-0.0), (true, EXPMIN, 0));
    assert_eq!(unpack(1.0), (false, -52, 1 << 52));
    assert_eq!(unpack(-0.75), (true, -53, 0b11 << 51));
    assert_eq!(unpack(f64::MIN_POSITIVE), (false, EXPMIN, 1 << 52));
    // Minimum subnormal.
    assert_eq!(unpack(f64::from_bits(1)), (false, EXPMIN, 1));
    assert_eq!(unpack(f64::MAX), (false, EMAX - 52, (1 << 53) - 1));
  }

  #[test]
  fn pack_examples() {
    assert_eq!(pack(false, 0, 0).to_bits(), 0.0f64.to_bits());
    assert_eq!(pack(true, 0, 0).to_bits(), (-0.0f64).to_bits());
    assert_eq!(pack(false, 0, 1 << 52), 1.0);
    assert_eq!(pack(true, -1, 0b11 << 51), -0.75);
    assert_eq!(pack(false, EMIN, 1 << 52), f64::MIN_POSITIVE);
    // Subnormal: exponent below EMIN shifts the significand down.
    assert_eq!(pack(false, EMIN - 8, 1 << 52), f64::from_bits(1 << 44));
    assert_eq!(pack(false, EMAX, (1 << 53) - 1), f64::MAX);
  }

  #[test]
  fn pack_saturates_above_the_double_range() {
    assert_eq!(pack(false, EMAX + 1, 1 << 52), f64::INFINITY);
    assert_eq!(pack(true, EMAX + 1, 1 << 52), f64::NEG_INFINITY);
    assert_eq!(pack(false, i32::MAX, 1 << 52), f64::INFINITY);
  }

  #[test]
  fn to_fixed_examples() {
    assert_eq!(to_fixed(0.0), (0, EXPMIN));
    assert_eq!(to_fixed(1.0), (1, 0));
    assert_eq!(to_fixed(1.5), (3, -1));
    assert_eq!(to_fixed(-10.0), (-5, 1));
    assert_eq!(to_fixed(f64::from_bits(1)), (1, EXPMIN));
    assert_eq!(to_fixed(-f64::MAX), (-((1i64 << 53) - 1), EMAX - 52));
  }

  #[test]
  fn ilogb_examples() {
    assert_eq!(ilogb(1.0), 0);
    assert_eq!(ilogb(-1.0), 0);
    assert_eq!(ilogb(0.5), -1);
    assert_eq!(ilogb(3.0), 1);
    assert_eq!(ilogb(f64::MIN_POSITIVE), EMIN);
    assert_eq!(ilogb(f64::from_bits(1)), EXPMIN);
    assert_eq!(ilogb(f64::MAX), EMAX);
  }

  #[test]
  fn unpack32_examples() {
    assert_eq!(unpack32(0.0), (false, EXPMIN32, 0));
    assert_eq!(unpack32(1.0), (false, -23, 1 << 23));
    assert_eq!(unpack32(-0.75), (true, -24, 0b11 << 22));
    assert_eq!(unpack32(f32::from_bits(1)), (false, EXPMIN32, 1));
  }

  proptest! {
    #![proptest_config(ProptestConfig::with_cases(crate::PROPTEST_CASES))]

    #[test]
    fn roundtrip_f64(x in finite_f64()) {
      let (s, exp, c) = unpack(x);
      // `unpack` yields the LSB exponent; `pack` wants the normalized one and a full-width
      // significand.
      let (e, c) = if c == 0 {
        (0, 0)
      } else {
        let lz = c.leading_zeros() - (64 - P);
        (exp + (P - 1 - lz) as i32, c << lz)
      };
      prop_assert_eq!(pack(s, e, c).to_bits(), x.to_bits());
    }

    #[test]
    fn roundtrip_f32(x in finite_f32()) {
      let (s, exp, c) = unpack32(x);
      let (e, c) = if c == 0 {
        (0, 0)
      } else {
        let lz = c.leading_zeros() - (32 - P32);
        (exp + (P32 - 1 - lz) as i32, c << lz)
      };
      prop_assert_eq!(pack32(s, e, c).to_bits(), x.to_bits());
    }

    #[test]
    fn to_fixed_is_exact(x in finite_f64()) {
      let (m, exp) = to_fixed(x);
      // `m` is odd (minimal precision) unless zero…
      prop_assert!(m == 0 || m % 2 != 0);
      // …and scaling it back recovers the input exactly (exponent is in range by
      // construction, so the product is exact).
      let back = m as f64 * f64::powi(2.0, exp);
      prop_assert_eq!(back, x);
      prop_assert!(x != 0.0 || back == 0.0);
    }
  }
}
