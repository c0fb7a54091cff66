//! Rounding contexts.
//!
//! A [`Context`] bundles everything the kernel needs to round into a format (precision,
//! subnormalization position, overflow threshold, rounding mode) plus the precision an engine
//! must deliver for safe rerounding, [`round_prec`](Context::round_prec). One product type
//! covers all four format families; the factories [`mp`](Context::mp), [`mps`](Context::mps),
//! [`mpb`](Context::mpb), and [`ieee754`](Context::ieee754) fill in the optional pieces.

use crate::codec;
use crate::flags::{raise_masked, Flags};
use crate::kernel;
use crate::round::{RoundingDirection, RoundingMode};

/// An immutable rounding context. Construct one with a factory, then consult it by reference
/// for as many operations as you like.
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq)]
pub struct Context {
  p: u32,
  n: Option<i32>,
  maxval: Option<f64>,
  maxval_odd: bool,
  rm: RoundingMode,
}

impl Context {
  /// An MPFR-style context: precision `p`, unbounded exponent range, no overflow threshold.
  pub fn mp(p: u32, rm: RoundingMode) -> Self {
    debug_assert!(p >= 1, "mp: precision must be at least 1");
    Context { p, n: None, maxval: None, maxval_odd: false, rm }
  }

  /// An MPFR-style context with a minimum normalized exponent: values below `2^emin` are
  /// subnormalized exactly as IEEE 754 would, with `n = emin - p`.
  pub fn mps(p: u32, emin: i32, rm: RoundingMode) -> Self {
    debug_assert!(p >= 1, "mps: precision must be at least 1");
    Context { p, n: Some(emin - p as i32), maxval: None, maxval_odd: false, rm }
  }

  /// As [`mps`](Self::mps), plus a maximum magnitude: rounded results above `maxval` overflow
  /// to `±maxval` or `±∞` depending on the rounding mode.
  ///
  /// `maxval` must be non-negative, finite, and representable in the format itself (rounding
  /// it must be the identity); violations are programming errors caught in debug builds.
  pub fn mpb(p: u32, emin: i32, maxval: f64, rm: RoundingMode) -> Self {
    let ctx = Self::mps(p, emin, rm);
    debug_assert!(!maxval.is_sign_negative(), "mpb: maxval must be non-negative");
    debug_assert!(maxval.is_finite(), "mpb: maxval must be finite");
    debug_assert!(
      maxval == kernel::round_double::<{ Flags::NONE }>(maxval, p, ctx.n, rm),
      "mpb: maxval must be representable in the format",
    );

    // Record the parity of maxval's last kept significand bit (position p-1 from the top);
    // overflow tie-breaking under the to-even and to-odd directions hinges on it.
    let maxval_odd = p <= codec::P && (maxval.to_bits() >> (codec::P - p)) & 1 == 1;

    Context { maxval: Some(maxval), maxval_odd, ..ctx }
  }

  /// An IEEE 754 binary format with `es` exponent bits and `nbits` bits in total:
  /// `p = nbits - es`, `emax = 2^(es-1) - 1`, `emin = 1 - emax`, and the format's largest
  /// finite value `(2^p - 1) · 2^(emax - p + 1)` as the overflow threshold.
  pub fn ieee754(es: u32, nbits: u32, rm: RoundingMode) -> Self {
    debug_assert!((2..=11).contains(&es), "ieee754: exponent field must have 2 to 11 bits");
    debug_assert!(nbits >= es + 2, "ieee754: too few bits for the format");
    debug_assert!(nbits - es <= codec::P, "ieee754: precision exceeds double-precision capability");

    let p = nbits - es;
    let emax = (1i32 << (es - 1)) - 1;
    let emin = 1 - emax;

    // Largest finite value: all-ones significand at the top exponent, encoded directly.
    let mbits = (((1u64 << (p - 1)) - 1) << (codec::P - p)) & codec::MANT_MASK;
    let ebits = ((emax + codec::BIAS) as u64) << codec::M;
    let maxval = f64::from_bits(ebits | mbits);

    Self::mpb(p, emin, maxval, rm)
  }

  /// The precision of this format.
  pub fn prec(&self) -> u32 {
    self.p
  }

  /// The first unrepresentable bit position, if this context subnormalizes.
  pub fn n(&self) -> Option<i32> {
    self.n
  }

  /// The overflow threshold, if this context has one.
  pub fn maxval(&self) -> Option<f64> {
    self.maxval
  }

  /// The rounding mode.
  pub fn rm(&self) -> RoundingMode {
    self.rm
  }

  /// The minimum round-to-odd precision an engine must deliver so that rerounding into this
  /// context is exact.
  pub fn round_prec(&self) -> u32 {
    self.p + 2
  }

  /// Rounds a double into this format, raising flags through `MASK`.
  pub fn round<const MASK: u32>(&self, x: f64) -> f64 {
    let r = kernel::round_double::<MASK>(x, self.p, self.n, self.rm);
    self.round_overflow::<MASK>(r)
  }

  /// Rounds the fixed-point value `m · 2^exp` into this format, raising flags through `MASK`.
  pub fn round_fixed<const MASK: u32>(&self, m: i64, exp: i32) -> f64 {
    let r = kernel::round_fixed::<MASK>(m, exp, self.p, self.n, self.rm);
    self.round_overflow::<MASK>(r)
  }

  /// Saturates a rounded result against `maxval`. The kernel has already rounded to `p` bits,
  /// so the only question left is whether the magnitude cleared the threshold, and if so,
  /// whether this mode sends it to infinity or pins it at `maxval`.
  fn round_overflow<const MASK: u32>(&self, x: f64) -> f64 {
    let Some(maxval) = self.maxval else { return x };
    if !x.is_finite() {
      return x;
    }
    if x.abs() <= maxval {
      return x;
    }

    raise_masked::<MASK>(Flags::OVERFLOW | Flags::INEXACT);

    let sign = x.is_sign_negative();
    let magnitude = if overflow_to_infinity(self.rm, sign, self.maxval_odd) {
      f64::INFINITY
    } else {
      maxval
    };
    if sign { -magnitude } else { magnitude }
  }
}

/// The overflow policy: whether a value beyond `maxval` rounds to infinity rather than
/// saturating, decided by the rounding direction for this sign. Toward zero pins at `maxval`;
/// away from zero escapes to infinity; the parity directions treat infinity as the successor
/// of `maxval` and pick by the parity of `maxval`'s last place.
fn overflow_to_infinity(rm: RoundingMode, sign: bool, maxval_odd: bool) -> bool {
  match rm.direction(sign) {
    RoundingDirection::ToZero => false,
    RoundingDirection::AwayZero => true,
    RoundingDirection::ToEven => maxval_odd,
    RoundingDirection::ToOdd => !maxval_odd,
  }
}
