//! The re-rounding kernel.
//!
//! Both entry points take a value with a known exact decomposition ([`round_double`] a finite
//! double, [`round_fixed`] an integer-significand fixed-point value) and produce the double
//! that correctly rounds it into the target format `(p, n, rm)`:
//!
//!   - `p` is the precision: the number of significand bits kept, counting the leading 1.
//!   - `n`, if present, is the subnormalization position: the first *unrepresentable* bit
//!     position, so every significant bit of a representable value sits strictly above it. An
//!     IEEE-style format with minimum normalized exponent emin has `n = emin - p`.
//!   - `rm` is any of the eight [rounding modes](crate::round::RoundingMode).
//!
//! Along the way the kernel raises the flags the rounding deserves (inexact, the tininess and
//! underflow pairs, carry), filtered through the compile-time mask `MASK` (see
//! [`crate::flags`]). The rounded value itself never depends on the mask.
//!
//! This module is documented in quite some detail, because everything subtle in the whole
//! crate happens here; the arithmetic engines only exist to feed it inputs it can round
//! without consulting the exact result.

use crate::codec;
use crate::flags::{raise_masked, Flags};
use crate::round::{to_rounding_bits, RoundingBits, RoundingDirection, RoundingMode};
use crate::utl::unlikely;

/// The lowest `k` bits.
#[inline]
const fn mask(k: u32) -> u64 {
  debug_assert!(k < 64);
  (1u64 << k) - 1
}

/// Rounds a finite double into the format `(p, n, rm)`. Non-finite inputs are returned
/// untouched with no flags raised.
pub fn round_double<const MASK: u32>(x: f64, p: u32, n: Option<i32>, rm: RoundingMode) -> f64 {
  if unlikely(!x.is_finite()) {
    return x;
  }

  // Decompose to a normalized 53-bit significand and normalized exponent. This mirrors
  // `codec::unpack`, but normalizing subnormals on the way so `finalize` sees one shape.
  let b = x.to_bits();
  let s = b >> 63 != 0;
  let ebits = (b >> codec::M) & 0x7ff;
  let mbits = b & codec::MANT_MASK;

  let (e, c) = if unlikely(ebits == 0) {
    if mbits == 0 {
      (0, 0)
    } else {
      // Subnormal: shift the leading 1 up to bit 52 and charge the shift to the exponent.
      let lz = mbits.leading_zeros() - (64 - codec::P);
      (codec::EMIN - lz as i32, mbits << lz)
    }
  } else {
    (ebits as i32 - codec::BIAS, codec::IMPLICIT1 | mbits)
  };

  finalize::<{ codec::P }, MASK>(s, e, c, p, n, rm)
}

/// Rounds the fixed-point value `m · 2^exp` into the format `(p, n, rm)`.
pub fn round_fixed<const MASK: u32>(m: i64, exp: i32, p: u32, n: Option<i32>, rm: RoundingMode) -> f64 {
  const PREC: u32 = 63;

  if m == 0 {
    return finalize::<PREC, MASK>(false, 0, 0, p, n, rm);
  }

  // Decompose into sign-magnitude. i64::MIN has no 63-bit magnitude; halving it (shifting the
  // exponent up) yields one exactly.
  let (s, c, exp) = if unlikely(m == i64::MIN) {
    (true, 1u64 << (PREC - 1), exp + 1)
  } else if m < 0 {
    (true, (-m) as u64, exp)
  } else {
    (false, m as u64, exp)
  };

  // The significand may carry anywhere from 1 to 63 bits; normalize to exactly 63.
  let lz = c.leading_zeros() - (64 - PREC);
  let c = c << lz;
  let exp = exp - lz as i32;

  let e = exp + (PREC as i32 - 1);
  finalize::<PREC, MASK>(s, e, c, p, n, rm)
}

/// The generic rounding core: `(-1)^s · c · 2^(e - P + 1)` with `c` normalized to exactly `P`
/// bits (or zero) is rounded to `p` bits above position `n`.
fn finalize<const P: u32, const MASK: u32>(
  s: bool,
  e: i32,
  c: u64,
  p: u32,
  n: Option<i32>,
  rm: RoundingMode,
) -> f64 {
  const { assert!(P == 53 || P == 63) }
  debug_assert!(p >= 1 && p <= 53, "finalize: target precision out of range");

  // Zero rounds to zero in every format, and is tiny both before and after rounding.
  if c == 0 {
    raise_masked::<MASK>(Flags::TINY_BEFORE | Flags::TINY_AFTER);
    return if s { -0.0 } else { 0.0 };
  }
  debug_assert!(c >> (P - 1) == 1, "finalize: significand must be normalized");

  // Subnormalization analysis. A value below the minimum normalized exponent emin = n + p
  // keeps fewer than p bits: one fewer for each binade below emin. `overshift` is the extreme
  // case where even the leading bit is below the representable range; the exponent is then
  // clamped to n, so that an increment carries into exactly the minimum subnormal, 2^(n+1).
  let e_before = e;
  let mut e = e;
  let mut p_kept = p;
  let mut emin = i32::MIN;
  let mut tiny_before = false;
  let mut overshift = false;
  if let Some(n) = n {
    emin = n + p as i32;
    if e < emin {
      tiny_before = true;
      raise_masked::<MASK>(Flags::TINY_BEFORE);
      let shift = (emin - e) as u32;
      if shift > p {
        overshift = true;
        p_kept = 0;
        e = n;
      } else {
        p_kept = p - shift;
      }
    }
  }

  // Split the P-bit significand into the bits the format keeps and the bits it loses. The
  // kept bits stay at their P-bit positions; only the final encode shifts them down.
  let p_lost = P - p_kept;
  let c_lost = c & mask(p_lost);
  let mut c_kept = c - c_lost;

  // Nothing lost: the value is representable. It may still be tiny (an exact subnormal), in
  // which case it is tiny after rounding too, trivially.
  if c_lost == 0 {
    if tiny_before {
      raise_masked::<MASK>(Flags::TINY_AFTER);
    }
    return encode::<P>(s, e, c_kept);
  }

  raise_masked::<MASK>(Flags::INEXACT);
  if tiny_before {
    raise_masked::<MASK>(Flags::UNDERFLOW_BEFORE);
  }

  // Tininess after rounding asks: would the value rounded to p bits with no exponent bound
  // still be below 2^emin? Three cases, from the pre-increment state:
  //
  //   - At least one binade below emin, the rounded value cannot reach 2^emin.
  //   - In the top binade below emin (e == emin - 1), if c is at most the largest p-bit
  //     significand (the cutoff, which is odd in its last place), monotonicity caps the
  //     rounded value at the cutoff's value, below 2^emin.
  //   - Above the cutoff, the unbounded rounding is a genuine tie-breaker between the cutoff
  //     and 2^emin: re-run the increment decision at the unbounded split (one position lower
  //     than the bounded one), with the kept LSB odd because the cutoff is. Tiny iff it does
  //     not increment.
  if MASK & (Flags::TINY_AFTER | Flags::UNDERFLOW_AFTER) != 0 && tiny_before {
    let tiny_after = if e_before < emin - 1 {
      true
    } else {
      let cutoff = mask(p) << (P - p);
      c <= cutoff || !dry_run_increment(c, p_lost - 1, rm, s)
    };
    if tiny_after {
      raise_masked::<MASK>(Flags::TINY_AFTER | Flags::UNDERFLOW_AFTER);
    }
  }

  // The increment decision. For the nearest modes, classify the lost bits against the halfway
  // point; an overshifted value sits strictly below half of the smallest representable value,
  // whatever its bits say, so it classifies as below. Ties, and every inexact case of the
  // directed modes, defer to the rounding direction, which may consult the kept LSB.
  let odd = (c_kept >> p_lost) & 1 == 1;
  let rb = if unlikely(overshift) {
    RoundingBits::BelowHalfway
  } else {
    let half = 1u64 << (p_lost - 1);
    to_rounding_bits(c_lost & half != 0, c_lost & (half - 1) != 0)
  };

  if round_increment(rb, rm, s, odd) {
    c_kept += 1u64 << p_lost;
    if c_kept == 1u64 << P {
      // The significand overflowed into bit P: the result is the next binade's power of two.
      // Architecturally this is a carry-out, but only when the rounding started at or above
      // emin; inside subnormal territory there is no carry chain to speak of.
      c_kept >>= 1;
      e += 1;
      if e_before >= emin || n.is_none() {
        raise_masked::<MASK>(Flags::CARRY);
      }
    }
  }

  encode::<P>(s, e, c_kept)
}

/// Replays the increment decision for the tiny-after dry run: same value, split one position
/// lower, kept LSB known odd.
fn dry_run_increment(c: u64, p_lost: u32, rm: RoundingMode, s: bool) -> bool {
  debug_assert!(p_lost >= 1);
  let lo = c & mask(p_lost);
  debug_assert!(lo != 0, "dry run is only reached for inexact unbounded roundings");

  let half = 1u64 << (p_lost - 1);
  let rb = to_rounding_bits(lo & half != 0, lo & (half - 1) != 0);
  round_increment(rb, rm, s, true)
}

/// Whether rounding moves the kept significand up by one unit in its last place.
#[inline]
fn round_increment(rb: RoundingBits, rm: RoundingMode, s: bool, odd: bool) -> bool {
  if rm.is_nearest() {
    match rb {
      RoundingBits::AboveHalfway => true,
      RoundingBits::Halfway => direction_increments(rm.direction(s), odd),
      RoundingBits::BelowHalfway | RoundingBits::Exact => false,
    }
  } else if rb != RoundingBits::Exact {
    direction_increments(rm.direction(s), odd)
  } else {
    false
  }
}

/// Whether the rounding direction, given the kept LSB, points away from zero.
#[inline]
fn direction_increments(dir: RoundingDirection, odd: bool) -> bool {
  match dir {
    RoundingDirection::ToZero => false,
    RoundingDirection::AwayZero => true,
    RoundingDirection::ToEven => odd,
    RoundingDirection::ToOdd => !odd,
  }
}

/// Shifts the `P`-bit significand down to the double's 53 bits and packs.
#[inline]
fn encode<const P: u32>(s: bool, e: i32, c: u64) -> f64 {
  let c = if P > codec::P {
    debug_assert!(c & mask(P - codec::P) == 0, "encode: dropping non-zero low bits");
    c >> (P - codec::P)
  } else {
    c
  };
  codec::pack(s, e, c)
}
