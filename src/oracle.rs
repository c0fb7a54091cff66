//! Reference rounding over arbitrary-precision rationals, for testing only.
//!
//! This is a **super-explicit** and **super-obvious** rendition of correct rounding: take the
//! exact value as a [`Rational`], find its leading bit by comparison, split it at the target
//! ulp with integer floor division, and decide the increment straight from the definition of
//! each rounding mode. It shares no code and no cleverness with the kernel. That is the point,
//! since this is what we check the optimized implementation against.

use crate::round::RoundingMode;

use malachite::base::num::arithmetic::traits::{Abs, Floor, FloorSqrt, PowerOf2};
use malachite::base::num::logic::traits::SignificantBits;
use malachite::rational::Rational;
use malachite::{Integer, Natural};

/// `floor(log2(x))` for positive `x`: the bit-length difference of numerator and denominator
/// overshoots by at most one, and one comparison settles it.
fn floor_log2(x: &Rational) -> i64 {
  debug_assert!(*x > Rational::from(0));
  let nb = x.numerator_ref().significant_bits() as i64;
  let db = x.denominator_ref().significant_bits() as i64;
  let mut e = nb - db;
  if *x < Rational::power_of_2(e) {
    e -= 1;
  }
  debug_assert!(*x >= Rational::power_of_2(e) && *x < Rational::power_of_2(e + 1));
  e
}

/// Whether this mode, applied to a value of the given sign whose kept significand has the
/// given parity, rounds an inexact value up in magnitude. For the nearest modes this is the
/// tie decision.
fn rounds_up(rm: RoundingMode, sign: bool, odd: bool) -> bool {
  match rm {
    RoundingMode::RNE | RoundingMode::RTE => odd,
    RoundingMode::RNA | RoundingMode::RAZ => true,
    RoundingMode::RTP => !sign,
    RoundingMode::RTN => sign,
    RoundingMode::RTZ => false,
    RoundingMode::RTO => !odd,
  }
}

/// Correctly rounds the exact value into the format `(p, n, rm)`, staying exact: the result is
/// the rounded value as a rational, with no exponent bound applied.
pub fn reference_round(exact: &Rational, p: u32, n: Option<i32>, rm: RoundingMode) -> Rational {
  let zero = Rational::from(0);
  if *exact == zero {
    return zero;
  }

  let sign = *exact < zero;
  let a = exact.abs();
  let e = floor_log2(&a);

  // The ulp position: p significant bits end at e - p + 1, but never below the first
  // representable position n + 1.
  let mut q = e - (i64::from(p) - 1);
  if let Some(n) = n {
    q = q.max(i64::from(n) + 1);
  }

  // Split |exact| = m · 2^q + remainder, with 0 ≤ remainder < 2^q.
  let t = a / Rational::power_of_2(q);
  let floor: Integer = (&t).floor();
  let m = u64::try_from(&floor).expect("reference_round: significand exceeds 64 bits");
  let rem = t - Rational::from(m);

  let increment = if rem == zero {
    false
  } else if rm.is_nearest() {
    let half = Rational::from_signeds(1, 2);
    match rem.cmp(&half) {
      core::cmp::Ordering::Less => false,
      core::cmp::Ordering::Greater => true,
      core::cmp::Ordering::Equal => rounds_up(rm, sign, m % 2 == 1),
    }
  } else {
    rounds_up(rm, sign, m % 2 == 1)
  };

  let m = m + u64::from(increment);
  let magnitude = Rational::from(m) * Rational::power_of_2(q);
  if sign { -magnitude } else { magnitude }
}

/// Whether `got` is the correct rounding of `exact` into `(p, n, rm)`, allowing for the one
/// divergence between rationals and doubles: a rounded value beyond the double range shows up
/// as an infinity of the right sign.
pub fn is_correct_rounded(exact: &Rational, p: u32, n: Option<i32>, rm: RoundingMode, got: f64) -> bool {
  let expected = reference_round(exact, p, n, rm);

  if got.is_nan() {
    return false;
  }
  if got.is_infinite() {
    let limit = Rational::try_from(f64::MAX).unwrap();
    return (&expected).abs() > limit && (got < 0.0) == (expected < Rational::from(0));
  }
  if got == 0.0 {
    // Sign of zero is checked by dedicated unit tests; the rational zero has none.
    return expected == Rational::from(0);
  }
  Rational::try_from(got).map_or(false, |r| r == expected)
}

/// Whether `got` correctly rounds `√x` into `(p, n, rm)`, for finite positive `x`.
///
/// The root is irrational unless `x` is a dyadic square, so it cannot be a `Rational`, but it
/// does not need to be. Compute the integer square root with 64 guard bits; if it is inexact,
/// the root lies strictly inside a gap of width 2^-64 ulps that contains no representable
/// value and no halfway point of any format with `p ≤ 53`, so the gap's midpoint (a dyadic
/// rational) rounds identically to the root itself.
pub fn sqrt_is_correct_rounded(x: f64, p: u32, n: Option<i32>, rm: RoundingMode, got: f64) -> bool {
  debug_assert!(x.is_finite() && x > 0.0);
  const G: u64 = 64;

  let (m, exp) = crate::codec::to_fixed(x);

  // Make the exponent even by widening the significand, so the root's exponent is integral.
  let (a, half_exp) = if exp % 2 != 0 {
    ((m as u64) << 1, (exp - 1) / 2)
  } else {
    (m as u64, exp / 2)
  };

  let scaled = Natural::from(a) << (2 * G);
  let root = (&scaled).floor_sqrt();
  let is_exact = &root * &root == scaled;

  let unit = i64::from(half_exp) - G as i64;
  let lower = Rational::from(root) * Rational::power_of_2(unit);
  let value = if is_exact {
    lower
  } else {
    lower + Rational::power_of_2(unit - 1)
  };

  is_correct_rounded(&value, p, n, rm, got)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::round::RoundingMode::*;

  fn rational(x: f64) -> Rational {
    Rational::try_from(x).unwrap()
  }

  #[test]
  fn floor_log2_examples() {
    assert_eq!(floor_log2(&rational(1.0)), 0);
    assert_eq!(floor_log2(&rational(1.5)), 0);
    assert_eq!(floor_log2(&rational(2.0)), 1);
    assert_eq!(floor_log2(&rational(0.5)), -1);
    assert_eq!(floor_log2(&rational(0.75)), -1);
    assert_eq!(floor_log2(&Rational::from_signeds(1, 3)), -2);
    assert_eq!(floor_log2(&Rational::from_signeds(7, 3)), 1);
  }

  #[test]
  fn reference_round_examples() {
    // 1.25 at p = 2: the grid case.
    assert_eq!(reference_round(&rational(1.25), 2, None, RNE), rational(1.0));
    assert_eq!(reference_round(&rational(1.25), 2, None, RNA), rational(1.5));
    assert_eq!(reference_round(&rational(1.25), 2, None, RTO), rational(1.5));
    assert_eq!(reference_round(&rational(1.25), 2, None, RTE), rational(1.0));

    // Subnormalization: 0.75 with one representable position above -1.
    assert_eq!(reference_round(&rational(0.75), 8, Some(-1), RNE), rational(1.0));
    assert_eq!(reference_round(&rational(0.5), 8, Some(-1), RNE), rational(0.0));
    assert_eq!(reference_round(&rational(0.5), 8, Some(-1), RAZ), rational(1.0));

    // Signs mirror.
    assert_eq!(reference_round(&rational(-1.25), 2, None, RTP), rational(-1.0));
    assert_eq!(reference_round(&rational(-1.25), 2, None, RTN), rational(-1.5));
  }

  #[test]
  fn sqrt_oracle_accepts_the_obvious() {
    // Exact roots.
    assert!(sqrt_is_correct_rounded(4.0, 53, None, RNE, 2.0));
    assert!(sqrt_is_correct_rounded(2.25, 53, None, RNE, 1.5));
    // The double-precision root of 2.
    assert!(sqrt_is_correct_rounded(2.0, 53, None, RNE, 2.0f64.sqrt()));
    assert!(!sqrt_is_correct_rounded(2.0, 53, None, RNE, 1.5));
  }
}
