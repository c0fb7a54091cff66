//! The user-visible operations.
//!
//! Every operation takes its operands as doubles and a [`Context`] describing the target
//! format, and returns the correctly rounded result as a double. The arithmetic ones are
//! generic over the [`Engine`] producing the round-to-odd intermediate and over the
//! compile-time flag mask; both are call-site choices, monomorphized away.
//!
//! Besides the kernel's rounding flags, operations raise the two operation-level flags:
//! `invalid` for the IEEE invalid-operation triggers, and `div_by_zero` for finite-nonzero
//! over zero. Only the listed triggers count; NaN operands propagate NaN without raising
//! anything.

use crate::context::Context;
use crate::engine::{fixed, Engine, Exact};
use crate::flags::{raise_masked, Flags};
use crate::utl::{likely, unlikely};

/// Rounds `x` into the context's format.
pub fn round<const MASK: u32>(x: f64, ctx: &Context) -> f64 {
  ctx.round::<MASK>(x)
}

/// Computes `-x`, rounded. Negation is exact; only the rounding can raise flags.
pub fn neg<const MASK: u32>(x: f64, ctx: &Context) -> f64 {
  ctx.round::<MASK>(-x)
}

/// Computes `|x|`, rounded.
pub fn abs<const MASK: u32>(x: f64, ctx: &Context) -> f64 {
  ctx.round::<MASK>(x.abs())
}

/// Computes `x + y`, rounded. Requires `ctx.round_prec() ≤ 53`.
pub fn add<E: Engine, const MASK: u32>(x: f64, y: f64, ctx: &Context) -> f64 {
  debug_assert!(ctx.round_prec() <= 53, "add: context precision exceeds engine capability");

  let r = E::add(x, y, ctx.round_prec());
  // Invalid iff the NaN came from adding opposing infinities.
  if unlikely(r.is_nan())
    && x.is_infinite()
    && y.is_infinite()
    && x.is_sign_positive() != y.is_sign_positive()
  {
    raise_masked::<MASK>(Flags::INVALID);
  }
  ctx.round::<MASK>(r)
}

/// Computes `x - y`, rounded. Requires `ctx.round_prec() ≤ 53`.
pub fn sub<E: Engine, const MASK: u32>(x: f64, y: f64, ctx: &Context) -> f64 {
  debug_assert!(ctx.round_prec() <= 53, "sub: context precision exceeds engine capability");

  let r = E::sub(x, y, ctx.round_prec());
  // Invalid iff the NaN came from subtracting like infinities.
  if unlikely(r.is_nan())
    && x.is_infinite()
    && y.is_infinite()
    && x.is_sign_positive() == y.is_sign_positive()
  {
    raise_masked::<MASK>(Flags::INVALID);
  }
  ctx.round::<MASK>(r)
}

/// Computes `x · y`, rounded. Requires `ctx.round_prec() ≤ 53`.
pub fn mul<E: Engine, const MASK: u32>(x: f64, y: f64, ctx: &Context) -> f64 {
  debug_assert!(ctx.round_prec() <= 53, "mul: context precision exceeds engine capability");

  let r = E::mul(x, y, ctx.round_prec());
  if unlikely(r.is_nan()) && mul_is_invalid(x, y) {
    raise_masked::<MASK>(Flags::INVALID);
  }
  ctx.round::<MASK>(r)
}

/// Computes `x / y`, rounded. Requires `ctx.round_prec() ≤ 53`.
pub fn div<E: Engine, const MASK: u32>(x: f64, y: f64, ctx: &Context) -> f64 {
  debug_assert!(ctx.round_prec() <= 53, "div: context precision exceeds engine capability");

  // Division by zero is its own flag, NaN or not: a finite non-zero numerator over zero
  // produces an exact signed infinity.
  if unlikely(y == 0.0) && x.is_finite() && x != 0.0 {
    raise_masked::<MASK>(Flags::DIV_BY_ZERO);
  }

  let r = E::div(x, y, ctx.round_prec());
  // Invalid iff the NaN came from 0/0 or ∞/∞.
  if unlikely(r.is_nan())
    && ((x == 0.0 && y == 0.0) || (x.is_infinite() && y.is_infinite()))
  {
    raise_masked::<MASK>(Flags::INVALID);
  }
  ctx.round::<MASK>(r)
}

/// Computes `√x`, rounded. Requires `ctx.round_prec() ≤ 53`.
pub fn sqrt<E: Engine, const MASK: u32>(x: f64, ctx: &Context) -> f64 {
  debug_assert!(ctx.round_prec() <= 53, "sqrt: context precision exceeds engine capability");

  let r = E::sqrt(x, ctx.round_prec());
  // Invalid iff the NaN came from a finite negative radicand.
  if unlikely(r.is_nan()) && x.is_finite() && x < 0.0 {
    raise_masked::<MASK>(Flags::INVALID);
  }
  ctx.round::<MASK>(r)
}

/// Computes `x · y + z` fused, rounded. Requires `ctx.round_prec() ≤ 53`.
pub fn fma<E: Engine, const MASK: u32>(x: f64, y: f64, z: f64, ctx: &Context) -> f64 {
  debug_assert!(ctx.round_prec() <= 53, "fma: context precision exceeds engine capability");

  let r = E::fma(x, y, z, ctx.round_prec());
  if unlikely(r.is_nan()) && fma_is_invalid(x, y, z) {
    raise_masked::<MASK>(Flags::INVALID);
  }
  ctx.round::<MASK>(r)
}

/// Computes `x · y` through the fixed-point engine: the product is exact in 64-bit integer
/// arithmetic and rounded through the kernel's integer-significand entry. Requires
/// `ctx.round_prec() ≤ 63` and inputs pre-rounded so the significand product fits 63 bits.
/// Non-finite inputs fall back to the exact engine.
pub fn mul_fixed<const MASK: u32>(x: f64, y: f64, ctx: &Context) -> f64 {
  debug_assert!(ctx.round_prec() <= 63, "mul_fixed: context precision exceeds engine capability");

  if likely(x.is_finite() && y.is_finite()) {
    let (m, exp) = fixed::mul(x, y, ctx.round_prec());
    ctx.round_fixed::<MASK>(m, exp)
  } else {
    let r = Exact::mul(x, y, ctx.round_prec());
    if unlikely(r.is_nan()) && mul_is_invalid(x, y) {
      raise_masked::<MASK>(Flags::INVALID);
    }
    ctx.round::<MASK>(r)
  }
}

/// The invalid-operation trigger for multiplication: zero times infinity.
#[inline]
fn mul_is_invalid(x: f64, y: f64) -> bool {
  (x == 0.0 && y.is_infinite()) || (x.is_infinite() && y == 0.0)
}

/// The invalid-operation triggers for fused multiply-add: zero times infinity, or an infinite
/// product meeting the opposite infinity.
#[inline]
fn fma_is_invalid(x: f64, y: f64, z: f64) -> bool {
  if mul_is_invalid(x, y) {
    return true;
  }
  (x.is_infinite() || y.is_infinite())
    && z.is_infinite()
    && (x.is_sign_negative() ^ y.is_sign_negative()) != z.is_sign_negative()
}
