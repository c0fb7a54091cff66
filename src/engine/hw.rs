//! The hardware round-to-odd engine.
//!
//! Round-to-odd is not a mode any FPU implements, but it factors as "round toward zero, then
//! set the LSB iff the operation was inexact", and both halves are things the hardware *does*
//! give us: a round-toward-zero mode and an inexact exception flag. So each operation opens a
//! [round-to-zero window](crate::env::RtzWindow), runs the native instruction, and jams the
//! sticky bit on the way out.
//!
//! Contract: the true result must neither overflow nor underflow at double precision. Inside
//! the window either event means the jammed LSB no longer encodes what was lost. Both are
//! asserted in debug builds from the window's status flags.
//!
//! On targets without FPU environment access this engine is an alias for [`Eft`], the
//! pure-software substitute.

#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
use crate::env;
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
use super::Eft;
use super::Engine;

/// Marker type for the hardware round-to-odd engine.
pub struct Hw;

#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
mod native {
  use super::*;
  use std::hint::black_box;

  /// Applies the round-to-odd jam given the window's exception flags.
  #[inline]
  pub(super) fn finalize(result: f64, ex: env::Exceptions) -> f64 {
    debug_assert!(
      !ex.overflow() && !ex.underflow(),
      "result left the double range inside the round-to-zero window",
    );

    if ex.inexact() {
      f64::from_bits(result.to_bits() | 1)
    } else {
      result
    }
  }

  impl Engine for Hw {
    fn add(x: f64, y: f64, p: u32) -> f64 {
      debug_assert!(p <= 53, "add: requested precision exceeds double-precision capability");
      let w = env::RtzWindow::open();
      // black_box pins the operation inside the window: without it the compiler is free to
      // schedule the FP op before `open` or after `status`.
      let r = black_box(black_box(x) + black_box(y));
      finalize(r, w.status())
    }

    fn sub(x: f64, y: f64, p: u32) -> f64 {
      debug_assert!(p <= 53, "sub: requested precision exceeds double-precision capability");
      let w = env::RtzWindow::open();
      let r = black_box(black_box(x) - black_box(y));
      finalize(r, w.status())
    }

    fn mul(x: f64, y: f64, p: u32) -> f64 {
      debug_assert!(p <= 53, "mul: requested precision exceeds double-precision capability");
      let w = env::RtzWindow::open();
      let r = black_box(black_box(x) * black_box(y));
      finalize(r, w.status())
    }

    fn div(x: f64, y: f64, p: u32) -> f64 {
      debug_assert!(p <= 53, "div: requested precision exceeds double-precision capability");
      let w = env::RtzWindow::open();
      let r = black_box(black_box(x) / black_box(y));
      finalize(r, w.status())
    }

    fn sqrt(x: f64, p: u32) -> f64 {
      debug_assert!(p <= 53, "sqrt: requested precision exceeds double-precision capability");
      let w = env::RtzWindow::open();
      let r = black_box(black_box(x).sqrt());
      finalize(r, w.status())
    }

    fn fma(x: f64, y: f64, z: f64, p: u32) -> f64 {
      debug_assert!(p <= 53, "fma: requested precision exceeds double-precision capability");
      let w = env::RtzWindow::open();
      let r = black_box(black_box(x).mul_add(black_box(y), black_box(z)));
      finalize(r, w.status())
    }
  }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
impl Engine for Hw {
  fn add(x: f64, y: f64, p: u32) -> f64 { Eft::add(x, y, p) }
  fn sub(x: f64, y: f64, p: u32) -> f64 { Eft::sub(x, y, p) }
  fn mul(x: f64, y: f64, p: u32) -> f64 { Eft::mul(x, y, p) }
  fn div(x: f64, y: f64, p: u32) -> f64 { Eft::div(x, y, p) }
  fn sqrt(x: f64, p: u32) -> f64 { Eft::sqrt(x, p) }
  fn fma(x: f64, y: f64, z: f64, p: u32) -> f64 { Eft::fma(x, y, z, p) }
}
