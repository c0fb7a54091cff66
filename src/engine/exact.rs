//! The exact engine.
//!
//! A pass-through for call sites where the caller knows the operation cannot lose bits (for
//! example multiplying values that were pre-rounded to formats whose precisions sum below
//! 53). Release builds compile to the bare native instruction. Debug builds verify the
//! exactness claim: on targets with FPU environment access, by clearing the exception flags
//! before the operation and checking that neither inexact nor overflow was raised; elsewhere,
//! by checking that the error-free-transformation residual of the operation is zero.

use super::eft::{two_div, two_fma, two_prod, two_sqrt, two_sum};
use super::Engine;

/// Marker type for the exact pass-through engine.
pub struct Exact;

/// Clears the FPU exception flags ahead of an operation to be verified. Debug builds only.
#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
#[inline]
fn begin_check() {
  if cfg!(debug_assertions) {
    crate::env::clear_exceptions();
  }
}

/// As above, without FPU flags to clear.
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline]
fn begin_check() {}

/// Whether the operation just finished was exact. Reads the FPU flags accumulated since
/// [`begin_check`] where available; the residual closure is the software fallback. Only
/// reachable from debug assertions.
#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
#[inline]
fn was_exact(_residual: impl FnOnce() -> (f64, f64)) -> bool {
  let ex = crate::env::get_exceptions();
  !ex.inexact() && !ex.overflow()
}

/// As above, without FPU flags: a zero residual (or an uncheckable special value) stands in.
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline]
fn was_exact(residual: impl FnOnce() -> (f64, f64)) -> bool {
  let (high, low) = residual();
  !high.is_finite() || low == 0.0
}

impl Engine for Exact {
  fn add(x: f64, y: f64, p: u32) -> f64 {
    debug_assert!(p <= 53, "add: requested precision exceeds double-precision capability");
    begin_check();
    let r = x + y;
    debug_assert!(was_exact(|| two_sum(x, y)), "add: operation marked exact was inexact");
    r
  }

  fn sub(x: f64, y: f64, p: u32) -> f64 {
    debug_assert!(p <= 53, "sub: requested precision exceeds double-precision capability");
    begin_check();
    let r = x - y;
    debug_assert!(was_exact(|| two_sum(x, -y)), "sub: operation marked exact was inexact");
    r
  }

  fn mul(x: f64, y: f64, p: u32) -> f64 {
    debug_assert!(p <= 53, "mul: requested precision exceeds double-precision capability");
    begin_check();
    let r = x * y;
    debug_assert!(was_exact(|| two_prod(x, y)), "mul: operation marked exact was inexact");
    r
  }

  fn div(x: f64, y: f64, p: u32) -> f64 {
    debug_assert!(p <= 53, "div: requested precision exceeds double-precision capability");
    begin_check();
    let r = x / y;
    debug_assert!(was_exact(|| two_div(x, y)), "div: operation marked exact was inexact");
    r
  }

  fn sqrt(x: f64, p: u32) -> f64 {
    debug_assert!(p <= 53, "sqrt: requested precision exceeds double-precision capability");
    begin_check();
    let r = x.sqrt();
    // Zero and negative radicands raise no inexact flag and have no usable residual.
    debug_assert!(x <= 0.0 || was_exact(|| two_sqrt(x)), "sqrt: operation marked exact was inexact");
    r
  }

  fn fma(x: f64, y: f64, z: f64, p: u32) -> f64 {
    debug_assert!(p <= 53, "fma: requested precision exceeds double-precision capability");
    begin_check();
    let r = x.mul_add(y, z);
    debug_assert!(was_exact(|| two_fma(x, y, z)), "fma: operation marked exact was inexact");
    r
  }
}
