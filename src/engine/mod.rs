//! The arithmetic engines.
//!
//! An engine computes one double-precision operation such that the result carries at least
//! `p + 2` bits of information about the exact real answer, using round-to-odd as the
//! intermediate rounding: the returned double *is* the round-to-odd of the exact result at 53
//! bits. The [kernel](crate::kernel) can then re-round it into any format of precision `p` under
//! any mode and land exactly where a single direct rounding would have.
//!
//! Engines are zero-sized types implementing [`Engine`]; operations pick one as a type
//! parameter and monomorphize, so engine choice is a compile-time decision per call site with
//! no dispatch cost.

/// Round-to-odd at 53 bits, via the FPU rounding mode and the inexact flag. The fastest engine
/// where available, but it touches the process-wide FPU control register.
mod hw;

/// Round-to-odd at 53 bits in pure software, via error-free transformations.
mod eft;

/// Pass-through for operations the caller knows to be exact; verified in debug builds.
mod exact;

/// Fixed-point multiplication with an exact integer result.
pub mod fixed;

pub use eft::Eft;
pub use exact::Exact;
pub use hw::Hw;

/// The capability every engine provides: the six arithmetic operations, each delivering a
/// double carrying at least `p` bits of round-to-odd information about the exact result.
///
/// `p` is the precision budget the caller relies on; engines `debug_assert!` that they can
/// honor it (`p ≤ 53` for all the double-based engines). Exceeding an engine's budget, or
/// leaving the double range inside an engine's computation, is a contract violation: asserted
/// in debug builds, unspecified results in release builds.
pub trait Engine {
  fn add(x: f64, y: f64, p: u32) -> f64;
  fn sub(x: f64, y: f64, p: u32) -> f64;
  fn mul(x: f64, y: f64, p: u32) -> f64;
  fn div(x: f64, y: f64, p: u32) -> f64;
  fn sqrt(x: f64, p: u32) -> f64;
  fn fma(x: f64, y: f64, z: f64, p: u32) -> f64;
}
