//! IEEE 754-style status flags.
//!
//! The register is a single process-wide word. Flags are only ever set by operations, never
//! cleared (except through [`reset`]); between operations they accumulate, so callers that want
//! to sample the flags of a particular sequence reset before it and read after it.
//!
//! Every flag-setting entry point in this crate takes a `const MASK: u32` parameter built from
//! the [`Flags`] bit constants; flags outside the mask are not raised, and the work needed only
//! for masked-out flags compiles away. The rounded results never depend on the mask.

use core::sync::atomic::{AtomicU32, Ordering};

/// A snapshot of (or a mask over) the status flag register.
///
/// Flag meanings:
///
/// - `invalid` - an operation had no usefully definable result.
/// - `div_by_zero` - an operation produced an exact infinite result from finite operands.
/// - `overflow` - the rounded result was larger in magnitude than the format's largest finite
///   value.
/// - `tiny_before` - the unrounded result was smaller in magnitude than the smallest
///   normalized value.
/// - `tiny_after` - the result would be smaller in magnitude than the smallest normalized
///   value even if the exponent range were unbounded.
/// - `underflow_before` - tiny (before rounding) and inexact.
/// - `underflow_after` - tiny (after rounding) and inexact.
/// - `inexact` - the result differs from the value computed with unbounded precision and
///   exponent range.
/// - `carry` - rounding moved the result's normalized exponent above the unrounded value's.
#[derive(Clone, Copy, Default)]
#[derive(Debug, PartialEq, Eq)]
pub struct Flags(u32);

impl Flags {
  pub const INVALID: u32 = 1 << 0;
  pub const DIV_BY_ZERO: u32 = 1 << 1;
  pub const OVERFLOW: u32 = 1 << 2;
  pub const TINY_BEFORE: u32 = 1 << 3;
  pub const TINY_AFTER: u32 = 1 << 4;
  pub const UNDERFLOW_BEFORE: u32 = 1 << 5;
  pub const UNDERFLOW_AFTER: u32 = 1 << 6;
  pub const INEXACT: u32 = 1 << 7;
  pub const CARRY: u32 = 1 << 8;

  /// Mask with every flag enabled.
  pub const ALL: u32 = 0x1ff;

  /// Mask with no flag enabled; operations under this mask touch no shared state.
  pub const NONE: u32 = 0;

  /// The raw bit-set.
  #[inline]
  pub fn bits(self) -> u32 {
    self.0
  }

  /// Whether every flag in `mask` is set.
  #[inline]
  pub fn contains(self, mask: u32) -> bool {
    self.0 & mask == mask
  }

  #[inline]
  pub fn invalid(self) -> bool { self.contains(Self::INVALID) }
  #[inline]
  pub fn div_by_zero(self) -> bool { self.contains(Self::DIV_BY_ZERO) }
  #[inline]
  pub fn overflow(self) -> bool { self.contains(Self::OVERFLOW) }
  #[inline]
  pub fn tiny_before(self) -> bool { self.contains(Self::TINY_BEFORE) }
  #[inline]
  pub fn tiny_after(self) -> bool { self.contains(Self::TINY_AFTER) }
  #[inline]
  pub fn underflow_before(self) -> bool { self.contains(Self::UNDERFLOW_BEFORE) }
  #[inline]
  pub fn underflow_after(self) -> bool { self.contains(Self::UNDERFLOW_AFTER) }
  #[inline]
  pub fn inexact(self) -> bool { self.contains(Self::INEXACT) }
  #[inline]
  pub fn carry(self) -> bool { self.contains(Self::CARRY) }
}

/// The process-wide register. Relaxed ordering suffices: the register is a monotonic bit-set
/// between resets and carries no data dependencies.
static REGISTER: AtomicU32 = AtomicU32::new(0);

/// Reads the current state of the flag register.
#[inline]
pub fn read() -> Flags {
  Flags(REGISTER.load(Ordering::Relaxed))
}

/// Resets all flags to clear.
#[inline]
pub fn reset() {
  REGISTER.store(0, Ordering::Relaxed);
}

/// Sets the given flag bits.
#[inline]
pub(crate) fn raise(bits: u32) {
  REGISTER.fetch_or(bits, Ordering::Relaxed);
}

/// Sets the flag bits that survive the compile-time mask. With `MASK = Flags::NONE` this is a
/// no-op and callers' flag bookkeeping folds away entirely.
#[inline]
pub(crate) fn raise_masked<const MASK: u32>(bits: u32) {
  if MASK & bits != 0 {
    raise(MASK & bits);
  }
}
