//! This crate simulates arbitrary-precision and custom-format floating point arithmetic by
//! reusing the host's hardware IEEE 754 double unit as its computational substrate. You pick a
//! number format (a precision, plus an optional minimum normalized exponent and an optional
//! maximum magnitude) and a rounding mode. Each operation on `f64`s then produces the value
//! that would result from performing the operation in real arithmetic and rounding *once* into
//! that format.
//!
//! # How it works
//!
//! Rounding twice is usually wrong: the intermediate rounding can land exactly on a halfway
//! point of the target format, and the second rounding then breaks the tie the wrong way. The
//! classical fix is *round-to-odd*: if an intermediate result carries `p + 2` bits rounded to
//! odd, re-rounding it to `p` bits under **any** rounding mode gives the same answer as one
//! direct correct rounding of the exact result. So every operation here runs in two stages:
//!
//!   1. An [engine](engine) computes the operation in native double precision with round-to-odd
//!      semantics: either by running the FPU in round-toward-zero mode and jamming the sticky
//!      bit into the LSB ([`Hw`]), or branch-free in pure software with error-free
//!      transformations ([`Eft`]).
//!   2. The [re-rounding kernel](kernel) converts that intermediate into the target format under
//!      any of eight rounding modes, honoring subnormalization, overflow, and the IEEE-style
//!      [status flags](flags).
//!
//! # Usage
//!
//! ```
//! use mpfx::{ops, Context, Eft, Flags, RoundingMode};
//!
//! // A binary32-like format: 8 exponent bits, 32 bits total.
//! let ctx = Context::ieee754(8, 32, RoundingMode::RNE);
//!
//! // 1/3 doesn't exist in binary32; the result is the correctly rounded quotient,
//! // bit-for-bit what an f32 division would produce.
//! let q = ops::div::<Eft, { Flags::ALL }>(1.0, 3.0, &ctx);
//! assert_eq!(q, (1.0f32 / 3.0f32) as f64);
//! assert!(mpfx::flags::read().inexact());
//!
//! // Or an MPFR-style format: 12 bits of precision, unbounded exponent.
//! mpfx::flags::reset();
//! let ctx = Context::mp(12, RoundingMode::RTZ);
//! assert_eq!(ops::round::<{ Flags::ALL }>(1.0 + 1e-9, &ctx), 1.0);
//! ```
//!
//! # Threading
//!
//! Two pieces of state are process-wide: the FPU control register touched by the [`Hw`] engine,
//! and the [flag register](flags). Neither is synchronized beyond what the hardware gives you.
//! Concurrent use from multiple threads should either serialize operations, or run with
//! [`Flags::NONE`] and a software engine ([`Eft`], [`Exact`]) per thread.

/// Pack and unpack IEEE 754 doubles (and floats) to and from sign/exponent/significand triples.
pub mod codec;

/// Rounding contexts: precision, subnormalization, overflow threshold, rounding mode.
pub mod context;

/// The arithmetic engines producing round-to-odd intermediates.
pub mod engine;

/// Save/restore of the host FPU rounding mode and exception flags.
#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
pub mod env;

/// The process-wide IEEE 754-style status flag register.
pub mod flags;

/// The correctly-rounded re-rounding kernel.
pub mod kernel;

/// User-visible operations, generic over the engine and the flag mask.
pub mod ops;

/// Rounding modes, directions, and rounding-bit classification.
pub mod round;

mod utl;

/// Reference rounding over arbitrary-precision rationals, for testing only.
#[cfg(test)]
mod oracle;

pub use context::Context;
pub use engine::{Eft, Engine, Exact, Hw};
pub use flags::Flags;
pub use round::RoundingMode;

/// Number of cases to run for each property test. Tuned down in debug builds, where the oracle
/// is an order of magnitude slower.
#[cfg(test)]
pub(crate) const PROPTEST_CASES: u32 = if cfg!(debug_assertions) { 0x400 } else { 0x4000 };
