//! Access to the host FPU control and status registers.
//!
//! This is the only module that touches machine state. It exposes exactly what the hardware
//! round-to-odd engine needs, a *round-to-zero window* (install round-toward-zero with clean
//! exception flags, run one operation, read back `{overflow, underflow, inexact}`, restore),
//! plus the standalone flag helpers the exact engine verifies with.
//!
//! The window is a scope guard: [`RtzWindow::open`] snapshots and reconfigures the FPU, and the
//! snapshot is restored either by [`RtzWindow::status`] or, if the closure in between panics, by
//! `Drop`. Calls must come from a single thread at a time; the control register is per-thread
//! state on both supported architectures, but this module does nothing to serialize callers
//! sharing a thread by other means.

#[cfg(target_arch = "x86_64")]
mod imp {
  use core::arch::asm;
  use core::mem::MaybeUninit;

  // MXCSR layout: exception flags in bits 0-5, rounding control in bits 13-14. 0x1f80 is the
  // power-on default: all exceptions masked, all flags clear, round-to-nearest.
  const MXCSR_DEFAULT: u32 = 0x1f80;
  const RC_RTZ: u32 = 0b11 << 13;

  pub const EX_OVERFLOW: u32 = 0x08;
  pub const EX_UNDERFLOW: u32 = 0x10;
  pub const EX_INEXACT: u32 = 0x20;
  pub const EX_ALL: u32 = 0x3f;

  pub type Saved = u32;

  #[inline]
  fn read_csr() -> u32 {
    let mut csr = MaybeUninit::<u32>::uninit();
    unsafe {
      asm!("stmxcsr [{}]", in(reg) csr.as_mut_ptr(), options(nostack, preserves_flags));
      csr.assume_init()
    }
  }

  #[inline]
  fn write_csr(csr: u32) {
    unsafe {
      asm!("ldmxcsr [{}]", in(reg) &csr as *const u32, options(nostack, readonly, preserves_flags));
    }
  }

  #[inline]
  pub fn install_rtz() -> Saved {
    let saved = read_csr();
    write_csr(MXCSR_DEFAULT | RC_RTZ);
    saved
  }

  #[inline]
  pub fn read_status() -> u32 {
    read_csr() & EX_ALL
  }

  #[inline]
  pub fn restore(saved: Saved) {
    // Restore the control bits but leave the exception flags clear.
    write_csr(saved & !EX_ALL);
  }

  #[inline]
  pub fn clear_status() {
    write_csr(read_csr() & !EX_ALL);
  }
}

#[cfg(target_arch = "aarch64")]
mod imp {
  use core::arch::asm;

  // FPCR: rounding mode in bits 23:22. FPSR: cumulative exception flags in bits 4:0.
  const RMODE_MASK: u64 = 0b11 << 22;
  const RMODE_RTZ: u64 = 0b11 << 22;

  pub const EX_OVERFLOW: u32 = 0x04;
  pub const EX_UNDERFLOW: u32 = 0x08;
  pub const EX_INEXACT: u32 = 0x10;
  pub const EX_ALL: u32 = 0x1f;

  pub type Saved = u64;

  #[inline]
  fn read_fpcr() -> u64 {
    let fpcr: u64;
    unsafe { asm!("mrs {}, fpcr", out(reg) fpcr, options(nomem, nostack, preserves_flags)) };
    fpcr
  }

  #[inline]
  fn write_fpcr(fpcr: u64) {
    unsafe { asm!("msr fpcr, {}", in(reg) fpcr, options(nomem, nostack, preserves_flags)) };
  }

  #[inline]
  fn read_fpsr() -> u64 {
    let fpsr: u64;
    unsafe { asm!("mrs {}, fpsr", out(reg) fpsr, options(nomem, nostack, preserves_flags)) };
    fpsr
  }

  #[inline]
  fn write_fpsr(fpsr: u64) {
    unsafe { asm!("msr fpsr, {}", in(reg) fpsr, options(nomem, nostack, preserves_flags)) };
  }

  #[inline]
  pub fn install_rtz() -> Saved {
    let saved = read_fpcr();
    write_fpcr((saved & !RMODE_MASK) | RMODE_RTZ);
    write_fpsr(0);
    saved
  }

  #[inline]
  pub fn read_status() -> u32 {
    read_fpsr() as u32 & EX_ALL
  }

  #[inline]
  pub fn restore(saved: Saved) {
    write_fpcr(saved);
    write_fpsr(0);
  }

  #[inline]
  pub fn clear_status() {
    write_fpsr(0);
  }
}

/// Exception flags accumulated by the FPU, masked to the three the engines care about.
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq, Eq)]
pub struct Exceptions(u32);

impl Exceptions {
  #[inline]
  pub fn overflow(self) -> bool {
    self.0 & imp::EX_OVERFLOW != 0
  }

  #[inline]
  pub fn underflow(self) -> bool {
    self.0 & imp::EX_UNDERFLOW != 0
  }

  #[inline]
  pub fn inexact(self) -> bool {
    self.0 & imp::EX_INEXACT != 0
  }
}

/// An open round-to-zero window: the FPU is in round-toward-zero mode with clean exception
/// flags until this value is consumed by [`status`](Self::status) or dropped.
pub struct RtzWindow {
  saved: imp::Saved,
}

impl RtzWindow {
  /// Snapshots the FPU control state, installs round-toward-zero, and clears the exception
  /// flags.
  #[inline]
  #[must_use]
  pub fn open() -> Self {
    RtzWindow { saved: imp::install_rtz() }
  }

  /// Reads the exception flags raised inside the window, then restores the snapshot.
  #[inline]
  pub fn status(self) -> Exceptions {
    Exceptions(imp::read_status() & (imp::EX_OVERFLOW | imp::EX_UNDERFLOW | imp::EX_INEXACT))
    // `self` drops here, restoring the snapshot after the flags were read.
  }
}

impl Drop for RtzWindow {
  #[inline]
  fn drop(&mut self) {
    imp::restore(self.saved);
  }
}

/// Clears the FPU exception flags.
#[inline]
pub fn clear_exceptions() {
  imp::clear_status();
}

/// Reads the current FPU exception flags.
#[inline]
pub fn get_exceptions() -> Exceptions {
  Exceptions(imp::read_status())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::hint::black_box;

  #[test]
  fn window_reports_inexact() {
    // 1/5 rounds *up* under round-to-nearest, so truncation lands one ulp below it.
    let w = RtzWindow::open();
    let q = black_box(black_box(1.0f64) / black_box(5.0f64));
    let ex = w.status();
    assert!(ex.inexact());
    assert!(!ex.overflow());
    assert!(!ex.underflow());
    assert_eq!(q, f64::from_bits(0.2f64.to_bits() - 1));
  }

  #[test]
  fn window_reports_exact() {
    let w = RtzWindow::open();
    let s = black_box(black_box(1.5f64) + black_box(0.25f64));
    let ex = w.status();
    assert!(!ex.inexact());
    assert_eq!(s, 1.75);
  }

  #[test]
  fn window_restores_rounding_mode() {
    // Nested window: the inner one must restore the outer one's round-to-zero mode.
    let outer = RtzWindow::open();
    {
      let inner = RtzWindow::open();
      let _ = black_box(black_box(1.0f64) / black_box(5.0f64));
      let _ = inner.status();
    }
    // Still rounding toward zero out here: a negative quotient truncates upward.
    let q = black_box(black_box(-1.0f64) / black_box(5.0f64));
    let ex = outer.status();
    assert!(ex.inexact());
    assert_eq!(q, f64::from_bits((-0.2f64).to_bits() - 1));
  }

  #[test]
  fn standalone_helpers() {
    clear_exceptions();
    let before = get_exceptions();
    assert!(!before.inexact());

    let _ = black_box(black_box(1.0f64) / black_box(5.0f64));
    assert!(get_exceptions().inexact());

    clear_exceptions();
    assert!(!get_exceptions().inexact());
  }
}
