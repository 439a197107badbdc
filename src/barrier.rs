//! ARMv8 data-synchronization barriers.
//!
//! The reference loader this crate is modeled on targets RISC-V and leans on
//! `compiler_fence(SeqCst)` around every MMIO access, which is enough on a
//! single-hart in-order core with no DMA reordering hazards of its own. The
//! UDC here does real DMA: the controller walks queue heads and transfer
//! descriptors in host RAM independently of the CPU, so a compiler fence
//! alone isn't sufficient — we need the real `dsb`/`dmb` instructions.

use core::arch::asm;
use core::sync::atomic::{compiler_fence, Ordering};

/// Store barrier: ensures buffer/descriptor writes are visible to the
/// controller before the MMIO write that hands them off (e.g. before
/// `EPTPRIME`).
#[inline(always)]
pub fn dsb_st() {
    compiler_fence(Ordering::SeqCst);
    #[cfg(target_arch = "aarch64")]
    unsafe {
        asm!("dsb st", options(nostack, preserves_flags));
    }
}

/// Load barrier: ensures a subsequent read of controller-written memory
/// (e.g. a completed TD's status word) observes the DMA write.
#[inline(always)]
pub fn dsb_ld() {
    compiler_fence(Ordering::SeqCst);
    #[cfg(target_arch = "aarch64")]
    unsafe {
        asm!("dsb ld", options(nostack, preserves_flags));
    }
}

/// Full two-way barrier, used around register reads that must not be
/// reordered with surrounding MMIO in either direction.
#[inline(always)]
pub fn dsb_sy() {
    compiler_fence(Ordering::SeqCst);
    #[cfg(target_arch = "aarch64")]
    unsafe {
        asm!("dsb sy", options(nostack, preserves_flags));
    }
}
