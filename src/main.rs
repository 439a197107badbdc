#![cfg_attr(not(test), no_main)]
#![cfg_attr(not(test), no_std)]

//! Entry point: constructs the LMB from the boot-time FDT, carves the
//! fastboot context's DMA-reachable queue-head/transfer-descriptor tables
//! out of it, brings up the UDC, and polls forever.
//!
//! Everything upstream of this (CPU bring-up, exception vectors, the MMU)
//! is an external collaborator's job per the scope this loader covers; by
//! the time `rust_entry` runs, the stack is set up and `x0` holds a pointer
//! to a flattened device tree, matching the reference loader's own
//! calling convention.

mod barrier;
mod boot;
mod debug;
mod fastboot;
mod fdt_inputs;
mod lmb;
mod platform;
mod smccc;
mod udc;

use fastboot::FbServer;
use fdt_inputs::FdtInputs;
use lmb::{tag, Lmb, RegionKind, ALLOC_32BIT};
use udc::descriptors::{self, Td};
use udc::regs::{UdcRegs, EHCI_BASE_DEFAULT};
use udc::{UsbdStatus, MAX_EPS};

/// Bounds of this loader's own image, exported by the linker script an
/// external bootstrap supplies (out of scope here, like the rest of CPU
/// bring-up) so `boot::seed_from_memory_nodes` can self-reserve it.
extern "C" {
    static __image_start: u8;
    static __image_end: u8;
}

#[cfg(not(test))]
mod panic_handler {
    use core::panic::PanicInfo;

    #[panic_handler]
    fn handle_panic(info: &PanicInfo) -> ! {
        crate::println!("{}", info);
        loop {}
    }
}

/// Alignment the UDC's TD/QH pool must satisfy, per `usbd_init`'s check.
const DMA_POOL_ALIGN: u64 = descriptors::TD_ALIGNMENT as u64;

/// Reads the big-endian `totalsize` field (offset 4) out of a flattened
/// device tree header, the only piece of the FDT format this crate reads
/// without handing off to the external parser: it's needed just to size the
/// slice `FdtInputs::new` expects before that parser ever runs.
///
/// # Safety
/// `ptr` must point at a valid FDT blob (magic `0xd00dfeed`) with at least
/// 8 readable bytes.
unsafe fn fdt_total_size(ptr: *const u8) -> usize {
    let header = core::slice::from_raw_parts(ptr, 8);
    u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize
}

/// Carves a DMA-reachable, 32-byte-aligned buffer of `len` bytes out of
/// `lmb`, zeroes it, and hands back a `'static` slice of `T` over it. Used
/// for both the QH and TD pools, which share the same placement
/// constraints (32-bit reachable, naturally aligned).
unsafe fn alloc_dma_slice<T>(lmb: &mut Lmb, count: usize, rtag: u32) -> &'static mut [T] {
    let len = (count * core::mem::size_of::<T>()) as u64;
    let addr = lmb
        .alloc_base(len, DMA_POOL_ALIGN, ALLOC_32BIT, RegionKind::Boot, rtag)
        .expect("out of 32-bit-reachable memory for UDC descriptor pool");
    let ptr = addr as *mut T;
    core::ptr::write_bytes(ptr as *mut u8, 0, len as usize);
    core::slice::from_raw_parts_mut(ptr, count)
}

/// # Safety
/// Must be called exactly once, by the external bootstrap, with the stack
/// already set up and `fdt_ptr` pointing at a live flattened device tree
/// that remains mapped for the lifetime of this call (it never returns).
#[export_name = "rust_entry"]
pub unsafe extern "C" fn rust_entry(fdt_ptr: *const u8) -> ! {
    debug::set_console_base(platform::UART_BASE_DEFAULT as *mut u32);
    crate::println!("\r\n~~tegra-fbloader up!~~\r\n");

    let fdt_len = fdt_total_size(fdt_ptr);
    let blob = core::slice::from_raw_parts(fdt_ptr, fdt_len);

    let image_base = &__image_start as *const u8 as u64;
    let image_size = (&__image_end as *const u8 as u64) - image_base;

    let inputs = match FdtInputs::new(blob, image_base, image_size) {
        Ok(inputs) => inputs,
        Err(_) => panic!("malformed boot FDT"),
    };

    let mut lmb = Lmb::new();
    boot::seed_from_memory_nodes(&mut lmb, &inputs);
    boot::seed_from_bootargs(&mut lmb, &inputs);

    #[cfg(feature = "verbose-debug")]
    lmb.dump_all();

    let td: &'static mut [Td] = alloc_dma_slice(&mut lmb, MAX_EPS * 2, tag("UDCT"));

    let regs = UdcRegs::new(EHCI_BASE_DEFAULT as *mut u8);
    let mut fb = FbServer::new(regs, td, &mut lmb, fdt_ptr as u64);

    match fb.init() {
        UsbdStatus::Success => {}
        status => panic!("usbd_init failed: {}", status),
    }

    loop {
        let status = fb.poll();
        #[cfg(feature = "verbose-debug")]
        if status != UsbdStatus::Success {
            crate::println!("usbd poll: {}", status);
        }
        #[cfg(not(feature = "verbose-debug"))]
        let _ = status;
    }
}
