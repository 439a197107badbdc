//! UART console used for all diagnostic output.
//!
//! No `log`/`tracing` facade: this is an early-boot binary with no allocator
//! and no host to ship structured logs to, so output goes straight through
//! `core::fmt::Write` onto a busy-waited UART, the way the rest of this
//! family of loaders does it.

use core::fmt::{Error, Write};

/// Default offset of the debug UART from its own MMIO base. Not part of the
/// EHCI/UDC register map in `crate::udc::regs`.
const UART_STATUS_OFFSET: usize = 0x08;
const UART_TX_OFFSET: usize = 0x00;
const UART_TX_BUSY: u32 = 1;

pub struct Uart {
    base: *mut u32,
}

impl Uart {
    /// # Safety
    /// `base` must be the MMIO base of a UART-compatible register block that
    /// is mapped for the lifetime of the program.
    pub const unsafe fn new(base: *mut u32) -> Self { Self { base } }

    pub fn putc(&self, c: u8) {
        unsafe {
            let status = self.base.add(UART_STATUS_OFFSET / 4);
            while status.read_volatile() & UART_TX_BUSY != 0 {}
            let tx = self.base.add(UART_TX_OFFSET / 4);
            tx.write_volatile(c as u32);
        }
    }
}

impl Write for Uart {
    fn write_str(&mut self, s: &str) -> Result<(), Error> {
        for c in s.bytes() {
            self.putc(c);
        }
        Ok(())
    }
}

/// Default debug console instance. Overridden at init time via
/// [`set_console_base`] once the platform's UART base address is known.
static mut CONSOLE_BASE: *mut u32 = core::ptr::null_mut();

/// # Safety
/// Must be called once, before any use of [`print!`]/[`println!`], and not
/// concurrently with any other access to the console (there is no locking —
/// this crate is single-threaded by design).
pub unsafe fn set_console_base(base: *mut u32) { CONSOLE_BASE = base; }

#[doc(hidden)]
pub fn console() -> Uart { unsafe { Uart::new(CONSOLE_BASE) } }

#[macro_export]
macro_rules! print {
    ($($args:tt)+) => ({
        use core::fmt::Write;
        let _ = write!($crate::debug::console(), $($args)+);
    });
}

#[macro_export]
macro_rules! println {
    () => ({
        $crate::print!("\r\n")
    });
    ($fmt:expr) => ({
        $crate::print!(concat!($fmt, "\r\n"))
    });
    ($fmt:expr, $($args:tt)+) => ({
        $crate::print!(concat!($fmt, "\r\n"), $($args)+)
    });
}
