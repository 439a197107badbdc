//! Fastboot command server: wires [`commands`]'s pure parsing onto EP1 of the
//! [`Usbd`] driver.
//!
//! The controller (`Usbd`) and the server state (`FbState`) are kept as
//! separate fields inside [`FbServer`] rather than one self-referential
//! struct: [`UsbdContext`]'s hooks are all handed `usbd: &mut Usbd`
//! explicitly, so `FbState` never needs to borrow its own controller, and
//! `FbServer::poll` can lend `&mut self.usbd` and `&mut self.fb` to each
//! other as two disjoint fields.

pub mod commands;

use core::fmt::Write;

use commands::{Access, FbStatus};

use crate::lmb::{Lmb, RegionKind, ALLOC_32BIT, ALLOC_ANYWHERE, tag};
use crate::platform;
use crate::smccc;
use crate::udc::descriptors;
use crate::udc::regs::UdcRegs;
use crate::udc::{Completion, CompletionList, EpType, Usbd, UsbdContext, UsbdStatus};

impl From<commands::RebootKind> for platform::RebootKind {
    fn from(k: commands::RebootKind) -> Self {
        match k {
            commands::RebootKind::Normal => platform::RebootKind::Normal,
            commands::RebootKind::Bootloader => platform::RebootKind::Bootloader,
            commands::RebootKind::Rcm => platform::RebootKind::Rcm,
            commands::RebootKind::Recovery => platform::RebootKind::Recovery,
            commands::RebootKind::Custom(v) => platform::RebootKind::Custom(v),
        }
    }
}

/// `core::fmt::Write` over a fixed buffer, for building replies without an
/// allocator. Writes past the end of the buffer are silently truncated —
/// every reply fits in 64 bytes by construction, so truncation never fires
/// in practice; it exists so a formatting bug degrades instead of panicking.
struct ByteWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> ByteWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self { Self { buf, len: 0 } }
}

impl<'a> Write for ByteWriter<'a> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        let end = (self.len + bytes.len()).min(self.buf.len());
        let n = end - self.len;
        self.buf[self.len..end].copy_from_slice(&bytes[..n]);
        self.len = end;
        Ok(())
    }
}

fn trim_start(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|&b| b != b' ').unwrap_or(s.len());
    &s[start..]
}

/// Splits off the first whitespace-delimited token, the way `oem <subcmd>
/// <rest>` is split from the remainder.
fn split_cmd(s: &[u8]) -> (&[u8], &[u8]) {
    let s = trim_start(s);
    let end = s.iter().position(|&b| b == b' ').unwrap_or(s.len());
    (&s[..end], trim_start(&s[end..]))
}

fn strip_prefix<'b>(s: &'b [u8], prefix: &[u8]) -> Option<&'b [u8]> {
    if s.len() >= prefix.len() && &s[..prefix.len()] == prefix {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// A download in progress or completed: the buffer `flash:run` will jump
/// into, and (while still receiving) how much of it remains to arrive.
struct Download {
    addr: u64,
    size: u64,
    align: u64,
    rem: usize,
}

/// Multi-packet `oem peek` state: re-entered on every EP1 IN completion
/// until `items_remaining` hits zero.
struct PeekFlow {
    addr: u64,
    access: Access,
    items_remaining: u32,
}

/// Everything about the fastboot protocol that isn't the UDC itself: command
/// buffering, the download/peek continuations, and the allocator the `oem
/// alloc`/`free`/`download` commands draw from. Implements [`UsbdContext`]
/// so [`Usbd::poll`] can drive it without knowing anything about fastboot.
struct FbState<'a> {
    lmb: &'a mut Lmb,
    fdt: u64,
    in_command: bool,
    download: Option<Download>,
    peek: Option<PeekFlow>,
    pending_reboot: Option<platform::RebootKind>,
    pending_flash_run: bool,
    /// Set when the just-sent IN packet is an `INFO...` that must be
    /// followed by a plain `OKAY` once it completes (alloc, smccc, the
    /// final chunk of a download).
    finish_with_okay: bool,
}

impl<'a> FbState<'a> {
    fn new(lmb: &'a mut Lmb, fdt: u64) -> Self {
        Self {
            lmb,
            fdt,
            in_command: false,
            download: None,
            peek: None,
            pending_reboot: None,
            pending_flash_run: false,
            finish_with_okay: false,
        }
    }

    fn start_cmd_read(&mut self, usbd: &mut Usbd) {
        let addr = usbd.req_buffer_mut(descriptors::FASTBOOT_EP_OUT, false).as_ptr() as u64;
        usbd.req_submit(descriptors::FASTBOOT_EP_OUT, false, addr, 64);
    }

    fn send_reply(&mut self, usbd: &mut Usbd, bytes: &[u8]) {
        let len = bytes.len().min(64);
        let addr = {
            let buf = usbd.req_buffer_mut(descriptors::FASTBOOT_EP_OUT, true);
            buf[..len].copy_from_slice(&bytes[..len]);
            buf.as_ptr() as u64
        };
        usbd.req_submit(descriptors::FASTBOOT_EP_OUT, true, addr, len);
    }

    fn reply_okay(&mut self, usbd: &mut Usbd) { self.send_reply(usbd, b"OKAY"); }

    fn reply_fail(&mut self, usbd: &mut Usbd, reason: &str) {
        let mut buf = [0u8; 64];
        let mut w = ByteWriter::new(&mut buf);
        let _ = write!(w, "FAIL{}", reason);
        let n = w.len;
        self.send_reply(usbd, &buf[..n]);
    }

    fn reply_data(&mut self, usbd: &mut Usbd, size: u32) {
        let mut buf = [0u8; 64];
        let mut w = ByteWriter::new(&mut buf);
        let _ = write!(w, "DATA{:08x}", size);
        let n = w.len;
        self.send_reply(usbd, &buf[..n]);
    }

    fn reply_info_loaded(&mut self, usbd: &mut Usbd, addr: u64, size: u64) {
        let mut buf = [0u8; 64];
        let mut w = ByteWriter::new(&mut buf);
        let _ = write!(w, "INFOLoaded at {:#x}-{:#x}", addr, addr + size);
        let n = w.len;
        self.finish_with_okay = true;
        self.send_reply(usbd, &buf[..n]);
    }

    // --- command dispatch -------------------------------------------------

    fn dispatch(&mut self, usbd: &mut Usbd, cmd: &[u8]) -> FbStatus {
        if let Some(rest) = strip_prefix(cmd, b"oem ") {
            return self.dispatch_oem(usbd, rest);
        }
        if cmd == b"reboot" {
            return self.start_reboot(usbd, platform::RebootKind::Normal);
        }
        if cmd == b"reboot-bootloader" {
            return self.start_reboot(usbd, platform::RebootKind::Bootloader);
        }
        if let Some(rest) = strip_prefix(cmd, b"download:") {
            return self.start_download(usbd, rest);
        }
        if cmd == b"flash:run" {
            return self.start_flash_run(usbd);
        }
        FbStatus::UNKNOWN_COMMAND
    }

    fn dispatch_oem(&mut self, usbd: &mut Usbd, rest: &[u8]) -> FbStatus {
        let (sub, rest) = split_cmd(rest);
        match sub {
            #[cfg(feature = "unsafe-debug")]
            b"peek" => self.start_peek(usbd, rest),
            #[cfg(feature = "unsafe-debug")]
            b"poke" => self.start_poke(usbd, rest),
            #[cfg(not(feature = "unsafe-debug"))]
            b"peek" | b"poke" => FbStatus::UNKNOWN_COMMAND,
            b"echo" => self.start_echo(usbd, rest),
            b"alloc" => self.start_alloc(usbd, rest, ALLOC_ANYWHERE),
            b"alloc32" => self.start_alloc(usbd, rest, ALLOC_32BIT),
            b"free" => self.do_free(usbd, rest),
            b"smccc" => self.do_smccc(usbd, rest),
            b"reboot" => match commands::parse_reboot_kind(rest) {
                Ok(kind) => self.start_reboot(usbd, kind.into()),
                Err(status) => status,
            },
            _ => FbStatus::UNKNOWN_COMMAND,
        }
    }

    #[cfg(feature = "unsafe-debug")]
    fn start_peek(&mut self, usbd: &mut Usbd, rest: &[u8]) -> FbStatus {
        let args = match commands::parse_peek(rest) {
            Ok(a) => a,
            Err(status) => return status,
        };
        self.peek = Some(PeekFlow { addr: args.addr, access: args.access, items_remaining: args.items });
        self.emit_peek_or_finish(usbd);
        FbStatus::OK
    }

    /// Emits the next `INFO` chunk of a peek in progress, or the terminating
    /// `OKAY` once `items_remaining` reaches zero. Re-invoked by
    /// [`Self::handle_reply_sent`] on every subsequent IN completion.
    #[cfg(feature = "unsafe-debug")]
    fn emit_peek_or_finish(&mut self, usbd: &mut Usbd) {
        let mut peek = match self.peek.take() {
            Some(p) => p,
            None => return,
        };
        if peek.items_remaining == 0 {
            self.reply_okay(usbd);
            return;
        }

        let mut buf = [0u8; 64];
        buf[..4].copy_from_slice(b"INFO");
        let mut off = 4usize;
        let budget = commands::item_budget(peek.access);
        while peek.items_remaining > 0 && off + budget <= buf.len() {
            let value = self.read_mem(peek.addr, peek.access.width());
            off += commands::format_peek_item(&mut buf[off..], peek.access, value);
            peek.addr = peek.addr.wrapping_add(peek.access.width() as u64);
            peek.items_remaining -= 1;
        }
        self.peek = Some(peek);
        self.send_reply(usbd, &buf[..off]);
    }

    #[cfg(feature = "unsafe-debug")]
    fn read_mem(&self, addr: u64, width: u8) -> u64 {
        unsafe {
            match width {
                1 => (addr as *const u8).read_volatile() as u64,
                2 => (addr as *const u16).read_volatile() as u64,
                4 => (addr as *const u32).read_volatile() as u64,
                8 => (addr as *const u64).read_volatile(),
                _ => 0,
            }
        }
    }

    #[cfg(feature = "unsafe-debug")]
    fn write_mem(&mut self, addr: u64, width: u8, value: u64) {
        unsafe {
            match width {
                1 => (addr as *mut u8).write_volatile(value as u8),
                2 => (addr as *mut u16).write_volatile(value as u16),
                4 => (addr as *mut u32).write_volatile(value as u32),
                8 => (addr as *mut u64).write_volatile(value),
                _ => {}
            }
        }
    }

    #[cfg(feature = "unsafe-debug")]
    fn write_mem_bytes(&mut self, addr: u64, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            unsafe { ((addr + i as u64) as *mut u8).write_volatile(b) };
        }
    }

    #[cfg(feature = "unsafe-debug")]
    fn start_poke(&mut self, usbd: &mut Usbd, rest: &[u8]) -> FbStatus {
        let (addr, access, values, ascii_tail) = match commands::parse_poke(rest) {
            Ok(v) => v,
            Err(status) => return status,
        };
        if access.is_ascii() {
            self.write_mem_bytes(addr, ascii_tail);
        } else {
            let mut a = addr;
            for value in values {
                self.write_mem(a, access.width(), value);
                a += access.width() as u64;
            }
        }
        self.reply_okay(usbd);
        FbStatus::OK
    }

    fn start_echo(&mut self, usbd: &mut Usbd, rest: &[u8]) -> FbStatus {
        let mut buf = [0u8; 64];
        buf[..4].copy_from_slice(b"INFO");
        let avail = buf.len() - 4;
        let n = rest.len().min(avail);
        buf[4..4 + n].copy_from_slice(&rest[..n]);
        self.finish_with_okay = true;
        self.send_reply(usbd, &buf[..4 + n]);
        FbStatus::OK
    }

    fn start_alloc(&mut self, usbd: &mut Usbd, rest: &[u8], max_addr: u64) -> FbStatus {
        let args = match commands::parse_alloc(rest) {
            Ok(a) => a,
            Err(status) => return status,
        };
        match self.lmb.alloc_base(args.size, args.align, max_addr, args.kind, tag("FBAL")) {
            Some(addr) => {
                let mut buf = [0u8; 64];
                let mut w = ByteWriter::new(&mut buf);
                let _ = write!(w, "INFO{:#x}", addr);
                let n = w.len;
                self.finish_with_okay = true;
                self.send_reply(usbd, &buf[..n]);
                FbStatus::OK
            }
            None => FbStatus::OUT_OF_MEMORY,
        }
    }

    fn do_free(&mut self, usbd: &mut Usbd, rest: &[u8]) -> FbStatus {
        let args = match commands::parse_free(rest) {
            Ok(a) => a,
            Err(status) => return status,
        };
        // Reply OKAY either way: a free of a range we never reserved is the
        // host's problem, not ours, matching the reference's fire-and-forget
        // behavior for this command.
        let _ = self.lmb.free(args.addr, args.size, args.align);
        self.reply_okay(usbd);
        FbStatus::OK
    }

    fn do_smccc(&mut self, usbd: &mut Usbd, rest: &[u8]) -> FbStatus {
        let mut args = commands::parse_smccc(rest);
        smccc::smc_call(&mut args);

        let mut buf = [0u8; 64];
        buf[..4].copy_from_slice(b"INFO");
        let mut off = 4usize;
        for (i, &v) in args[..4].iter().enumerate() {
            if i > 0 {
                buf[off] = b' ';
                off += 1;
            }
            let src = (v as u32).to_be_bytes();
            let _ = hex::encode_to_slice(src, &mut buf[off..off + 8]);
            off += 8;
        }
        self.finish_with_okay = true;
        self.send_reply(usbd, &buf[..off]);
        FbStatus::OK
    }

    fn start_reboot(&mut self, usbd: &mut Usbd, kind: platform::RebootKind) -> FbStatus {
        self.pending_reboot = Some(kind);
        self.reply_okay(usbd);
        FbStatus::OK
    }

    fn start_download(&mut self, usbd: &mut Usbd, rest: &[u8]) -> FbStatus {
        let size = match commands::parse_download_size(rest) {
            Ok(v) => v,
            Err(status) => return status,
        };

        if let Some(prev) = self.download.take() {
            let _ = self.lmb.free(prev.addr, prev.size, prev.align);
        }

        const DOWNLOAD_ALIGN: u64 = 1 << 20;
        let addr = match self.lmb.alloc_base(size as u64, DOWNLOAD_ALIGN, ALLOC_32BIT, RegionKind::Boot, tag("DLOD")) {
            Some(a) => a,
            None => return FbStatus::OUT_OF_MEMORY,
        };
        self.download = Some(Download { addr, size: size as u64, align: DOWNLOAD_ALIGN, rem: size as usize });

        // The command-mode OUT read this completion just re-armed is no
        // longer what we want listening on EP1 OUT; replace it with the
        // data-chunk read below.
        usbd.req_cancel(descriptors::FASTBOOT_EP_OUT, false);

        self.reply_data(usbd, size);
        self.submit_next_download_chunk(usbd);
        FbStatus::OK
    }

    /// A single TD can only span `0x5000` bytes ([`Usbd::req_submit`] caps
    /// it), so a download larger than that arrives in more than one chunk.
    fn submit_next_download_chunk(&mut self, usbd: &mut Usbd) {
        let dl = self.download.as_ref().expect("submit_next_download_chunk without a download in progress");
        let done = dl.size as usize - dl.rem;
        let addr = dl.addr + done as u64;
        usbd.req_submit(descriptors::FASTBOOT_EP_OUT, false, addr, dl.rem);
    }

    fn handle_download_chunk(&mut self, usbd: &mut Usbd, c: &Completion) {
        if c.error {
            self.download = None;
            self.start_cmd_read(usbd);
            return;
        }

        let done = {
            let dl = match self.download.as_mut() {
                Some(dl) => dl,
                None => return,
            };
            dl.rem = dl.rem.saturating_sub(c.io_done);
            dl.rem == 0
        };

        if done {
            let dl = self.download.as_ref().expect("download just confirmed present");
            let (addr, size) = (dl.addr, dl.size);
            self.start_cmd_read(usbd);
            self.reply_info_loaded(usbd, addr, size);
        } else {
            self.submit_next_download_chunk(usbd);
        }
    }

    fn start_flash_run(&mut self, usbd: &mut Usbd) -> FbStatus {
        if self.download.is_none() {
            return FbStatus::NOTHING_DOWNLOADED;
        }
        self.pending_flash_run = true;
        self.reply_okay(usbd);
        FbStatus::OK
    }

    /// Never returns: tail-jumps into the downloaded payload.
    fn do_jump(&mut self, _usbd: &mut Usbd) -> ! {
        let dl = self.download.as_ref().expect("flash:run without a completed download");
        let slice = unsafe { core::slice::from_raw_parts(dl.addr as *const u8, dl.size as usize) };
        let entry = platform::payload_entry(slice);
        unsafe { platform::jump(entry, self.fdt) }
    }

    // --- completion routing -------------------------------------------------

    fn handle_command_received(&mut self, usbd: &mut Usbd, c: &Completion) {
        let mut cmd = [0u8; 64];
        let len = c.io_done.min(64);
        cmd[..len].copy_from_slice(&usbd.req_buffer_mut(descriptors::FASTBOOT_EP_OUT, false)[..len]);

        // Pipeline: a fresh OUT read goes out immediately so the host can
        // queue its next command before this one's reply is even sent.
        // Skipped once the port has been de-configured out from under this
        // completion (e.g. a reset raced the transfer) -- there is no
        // endpoint left to prime.
        if usbd.current_config() != 0 {
            self.start_cmd_read(usbd);
        }

        if c.error {
            return;
        }

        if self.in_command {
            usbd.req_cancel(descriptors::FASTBOOT_EP_OUT, true);
        }
        self.in_command = true;

        let status = self.dispatch(usbd, &cmd[..len]);
        if let Some(reason) = status.0 {
            self.reply_fail(usbd, reason);
        }
    }

    fn handle_reply_sent(&mut self, usbd: &mut Usbd, c: &Completion) {
        if c.error {
            return;
        }

        #[cfg(feature = "unsafe-debug")]
        if self.peek.is_some() {
            self.emit_peek_or_finish(usbd);
            return;
        }

        if self.finish_with_okay {
            self.finish_with_okay = false;
            self.reply_okay(usbd);
            return;
        }

        if let Some(kind) = self.pending_reboot.take() {
            platform::reboot(kind);
        }
        if self.pending_flash_run {
            self.pending_flash_run = false;
            self.do_jump(usbd);
        }
    }

    fn handle_completion(&mut self, usbd: &mut Usbd, c: &Completion) {
        if c.ep_num != descriptors::FASTBOOT_EP_OUT {
            return;
        }
        if c.send {
            self.handle_reply_sent(usbd, c);
        } else if self.download.is_some() {
            self.handle_download_chunk(usbd, c);
        } else {
            self.handle_command_received(usbd, c);
        }
    }
}

impl<'a> UsbdContext for FbState<'a> {
    fn port_reset(&mut self, _usbd: &mut Usbd) {
        self.in_command = false;
        self.peek = None;
        self.pending_reboot = None;
        self.pending_flash_run = false;
        self.finish_with_okay = false;
    }

    fn port_setup(&mut self, _usbd: &mut Usbd, _ep: usize) {
        // Fastboot has no class-specific (non-EP0) setup requests.
    }

    fn set_config(&mut self, usbd: &mut Usbd, value: u8) -> bool {
        match value {
            0 => true,
            1 => {
                usbd.ep_enable(descriptors::FASTBOOT_EP_OUT, EpType::Bulk);
                self.start_cmd_read(usbd);
                true
            }
            _ => false,
        }
    }

    fn descriptor(&self, id: u16, high_speed: bool) -> Option<&'static [u8]> {
        descriptors::descriptor_for(id, high_speed)
    }
}

/// The fastboot server: a [`Usbd`] plus the protocol state driving it.
/// `'a` is the lifetime of the borrowed [`Lmb`] the `oem alloc`/`free` and
/// `download:` commands draw DMA-reachable memory from.
pub struct FbServer<'a> {
    usbd: Usbd,
    fb: FbState<'a>,
}

impl<'a> FbServer<'a> {
    /// # Safety
    /// Same contract as [`Usbd::new`]: `td` must be 32-bit-reachable,
    /// correctly aligned DMA memory that outlives this server.
    pub unsafe fn new(
        regs: UdcRegs,
        td: &'static mut [descriptors::Td],
        lmb: &'a mut Lmb,
        fdt: u64,
    ) -> Self {
        let mut usbd = Usbd::new(regs, td);
        usbd.register_ep(descriptors::FASTBOOT_EP_OUT, false, EpType::Bulk);
        usbd.register_ep(descriptors::FASTBOOT_EP_OUT, true, EpType::Bulk);
        Self { usbd, fb: FbState::new(lmb, fdt) }
    }

    pub fn init(&mut self) -> UsbdStatus { self.usbd.init() }

    /// Drives one iteration of the controller/protocol poll loop. Call this
    /// forever from the entry point; it never blocks.
    pub fn poll(&mut self) -> UsbdStatus {
        let mut completions = CompletionList::new();
        let status = self.usbd.poll(&mut self.fb, &mut completions);
        if status != UsbdStatus::Success {
            return status;
        }
        for c in completions.iter() {
            self.fb.handle_completion(&mut self.usbd, c);
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_cmd_separates_first_token() {
        assert_eq!(split_cmd(b"peek 0x1000 4"), (&b"peek"[..], &b"0x1000 4"[..]));
        assert_eq!(split_cmd(b"flash:run"), (&b"flash:run"[..], &b""[..]));
    }

    #[test]
    fn strip_prefix_matches_exactly() {
        assert_eq!(strip_prefix(b"download:00000100", b"download:"), Some(&b"00000100"[..]));
        assert_eq!(strip_prefix(b"reboot", b"download:"), None);
    }

    #[test]
    fn byte_writer_formats_and_truncates() {
        let mut buf = [0u8; 8];
        let mut w = ByteWriter::new(&mut buf);
        let _ = write!(w, "hello");
        assert_eq!(w.len, 5);
        assert_eq!(&buf[..5], b"hello");

        let mut small = [0u8; 3];
        let mut w2 = ByteWriter::new(&mut small);
        let _ = write!(w2, "toolong");
        assert_eq!(w2.len, 3);
        assert_eq!(&small[..], b"too");
    }

    #[test]
    fn download_reply_loaded_format() {
        let mut buf = [0u8; 64];
        let mut w = ByteWriter::new(&mut buf);
        let _ = write!(w, "INFOLoaded at {:#x}-{:#x}", 0x8800_0000u64, 0x8810_0000u64);
        assert_eq!(&buf[..w.len], b"INFOLoaded at 0x88000000-0x88100000");
    }
}
