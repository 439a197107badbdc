//! Chipidea/EHCI-style device-mode USB controller driver.
//!
//! Single-threaded and poll-driven: there is no interrupt handler anywhere
//! in this module. [`Usbd::poll`] is meant to be called from a tight loop;
//! it drains `USBSTS`, then completed transfers, then pending setup
//! packets, in that order, every time it's called.

pub mod descriptors;
pub mod regs;

use descriptors::Td;
use regs::UdcRegs;

pub const MAX_EPS: usize = 16;
pub const MAX_REQS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbdStatus {
    Success,
    BadAlignment,
    PortChangeError,
    UsbstsError,
    EpUnconfigured,
    SetupPacketUnsupported,
    ConfigUnsupported,
}

impl core::fmt::Display for UsbdStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            UsbdStatus::Success => "success",
            UsbdStatus::BadAlignment => "bad alignment",
            UsbdStatus::PortChangeError => "port change error",
            UsbdStatus::UsbstsError => "USBSTS error",
            UsbdStatus::EpUnconfigured => "endpoint unconfigured",
            UsbdStatus::SetupPacketUnsupported => "setup packet unsupported",
            UsbdStatus::ConfigUnsupported => "config unsupported",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpType {
    None,
    Ctrl,
    Iso,
    Bulk,
    Intr,
}

/// A single-direction endpoint: one queue head, one transfer descriptor.
pub struct Ep {
    pub num: u8,
    pub send: bool,
    pub ty: EpType,
}

/// One in-flight (or idle) transfer request bound to an endpoint.
pub struct Req {
    pub buffer: [u8; 64],
    pub buffer_addr: u64,
    pub buffer_length: usize,
    pub io_done: usize,
    pub error: bool,
    pub active: bool,
    pub ep_num: u8,
    pub send: bool,
}

impl Req {
    pub const fn new() -> Self {
        Self {
            buffer: [0; 64],
            buffer_addr: 0,
            buffer_length: 0,
            io_done: 0,
            error: false,
            active: false,
            ep_num: 0,
            send: false,
        }
    }
}

/// A request that finished (successfully or not) since the last `poll`.
/// EP0's own completions are handled internally and never show up here;
/// this is strictly the class driver's (fastboot's) business.
#[derive(Clone, Copy)]
pub struct Completion {
    pub ep_num: u8,
    pub send: bool,
    pub error: bool,
    pub io_done: usize,
}

pub const MAX_COMPLETIONS: usize = MAX_EPS;

/// Fixed-capacity list handed back from [`Usbd::poll`]. There is no heap, so
/// this is a small array plus a count rather than a `Vec`.
pub struct CompletionList {
    items: [Option<Completion>; MAX_COMPLETIONS],
    count: usize,
}

impl CompletionList {
    pub const fn new() -> Self { Self { items: [None; MAX_COMPLETIONS], count: 0 } }

    fn push(&mut self, c: Completion) {
        if self.count < self.items.len() {
            self.items[self.count] = Some(c);
            self.count += 1;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Completion> { self.items[..self.count].iter().filter_map(|x| x.as_ref()) }

    pub fn is_empty(&self) -> bool { self.count == 0 }
}

/// Everything a caller must supply to get a request's completion callback
/// invoked: the standard-request handling (`ep0_setup`) and the
/// class-specific setup/port-reset/set-config hooks live above this driver,
/// not inside it, so it stays ignorant of fastboot's command protocol.
pub trait UsbdContext {
    fn port_reset(&mut self, usbd: &mut Usbd);
    fn port_setup(&mut self, usbd: &mut Usbd, ep: usize);
    /// Returns `true` if `value` is an acceptable configuration. Gets
    /// `usbd` so it can enable the endpoints its configuration needs and
    /// queue its first reads before acking the status stage.
    fn set_config(&mut self, usbd: &mut Usbd, value: u8) -> bool;
    fn descriptor(&self, id: u16, high_speed: bool) -> Option<&'static [u8]>;
}

/// Request slot index: OUT endpoints occupy `0..MAX_EPS`, IN endpoints
/// `MAX_EPS..2*MAX_EPS`, matching the reference driver's flat array.
fn req_slot(ep_num: u8, send: bool) -> usize {
    ep_num as usize + if send { MAX_EPS } else { 0 }
}

/// The UDC driver proper. Owns the hardware TD/QH table and the fixed
/// request-slot array; knows nothing about what the bytes in any buffer
/// mean.
pub struct Usbd {
    regs: UdcRegs,
    td: &'static mut [Td],
    reqs: [Req; 2 * MAX_EPS],
    eps: [Option<Ep>; MAX_EPS],
    hs: bool,
    current_config: u8,
}

impl Usbd {
    /// # Safety
    /// `regs` must address a live EHCI/Chipidea controller, whose
    /// `ehci_base+0x1000` queue-head window this driver will read and write
    /// directly. `td` must be 32-byte-aligned, 32-bit-reachable DMA memory
    /// sized for `eps.len()` endpoints (one TD per registered direction) and
    /// must remain valid for as long as this driver runs.
    pub unsafe fn new(regs: UdcRegs, td: &'static mut [Td]) -> Self {
        Self {
            regs,
            td,
            reqs: core::array::from_fn(|_| Req::new()),
            eps: core::array::from_fn(|_| None),
            hs: false,
            current_config: 0,
        }
    }

    /// Registers an endpoint so `init`/`port_reset` know to prime a TD for
    /// it. EP0 in both directions is implicit and always control-type.
    pub fn register_ep(&mut self, num: u8, send: bool, ty: EpType) {
        let idx = req_slot(num, send).min(MAX_EPS - 1);
        self.eps[idx] = Some(Ep { num, send, ty });
    }

    /// Index into the heap-allocated TD pool for `ep`/`send`; queue heads
    /// have no such index, they live at a fixed MMIO offset per endpoint.
    fn td_index(&self, ep: u8, send: bool) -> usize { ep as usize * 2 + if send { 1 } else { 0 } }

    fn hw_ep_init(&self, ep: u8, rx: EpType, tx: EpType) {
        if ep == 0 {
            // Control endpoints are always on; no EP_CTRL programming needed.
            return;
        }
        let mut ctrl = regs::EpCtrl::default();
        if rx != EpType::None {
            ctrl.set_rx_type(ep_type_code(rx));
            ctrl.set_rxe(true);
            ctrl.set_rxr(true);
        }
        if tx != EpType::None {
            ctrl.set_tx_type(ep_type_code(tx));
            ctrl.set_txe(true);
            ctrl.set_txr(true);
        }
        self.regs.set_ep_ctrl(ep as usize, ctrl);
    }

    pub fn ep_enable(&mut self, num: u8, ty: EpType) {
        self.hw_ep_init(num, ty, ty);
    }

    pub fn ep_disable(&mut self, num: u8) {
        self.hw_ep_init(num, EpType::None, EpType::None);
    }

    fn max_packet(&self, ty: EpType) -> u16 {
        match ty {
            EpType::Ctrl => descriptors::CONTROL_MAX,
            EpType::Bulk => descriptors::bulk_max_packet(self.hs),
            EpType::Intr => if self.hs { 1024 } else { 64 },
            EpType::Iso => if self.hs { 1024 } else { 1023 },
            EpType::None => 0,
        }
    }

    /// Resets the controller, switches it into device mode, and programs
    /// `USBLISTADR` at the queue-head table -- the controller's own fixed
    /// `ehci_base+0x1000` MMIO window, not a heap buffer. Spins on `USBCMD`
    /// acking the reset and the mode-switch, matching the reference
    /// sequence exactly.
    pub fn init(&mut self) -> UsbdStatus {
        let td_addr = self.td.as_ptr() as u64;
        if td_addr % descriptors::TD_ALIGNMENT as u64 != 0 {
            return UsbdStatus::BadAlignment;
        }
        if td_addr > 0xffff_ffff {
            return UsbdStatus::BadAlignment;
        }

        self.current_config = 0;
        self.hs = false;

        self.regs.set_usbcmd(regs::USBCMD_ITC_DEFAULT | regs::USBCMD_RESET);
        while self.regs.usbcmd() & regs::USBCMD_RESET != 0 {}

        self.regs.set_usbmode(regs::USBMODE_DEVICE);
        while self.regs.usbmode() & regs::USBMODE_MASK != regs::USBMODE_DEVICE {}

        self.regs.hw_ep_flush(None, false);
        self.regs.set_usblistadr(self.regs.qh_table_base() as u32);
        self.regs.set_usbcmd(regs::USBCMD_ITC_DEFAULT | regs::USBCMD_RUN);

        UsbdStatus::Success
    }

    /// Builds the queue head for `ep`/`send` and primes its transfer
    /// descriptor for a `buffer_length`-byte transfer at `buf_addr`,
    /// issuing the store barrier before handing it to the controller.
    pub fn req_submit(&mut self, ep_num: u8, send: bool, buf_addr: u64, buffer_length: usize) -> UsbdStatus {
        let buffer_length = buffer_length.min(0x5000);
        let slot = req_slot(ep_num, send);
        if self.reqs[slot].active {
            return UsbdStatus::EpUnconfigured;
        }

        self.regs.hw_ep_flush(Some(ep_num as usize), send);

        let qh_idx = self.td_index(ep_num, send);
        let max_packet = self.max_packet(if ep_num == 0 { EpType::Ctrl } else { EpType::Bulk });
        self.td[qh_idx].init(buf_addr, buffer_length);
        crate::barrier::dsb_st();
        let td_addr = self.td.as_ptr() as u64 + (qh_idx * core::mem::size_of::<Td>()) as u64;
        unsafe { self.regs.qh_mut(ep_num as usize, send) }.init(max_packet, ep_num == 0 && !send, td_addr);
        crate::barrier::dsb_st();

        let bits: u32 = if send { 1 << (16 + ep_num) } else { 1 << ep_num };
        self.regs.set_eptprime(bits);

        self.reqs[slot].buffer_addr = buf_addr;
        self.reqs[slot].buffer_length = buffer_length;
        self.reqs[slot].io_done = 0;
        self.reqs[slot].error = false;
        self.reqs[slot].active = true;
        self.reqs[slot].ep_num = ep_num;
        self.reqs[slot].send = send;
        UsbdStatus::Success
    }

    /// Borrows the request's embedded short-transfer buffer, for callers
    /// that submit from it directly (EP0 replies, fastboot's small INFO/OKAY
    /// packets) instead of from an external DMA buffer.
    pub fn req_buffer_mut(&mut self, ep_num: u8, send: bool) -> &mut [u8; 64] {
        &mut self.reqs[req_slot(ep_num, send)].buffer
    }

    pub fn req_is_active(&self, ep_num: u8, send: bool) -> bool { self.reqs[req_slot(ep_num, send)].active }

    pub fn req_cancel(&mut self, ep_num: u8, send: bool) {
        let slot = req_slot(ep_num, send);
        if !self.reqs[slot].active {
            return;
        }
        self.regs.hw_ep_flush(Some(ep_num as usize), send);
        self.reqs[slot].active = false;
        self.reqs[slot].error = true;
    }

    /// EP0's own completions are consumed internally (the in-completion of a
    /// control write chains the zero-length OUT status stage); everything
    /// else is reported out through `out`.
    fn complete_slot(&mut self, slot: usize, out: &mut CompletionList) {
        let ep_num = self.reqs[slot].ep_num;
        let send = self.reqs[slot].send;
        let qh_idx = self.td_index(ep_num, send);
        let td = &self.td[qh_idx];
        let error = td.has_error();
        let done = td.bytes_transferred(self.reqs[slot].buffer_length);
        self.reqs[slot].active = false;
        self.reqs[slot].error = error;
        self.reqs[slot].io_done = done;

        if ep_num == 0 {
            if send && !error {
                // Control write's data/status stage completed; ack it with
                // a zero-length read, matching usbd_ep0_in_req_complete.
                self.req_submit(0, false, 0, 0);
            }
            return;
        }
        out.push(Completion { ep_num, send, error, io_done: done });
    }

    /// Re-acks and processes a `port_reset`: clears completion/setup
    /// status, flushes every endpoint, fails every in-flight request, and
    /// re-disables every non-control endpoint.
    fn port_reset(&mut self, ctx: &mut dyn UsbdContext, out: &mut CompletionList) {
        let setupst = self.regs.eptsetupst();
        self.regs.ack_eptsetupst(setupst);
        let complete = self.regs.eptcomplete();
        self.regs.ack_eptcomplete(complete);
        self.regs.hw_ep_flush(None, false);

        for slot in 0..self.reqs.len() {
            if self.reqs[slot].active {
                let ep_num = self.reqs[slot].ep_num;
                let send = self.reqs[slot].send;
                self.reqs[slot].active = false;
                self.reqs[slot].error = true;
                if ep_num != 0 {
                    out.push(Completion { ep_num, send, error: true, io_done: 0 });
                }
            }
        }

        for ep in 1..MAX_EPS {
            self.hw_ep_init(ep as u8, EpType::None, EpType::None);
        }

        self.current_config = 0;
        ctx.port_reset(self);
    }

    fn port_change(&mut self) -> UsbdStatus {
        let devlc = self.regs.usbdevlc();
        match devlc.mode() {
            regs::DEVLC_MODE_FULL => {
                self.hs = false;
                UsbdStatus::Success
            }
            regs::DEVLC_MODE_HIGH => {
                self.hs = true;
                UsbdStatus::Success
            }
            _ => UsbdStatus::PortChangeError,
        }
    }

    fn ep0_setup_ack(&mut self) {
        self.req_submit(0, true, 0, 0);
    }

    /// Sends up to `max_len` bytes of `data` (further capped at the small
    /// buffer's 64-byte size). `max_len` is the SETUP stage's `wLength`:
    /// the host can ask for fewer bytes than a descriptor actually has
    /// (e.g. an 8-byte first fetch of the device descriptor).
    fn ep0_setup_tx(&mut self, data: &'static [u8], max_len: usize) {
        let len = data.len().min(max_len).min(64);
        let addr = {
            let buf = &mut self.reqs[req_slot(0, true)].buffer;
            buf[..len].copy_from_slice(&data[..len]);
            buf.as_ptr() as u64
        };
        self.req_submit(0, true, addr, len);
    }

    /// Standard control-transfer dispatch: `SET_ADDRESS`, `GET_DESCRIPTOR`,
    /// `SET_CONFIGURATION`, `GET_CONFIGURATION`. Anything else is rejected
    /// with `SetupPacketUnsupported` so the caller can stall the endpoint.
    fn ep0_setup(&mut self, ctx: &mut dyn UsbdContext, req: &SetupPacket) -> UsbdStatus {
        const USB_REQ_SET_ADDRESS: u8 = 0x05;
        const USB_REQ_GET_DESCRIPTOR: u8 = 0x06;
        const USB_REQ_GET_CONFIGURATION: u8 = 0x08;
        const USB_REQ_SET_CONFIGURATION: u8 = 0x09;

        match req.b_request {
            USB_REQ_SET_ADDRESS => {
                let addr = regs::USBDEVADDR_ADVANCE | ((req.w_value as u32) << regs::USBDEVADDR_SHIFT);
                self.regs.set_usbdevaddr(addr);
                self.ep0_setup_ack();
                UsbdStatus::Success
            }
            USB_REQ_GET_DESCRIPTOR => match ctx.descriptor(req.w_value, self.hs) {
                Some(data) => {
                    self.ep0_setup_tx(data, req.w_length as usize);
                    UsbdStatus::Success
                }
                None => UsbdStatus::SetupPacketUnsupported,
            },
            USB_REQ_SET_CONFIGURATION => {
                let value = req.w_value as u8;
                if value as u16 != self.current_config as u16 {
                    if !ctx.set_config(self, value) {
                        return UsbdStatus::ConfigUnsupported;
                    }
                    self.current_config = value;
                }
                self.ep0_setup_ack();
                UsbdStatus::Success
            }
            USB_REQ_GET_CONFIGURATION => {
                let byte: &'static [u8] = match self.current_config {
                    0 => &[0],
                    1 => &[1],
                    _ => &[0],
                };
                self.ep0_setup_tx(byte, req.w_length as usize);
                UsbdStatus::Success
            }
            _ => UsbdStatus::SetupPacketUnsupported,
        }
    }

    /// Drains `EPTSETUPST`: for each set bit, copies the eight-byte setup
    /// packet out of that endpoint's OUT queue head, acks the bit, and
    /// dispatches it (EP0 internally, everything else to `ctx.port_setup`).
    fn port_setup(&mut self, ctx: &mut dyn UsbdContext) {
        let mut pending = self.regs.eptsetupst();
        let mut ep_ix = 0usize;
        while pending != 0 {
            if pending & 1 != 0 {
                let qh = unsafe { self.regs.qh_mut(ep_ix, false) };
                let setup = SetupPacket::from_bytes(&qh.setup_buffer);

                loop {
                    self.regs.ack_eptsetupst(1 << ep_ix);
                    if self.regs.eptsetupst() & (1 << ep_ix) == 0 {
                        break;
                    }
                }

                let status = if ep_ix == 0 { self.ep0_setup(ctx, &setup) } else {
                    ctx.port_setup(self, ep_ix);
                    UsbdStatus::Success
                };
                if status != UsbdStatus::Success {
                    self.hw_ep_stall(ep_ix as u8);
                }
            }
            pending >>= 1;
            ep_ix += 1;
        }
    }

    fn hw_ep_stall(&self, ep: u8) {
        let mut ctrl = self.regs.ep_ctrl(ep as usize);
        ctrl.set_rxs(true);
        ctrl.set_txs(true);
        self.regs.set_ep_ctrl(ep as usize, ctrl);
    }

    fn completions(&mut self, out: &mut CompletionList) {
        let mut pending = self.regs.eptcomplete();
        if pending == 0 {
            return;
        }
        self.regs.ack_eptcomplete(pending);
        crate::barrier::dsb_ld();

        let mut ep_ix = 0usize;
        while pending != 0 {
            if pending & 1 != 0 {
                let send = ep_ix >= MAX_EPS;
                let ep_num = (ep_ix % MAX_EPS) as u8;
                let slot = req_slot(ep_num, send);
                if self.reqs[slot].active {
                    self.complete_slot(slot, out);
                }
            }
            pending >>= 1;
            ep_ix += 1;
        }
    }

    /// Call this every loop iteration. Drains `USBSTS`, then completed
    /// transfers (reported through `out`), then pending setup packets, in
    /// that order. Returns `Success` when nothing errored.
    pub fn poll(&mut self, ctx: &mut dyn UsbdContext, out: &mut CompletionList) -> UsbdStatus {
        let sts = self.regs.usbsts();
        if sts != 0 {
            self.regs.ack_usbsts(sts);
            if sts & regs::USBSTS_SLI != 0 {
                self.init();
            } else if sts & regs::USBSTS_RESET != 0 {
                self.port_reset(ctx, out);
            } else if sts & regs::USBSTS_PORT_CHANGE != 0 {
                let status = self.port_change();
                if status != UsbdStatus::Success {
                    return status;
                }
            } else {
                return UsbdStatus::UsbstsError;
            }
        }

        self.completions(out);
        self.port_setup(ctx);
        UsbdStatus::Success
    }

    pub fn high_speed(&self) -> bool { self.hs }
    pub fn current_config(&self) -> u8 { self.current_config }
}

fn ep_type_code(ty: EpType) -> u8 {
    match ty {
        EpType::Ctrl => 0,
        EpType::Iso => 0,
        EpType::Bulk => 1,
        EpType::Intr => 2,
        EpType::None => 0,
    }
}

/// The eight-byte `SETUP` stage of a control transfer.
#[derive(Clone, Copy)]
pub struct SetupPacket {
    pub b_request_type: u8,
    pub b_request: u8,
    pub w_value: u16,
    pub w_index: u16,
    pub w_length: u16,
}

impl SetupPacket {
    fn from_bytes(b: &[u8; 8]) -> Self {
        Self {
            b_request_type: b[0],
            b_request: b[1],
            w_value: u16::from_le_bytes([b[2], b[3]]),
            w_index: u16::from_le_bytes([b[4], b[5]]),
            w_length: u16::from_le_bytes([b[6], b[7]]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_packet_parses_little_endian_fields() {
        let raw = [0x80u8, 0x06, 0x00, 0x01, 0x00, 0x00, 0x40, 0x00];
        let req = SetupPacket::from_bytes(&raw);
        assert_eq!(req.b_request_type, 0x80);
        assert_eq!(req.b_request, 0x06);
        assert_eq!(req.w_value, 0x0100);
        assert_eq!(req.w_index, 0);
        assert_eq!(req.w_length, 0x40);
    }

    #[test]
    fn req_slot_separates_directions() {
        assert_eq!(req_slot(0, false), 0);
        assert_eq!(req_slot(0, true), MAX_EPS);
        assert_eq!(req_slot(1, false), 1);
        assert_eq!(req_slot(1, true), MAX_EPS + 1);
    }

    #[test]
    fn ep_type_codes_match_register_encoding() {
        assert_eq!(ep_type_code(EpType::Bulk), 1);
        assert_eq!(ep_type_code(EpType::Intr), 2);
    }
}
