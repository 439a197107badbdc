//! DMA descriptor layouts and USB descriptor tables.
//!
//! The `Td`/`Qh` structs mirror the controller's in-memory layout exactly —
//! field order and padding matter, since the hardware walks these with no
//! knowledge of Rust types. The `*Descriptor` structs below them are the
//! USB-standard wire formats reported to the host during enumeration.

pub const TD_ALIGNMENT: usize = 0x20;

const TD_NEXT_TERMINATE: u32 = 0x1;
const TD_STATUS_ACTIVE: u32 = 0x80;
const TD_STATUS_HALTED: u32 = 0x40;
const TD_STATUS_DATA_BUFF_ERR: u32 = 0x20;
const TD_STATUS_TRANSACTION_ERR: u32 = 0x8;
const TD_STATUS_ERROR_MASK: u32 = TD_STATUS_HALTED | TD_STATUS_DATA_BUFF_ERR | TD_STATUS_TRANSACTION_ERR;
const TD_ADDR_MASK: u32 = 0xffff_ffe0;
const TD_PACKET_SIZE_MASK: u32 = 0x7fff_0000;
const TD_LENGTH_BIT_POS: u32 = 16;

const QH_ZLT_SEL: u32 = 0x2000_0000;
const QH_MAX_PKT_LEN_POS: u32 = 16;
const QH_IOS: u32 = 0x8000;
const QH_NEXT_TERMINATE: u32 = 0x1;

/// One 32-byte hardware transfer descriptor. The controller's DMA engine
/// reads and writes this directly, so every field is little-endian `u32`
/// and the struct must stay exactly 32 bytes — `_pad` exists only to hit
/// that size, it is never read.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Td {
    pub next_td_ptr: u32,
    pub size_ioc_sts: u32,
    pub buff_ptr: [u32; 5],
    _pad: u32,
}

impl Td {
    pub const fn zeroed() -> Self {
        Self { next_td_ptr: 0, size_ioc_sts: 0, buff_ptr: [0; 5], _pad: 0 }
    }

    /// Initializes this TD to describe a single transfer of `size` bytes
    /// starting at physical address `buf`, terminated (no next TD chained).
    pub fn init(&mut self, buf: u64, size: usize) {
        *self = Self::zeroed();
        self.next_td_ptr = TD_ADDR_MASK | TD_NEXT_TERMINATE;
        self.size_ioc_sts = ((size as u32) << TD_LENGTH_BIT_POS) | TD_STATUS_ACTIVE;
        self.buff_ptr[0] = buf as u32;
        for page in 1..5 {
            let threshold = buf + (page as u64) * 0x1000;
            if buf + size as u64 > threshold {
                self.buff_ptr[page] = threshold as u32;
            }
        }
    }

    pub fn is_active(&self) -> bool { self.size_ioc_sts & TD_STATUS_ACTIVE != 0 }

    pub fn has_error(&self) -> bool { self.size_ioc_sts & TD_STATUS_ERROR_MASK != 0 }

    /// Bytes actually transferred, derived from the residual length the
    /// controller leaves behind on completion.
    pub fn bytes_transferred(&self, requested: usize) -> usize {
        let residual = (self.size_ioc_sts & TD_PACKET_SIZE_MASK) >> TD_LENGTH_BIT_POS;
        requested - residual as usize
    }
}

/// One 64-byte hardware queue head, one pair (OUT, IN) per endpoint, packed
/// back to back in the table `USBLISTADR` points at.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Qh {
    pub max_pkt_length: u32,
    pub curr_dtd_ptr: u32,
    pub next_dtd_ptr: u32,
    pub size_ioc_int_sts: u32,
    pub buff_ptr: [u32; 5],
    _res1: u32,
    pub setup_buffer: [u8; 8],
    _res2: [u32; 4],
}

impl Qh {
    pub const fn zeroed() -> Self {
        Self {
            max_pkt_length: 0,
            curr_dtd_ptr: 0,
            next_dtd_ptr: 0,
            size_ioc_int_sts: 0,
            buff_ptr: [0; 5],
            _res1: 0,
            setup_buffer: [0; 8],
            _res2: [0; 4],
        }
    }

    /// Initializes this queue head for `max_packet`-sized transfers, chained
    /// to `first_td`. `is_ep0_out` sets the interrupt-on-setup bit that only
    /// applies to the control endpoint's OUT queue head.
    pub fn init(&mut self, max_packet: u16, is_ep0_out: bool, first_td: u64) {
        *self = Self::zeroed();
        self.max_pkt_length = ((max_packet as u32) << QH_MAX_PKT_LEN_POS) | QH_ZLT_SEL;
        if is_ep0_out {
            self.max_pkt_length |= QH_IOS;
        }
        self.curr_dtd_ptr = TD_ADDR_MASK | QH_NEXT_TERMINATE;
        self.next_dtd_ptr = first_td as u32;
    }
}

const _: () = assert!(core::mem::size_of::<Td>() == 32);
const _: () = assert!(core::mem::size_of::<Qh>() == 64);

pub const CONTROL_MAX: u16 = 64;
pub const FS_BULK_MAX: u16 = 64;
pub const HS_BULK_MAX: u16 = 512;

pub const fn bulk_max_packet(high_speed: bool) -> u16 {
    if high_speed { HS_BULK_MAX } else { FS_BULK_MAX }
}

// --- USB standard descriptors --------------------------------------------

pub const USB_DT_DEVICE: u8 = 0x01;
pub const USB_DT_CONFIG: u8 = 0x02;
pub const USB_DT_STRING: u8 = 0x03;
pub const USB_DT_INTERFACE: u8 = 0x04;
pub const USB_DT_ENDPOINT: u8 = 0x05;
pub const USB_DT_DEVICE_QUALIFIER: u8 = 0x06;

pub const USB_ENDPOINT_XFER_BULK: u8 = 0x02;
pub const USB_DIR_IN: u8 = 0x80;
pub const USB_DIR_OUT: u8 = 0x00;

pub const VENDOR_ID: u16 = 0x18d1;
pub const PRODUCT_ID: u16 = 0xd00d;
pub const DEVICE_RELEASE: u16 = 0x0100;

pub const MANUFACTURER: &str = "Tegra";
pub const PRODUCT: &str = "Fastboot";
pub const SERIAL_DEFAULT: &str = "0";

pub const STRING_IDX_MANUFACTURER: u8 = 1;
pub const STRING_IDX_PRODUCT: u8 = 2;
pub const STRING_IDX_SERIAL: u8 = 4;

pub const FASTBOOT_IFACE_CLASS: u8 = 0xff;
pub const FASTBOOT_IFACE_SUBCLASS: u8 = 0x42;
pub const FASTBOOT_IFACE_PROTOCOL: u8 = 0x03;

pub const FASTBOOT_EP_OUT: u8 = 1;
pub const FASTBOOT_EP_IN: u8 = 0x81;

/// Identifies an entry in a descriptor table, matching the `(type << 8) |
/// index` scheme the control-transfer `GET_DESCRIPTOR` request uses to pick
/// one out.
pub const fn desc_id(desc_type: u8, index: u8) -> u16 { ((desc_type as u16) << 8) | index as u16 }

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct DeviceDescriptor {
    pub b_length: u8,
    pub b_descriptor_type: u8,
    pub bcd_usb: u16,
    pub b_device_class: u8,
    pub b_device_sub_class: u8,
    pub b_device_protocol: u8,
    pub b_max_packet_size0: u8,
    pub id_vendor: u16,
    pub id_product: u16,
    pub bcd_device: u16,
    pub i_manufacturer: u8,
    pub i_product: u8,
    pub i_serial_number: u8,
    pub b_num_configurations: u8,
}

impl AsRef<[u8]> for DeviceDescriptor {
    fn as_ref(&self) -> &[u8] {
        unsafe {
            core::slice::from_raw_parts(
                self as *const DeviceDescriptor as *const u8,
                core::mem::size_of::<DeviceDescriptor>(),
            )
        }
    }
}

pub static DEVICE_DESCRIPTOR: DeviceDescriptor = DeviceDescriptor {
    b_length: core::mem::size_of::<DeviceDescriptor>() as u8,
    b_descriptor_type: USB_DT_DEVICE,
    bcd_usb: 0x0200,
    b_device_class: 0,
    b_device_sub_class: 0,
    b_device_protocol: 0,
    b_max_packet_size0: CONTROL_MAX as u8,
    id_vendor: VENDOR_ID,
    id_product: PRODUCT_ID,
    bcd_device: DEVICE_RELEASE,
    i_manufacturer: STRING_IDX_MANUFACTURER,
    i_product: STRING_IDX_PRODUCT,
    i_serial_number: STRING_IDX_SERIAL,
    b_num_configurations: 1,
};

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EndpointDescriptor {
    pub b_length: u8,
    pub b_descriptor_type: u8,
    pub b_endpoint_address: u8,
    pub bm_attributes: u8,
    pub w_max_packet_size: u16,
    pub b_interval: u8,
}

impl AsRef<[u8]> for EndpointDescriptor {
    fn as_ref(&self) -> &[u8] {
        unsafe {
            core::slice::from_raw_parts(
                self as *const EndpointDescriptor as *const u8,
                core::mem::size_of::<EndpointDescriptor>(),
            )
        }
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct InterfaceDescriptor {
    pub b_length: u8,
    pub b_descriptor_type: u8,
    pub b_interface_number: u8,
    pub b_alternate_setting: u8,
    pub b_num_endpoints: u8,
    pub b_interface_class: u8,
    pub b_interface_sub_class: u8,
    pub b_interface_protocol: u8,
    pub i_interface: u8,
}

impl AsRef<[u8]> for InterfaceDescriptor {
    fn as_ref(&self) -> &[u8] {
        unsafe {
            core::slice::from_raw_parts(
                self as *const InterfaceDescriptor as *const u8,
                core::mem::size_of::<InterfaceDescriptor>(),
            )
        }
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct ConfigDescriptor {
    pub b_length: u8,
    pub b_descriptor_type: u8,
    pub w_total_length: u16,
    pub b_num_interfaces: u8,
    pub b_configuration_value: u8,
    pub i_configuration: u8,
    pub bm_attributes: u8,
    pub b_max_power: u8,
}

impl AsRef<[u8]> for ConfigDescriptor {
    fn as_ref(&self) -> &[u8] {
        unsafe {
            core::slice::from_raw_parts(
                self as *const ConfigDescriptor as *const u8,
                core::mem::size_of::<ConfigDescriptor>(),
            )
        }
    }
}

/// Composite configuration descriptor: config header + one interface + two
/// bulk endpoints, packed contiguously so a single `GET_DESCRIPTOR(CONFIG)`
/// reply can hand the whole thing over as one byte run.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct FastbootConfig {
    pub config: ConfigDescriptor,
    pub iface: InterfaceDescriptor,
    pub ep_out: EndpointDescriptor,
    pub ep_in: EndpointDescriptor,
}

impl AsRef<[u8]> for FastbootConfig {
    fn as_ref(&self) -> &[u8] {
        unsafe {
            core::slice::from_raw_parts(
                self as *const FastbootConfig as *const u8,
                core::mem::size_of::<FastbootConfig>(),
            )
        }
    }
}

const CONFIG_TOTAL_LEN: u16 = (core::mem::size_of::<ConfigDescriptor>()
    + core::mem::size_of::<InterfaceDescriptor>()
    + 2 * core::mem::size_of::<EndpointDescriptor>()) as u16;

pub const fn fastboot_config(high_speed: bool) -> FastbootConfig {
    let max_packet = bulk_max_packet(high_speed);
    FastbootConfig {
        config: ConfigDescriptor {
            b_length: core::mem::size_of::<ConfigDescriptor>() as u8,
            b_descriptor_type: USB_DT_CONFIG,
            w_total_length: CONFIG_TOTAL_LEN,
            b_num_interfaces: 1,
            b_configuration_value: 1,
            i_configuration: 0,
            bm_attributes: 0x80,
            b_max_power: 0x32,
        },
        iface: InterfaceDescriptor {
            b_length: core::mem::size_of::<InterfaceDescriptor>() as u8,
            b_descriptor_type: USB_DT_INTERFACE,
            b_interface_number: 0,
            b_alternate_setting: 0,
            b_num_endpoints: 2,
            b_interface_class: FASTBOOT_IFACE_CLASS,
            b_interface_sub_class: FASTBOOT_IFACE_SUBCLASS,
            b_interface_protocol: FASTBOOT_IFACE_PROTOCOL,
            i_interface: 0,
        },
        ep_out: EndpointDescriptor {
            b_length: core::mem::size_of::<EndpointDescriptor>() as u8,
            b_descriptor_type: USB_DT_ENDPOINT,
            b_endpoint_address: FASTBOOT_EP_OUT,
            bm_attributes: USB_ENDPOINT_XFER_BULK,
            w_max_packet_size: max_packet,
            b_interval: 0,
        },
        ep_in: EndpointDescriptor {
            b_length: core::mem::size_of::<EndpointDescriptor>() as u8,
            b_descriptor_type: USB_DT_ENDPOINT,
            b_endpoint_address: FASTBOOT_EP_IN,
            bm_attributes: USB_ENDPOINT_XFER_BULK,
            w_max_packet_size: max_packet,
            b_interval: 0,
        },
    }
}

pub static FASTBOOT_CONFIG_FS: FastbootConfig = fastboot_config(false);
pub static FASTBOOT_CONFIG_HS: FastbootConfig = fastboot_config(true);

/// UTF-16LE string descriptor, built from a `&str` at compile time. Only
/// ASCII input is supported (every string this loader reports is ASCII),
/// which keeps construction a `const fn` and lets every reported string
/// live as a `'static` table instead of being rebuilt on each `GET_DESCRIPTOR`.
pub struct StringDescriptor {
    buf: [u8; 64],
    len: u8,
}

impl StringDescriptor {
    pub const fn ascii(s: &str) -> Self {
        let bytes = s.as_bytes();
        let mut buf = [0u8; 64];
        let mut len = 2usize;
        let mut i = 0;
        while i < bytes.len() {
            if len + 2 > buf.len() {
                break;
            }
            buf[len] = bytes[i];
            buf[len + 1] = 0;
            len += 2;
            i += 1;
        }
        buf[0] = len as u8;
        buf[1] = USB_DT_STRING;
        Self { buf, len: len as u8 }
    }

    pub const fn langid() -> Self {
        // English (US), the only language this loader ever reports.
        let mut buf = [0u8; 64];
        buf[0] = 4;
        buf[1] = USB_DT_STRING;
        buf[2] = 0x09;
        buf[3] = 0x04;
        Self { buf, len: 4 }
    }
}

impl AsRef<[u8]> for StringDescriptor {
    fn as_ref(&self) -> &[u8] { &self.buf[..self.len as usize] }
}

pub static LANGID_DESC: StringDescriptor = StringDescriptor::langid();
pub static MANUFACTURER_DESC: StringDescriptor = StringDescriptor::ascii(MANUFACTURER);
pub static PRODUCT_DESC: StringDescriptor = StringDescriptor::ascii(PRODUCT);
pub static SERIAL_DESC: StringDescriptor = StringDescriptor::ascii(SERIAL_DEFAULT);

/// Resolves a `GET_DESCRIPTOR` index (`(type << 8) | index`, see [`desc_id`])
/// against the fixed tables above. `high_speed` selects which of the two
/// config descriptors' endpoint `wMaxPacketSize` fields applies.
pub fn descriptor_for(id: u16, high_speed: bool) -> Option<&'static [u8]> {
    let desc_type = (id >> 8) as u8;
    let index = (id & 0xff) as u8;
    match desc_type {
        USB_DT_DEVICE => Some(DEVICE_DESCRIPTOR.as_ref()),
        USB_DT_CONFIG => {
            Some(if high_speed { FASTBOOT_CONFIG_HS.as_ref() } else { FASTBOOT_CONFIG_FS.as_ref() })
        }
        USB_DT_STRING => match index {
            0 => Some(LANGID_DESC.as_ref()),
            STRING_IDX_MANUFACTURER => Some(MANUFACTURER_DESC.as_ref()),
            STRING_IDX_PRODUCT => Some(PRODUCT_DESC.as_ref()),
            STRING_IDX_SERIAL => Some(SERIAL_DESC.as_ref()),
            _ => None,
        },
        _ => None,
    }
}
