//! Status register and identification decoding
//!
//! Pure, stateless and total: every one of the 256 byte values decodes,
//! and re-encoding the structured fields reproduces the original byte
//! exactly. BUSY and WEL are read-only reflections of chip hardware
//! state; everything else is read-modify-write through the driver's
//! `set_status*` operations.

use bitflags::bitflags;

use crate::chip::AddressMode;

bitflags! {
    /// Status Register 1
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Status1: u8 {
        /// Erase/write in progress (read-only)
        const BUSY = 1 << 0;
        /// Write enable latch (read-only)
        const WEL  = 1 << 1;
        /// Block protect bit 0
        const BP0  = 1 << 2;
        /// Block protect bit 1
        const BP1  = 1 << 3;
        /// Block protect bit 2
        const BP2  = 1 << 4;
        /// Top/bottom protect
        const TB   = 1 << 5;
        /// Sector/block protect
        const SEC  = 1 << 6;
        /// Status register protect 0
        const SRP0 = 1 << 7;
    }
}

bitflags! {
    /// Status Register 2
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Status2: u8 {
        /// Status register protect 1
        const SRP1 = 1 << 0;
        /// Quad enable - gates all x4 commands
        const QE   = 1 << 1;
        /// Reserved bit (kept so decode round-trips exactly)
        const RESERVED = 1 << 2;
        /// Security register 1 lock (one-time programmable)
        const LB1  = 1 << 3;
        /// Security register 2 lock (one-time programmable)
        const LB2  = 1 << 4;
        /// Security register 3 lock (one-time programmable)
        const LB3  = 1 << 5;
        /// Complement protect
        const CMP  = 1 << 6;
        /// Suspend status (read-only)
        const SUS  = 1 << 7;
    }
}

impl Status1 {
    /// Decode a raw SR1 byte (total over all 256 values)
    pub const fn decode(byte: u8) -> Self {
        Self::from_bits_retain(byte)
    }

    /// True while an erase or program is in progress
    pub const fn busy(self) -> bool {
        self.contains(Self::BUSY)
    }

    /// True when the write enable latch is set
    pub const fn write_enabled(self) -> bool {
        self.contains(Self::WEL)
    }
}

impl Status2 {
    /// Decode a raw SR2 byte (total over all 256 values)
    pub const fn decode(byte: u8) -> Self {
        Self::from_bits_retain(byte)
    }

    /// True when quad commands are enabled
    pub const fn quad_enabled(self) -> bool {
        self.contains(Self::QE)
    }

    /// True while an erase or program is suspended
    pub const fn suspended(self) -> bool {
        self.contains(Self::SUS)
    }
}

/// Output driver strength field of Status Register 3 (bits 6-5)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DriverStrength {
    /// 100% drive
    #[default]
    Percent100 = 0b00,
    /// 75% drive
    Percent75 = 0b01,
    /// 50% drive
    Percent50 = 0b10,
    /// 25% drive
    Percent25 = 0b11,
}

/// Status Register 3
///
/// Kept as a raw byte wrapper because of the two-bit driver-strength
/// field; individual bits are exposed through accessors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Status3(u8);

impl Status3 {
    const ADS: u8 = 1 << 0;
    const ADP: u8 = 1 << 1;
    const WPS: u8 = 1 << 2;
    const DRV_SHIFT: u8 = 5;
    const DRV_MASK: u8 = 0b11 << Self::DRV_SHIFT;
    const HOLD_RST: u8 = 1 << 7;

    /// Decode a raw SR3 byte (total over all 256 values)
    pub const fn decode(byte: u8) -> Self {
        Self(byte)
    }

    /// Re-encode to the raw byte
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Current address mode (read-only, tracks EN4B/EX4B)
    pub const fn current_address_mode(self) -> AddressMode {
        if self.0 & Self::ADS != 0 {
            AddressMode::FourByte
        } else {
            AddressMode::ThreeByte
        }
    }

    /// Power-up address mode
    pub const fn power_up_address_mode(self) -> AddressMode {
        if self.0 & Self::ADP != 0 {
            AddressMode::FourByte
        } else {
            AddressMode::ThreeByte
        }
    }

    /// Write protect selection: false = legacy BP scheme, true =
    /// individual block locks
    pub const fn write_protect_selection(self) -> bool {
        self.0 & Self::WPS != 0
    }

    /// Set the write protect selection bit
    pub const fn with_write_protect_selection(self, wps: bool) -> Self {
        if wps {
            Self(self.0 | Self::WPS)
        } else {
            Self(self.0 & !Self::WPS)
        }
    }

    /// Output driver strength
    pub const fn driver_strength(self) -> DriverStrength {
        match (self.0 & Self::DRV_MASK) >> Self::DRV_SHIFT {
            0b00 => DriverStrength::Percent100,
            0b01 => DriverStrength::Percent75,
            0b10 => DriverStrength::Percent50,
            _ => DriverStrength::Percent25,
        }
    }

    /// Set the output driver strength field
    pub const fn with_driver_strength(self, drv: DriverStrength) -> Self {
        Self((self.0 & !Self::DRV_MASK) | ((drv as u8) << Self::DRV_SHIFT))
    }

    /// True when the pin is configured as RESET rather than HOLD
    pub const fn hold_or_reset(self) -> bool {
        self.0 & Self::HOLD_RST != 0
    }

    /// Set the HOLD/RESET function selector
    pub const fn with_hold_or_reset(self, reset: bool) -> Self {
        if reset {
            Self(self.0 | Self::HOLD_RST)
        } else {
            Self(self.0 & !Self::HOLD_RST)
        }
    }
}

/// Manufacturer + device ID as returned by the 0x90 command family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId {
    /// Manufacturer byte (0xEF for Winbond)
    pub manufacturer: u8,
    /// Device byte
    pub device: u8,
}

impl DeviceId {
    /// Decode the two response bytes of the 0x90 command
    pub const fn decode(bytes: [u8; 2]) -> Self {
        Self {
            manufacturer: bytes[0],
            device: bytes[1],
        }
    }

    /// Combine into the ID word chip types are keyed by
    pub const fn id_word(self) -> u16 {
        ((self.manufacturer as u16) << 8) | self.device as u16
    }
}

/// JEDEC ID as returned by the 0x9F command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JedecId {
    /// Manufacturer byte
    pub manufacturer: u8,
    /// Memory type + capacity bytes
    pub device: u16,
}

impl JedecId {
    /// Decode the three response bytes of the 0x9F command
    pub const fn decode(bytes: [u8; 3]) -> Self {
        Self {
            manufacturer: bytes[0],
            device: ((bytes[1] as u16) << 8) | bytes[2] as u16,
        }
    }
}

/// Raw SFDP parameter table with header accessors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sfdp {
    /// The raw 256-byte table as read from address 0
    pub raw: [u8; crate::chip::SFDP_LEN],
}

impl Sfdp {
    /// ASCII "SFDP", little-endian in the first four bytes
    pub const SIGNATURE: u32 = 0x5044_4653;

    /// Wrap a raw table
    pub const fn decode(raw: [u8; crate::chip::SFDP_LEN]) -> Self {
        Self { raw }
    }

    /// Signature dword from the table header
    pub const fn signature(&self) -> u32 {
        u32::from_le_bytes([self.raw[0], self.raw[1], self.raw[2], self.raw[3]])
    }

    /// True when the signature matches "SFDP"
    pub const fn is_valid(&self) -> bool {
        self.signature() == Self::SIGNATURE
    }

    /// Revision (major, minor) from the table header
    pub const fn revision(&self) -> (u8, u8) {
        (self.raw[5], self.raw[4])
    }

    /// Number of parameter headers (stored value + 1)
    pub const fn parameter_header_count(&self) -> u8 {
        self.raw[6].wrapping_add(1)
    }
}
