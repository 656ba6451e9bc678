//! W25Qxx chip parameters
//!
//! Density variants, interface selection and the fixed geometry shared by
//! the whole family (256-byte pages, 4 KiB sectors, 64 KiB blocks).

/// Page size in bytes - program operations must not cross this boundary
pub const PAGE_SIZE: u32 = 256;
/// Smallest erase granularity in bytes
pub const SECTOR_SIZE: u32 = 4 * 1024;
/// 32 KiB erase block size in bytes
pub const BLOCK_32K_SIZE: u32 = 32 * 1024;
/// 64 KiB erase block size - also the granularity of individual block locks
pub const BLOCK_64K_SIZE: u32 = 64 * 1024;
/// Size of each security register in bytes
pub const SECURITY_REGISTER_SIZE: usize = 256;
/// Length of the factory-programmed unique ID in bytes
pub const UNIQUE_ID_LEN: usize = 8;
/// Length of the SFDP parameter table read by the driver
pub const SFDP_LEN: usize = 256;

/// W25Qxx density variant
///
/// The discriminant is the (manufacturer, device) ID word the chip answers
/// with to the 0x90 Read Manufacturer/Device ID command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ChipType {
    /// W25Q80 - 1 MiB
    W25Q80 = 0xEF13,
    /// W25Q16 - 2 MiB
    W25Q16 = 0xEF14,
    /// W25Q32 - 4 MiB
    W25Q32 = 0xEF15,
    /// W25Q64 - 8 MiB
    W25Q64 = 0xEF16,
    /// W25Q128 - 16 MiB
    W25Q128 = 0xEF17,
    /// W25Q256 - 32 MiB
    W25Q256 = 0xEF18,
}

impl ChipType {
    /// ID word (manufacturer byte, device byte) for this variant
    pub const fn id(self) -> u16 {
        self as u16
    }

    /// Total capacity in bytes
    pub const fn capacity(self) -> u32 {
        match self {
            Self::W25Q80 => 1 * 1024 * 1024,
            Self::W25Q16 => 2 * 1024 * 1024,
            Self::W25Q32 => 4 * 1024 * 1024,
            Self::W25Q64 => 8 * 1024 * 1024,
            Self::W25Q128 => 16 * 1024 * 1024,
            Self::W25Q256 => 32 * 1024 * 1024,
        }
    }

    /// Number of 64 KiB blocks (the individual block lock granularity)
    pub const fn block_count(self) -> u32 {
        self.capacity() / BLOCK_64K_SIZE
    }

    /// Whether the chip implements 4-byte addressing
    ///
    /// Only variants larger than 16 MiB exceed the 3-byte addressable
    /// range and carry the EN4B/EX4B commands.
    pub const fn supports_4byte_addressing(self) -> bool {
        matches!(self, Self::W25Q256)
    }
}

/// Physical bus flavor the chip is wired to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Interface {
    /// Standard SPI bus, optionally with dual/quad data lanes
    #[default]
    Spi,
    /// Native QSPI controller, commands framed 4-4-4 once QPI is entered
    Qspi,
}

/// Address framing currently in effect on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AddressMode {
    /// 3-byte (24-bit) addresses
    #[default]
    ThreeByte,
    /// 4-byte (32-bit) addresses, W25Q256 only
    FourByte,
}

/// One of the three independently addressable 256-byte security registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SecurityRegister {
    /// Security register 1 at base address 0x1000
    One = 0x1000,
    /// Security register 2 at base address 0x2000
    Two = 0x2000,
    /// Security register 3 at base address 0x3000
    Three = 0x3000,
}

impl SecurityRegister {
    /// Chip-defined base address of this register
    pub const fn base_addr(self) -> u32 {
        self as u32
    }
}

/// Burst-wrap length for the Set Burst with Wrap (0x77) command
///
/// The discriminant is the W6-W4 field encoding placed in the wrap byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BurstWrap {
    /// Wrap disabled
    #[default]
    None = 0x10,
    /// 8-byte wrap
    Bytes8 = 0x00,
    /// 16-byte wrap
    Bytes16 = 0x20,
    /// 32-byte wrap
    Bytes32 = 0x40,
    /// 64-byte wrap
    Bytes64 = 0x60,
}

impl BurstWrap {
    /// Wire encoding of the wrap byte
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// Dummy-clock preset for QSPI fast reads (Set Read Parameters, 0xC0)
///
/// The preset must match the actual bus clock for correct sampling; that
/// pairing is the caller's responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReadDummy {
    /// 2 dummy clocks, bus clock up to 33 MHz
    Clocks2Max33Mhz = 0x00,
    /// 4 dummy clocks, bus clock up to 55 MHz
    Clocks4Max55Mhz = 0x01,
    /// 6 dummy clocks, bus clock up to 80 MHz
    Clocks6Max80Mhz = 0x02,
    /// 8 dummy clocks, bus clock up to 80 MHz
    Clocks8Max80Mhz = 0x03,
}

impl ReadDummy {
    /// Number of dummy clock cycles this preset selects
    pub const fn cycles(self) -> u8 {
        match self {
            Self::Clocks2Max33Mhz => 2,
            Self::Clocks4Max55Mhz => 4,
            Self::Clocks6Max80Mhz => 6,
            Self::Clocks8Max80Mhz => 8,
        }
    }

    /// P5-P4 field placement in the read-parameters byte
    pub const fn param_bits(self) -> u8 {
        (self as u8) << 4
    }
}

/// Wrap-length field of the read-parameters byte (P1-P0)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WrapLength {
    /// 8-byte wrap
    #[default]
    Bytes8 = 0x00,
    /// 16-byte wrap
    Bytes16 = 0x01,
    /// 32-byte wrap
    Bytes32 = 0x02,
    /// 64-byte wrap
    Bytes64 = 0x03,
}

impl WrapLength {
    /// P1-P0 field placement in the read-parameters byte
    pub const fn param_bits(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_matches_id_ladder() {
        assert_eq!(ChipType::W25Q80.capacity(), 1 << 20);
        assert_eq!(ChipType::W25Q256.capacity(), 32 << 20);
        assert_eq!(ChipType::W25Q128.id(), 0xEF17);
    }

    #[test]
    fn block_count_uses_64k_granularity() {
        assert_eq!(ChipType::W25Q80.block_count(), 16);
        assert_eq!(ChipType::W25Q128.block_count(), 256);
    }

    #[test]
    fn only_q256_has_4byte_addressing() {
        assert!(ChipType::W25Q256.supports_4byte_addressing());
        assert!(!ChipType::W25Q128.supports_4byte_addressing());
    }

    #[test]
    fn read_parameters_field_encoding() {
        assert_eq!(ReadDummy::Clocks8Max80Mhz.param_bits(), 0x30);
        assert_eq!(ReadDummy::Clocks2Max33Mhz.cycles(), 2);
        assert_eq!(WrapLength::Bytes64.param_bits(), 0x03);
        assert_eq!(BurstWrap::Bytes16.bits(), 0x20);
    }
}
