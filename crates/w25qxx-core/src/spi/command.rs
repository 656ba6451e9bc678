//! SPI command structure

use super::{AddressWidth, IoMode};

/// A single SPI transaction frame
///
/// Designed to avoid allocation - uses slices for data. The lifetime
/// parameter `'a` ties the command to the buffers it references. A frame
/// is built per call and consumed by the bus, never persisted.
pub struct SpiCommand<'a> {
    /// The opcode byte
    pub opcode: u8,

    /// Address (if any)
    pub address: Option<u32>,

    /// Address width
    pub address_width: AddressWidth,

    /// I/O mode
    pub io_mode: IoMode,

    /// Number of dummy clock cycles after the address
    pub dummy_cycles: u8,

    /// Data to write after opcode/address/dummy
    pub write_data: &'a [u8],

    /// Buffer to read into (mutable)
    pub read_buf: &'a mut [u8],
}

impl<'a> SpiCommand<'a> {
    /// Create a simple command with no address or data (e.g. WREN)
    pub fn simple(opcode: u8) -> Self {
        Self {
            opcode,
            address: None,
            address_width: AddressWidth::None,
            io_mode: IoMode::Single,
            dummy_cycles: 0,
            write_data: &[],
            read_buf: &mut [],
        }
    }

    /// Create a read register command with no address (e.g. RDSR1)
    pub fn read_reg(opcode: u8, buf: &'a mut [u8]) -> Self {
        Self {
            opcode,
            address: None,
            address_width: AddressWidth::None,
            io_mode: IoMode::Single,
            dummy_cycles: 0,
            write_data: &[],
            read_buf: buf,
        }
    }

    /// Create a write register command with no address (e.g. WRSR1)
    pub fn write_reg(opcode: u8, data: &'a [u8]) -> Self {
        Self {
            opcode,
            address: None,
            address_width: AddressWidth::None,
            io_mode: IoMode::Single,
            dummy_cycles: 0,
            write_data: data,
            read_buf: &mut [],
        }
    }

    /// Create an addressed read command
    pub fn read(opcode: u8, width: AddressWidth, addr: u32, buf: &'a mut [u8]) -> Self {
        Self {
            opcode,
            address: Some(addr),
            address_width: width,
            io_mode: IoMode::Single,
            dummy_cycles: 0,
            write_data: &[],
            read_buf: buf,
        }
    }

    /// Create an addressed write command (e.g. Page Program)
    pub fn write(opcode: u8, width: AddressWidth, addr: u32, data: &'a [u8]) -> Self {
        Self {
            opcode,
            address: Some(addr),
            address_width: width,
            io_mode: IoMode::Single,
            dummy_cycles: 0,
            write_data: data,
            read_buf: &mut [],
        }
    }

    /// Create an addressed command with neither payload nor response
    /// (e.g. Sector Erase, Block Lock)
    pub fn addressed(opcode: u8, width: AddressWidth, addr: u32) -> Self {
        Self {
            opcode,
            address: Some(addr),
            address_width: width,
            io_mode: IoMode::Single,
            dummy_cycles: 0,
            write_data: &[],
            read_buf: &mut [],
        }
    }

    /// Set the I/O mode for this command
    pub fn with_io_mode(mut self, mode: IoMode) -> Self {
        self.io_mode = mode;
        self
    }

    /// Set the number of dummy cycles
    pub fn with_dummy_cycles(mut self, cycles: u8) -> Self {
        self.dummy_cycles = cycles;
        self
    }

    /// Returns true if this command has a read phase
    pub fn has_read(&self) -> bool {
        !self.read_buf.is_empty()
    }

    /// Returns true if this command has a write phase
    pub fn has_write(&self) -> bool {
        !self.write_data.is_empty()
    }

    /// Returns true if this command has an address phase
    pub fn has_address(&self) -> bool {
        self.address.is_some()
    }

    /// Number of byte slots the dummy cycles occupy on the wire
    ///
    /// Dummy clocks are driven at the address-phase lane width, so the
    /// byte count is `cycles * lanes / 8` (e.g. 8 cycles single-lane and
    /// 6 cycles quad-lane both flatten to whole bytes).
    pub const fn dummy_bytes(&self) -> usize {
        (self.dummy_cycles as usize * self.io_mode.addr_lines() as usize) / 8
    }

    /// Length of the transmit header: opcode + address + dummy bytes
    pub const fn header_len(&self) -> usize {
        1 + self.address_width.bytes() as usize + self.dummy_bytes()
    }

    /// Flatten opcode, address and dummy bytes into `buf`
    ///
    /// `buf` must be at least `header_len()` bytes. Returns the number of
    /// bytes written. Together with `write_data` this is the exact byte
    /// stream a byte-serial transport shifts out.
    pub fn encode_header(&self, buf: &mut [u8]) -> usize {
        buf[0] = self.opcode;
        let mut len = 1;
        if let Some(addr) = self.address {
            self.address_width
                .encode(addr, &mut buf[1..1 + self.address_width.bytes() as usize]);
            len += self.address_width.bytes() as usize;
        }
        for slot in &mut buf[len..len + self.dummy_bytes()] {
            *slot = 0;
        }
        len + self.dummy_bytes()
    }

    /// Total number of bytes transferred (for timing/buffer sizing)
    pub fn total_bytes(&self) -> usize {
        self.header_len() + self.write_data.len() + self.read_buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spi::opcodes;

    #[test]
    fn plain_read_header_is_opcode_then_address() {
        let mut buf = [0u8; 16];
        let cmd = SpiCommand::read(opcodes::READ, AddressWidth::ThreeByte, 0x001000, &mut []);
        let len = cmd.encode_header(&mut buf);
        assert_eq!(&buf[..len], &[0x03, 0x00, 0x10, 0x00]);
    }

    #[test]
    fn fast_read_header_carries_one_dummy_byte() {
        let mut buf = [0u8; 16];
        let cmd = SpiCommand::read(opcodes::FAST_READ, AddressWidth::ThreeByte, 0xABCDEF, &mut [])
            .with_dummy_cycles(8);
        let len = cmd.encode_header(&mut buf);
        assert_eq!(&buf[..len], &[0x0B, 0xAB, 0xCD, 0xEF, 0x00]);
    }

    #[test]
    fn quad_io_dummy_cycles_flatten_at_four_lanes() {
        let cmd = SpiCommand::read(
            opcodes::FAST_READ_QUAD_IO,
            AddressWidth::ThreeByte,
            0,
            &mut [],
        )
        .with_io_mode(IoMode::QuadIo)
        .with_dummy_cycles(6);
        // 6 cycles * 4 lanes = 3 byte slots
        assert_eq!(cmd.dummy_bytes(), 3);
        assert_eq!(cmd.header_len(), 7);
    }

    #[test]
    fn simple_command_is_one_byte() {
        let mut buf = [0u8; 4];
        let cmd = SpiCommand::simple(opcodes::WREN);
        assert_eq!(cmd.encode_header(&mut buf), 1);
        assert_eq!(buf[0], 0x06);
        assert!(!cmd.has_read() && !cmd.has_write() && !cmd.has_address());
    }
}
