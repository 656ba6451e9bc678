//! Bus transport capability
//!
//! The driver core never touches hardware directly: the host environment
//! supplies an implementation of [`FlashBus`] that can shift a command
//! frame out (and a response back in) under a single chip-select
//! assertion, plus the delay primitives busy-polling needs.

use crate::error::Result;
use crate::spi::SpiCommand;
use bitflags::bitflags;

bitflags! {
    /// Lane-width and addressing capabilities of a bus implementation
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BusFeatures: u32 {
        /// Supports 4-byte addressing commands
        const FOUR_BYTE_ADDR = 1 << 0;
        /// Can read two bits at once (1-1-2 mode)
        const DUAL_IN        = 1 << 1;
        /// Can transfer two bits at once (1-2-2 mode)
        const DUAL_IO        = 1 << 2;
        /// Can read four bits at once (1-1-4 mode)
        const QUAD_IN        = 1 << 3;
        /// Can transfer four bits at once (1-4-4 mode)
        const QUAD_IO        = 1 << 4;
        /// Can send commands with quad I/O (4-4-4 mode)
        const QPI            = 1 << 5;

        /// Shorthand for dual mode (both DUAL_IN and DUAL_IO)
        const DUAL = Self::DUAL_IN.bits() | Self::DUAL_IO.bits();
        /// Shorthand for quad mode (both QUAD_IN and QUAD_IO)
        const QUAD = Self::QUAD_IN.bits() | Self::QUAD_IO.bits();
    }
}

impl Default for BusFeatures {
    fn default() -> Self {
        BusFeatures::empty()
    }
}

/// Blocking bus transport for one chip select
///
/// Implementations execute one [`SpiCommand`] per chip-select assertion:
/// shift out the header (opcode, address, dummy slots) and any write
/// payload, then clock in `read_buf.len()` response bytes. QSPI-capable
/// controllers use the command's `io_mode` and `dummy_cycles` fields to
/// program their lane framing; byte-serial masters can flatten the frame
/// with [`default_execute`].
pub trait FlashBus {
    /// Bring the bus up. Called once by the driver's init.
    fn init(&mut self) -> Result<()>;

    /// Release the bus. Called by the driver's deinit.
    fn deinit(&mut self) -> Result<()>;

    /// Get the lane widths and addressing modes this bus can drive
    fn features(&self) -> BusFeatures;

    /// Maximum number of bytes readable in a single transaction
    fn max_read_len(&self) -> usize;

    /// Maximum number of bytes writable in a single transaction
    fn max_write_len(&self) -> usize;

    /// Execute a single command under one chip-select assertion
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()>;

    /// Delay for the specified number of milliseconds
    fn delay_ms(&mut self, ms: u32);

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);
}

impl<T: FlashBus + ?Sized> FlashBus for &mut T {
    fn init(&mut self) -> Result<()> {
        (**self).init()
    }

    fn deinit(&mut self) -> Result<()> {
        (**self).deinit()
    }

    fn features(&self) -> BusFeatures {
        (**self).features()
    }

    fn max_read_len(&self) -> usize {
        (**self).max_read_len()
    }

    fn max_write_len(&self) -> usize {
        (**self).max_write_len()
    }

    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        (**self).execute(cmd)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

/// Helper for implementing `FlashBus::execute()` on byte-serial masters.
///
/// Most SPI controllers expose a plain write-then-read exchange. This
/// function checks the lane width, flattens the command header and write
/// payload into one transmit buffer and hands it to the provided transfer
/// closure together with the command's read buffer.
#[cfg(feature = "alloc")]
pub fn default_execute<F>(cmd: &mut SpiCommand<'_>, features: BusFeatures, transfer_fn: F) -> Result<()>
where
    F: FnOnce(&[u8], &mut [u8]) -> Result<()>,
{
    use crate::spi::check_io_mode_supported;

    check_io_mode_supported(cmd.io_mode, features)?;

    let header_len = cmd.header_len();
    let mut tx = alloc::vec![0u8; header_len + cmd.write_data.len()];
    cmd.encode_header(&mut tx);
    tx[header_len..].copy_from_slice(cmd.write_data);

    transfer_fn(&tx, cmd.read_buf)
}
