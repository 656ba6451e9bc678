//! Operation sequencer and chip state tracker
//!
//! [`Flash`] owns the live configuration of one chip session (type,
//! interface, address mode, quad enable, read parameters) and drives the
//! multi-step protocols around the raw commands: write-enable before any
//! mutation, busy-polling after it, suspend/resume preconditions, the
//! enable-reset/reset pair, and read-back verification of every mode
//! transition. One `Flash` must not be driven by more than one concurrent
//! caller; command sequences are multi-step and not atomic against
//! interleaving.

use crate::bus::FlashBus;
use crate::chip::{
    AddressMode, BurstWrap, ChipType, Interface, ReadDummy, SecurityRegister, WrapLength,
    BLOCK_32K_SIZE, BLOCK_64K_SIZE, PAGE_SIZE, SECTOR_SIZE, SECURITY_REGISTER_SIZE, SFDP_LEN,
    UNIQUE_ID_LEN,
};
use crate::error::{Error, Result};
use crate::spi::{opcodes, AddressWidth, IoMode, SpiCommand};
use crate::status::{DeviceId, JedecId, Sfdp, Status1, Status2, Status3};

/// One busy-poll schedule: delay between SR1 reads and the total bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poll {
    /// Delay between status polls, in microseconds
    pub interval_us: u32,
    /// Maximum total wait before `Error::Timeout`, in microseconds
    pub timeout_us: u32,
}

impl Poll {
    /// Create a poll schedule
    pub const fn new(interval_us: u32, timeout_us: u32) -> Self {
        Self {
            interval_us,
            timeout_us,
        }
    }

    /// Number of delay-then-repoll rounds before the bound is exhausted
    pub const fn max_polls(self) -> u32 {
        if self.interval_us == 0 {
            self.timeout_us
        } else {
            self.timeout_us / self.interval_us
        }
    }
}

/// Per-operation-class busy-poll schedules
///
/// Defaults are derived from the datasheet's typical/maximum operation
/// times; callers with different clocking or patience can override any of
/// them before or after init.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTimings {
    /// Status register writes (typ. 5-200 ms)
    pub status_write: Poll,
    /// Page program (typ. 0.7-5 ms)
    pub page_program: Poll,
    /// 4 KiB sector erase (typ. 45-400 ms)
    pub sector_erase: Poll,
    /// 32/64 KiB block erase (typ. 120-2000 ms)
    pub block_erase: Poll,
    /// Full chip erase (tens of seconds on large parts)
    pub chip_erase: Poll,
}

impl Default for PollTimings {
    fn default() -> Self {
        Self {
            status_write: Poll::new(10_000, 500_000),
            page_program: Poll::new(10, 10_000),
            sector_erase: Poll::new(10_000, 1_000_000),
            block_erase: Poll::new(100_000, 4_000_000),
            chip_erase: Poll::new(1_000_000, 400_000_000),
        }
    }
}

/// Driver handle for one W25Qxx chip session
///
/// Owns (or mutably borrows, via the blanket `FlashBus for &mut T` impl)
/// the bus transport for the lifetime of the session.
pub struct Flash<B: FlashBus> {
    bus: B,
    chip: ChipType,
    interface: Interface,
    addr_mode: AddressMode,
    dual_quad: bool,
    dummy: ReadDummy,
    wrap_length: WrapLength,
    burst_wrap: BurstWrap,
    timings: PollTimings,
    initialized: bool,
    reset_armed: bool,
}

impl<B: FlashBus> Flash<B> {
    /// Create an uninitialized handle for the given chip and wiring
    pub fn new(bus: B, chip: ChipType, interface: Interface) -> Self {
        Self {
            bus,
            chip,
            interface,
            addr_mode: AddressMode::ThreeByte,
            dual_quad: false,
            dummy: ReadDummy::Clocks8Max80Mhz,
            wrap_length: WrapLength::Bytes8,
            burst_wrap: BurstWrap::None,
            timings: PollTimings::default(),
            initialized: false,
            reset_armed: false,
        }
    }

    /// Request dual/quad-SPI operation; the quad-enable bit is written and
    /// verified during `init`
    pub fn with_dual_quad(mut self, enable: bool) -> Self {
        self.dual_quad = enable;
        self
    }

    /// Override the busy-poll schedules
    pub fn with_poll_timings(mut self, timings: PollTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Consume the handle and hand the bus back
    pub fn free(self) -> B {
        self.bus
    }

    // ------------------------------------------------------------------
    // Tracked state accessors
    // ------------------------------------------------------------------

    /// Configured chip type
    pub fn chip_type(&self) -> ChipType {
        self.chip
    }

    /// Reconfigure the chip type; only valid before init
    pub fn set_chip_type(&mut self, chip: ChipType) -> Result<()> {
        if self.initialized {
            return Err(Error::InvalidState);
        }
        self.chip = chip;
        Ok(())
    }

    /// Current interface mode
    pub fn interface(&self) -> Interface {
        self.interface
    }

    /// Reconfigure the wiring; only valid before init
    pub fn set_interface(&mut self, interface: Interface) -> Result<()> {
        if self.initialized {
            return Err(Error::InvalidState);
        }
        self.interface = interface;
        Ok(())
    }

    /// Tracked address mode
    pub fn address_mode(&self) -> AddressMode {
        self.addr_mode
    }

    /// Tracked dual/quad-SPI enable state
    pub fn dual_quad_spi(&self) -> bool {
        self.dual_quad
    }

    /// Tracked burst-wrap length
    pub fn burst_wrap(&self) -> BurstWrap {
        self.burst_wrap
    }

    /// Tracked QSPI read dummy preset
    pub fn read_dummy(&self) -> ReadDummy {
        self.dummy
    }

    /// Current busy-poll schedules
    pub fn poll_timings(&self) -> PollTimings {
        self.timings
    }

    /// Replace the busy-poll schedules
    pub fn set_poll_timings(&mut self, timings: PollTimings) {
        self.timings = timings;
    }

    /// Whether `init` has completed
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Bring the chip up: bus init, wake + reset into a known state,
    /// probe and verify the chip ID, then apply the requested quad/QSPI
    /// configuration
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Err(Error::InvalidState);
        }
        self.bus.init()?;

        // The chip powers up in standard SPI; probe single-lane even when
        // the wiring is QSPI and only switch over once QE is confirmed.
        let target_qspi = self.interface == Interface::Qspi;
        let target_dual_quad = self.dual_quad;
        self.interface = Interface::Spi;
        self.dual_quad = false;

        self.exec(&mut SpiCommand::simple(opcodes::RELEASE_POWER_DOWN))?;
        self.bus.delay_us(3);
        self.exec(&mut SpiCommand::simple(opcodes::ENABLE_RESET))?;
        self.exec(&mut SpiCommand::simple(opcodes::RESET_DEVICE))?;
        self.bus.delay_ms(10);

        let mut buf = [0u8; 2];
        let mut cmd = SpiCommand::read(opcodes::DEVICE_ID, AddressWidth::ThreeByte, 0, &mut buf);
        self.exec(&mut cmd)?;
        let found = DeviceId::decode(buf).id_word();
        if found != self.chip.id() {
            log::error!(
                "chip ID probe mismatch: expected 0x{:04X}, found 0x{:04X}",
                self.chip.id(),
                found
            );
            let _ = self.bus.deinit();
            return Err(Error::IdMismatch {
                expected: self.chip.id(),
                found,
            });
        }

        self.initialized = true;
        if let Err(e) = self.post_init(target_dual_quad, target_qspi) {
            self.initialized = false;
            let _ = self.bus.deinit();
            return Err(e);
        }
        log::debug!("{:?} initialized over {:?}", self.chip, self.interface);
        Ok(())
    }

    fn post_init(&mut self, dual_quad: bool, qspi: bool) -> Result<()> {
        // W25Q256 may power up in 4-byte mode depending on ADP
        if self.chip.supports_4byte_addressing() {
            let sr3 = Status3::decode(self.read_status_raw(opcodes::RDSR3)?);
            self.addr_mode = sr3.current_address_mode();
        } else {
            self.addr_mode = AddressMode::ThreeByte;
        }

        if dual_quad || qspi {
            self.set_dual_quad_spi(true)?;
        }
        if qspi {
            self.enter_qspi_mode()?;
        }
        Ok(())
    }

    /// Power the chip down and release the bus
    pub fn deinit(&mut self) -> Result<()> {
        self.ensure_init()?;
        if self.interface == Interface::Qspi {
            self.exit_qspi_mode()?;
        }
        self.exec(&mut SpiCommand::simple(opcodes::POWER_DOWN))?;
        self.bus.delay_us(3);
        self.bus.deinit()?;
        self.initialized = false;
        self.reset_armed = false;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internal plumbing
    // ------------------------------------------------------------------

    fn ensure_init(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    /// Single funnel for every bus exchange
    ///
    /// Disarms the reset pair on any command other than Enable Reset and
    /// reframes commands 4-4-4 when the chip is in QPI mode.
    fn exec(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        if cmd.opcode != opcodes::ENABLE_RESET {
            self.reset_armed = false;
        }
        if self.interface == Interface::Qspi && cmd.io_mode == IoMode::Single {
            cmd.io_mode = IoMode::Qpi;
        }
        crate::spi::check_io_mode_supported(cmd.io_mode, self.bus.features())?;
        self.bus.execute(cmd)
    }

    fn addr_width(&self) -> AddressWidth {
        AddressWidth::from(self.addr_mode)
    }

    /// Validate an address span against chip capacity and the reachable
    /// range of the current address mode
    fn check_range(&self, addr: u32, len: u32) -> Result<()> {
        let end = addr
            .checked_add(len)
            .ok_or(Error::AddressOutOfRange { addr })?;
        if end > self.chip.capacity() {
            return Err(Error::AddressOutOfRange { addr });
        }
        if end > self.addr_width().max_size() {
            return Err(Error::ModeMismatch);
        }
        Ok(())
    }

    /// Multi-lane SPI commands need the enable flag (QE confirmed) and a
    /// bus that can drive the lanes; native QSPI implies both
    fn require_dual_quad(&self) -> Result<()> {
        if self.interface == Interface::Qspi {
            return Err(Error::ModeMismatch);
        }
        if !self.dual_quad {
            return Err(Error::ModeMismatch);
        }
        Ok(())
    }

    fn read_status_raw(&mut self, opcode: u8) -> Result<u8> {
        let mut buf = [0u8; 1];
        let mut cmd = SpiCommand::read_reg(opcode, &mut buf);
        self.exec(&mut cmd)?;
        Ok(buf[0])
    }

    /// Send Write Enable; the WEL latch is confirmed by the busy-poll
    /// that follows the guarded command
    fn write_enable(&mut self) -> Result<()> {
        self.exec(&mut SpiCommand::simple(opcodes::WREN))
    }

    /// Poll SR1 until BUSY clears or the schedule's bound is exhausted
    ///
    /// Issues one status read per round; a chip that is busy for exactly
    /// K polls costs K+1 reads. On timeout no further bus calls are made.
    fn wait_ready(&mut self, poll: Poll) -> Result<()> {
        let mut remaining = poll.max_polls();
        loop {
            let sr1 = Status1::decode(self.read_status_raw(opcodes::RDSR1)?);
            if !sr1.busy() {
                return Ok(());
            }
            if remaining == 0 {
                log::error!("busy-poll exhausted after {} us", poll.timeout_us);
                return Err(Error::Timeout);
            }
            remaining -= 1;
            self.bus.delay_us(poll.interval_us);
        }
    }

    /// WREN + command + busy-poll: the shape of every mutating operation
    fn write_guarded(&mut self, cmd: &mut SpiCommand<'_>, poll: Poll) -> Result<()> {
        self.write_enable()?;
        self.exec(cmd)?;
        self.wait_ready(poll)
    }

    /// Chunked addressed read shared by all the read variants
    fn read_chunked(
        &mut self,
        opcode: u8,
        io_mode: IoMode,
        dummy_cycles: u8,
        addr: u32,
        buf: &mut [u8],
    ) -> Result<()> {
        let width = self.addr_width();
        let max_len = self.bus.max_read_len();
        let mut offset = 0;
        while offset < buf.len() {
            let chunk_len = core::cmp::min(max_len, buf.len() - offset);
            let chunk = &mut buf[offset..offset + chunk_len];
            let mut cmd = SpiCommand::read(opcode, width, addr + offset as u32, chunk)
                .with_io_mode(io_mode)
                .with_dummy_cycles(dummy_cycles);
            self.exec(&mut cmd)?;
            offset += chunk_len;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Read data in the current interface mode (fast read framing)
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.fast_read(addr, buf)
    }

    /// Plain Read Data (0x03) - standard SPI only, no dummy cycles
    pub fn only_spi_read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.ensure_init()?;
        if self.interface != Interface::Spi {
            return Err(Error::ModeMismatch);
        }
        self.check_range(addr, buf.len() as u32)?;
        self.read_chunked(opcodes::READ, IoMode::Single, 0, addr, buf)
    }

    /// Fast Read (0x0B): one dummy byte over SPI, the configured dummy
    /// preset over QSPI
    pub fn fast_read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.ensure_init()?;
        self.check_range(addr, buf.len() as u32)?;
        let dummy = match self.interface {
            Interface::Spi => 8,
            Interface::Qspi => self.dummy.cycles(),
        };
        self.read_chunked(opcodes::FAST_READ, IoMode::Single, dummy, addr, buf)
    }

    /// Fast Read Dual Output (1-1-2)
    pub fn fast_read_dual_output(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.ensure_init()?;
        self.require_dual_quad()?;
        self.check_range(addr, buf.len() as u32)?;
        self.read_chunked(opcodes::FAST_READ_DUAL_OUT, IoMode::DualOut, 8, addr, buf)
    }

    /// Fast Read Dual I/O (1-2-2)
    pub fn fast_read_dual_io(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.ensure_init()?;
        self.require_dual_quad()?;
        self.check_range(addr, buf.len() as u32)?;
        self.read_chunked(opcodes::FAST_READ_DUAL_IO, IoMode::DualIo, 4, addr, buf)
    }

    /// Fast Read Quad Output (1-1-4) - needs the quad-enable bit
    pub fn fast_read_quad_output(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.ensure_init()?;
        self.require_dual_quad()?;
        self.check_range(addr, buf.len() as u32)?;
        self.read_chunked(opcodes::FAST_READ_QUAD_OUT, IoMode::QuadOut, 8, addr, buf)
    }

    /// Fast Read Quad I/O (1-4-4) - needs the quad-enable bit
    pub fn fast_read_quad_io(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.ensure_init()?;
        self.require_dual_quad()?;
        self.check_range(addr, buf.len() as u32)?;
        self.read_chunked(opcodes::FAST_READ_QUAD_IO, IoMode::QuadIo, 6, addr, buf)
    }

    /// Word Read Quad I/O (0xE7) - address must be 2-byte aligned
    pub fn word_read_quad_io(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.ensure_init()?;
        self.require_dual_quad()?;
        if addr & 0x1 != 0 {
            return Err(Error::InvalidAlignment);
        }
        self.check_range(addr, buf.len() as u32)?;
        self.read_chunked(opcodes::WORD_READ_QUAD_IO, IoMode::QuadIo, 4, addr, buf)
    }

    /// Octal Word Read Quad I/O (0xE3) - address must be 16-byte aligned
    pub fn octal_word_read_quad_io(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.ensure_init()?;
        self.require_dual_quad()?;
        if addr & 0xF != 0 {
            return Err(Error::InvalidAlignment);
        }
        self.check_range(addr, buf.len() as u32)?;
        self.read_chunked(opcodes::OCTAL_WORD_READ_QUAD_IO, IoMode::QuadIo, 2, addr, buf)
    }

    // ------------------------------------------------------------------
    // Program
    // ------------------------------------------------------------------

    /// Program up to one page; the payload must not cross a 256-byte page
    /// boundary (the chip would silently wrap instead of advancing)
    pub fn page_program(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.ensure_init()?;
        if data.is_empty() {
            return Ok(());
        }
        if crosses_page_boundary(addr, data.len() as u32) {
            return Err(Error::PageBoundaryCrossed {
                addr,
                len: data.len() as u32,
            });
        }
        self.check_range(addr, data.len() as u32)?;
        let mut cmd = SpiCommand::write(opcodes::PAGE_PROGRAM, self.addr_width(), addr, data);
        self.write_guarded(&mut cmd, self.timings.page_program)
    }

    /// Quad Input Page Program (0x32, 1-1-4) - needs the quad-enable bit
    pub fn page_program_quad_input(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.ensure_init()?;
        self.require_dual_quad()?;
        if data.is_empty() {
            return Ok(());
        }
        if crosses_page_boundary(addr, data.len() as u32) {
            return Err(Error::PageBoundaryCrossed {
                addr,
                len: data.len() as u32,
            });
        }
        self.check_range(addr, data.len() as u32)?;
        let mut cmd = SpiCommand::write(opcodes::QUAD_PAGE_PROGRAM, self.addr_width(), addr, data)
            .with_io_mode(IoMode::QuadOut);
        self.write_guarded(&mut cmd, self.timings.page_program)
    }

    /// Program an arbitrary span, split on page boundaries and the bus's
    /// maximum write length
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.ensure_init()?;
        self.check_range(addr, data.len() as u32)?;
        let max_write = self.bus.max_write_len();
        let mut offset = 0usize;
        while offset < data.len() {
            let cur = addr + offset as u32;
            let page_room = (PAGE_SIZE - (cur % PAGE_SIZE)) as usize;
            let chunk_len = (data.len() - offset).min(page_room).min(max_write);
            self.page_program(cur, &data[offset..offset + chunk_len])?;
            offset += chunk_len;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Erase
    // ------------------------------------------------------------------

    /// Erase the 4 KiB sector at `addr` (sector-aligned)
    pub fn sector_erase_4k(&mut self, addr: u32) -> Result<()> {
        self.erase(opcodes::SECTOR_ERASE_4K, SECTOR_SIZE, addr, self.timings.sector_erase)
    }

    /// Erase the 32 KiB block at `addr` (block-aligned)
    pub fn block_erase_32k(&mut self, addr: u32) -> Result<()> {
        self.erase(opcodes::BLOCK_ERASE_32K, BLOCK_32K_SIZE, addr, self.timings.block_erase)
    }

    /// Erase the 64 KiB block at `addr` (block-aligned)
    pub fn block_erase_64k(&mut self, addr: u32) -> Result<()> {
        self.erase(opcodes::BLOCK_ERASE_64K, BLOCK_64K_SIZE, addr, self.timings.block_erase)
    }

    fn erase(&mut self, opcode: u8, granule: u32, addr: u32, poll: Poll) -> Result<()> {
        self.ensure_init()?;
        if addr % granule != 0 {
            return Err(Error::InvalidAlignment);
        }
        self.check_range(addr, granule)?;
        let mut cmd = SpiCommand::addressed(opcode, self.addr_width(), addr);
        self.write_guarded(&mut cmd, poll)
    }

    /// Erase the entire chip
    pub fn chip_erase(&mut self) -> Result<()> {
        self.ensure_init()?;
        let mut cmd = SpiCommand::simple(opcodes::CHIP_ERASE);
        self.write_guarded(&mut cmd, self.timings.chip_erase)
    }

    /// Clear the write-enable latch (0x04)
    ///
    /// The latch clears itself after every completed program/erase; this
    /// retracts one that was set but not consumed.
    pub fn write_disable(&mut self) -> Result<()> {
        self.ensure_init()?;
        self.exec(&mut SpiCommand::simple(opcodes::WRDI))
    }

    // ------------------------------------------------------------------
    // Suspend / Resume
    // ------------------------------------------------------------------

    /// Suspend an erase or program in progress
    ///
    /// Only valid while SR1.BUSY is set; rejected otherwise so a stray
    /// suspend cannot silently pair with a later operation.
    pub fn erase_program_suspend(&mut self) -> Result<()> {
        self.ensure_init()?;
        let sr1 = Status1::decode(self.read_status_raw(opcodes::RDSR1)?);
        if !sr1.busy() {
            return Err(Error::NothingToSuspend);
        }
        self.exec(&mut SpiCommand::simple(opcodes::SUSPEND))?;
        self.bus.delay_us(20);
        Ok(())
    }

    /// Resume a suspended erase or program
    pub fn erase_program_resume(&mut self) -> Result<()> {
        self.ensure_init()?;
        let sr2 = Status2::decode(self.read_status_raw(opcodes::RDSR2)?);
        if !sr2.suspended() {
            return Err(Error::NothingToResume);
        }
        self.exec(&mut SpiCommand::simple(opcodes::RESUME))
    }

    // ------------------------------------------------------------------
    // Status registers
    // ------------------------------------------------------------------

    /// Read Status Register 1
    pub fn status1(&mut self) -> Result<Status1> {
        self.ensure_init()?;
        Ok(Status1::decode(self.read_status_raw(opcodes::RDSR1)?))
    }

    /// Read Status Register 2
    pub fn status2(&mut self) -> Result<Status2> {
        self.ensure_init()?;
        Ok(Status2::decode(self.read_status_raw(opcodes::RDSR2)?))
    }

    /// Read Status Register 3
    pub fn status3(&mut self) -> Result<Status3> {
        self.ensure_init()?;
        Ok(Status3::decode(self.read_status_raw(opcodes::RDSR3)?))
    }

    /// True while an erase or program is in progress
    pub fn is_busy(&mut self) -> Result<bool> {
        Ok(self.status1()?.busy())
    }

    /// Write Status Register 1 (write-enabled + busy-polled)
    pub fn set_status1(&mut self, value: Status1) -> Result<()> {
        self.ensure_init()?;
        self.write_status_raw(opcodes::WRSR1, value.bits())
    }

    /// Write Status Register 2; the tracked quad-enable state follows the
    /// QE bit as read back after the write, not the value requested
    pub fn set_status2(&mut self, value: Status2) -> Result<()> {
        self.ensure_init()?;
        self.write_status_raw(opcodes::WRSR2, value.bits())?;
        let readback = Status2::decode(self.read_status_raw(opcodes::RDSR2)?);
        self.dual_quad = readback.quad_enabled();
        Ok(())
    }

    /// Write Status Register 3
    pub fn set_status3(&mut self, value: Status3) -> Result<()> {
        self.ensure_init()?;
        self.write_status_raw(opcodes::WRSR3, value.bits())
    }

    fn write_status_raw(&mut self, opcode: u8, byte: u8) -> Result<()> {
        let data = [byte];
        let mut cmd = SpiCommand::write_reg(opcode, &data);
        self.write_guarded(&mut cmd, self.timings.status_write)
    }

    // ------------------------------------------------------------------
    // Mode transitions
    // ------------------------------------------------------------------

    /// Switch address framing; state is updated only after SR3 reads back
    /// with the requested mode
    pub fn set_address_mode(&mut self, mode: AddressMode) -> Result<()> {
        self.ensure_init()?;
        if mode == AddressMode::FourByte && !self.chip.supports_4byte_addressing() {
            return Err(Error::UnsupportedOperation);
        }
        if mode == self.addr_mode {
            return Ok(());
        }
        let opcode = match mode {
            AddressMode::ThreeByte => opcodes::EXIT_4BYTE_MODE,
            AddressMode::FourByte => opcodes::ENTER_4BYTE_MODE,
        };
        self.exec(&mut SpiCommand::simple(opcode))?;
        let sr3 = Status3::decode(self.read_status_raw(opcodes::RDSR3)?);
        if sr3.current_address_mode() != mode {
            log::error!("address mode switch to {:?} did not read back", mode);
            return Err(Error::ModeTransitionFailed);
        }
        self.addr_mode = mode;
        Ok(())
    }

    /// Toggle the quad-enable bit in SR2; the tracked flag changes only
    /// after the write reads back as requested
    pub fn set_dual_quad_spi(&mut self, enable: bool) -> Result<()> {
        self.ensure_init()?;
        let sr2 = Status2::decode(self.read_status_raw(opcodes::RDSR2)?);
        if sr2.quad_enabled() == enable {
            self.dual_quad = enable;
            return Ok(());
        }
        let mut desired = sr2;
        desired.set(Status2::QE, enable);
        self.write_status_raw(opcodes::WRSR2, desired.bits())?;
        let readback = Status2::decode(self.read_status_raw(opcodes::RDSR2)?);
        if readback.quad_enabled() != enable {
            log::error!("quad-enable write did not read back (SR2=0x{:02X})", readback.bits());
            return Err(Error::ModeTransitionFailed);
        }
        self.dual_quad = enable;
        Ok(())
    }

    /// Enter QPI mode (0x38); requires the quad-enable bit
    pub fn enter_qspi_mode(&mut self) -> Result<()> {
        self.ensure_init()?;
        if self.interface == Interface::Qspi {
            return Ok(());
        }
        if !self.dual_quad {
            return Err(Error::ModeMismatch);
        }
        self.exec(&mut SpiCommand::simple(opcodes::ENTER_QPI_MODE))?;
        self.interface = Interface::Qspi;
        // Program the dummy-clock preset the QPI fast reads will assume
        let param = [self.dummy.param_bits() | self.wrap_length.param_bits()];
        let mut cmd = SpiCommand::write_reg(opcodes::SET_READ_PARAMETERS, &param);
        self.exec(&mut cmd)
    }

    /// Exit QPI mode (0xFF, sent 4-4-4)
    pub fn exit_qspi_mode(&mut self) -> Result<()> {
        self.ensure_init()?;
        if self.interface == Interface::Spi {
            return Ok(());
        }
        self.exec(&mut SpiCommand::simple(opcodes::EXIT_QPI_MODE))?;
        self.interface = Interface::Spi;
        Ok(())
    }

    /// Set QPI read parameters: dummy-clock preset + wrap length
    ///
    /// The preset must match the bus clock (2/33 MHz ... 8/80 MHz); the
    /// driver records it for subsequent fast reads but cannot check the
    /// actual clock.
    pub fn set_read_parameters(&mut self, dummy: ReadDummy, wrap: WrapLength) -> Result<()> {
        self.ensure_init()?;
        if self.interface != Interface::Qspi {
            return Err(Error::ModeMismatch);
        }
        let param = [dummy.param_bits() | wrap.param_bits()];
        let mut cmd = SpiCommand::write_reg(opcodes::SET_READ_PARAMETERS, &param);
        self.exec(&mut cmd)?;
        self.dummy = dummy;
        self.wrap_length = wrap;
        Ok(())
    }

    /// Set Burst with Wrap (0x77) - standard SPI only
    pub fn set_burst_with_wrap(&mut self, wrap: BurstWrap) -> Result<()> {
        self.ensure_init()?;
        if self.interface != Interface::Spi {
            return Err(Error::ModeMismatch);
        }
        // 24 wrap-don't-care bits then the wrap byte
        let data = [0x00, 0x00, 0x00, wrap.bits()];
        let mut cmd = SpiCommand::write_reg(opcodes::SET_BURST_WITH_WRAP, &data);
        self.exec(&mut cmd)?;
        self.burst_wrap = wrap;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reset
    // ------------------------------------------------------------------

    /// Arm the software reset; must be immediately followed by
    /// `reset_device`, any other command disarms it
    pub fn enable_reset(&mut self) -> Result<()> {
        self.ensure_init()?;
        self.exec(&mut SpiCommand::simple(opcodes::ENABLE_RESET))?;
        self.reset_armed = true;
        Ok(())
    }

    /// Reset the chip; rejected unless armed by an immediately preceding
    /// `enable_reset`
    ///
    /// A reset drops the chip out of QPI mode and back to its power-up
    /// address mode; the tracked state is re-synchronized from SR3.
    pub fn reset_device(&mut self) -> Result<()> {
        self.ensure_init()?;
        if !self.reset_armed {
            return Err(Error::InvalidState);
        }
        self.exec(&mut SpiCommand::simple(opcodes::RESET_DEVICE))?;
        self.interface = Interface::Spi;
        self.bus.delay_us(30);
        if self.chip.supports_4byte_addressing() {
            let sr3 = Status3::decode(self.read_status_raw(opcodes::RDSR3)?);
            self.addr_mode = sr3.current_address_mode();
        } else {
            self.addr_mode = AddressMode::ThreeByte;
        }
        Ok(())
    }

    /// Issue the full enable-reset + reset-device pair
    pub fn software_reset(&mut self) -> Result<()> {
        self.enable_reset()?;
        self.reset_device()
    }

    // ------------------------------------------------------------------
    // Power management
    // ------------------------------------------------------------------

    /// Enter deep power-down
    pub fn power_down(&mut self) -> Result<()> {
        self.ensure_init()?;
        self.exec(&mut SpiCommand::simple(opcodes::POWER_DOWN))?;
        self.bus.delay_us(3);
        Ok(())
    }

    /// Release from deep power-down
    pub fn release_power_down(&mut self) -> Result<()> {
        self.ensure_init()?;
        self.exec(&mut SpiCommand::simple(opcodes::RELEASE_POWER_DOWN))?;
        self.bus.delay_us(3);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Identification
    // ------------------------------------------------------------------

    /// Read Manufacturer/Device ID (0x90)
    pub fn manufacturer_device_id(&mut self) -> Result<DeviceId> {
        self.ensure_init()?;
        let mut buf = [0u8; 2];
        let mut cmd = SpiCommand::read(opcodes::DEVICE_ID, AddressWidth::ThreeByte, 0, &mut buf);
        self.exec(&mut cmd)?;
        Ok(DeviceId::decode(buf))
    }

    /// Read Manufacturer/Device ID via Dual I/O (0x92)
    pub fn manufacturer_device_id_dual_io(&mut self) -> Result<DeviceId> {
        self.ensure_init()?;
        self.require_dual_quad()?;
        let mut buf = [0u8; 2];
        let mut cmd = SpiCommand::read(
            opcodes::DEVICE_ID_DUAL_IO,
            AddressWidth::ThreeByte,
            0,
            &mut buf,
        )
        .with_io_mode(IoMode::DualIo)
        .with_dummy_cycles(4);
        self.exec(&mut cmd)?;
        Ok(DeviceId::decode(buf))
    }

    /// Read Manufacturer/Device ID via Quad I/O (0x94)
    pub fn manufacturer_device_id_quad_io(&mut self) -> Result<DeviceId> {
        self.ensure_init()?;
        self.require_dual_quad()?;
        let mut buf = [0u8; 2];
        let mut cmd = SpiCommand::read(
            opcodes::DEVICE_ID_QUAD_IO,
            AddressWidth::ThreeByte,
            0,
            &mut buf,
        )
        .with_io_mode(IoMode::QuadIo)
        .with_dummy_cycles(6);
        self.exec(&mut cmd)?;
        Ok(DeviceId::decode(buf))
    }

    /// Read the JEDEC ID (0x9F)
    pub fn jedec_id(&mut self) -> Result<JedecId> {
        self.ensure_init()?;
        let mut buf = [0u8; 3];
        let mut cmd = SpiCommand::read_reg(opcodes::JEDEC_ID, &mut buf);
        self.exec(&mut cmd)?;
        Ok(JedecId::decode(buf))
    }

    /// Read the 64-bit factory unique ID (0x4B)
    ///
    /// The dummy phase is 4 bytes in 3-byte mode and 5 in 4-byte mode.
    pub fn unique_id(&mut self) -> Result<[u8; UNIQUE_ID_LEN]> {
        self.ensure_init()?;
        let dummy = match self.addr_mode {
            AddressMode::ThreeByte => 32,
            AddressMode::FourByte => 40,
        };
        let mut id = [0u8; UNIQUE_ID_LEN];
        let mut cmd = SpiCommand::read_reg(opcodes::UNIQUE_ID, &mut id).with_dummy_cycles(dummy);
        self.exec(&mut cmd)?;
        Ok(id)
    }

    /// Read the SFDP parameter table (0x5A)
    pub fn sfdp(&mut self) -> Result<Sfdp> {
        self.ensure_init()?;
        let mut raw = [0u8; SFDP_LEN];
        let mut cmd = SpiCommand::read(opcodes::SFDP, AddressWidth::ThreeByte, 0, &mut raw)
            .with_dummy_cycles(8);
        self.exec(&mut cmd)?;
        Ok(Sfdp::decode(raw))
    }

    // ------------------------------------------------------------------
    // Security registers
    // ------------------------------------------------------------------

    /// Erase one of the three 256-byte security registers
    pub fn erase_security_register(&mut self, reg: SecurityRegister) -> Result<()> {
        self.ensure_init()?;
        let mut cmd = SpiCommand::addressed(
            opcodes::ERASE_SECURITY_REGISTER,
            self.addr_width(),
            reg.base_addr(),
        );
        self.write_guarded(&mut cmd, self.timings.sector_erase)
    }

    /// Program a full 256-byte security register
    pub fn program_security_register(
        &mut self,
        reg: SecurityRegister,
        data: &[u8; SECURITY_REGISTER_SIZE],
    ) -> Result<()> {
        self.ensure_init()?;
        let mut cmd = SpiCommand::write(
            opcodes::PROGRAM_SECURITY_REGISTER,
            self.addr_width(),
            reg.base_addr(),
            data,
        );
        self.write_guarded(&mut cmd, self.timings.page_program)
    }

    /// Read a full 256-byte security register
    pub fn read_security_register(
        &mut self,
        reg: SecurityRegister,
        data: &mut [u8; SECURITY_REGISTER_SIZE],
    ) -> Result<()> {
        self.ensure_init()?;
        let mut cmd = SpiCommand::read(
            opcodes::READ_SECURITY_REGISTER,
            self.addr_width(),
            reg.base_addr(),
            data,
        )
        .with_dummy_cycles(8);
        self.exec(&mut cmd)
    }

    // ------------------------------------------------------------------
    // Block lock
    // ------------------------------------------------------------------

    /// Lock the block containing `addr` (WPS scheme)
    pub fn individual_block_lock(&mut self, addr: u32) -> Result<()> {
        self.block_lock_op(opcodes::BLOCK_LOCK, addr)
    }

    /// Unlock the block containing `addr`
    pub fn individual_block_unlock(&mut self, addr: u32) -> Result<()> {
        self.block_lock_op(opcodes::BLOCK_UNLOCK, addr)
    }

    fn block_lock_op(&mut self, opcode: u8, addr: u32) -> Result<()> {
        self.ensure_init()?;
        self.check_range(addr, 1)?;
        let mut cmd = SpiCommand::addressed(opcode, self.addr_width(), addr);
        self.write_guarded(&mut cmd, self.timings.status_write)
    }

    /// Read the lock bit of the block containing `addr`
    pub fn read_block_lock(&mut self, addr: u32) -> Result<bool> {
        self.ensure_init()?;
        self.check_range(addr, 1)?;
        let mut buf = [0u8; 1];
        let mut cmd = SpiCommand::read(opcodes::READ_BLOCK_LOCK, self.addr_width(), addr, &mut buf);
        self.exec(&mut cmd)?;
        Ok(buf[0] & 0x01 != 0)
    }

    /// Lock every block; no address validation involved
    pub fn global_block_lock(&mut self) -> Result<()> {
        self.ensure_init()?;
        let mut cmd = SpiCommand::simple(opcodes::GLOBAL_BLOCK_LOCK);
        self.write_guarded(&mut cmd, self.timings.status_write)
    }

    /// Unlock every block
    pub fn global_block_unlock(&mut self) -> Result<()> {
        self.ensure_init()?;
        let mut cmd = SpiCommand::simple(opcodes::GLOBAL_BLOCK_UNLOCK);
        self.write_guarded(&mut cmd, self.timings.status_write)
    }
}

/// Whether a program starting at `addr` would wrap within its 256-byte page
const fn crosses_page_boundary(addr: u32, len: u32) -> bool {
    let page_off = addr % PAGE_SIZE;
    page_off + len > PAGE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_boundary_detection() {
        // exactly filling a page from an aligned start is fine
        assert!(!crosses_page_boundary(0x1000, 256));
        assert!(!crosses_page_boundary(0x10FF, 1));
        assert!(crosses_page_boundary(0x10FF, 2));
        assert!(crosses_page_boundary(0x1080, 200));
    }

    #[test]
    fn poll_round_budget() {
        assert_eq!(Poll::new(10, 100).max_polls(), 10);
        // zero interval degrades to one poll per microsecond of budget
        assert_eq!(Poll::new(0, 5).max_polls(), 5);
    }

    #[test]
    fn default_timings_are_sane() {
        let t = PollTimings::default();
        assert!(t.page_program.timeout_us < t.sector_erase.timeout_us);
        assert!(t.sector_erase.timeout_us < t.chip_erase.timeout_us);
    }
}
