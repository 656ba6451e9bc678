//! w25qxx-dummy - In-memory W25Qxx chip emulator
//!
//! Implements [`FlashBus`] against a byte array instead of hardware so the
//! driver's command sequences can be tested without a chip. The emulator
//! models the behavior the sequencer depends on: the write-enable latch,
//! busy status after mutating commands, suspend, address-mode and QPI
//! flags, block locks and the security registers. Every executed command
//! is appended to a transaction log so tests can assert on the exact
//! sequence the driver emitted.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use w25qxx_core::bus::{BusFeatures, FlashBus};
use w25qxx_core::chip::{ChipType, BLOCK_64K_SIZE, SECURITY_REGISTER_SIZE};
use w25qxx_core::error::{Error, Result};
use w25qxx_core::spi::{opcodes, SpiCommand};

/// Status register bit positions the emulator maintains itself
const SR1_BUSY: u8 = 1 << 0;
const SR1_WEL: u8 = 1 << 1;
const SR2_SUS: u8 = 1 << 7;
const SR3_ADS: u8 = 1 << 0;

/// One executed command as seen by the emulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction {
    /// Opcode byte
    pub opcode: u8,
    /// Address field, if the command carried one
    pub address: Option<u32>,
}

/// Configuration for the emulated chip
#[derive(Debug, Clone, Copy)]
pub struct DummyConfig {
    /// Chip variant to emulate (ID responses and capacity follow it)
    pub chip: ChipType,
    /// Number of BUSY status reads reported after each mutating command
    pub busy_polls: u32,
    /// When set, SR1 reads report BUSY forever (timeout testing)
    pub stuck_busy: bool,
    /// When set, status register writes complete but the value does not
    /// stick (read-back-verify failure testing)
    pub stuck_status_writes: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            chip: ChipType::W25Q128,
            busy_polls: 0,
            stuck_busy: false,
            stuck_status_writes: false,
        }
    }
}

/// In-memory chip emulator
#[cfg(feature = "alloc")]
pub struct DummyFlash {
    config: DummyConfig,
    data: Vec<u8>,
    security: [[u8; SECURITY_REGISTER_SIZE]; 3],
    block_locks: Vec<bool>,
    sr1: u8,
    sr2: u8,
    sr3: u8,
    read_params: u8,
    wrap_byte: u8,
    write_enabled: bool,
    in_4byte_mode: bool,
    in_qpi_mode: bool,
    powered_down: bool,
    reset_enabled: bool,
    busy_remaining: u32,
    suspended_busy: Option<u32>,
    log: Vec<Transaction>,
}

#[cfg(feature = "alloc")]
impl DummyFlash {
    /// Create an emulator with the given configuration, fully erased
    pub fn new(config: DummyConfig) -> Self {
        let size = config.chip.capacity() as usize;
        Self {
            config,
            data: vec![0xFF; size],
            security: [[0xFF; SECURITY_REGISTER_SIZE]; 3],
            block_locks: vec![false; config.chip.block_count() as usize],
            sr1: 0,
            sr2: 0,
            sr3: 0,
            read_params: 0,
            wrap_byte: 0x10,
            write_enabled: false,
            in_4byte_mode: false,
            in_qpi_mode: false,
            powered_down: false,
            reset_enabled: false,
            busy_remaining: 0,
            suspended_busy: None,
            log: Vec::new(),
        }
    }

    /// Create an emulated W25Q128 with default settings
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Raw flash array
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable flash array (for pre-seeding test content)
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// The configuration this emulator was built with
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Every command executed so far, in order
    pub fn transactions(&self) -> &[Transaction] {
        &self.log
    }

    /// Drop the transaction log (typically after init, to scope an assert)
    pub fn clear_transactions(&mut self) {
        self.log.clear();
    }

    /// True when the emulated chip is in QPI mode
    pub fn in_qpi_mode(&self) -> bool {
        self.in_qpi_mode
    }

    /// True when the emulated chip frames addresses as 4 bytes
    pub fn in_4byte_mode(&self) -> bool {
        self.in_4byte_mode
    }

    /// Lock state of the 64 KiB block containing `addr`
    pub fn block_locked(&self, addr: u32) -> bool {
        self.block_locks[(addr / BLOCK_64K_SIZE) as usize]
    }

    /// Pretend an erase/program is in flight for the next `polls` status
    /// reads (test hook for the suspend path)
    pub fn force_busy(&mut self, polls: u32) {
        self.busy_remaining = polls;
    }

    fn sr1_snapshot(&mut self) -> u8 {
        let mut sr1 = self.sr1 & !(SR1_BUSY | SR1_WEL);
        if self.write_enabled {
            sr1 |= SR1_WEL;
        }
        if self.config.stuck_busy {
            return sr1 | SR1_BUSY;
        }
        if self.suspended_busy.is_none() && self.busy_remaining > 0 {
            self.busy_remaining -= 1;
            sr1 |= SR1_BUSY;
        }
        sr1
    }

    fn sr2_snapshot(&self) -> u8 {
        let mut sr2 = self.sr2 & !SR2_SUS;
        if self.suspended_busy.is_some() {
            sr2 |= SR2_SUS;
        }
        sr2
    }

    fn sr3_snapshot(&self) -> u8 {
        let mut sr3 = self.sr3 & !SR3_ADS;
        if self.in_4byte_mode {
            sr3 |= SR3_ADS;
        }
        sr3
    }

    /// Consume the write-enable latch; mutating commands without it are
    /// silently ignored, as on the real chip
    fn take_write_enable(&mut self) -> bool {
        let enabled = self.write_enabled;
        self.write_enabled = false;
        enabled
    }

    fn start_busy(&mut self) {
        self.busy_remaining = self.config.busy_polls;
    }

    fn handle_read(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        let addr = cmd.address.unwrap_or(0) as usize;
        let len = cmd.read_buf.len();
        if addr + len > self.data.len() {
            return Err(Error::Transport);
        }
        cmd.read_buf.copy_from_slice(&self.data[addr..addr + len]);
        Ok(())
    }

    fn handle_page_program(&mut self, cmd: &SpiCommand<'_>) -> Result<()> {
        if !self.take_write_enable() {
            return Ok(());
        }
        let addr = cmd.address.unwrap_or(0) as usize;
        if addr + cmd.write_data.len() > self.data.len() {
            return Err(Error::Transport);
        }
        // NOR programming only clears bits
        for (slot, &byte) in self.data[addr..].iter_mut().zip(cmd.write_data) {
            *slot &= byte;
        }
        self.start_busy();
        Ok(())
    }

    fn handle_erase(&mut self, cmd: &SpiCommand<'_>, erase_size: usize) -> Result<()> {
        if !self.take_write_enable() {
            return Ok(());
        }
        let addr = cmd.address.unwrap_or(0) as usize;
        let aligned = addr & !(erase_size - 1);
        if aligned + erase_size > self.data.len() {
            return Err(Error::Transport);
        }
        self.data[aligned..aligned + erase_size].fill(0xFF);
        self.start_busy();
        Ok(())
    }

    fn handle_chip_erase(&mut self) -> Result<()> {
        if !self.take_write_enable() {
            return Ok(());
        }
        self.data.fill(0xFF);
        self.start_busy();
        Ok(())
    }

    fn security_region(cmd: &SpiCommand<'_>) -> Result<(usize, usize)> {
        let addr = cmd.address.unwrap_or(0);
        let index = (addr >> 12) as usize;
        if !(1..=3).contains(&index) {
            return Err(Error::Transport);
        }
        Ok((index - 1, (addr & 0xFF) as usize))
    }

    fn handle_block_lock(&mut self, cmd: &SpiCommand<'_>, lock: bool) -> Result<()> {
        if !self.take_write_enable() {
            return Ok(());
        }
        let addr = cmd.address.unwrap_or(0);
        let index = (addr / BLOCK_64K_SIZE) as usize;
        if index >= self.block_locks.len() {
            return Err(Error::Transport);
        }
        self.block_locks[index] = lock;
        Ok(())
    }

    /// Power-up state, reached through the software reset pair
    fn reset(&mut self) {
        self.write_enabled = false;
        self.in_4byte_mode = false;
        self.in_qpi_mode = false;
        self.busy_remaining = 0;
        self.suspended_busy = None;
        self.sr1 &= !(SR1_BUSY | SR1_WEL);
    }
}

#[cfg(feature = "alloc")]
impl FlashBus for DummyFlash {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn deinit(&mut self) -> Result<()> {
        Ok(())
    }

    fn features(&self) -> BusFeatures {
        BusFeatures::FOUR_BYTE_ADDR
            | BusFeatures::DUAL
            | BusFeatures::QUAD
            | BusFeatures::QPI
    }

    fn max_read_len(&self) -> usize {
        4096
    }

    fn max_write_len(&self) -> usize {
        256
    }

    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        self.log.push(Transaction {
            opcode: cmd.opcode,
            address: cmd.address,
        });

        if self.powered_down && cmd.opcode != opcodes::RELEASE_POWER_DOWN {
            return Err(Error::Transport);
        }
        if cmd.opcode != opcodes::ENABLE_RESET && cmd.opcode != opcodes::RESET_DEVICE {
            self.reset_enabled = false;
        }

        match cmd.opcode {
            opcodes::WREN | opcodes::VOLATILE_SR_WREN => {
                self.write_enabled = true;
                Ok(())
            }
            opcodes::WRDI => {
                self.write_enabled = false;
                Ok(())
            }

            opcodes::RDSR1 => {
                let sr1 = self.sr1_snapshot();
                if let Some(out) = cmd.read_buf.first_mut() {
                    *out = sr1;
                }
                Ok(())
            }
            opcodes::RDSR2 => {
                if let Some(out) = cmd.read_buf.first_mut() {
                    *out = self.sr2_snapshot();
                }
                Ok(())
            }
            opcodes::RDSR3 => {
                if let Some(out) = cmd.read_buf.first_mut() {
                    *out = self.sr3_snapshot();
                }
                Ok(())
            }

            opcodes::WRSR1 => {
                if self.take_write_enable() {
                    if !self.config.stuck_status_writes {
                        self.sr1 = *cmd.write_data.first().unwrap_or(&0);
                    }
                    self.start_busy();
                }
                Ok(())
            }
            opcodes::WRSR2 => {
                if self.take_write_enable() {
                    if !self.config.stuck_status_writes {
                        self.sr2 = *cmd.write_data.first().unwrap_or(&0) & !SR2_SUS;
                    }
                    self.start_busy();
                }
                Ok(())
            }
            opcodes::WRSR3 => {
                if self.take_write_enable() {
                    if !self.config.stuck_status_writes {
                        self.sr3 = *cmd.write_data.first().unwrap_or(&0) & !SR3_ADS;
                    }
                    self.start_busy();
                }
                Ok(())
            }

            opcodes::READ
            | opcodes::FAST_READ
            | opcodes::FAST_READ_DUAL_OUT
            | opcodes::FAST_READ_DUAL_IO
            | opcodes::FAST_READ_QUAD_OUT
            | opcodes::FAST_READ_QUAD_IO
            | opcodes::WORD_READ_QUAD_IO
            | opcodes::OCTAL_WORD_READ_QUAD_IO => self.handle_read(cmd),

            opcodes::PAGE_PROGRAM | opcodes::QUAD_PAGE_PROGRAM => self.handle_page_program(cmd),

            opcodes::SECTOR_ERASE_4K => self.handle_erase(cmd, 4 * 1024),
            opcodes::BLOCK_ERASE_32K => self.handle_erase(cmd, 32 * 1024),
            opcodes::BLOCK_ERASE_64K => self.handle_erase(cmd, 64 * 1024),
            opcodes::CHIP_ERASE | opcodes::CHIP_ERASE_ALT => self.handle_chip_erase(),

            opcodes::SUSPEND => {
                if self.busy_remaining > 0 && self.suspended_busy.is_none() {
                    self.suspended_busy = Some(self.busy_remaining);
                    self.busy_remaining = 0;
                }
                Ok(())
            }
            opcodes::RESUME => {
                if let Some(busy) = self.suspended_busy.take() {
                    self.busy_remaining = busy;
                }
                Ok(())
            }

            opcodes::DEVICE_ID | opcodes::DEVICE_ID_DUAL_IO | opcodes::DEVICE_ID_QUAD_IO => {
                let id = self.config.chip.id();
                if cmd.read_buf.len() >= 2 {
                    cmd.read_buf[0] = (id >> 8) as u8;
                    cmd.read_buf[1] = id as u8;
                }
                Ok(())
            }
            opcodes::JEDEC_ID => {
                // JEDEC capacity code is one above the 0x90 device byte
                let id = self.config.chip.id();
                if cmd.read_buf.len() >= 3 {
                    cmd.read_buf[0] = (id >> 8) as u8;
                    cmd.read_buf[1] = 0x40;
                    cmd.read_buf[2] = (id as u8).wrapping_add(1);
                }
                Ok(())
            }
            opcodes::UNIQUE_ID => {
                for (i, out) in cmd.read_buf.iter_mut().enumerate() {
                    *out = 0xD0 | i as u8;
                }
                Ok(())
            }
            opcodes::SFDP => {
                let addr = cmd.address.unwrap_or(0) as usize;
                let mut table = [0u8; 256];
                table[..4].copy_from_slice(b"SFDP");
                table[4] = 0x06;
                table[5] = 0x01;
                for (i, out) in cmd.read_buf.iter_mut().enumerate() {
                    *out = *table.get(addr + i).unwrap_or(&0xFF);
                }
                Ok(())
            }

            opcodes::ERASE_SECURITY_REGISTER => {
                let (region, _) = Self::security_region(cmd)?;
                if self.take_write_enable() {
                    self.security[region].fill(0xFF);
                    self.start_busy();
                }
                Ok(())
            }
            opcodes::PROGRAM_SECURITY_REGISTER => {
                let (region, offset) = Self::security_region(cmd)?;
                if self.take_write_enable() {
                    for (slot, &byte) in
                        self.security[region][offset..].iter_mut().zip(cmd.write_data)
                    {
                        *slot &= byte;
                    }
                    self.start_busy();
                }
                Ok(())
            }
            opcodes::READ_SECURITY_REGISTER => {
                let (region, offset) = Self::security_region(cmd)?;
                for (i, out) in cmd.read_buf.iter_mut().enumerate() {
                    *out = *self.security[region].get(offset + i).unwrap_or(&0xFF);
                }
                Ok(())
            }

            opcodes::BLOCK_LOCK => self.handle_block_lock(cmd, true),
            opcodes::BLOCK_UNLOCK => self.handle_block_lock(cmd, false),
            opcodes::READ_BLOCK_LOCK => {
                let addr = cmd.address.unwrap_or(0);
                let index = (addr / BLOCK_64K_SIZE) as usize;
                let locked = *self.block_locks.get(index).ok_or(Error::Transport)?;
                if let Some(out) = cmd.read_buf.first_mut() {
                    *out = locked as u8;
                }
                Ok(())
            }
            opcodes::GLOBAL_BLOCK_LOCK => {
                if self.take_write_enable() {
                    self.block_locks.fill(true);
                }
                Ok(())
            }
            opcodes::GLOBAL_BLOCK_UNLOCK => {
                if self.take_write_enable() {
                    self.block_locks.fill(false);
                }
                Ok(())
            }

            opcodes::ENTER_4BYTE_MODE => {
                self.in_4byte_mode = true;
                Ok(())
            }
            opcodes::EXIT_4BYTE_MODE => {
                self.in_4byte_mode = false;
                Ok(())
            }
            opcodes::ENTER_QPI_MODE => {
                self.in_qpi_mode = true;
                Ok(())
            }
            opcodes::EXIT_QPI_MODE => {
                self.in_qpi_mode = false;
                Ok(())
            }
            opcodes::SET_READ_PARAMETERS => {
                self.read_params = *cmd.write_data.first().unwrap_or(&0);
                Ok(())
            }
            opcodes::SET_BURST_WITH_WRAP => {
                self.wrap_byte = *cmd.write_data.last().unwrap_or(&0x10);
                Ok(())
            }

            opcodes::ENABLE_RESET => {
                self.reset_enabled = true;
                Ok(())
            }
            opcodes::RESET_DEVICE => {
                // a reset without the preceding enable is a chip-side no-op
                if self.reset_enabled {
                    self.reset();
                }
                self.reset_enabled = false;
                Ok(())
            }

            opcodes::POWER_DOWN => {
                self.powered_down = true;
                Ok(())
            }
            opcodes::RELEASE_POWER_DOWN => {
                self.powered_down = false;
                Ok(())
            }

            _ => {
                log::warn!("unhandled opcode 0x{:02X}", cmd.opcode);
                Err(Error::Transport)
            }
        }
    }

    fn delay_ms(&mut self, _ms: u32) {}

    fn delay_us(&mut self, _us: u32) {}
}
