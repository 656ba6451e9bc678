//! Driver sequencer tests against the in-memory emulator
//!
//! These assert on the exact command sequences the driver emits (via the
//! emulator's transaction log) as well as on end-to-end data behavior.

use std::cell::RefCell;
use std::rc::Rc;

use w25qxx_core::bus::{BusFeatures, FlashBus};
use w25qxx_core::chip::{AddressMode, ChipType, Interface, SecurityRegister};
use w25qxx_core::driver::{Flash, Poll, PollTimings};
use w25qxx_core::error::Error;
use w25qxx_core::spi::{opcodes, SpiCommand};
use w25qxx_core::status::{Status1, Status2};
use w25qxx_dummy::{DummyConfig, DummyFlash, Transaction};

/// Shared handle so tests can poke the emulator mid-session
#[derive(Clone)]
struct SharedBus(Rc<RefCell<DummyFlash>>);

impl SharedBus {
    fn new(config: DummyConfig) -> Self {
        Self(Rc::new(RefCell::new(DummyFlash::new(config))))
    }
}

impl FlashBus for SharedBus {
    fn init(&mut self) -> w25qxx_core::Result<()> {
        self.0.borrow_mut().init()
    }

    fn deinit(&mut self) -> w25qxx_core::Result<()> {
        self.0.borrow_mut().deinit()
    }

    fn features(&self) -> BusFeatures {
        self.0.borrow().features()
    }

    fn max_read_len(&self) -> usize {
        self.0.borrow().max_read_len()
    }

    fn max_write_len(&self) -> usize {
        self.0.borrow().max_write_len()
    }

    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> w25qxx_core::Result<()> {
        self.0.borrow_mut().execute(cmd)
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.borrow_mut().delay_ms(ms)
    }

    fn delay_us(&mut self, us: u32) {
        self.0.borrow_mut().delay_us(us)
    }
}

fn init_flash(config: DummyConfig, chip: ChipType) -> (Flash<SharedBus>, SharedBus) {
    let bus = SharedBus::new(config);
    let mut flash = Flash::new(bus.clone(), chip, Interface::Spi);
    flash.init().expect("init");
    bus.0.borrow_mut().clear_transactions();
    (flash, bus)
}

fn opcode_sequence(bus: &SharedBus) -> Vec<u8> {
    bus.0
        .borrow()
        .transactions()
        .iter()
        .map(|t| t.opcode)
        .collect()
}

/// Every guarded exchange must be directly preceded by a write-enable
fn assert_write_enable_precedes(log: &[Transaction], guarded: &[u8]) {
    for (i, t) in log.iter().enumerate() {
        if guarded.contains(&t.opcode) {
            assert!(
                i > 0 && log[i - 1].opcode == opcodes::WREN,
                "opcode 0x{:02X} at index {} not preceded by WREN",
                t.opcode,
                i
            );
        }
    }
}

#[test]
fn uninitialized_handle_rejects_operations() {
    let bus = SharedBus::new(DummyConfig::default());
    let mut flash = Flash::new(bus, ChipType::W25Q128, Interface::Spi);
    let mut buf = [0u8; 4];
    assert_eq!(flash.read(0, &mut buf), Err(Error::NotInitialized));
    assert_eq!(flash.chip_erase(), Err(Error::NotInitialized));
}

#[test]
fn init_verifies_the_probed_id() {
    let bus = SharedBus::new(DummyConfig {
        chip: ChipType::W25Q64,
        ..DummyConfig::default()
    });
    let mut flash = Flash::new(bus, ChipType::W25Q128, Interface::Spi);
    assert_eq!(
        flash.init(),
        Err(Error::IdMismatch {
            expected: 0xEF17,
            found: 0xEF16
        })
    );
    assert!(!flash.is_initialized());
}

#[test]
fn plain_read_is_a_single_exchange() {
    let (mut flash, bus) = init_flash(DummyConfig::default(), ChipType::W25Q128);
    let pattern: Vec<u8> = (0..16).map(|i| i as u8 ^ 0xA5).collect();
    bus.0.borrow_mut().data_mut()[0x001000..0x001010].copy_from_slice(&pattern);
    bus.0.borrow_mut().clear_transactions();

    let mut buf = [0u8; 16];
    flash.only_spi_read(0x001000, &mut buf).unwrap();
    assert_eq!(buf.as_slice(), pattern.as_slice());

    let log = bus.0.borrow().transactions().to_vec();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].opcode, opcodes::READ);
    assert_eq!(log[0].address, Some(0x001000));
}

#[test]
fn sector_erase_emits_wren_erase_then_polls() {
    let (mut flash, bus) = init_flash(
        DummyConfig {
            busy_polls: 2,
            ..DummyConfig::default()
        },
        ChipType::W25Q128,
    );
    flash.sector_erase_4k(0x002000).unwrap();

    // 2 busy polls + the final clear read
    assert_eq!(
        opcode_sequence(&bus),
        [
            opcodes::WREN,
            opcodes::SECTOR_ERASE_4K,
            opcodes::RDSR1,
            opcodes::RDSR1,
            opcodes::RDSR1,
        ]
    );
    assert_eq!(
        bus.0.borrow().transactions()[1].address,
        Some(0x002000)
    );
    assert!(!flash.is_busy().unwrap());
}

#[test]
fn busy_for_k_polls_costs_k_plus_one_reads() {
    let (mut flash, bus) = init_flash(
        DummyConfig {
            busy_polls: 5,
            ..DummyConfig::default()
        },
        ChipType::W25Q128,
    );
    flash.page_program(0, &[0x42]).unwrap();

    let status_reads = opcode_sequence(&bus)
        .iter()
        .filter(|&&op| op == opcodes::RDSR1)
        .count();
    assert_eq!(status_reads, 6);
}

#[test]
fn exhausted_poll_budget_times_out_with_no_further_calls() {
    let (mut flash, bus) = init_flash(
        DummyConfig {
            stuck_busy: true,
            ..DummyConfig::default()
        },
        ChipType::W25Q128,
    );
    let mut timings = PollTimings::default();
    timings.sector_erase = Poll::new(1, 3);
    flash.set_poll_timings(timings);

    assert_eq!(flash.sector_erase_4k(0), Err(Error::Timeout));

    // WREN + erase + (max_polls + 1) status reads, then nothing
    let log = opcode_sequence(&bus);
    assert_eq!(log.len(), 2 + 4);
    assert!(log[2..].iter().all(|&op| op == opcodes::RDSR1));
}

#[test]
fn guarded_commands_are_always_preceded_by_write_enable() {
    let (mut flash, bus) = init_flash(DummyConfig::default(), ChipType::W25Q128);
    flash.page_program(0x100, &[1, 2, 3]).unwrap();
    flash.sector_erase_4k(0x1000).unwrap();
    flash.block_erase_64k(0x10000).unwrap();
    flash.set_status1(Status1::decode(0x00)).unwrap();
    flash.chip_erase().unwrap();

    let log = bus.0.borrow().transactions().to_vec();
    assert_write_enable_precedes(
        &log,
        &[
            opcodes::PAGE_PROGRAM,
            opcodes::SECTOR_ERASE_4K,
            opcodes::BLOCK_ERASE_64K,
            opcodes::WRSR1,
            opcodes::CHIP_ERASE,
        ],
    );
}

#[test]
fn page_program_rejects_boundary_crossings_before_any_exchange() {
    let (mut flash, bus) = init_flash(DummyConfig::default(), ChipType::W25Q128);

    // exactly filling a page from an aligned start is fine
    let full_page = [0xA5u8; 256];
    flash.page_program(0x1000, &full_page).unwrap();

    bus.0.borrow_mut().clear_transactions();
    assert_eq!(
        flash.page_program(0x10FF, &[1, 2]),
        Err(Error::PageBoundaryCrossed {
            addr: 0x10FF,
            len: 2
        })
    );
    assert!(bus.0.borrow().transactions().is_empty());
}

#[test]
fn write_splits_on_page_boundaries() {
    let (mut flash, bus) = init_flash(DummyConfig::default(), ChipType::W25Q128);
    let data: Vec<u8> = (0..600).map(|i| (i % 251) as u8).collect();
    flash.write(0x10F0, &data).unwrap();

    let mut buf = vec![0u8; 600];
    flash.read(0x10F0, &mut buf).unwrap();
    assert_eq!(buf, data);

    // no emitted program may span a page
    for t in bus.0.borrow().transactions() {
        if t.opcode == opcodes::PAGE_PROGRAM {
            assert!(t.address.is_some());
        }
    }
}

#[test]
fn erase_requires_alignment() {
    let (mut flash, _) = init_flash(DummyConfig::default(), ChipType::W25Q128);
    assert_eq!(flash.sector_erase_4k(0x100), Err(Error::InvalidAlignment));
    assert_eq!(flash.block_erase_32k(0x1000), Err(Error::InvalidAlignment));
    assert_eq!(flash.block_erase_64k(0x8000), Err(Error::InvalidAlignment));
}

#[test]
fn reads_and_writes_are_bounds_checked() {
    let (mut flash, _) = init_flash(DummyConfig::default(), ChipType::W25Q128);
    let capacity = ChipType::W25Q128.capacity();
    let mut buf = [0u8; 16];
    assert_eq!(
        flash.read(capacity - 8, &mut buf),
        Err(Error::AddressOutOfRange { addr: capacity - 8 })
    );
    assert_eq!(
        flash.write(capacity, &[0u8; 1]),
        Err(Error::AddressOutOfRange { addr: capacity })
    );
}

#[test]
fn reset_device_requires_an_armed_enable() {
    let (mut flash, _) = init_flash(DummyConfig::default(), ChipType::W25Q128);
    assert_eq!(flash.reset_device(), Err(Error::InvalidState));

    flash.enable_reset().unwrap();
    flash.reset_device().unwrap();
}

#[test]
fn any_command_between_the_reset_pair_disarms_it() {
    let (mut flash, _) = init_flash(DummyConfig::default(), ChipType::W25Q128);
    flash.enable_reset().unwrap();
    let _ = flash.status1().unwrap();
    assert_eq!(flash.reset_device(), Err(Error::InvalidState));

    flash.software_reset().unwrap();
}

#[test]
fn address_mode_round_trips_without_side_effects() {
    let (mut flash, bus) = init_flash(
        DummyConfig {
            chip: ChipType::W25Q256,
            ..DummyConfig::default()
        },
        ChipType::W25Q256,
    );
    assert_eq!(flash.address_mode(), AddressMode::ThreeByte);
    let quad_before = flash.dual_quad_spi();

    flash.set_address_mode(AddressMode::FourByte).unwrap();
    assert_eq!(flash.address_mode(), AddressMode::FourByte);
    assert!(bus.0.borrow().in_4byte_mode());

    flash.set_address_mode(AddressMode::ThreeByte).unwrap();
    assert_eq!(flash.address_mode(), AddressMode::ThreeByte);
    assert_eq!(flash.dual_quad_spi(), quad_before);
    assert_eq!(flash.interface(), Interface::Spi);
}

#[test]
fn four_byte_mode_is_rejected_on_small_chips() {
    let (mut flash, _) = init_flash(DummyConfig::default(), ChipType::W25Q128);
    assert_eq!(
        flash.set_address_mode(AddressMode::FourByte),
        Err(Error::UnsupportedOperation)
    );
}

#[test]
fn quad_reads_are_gated_on_the_enable_flag() {
    let (mut flash, _) = init_flash(DummyConfig::default(), ChipType::W25Q128);
    let mut buf = [0u8; 4];
    assert_eq!(
        flash.fast_read_quad_io(0, &mut buf),
        Err(Error::ModeMismatch)
    );

    flash.set_dual_quad_spi(true).unwrap();
    flash.fast_read_quad_io(0, &mut buf).unwrap();
    assert_eq!(buf, [0xFF; 4]);
}

#[test]
fn failed_quad_enable_write_back_is_reported() {
    let (mut flash, _) = init_flash(
        DummyConfig {
            stuck_status_writes: true,
            ..DummyConfig::default()
        },
        ChipType::W25Q128,
    );
    assert_eq!(
        flash.set_dual_quad_spi(true),
        Err(Error::ModeTransitionFailed)
    );
    // tracked state only changes after read-back confirmation
    assert!(!flash.dual_quad_spi());
}

#[test]
fn dual_reads_match_plain_reads() {
    let (mut flash, bus) = init_flash(DummyConfig::default(), ChipType::W25Q128);
    bus.0.borrow_mut().data_mut()[0x40..0x48].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
    flash.set_dual_quad_spi(true).unwrap();

    let mut dual = [0u8; 8];
    flash.fast_read_dual_output(0x40, &mut dual).unwrap();
    let mut plain = [0u8; 8];
    flash.only_spi_read(0x40, &mut plain).unwrap();
    assert_eq!(dual, plain);
}

#[test]
fn word_reads_enforce_their_alignment() {
    let (mut flash, _) = init_flash(DummyConfig::default(), ChipType::W25Q128);
    flash.set_dual_quad_spi(true).unwrap();
    let mut buf = [0u8; 4];
    assert_eq!(
        flash.word_read_quad_io(0x41, &mut buf),
        Err(Error::InvalidAlignment)
    );
    assert_eq!(
        flash.octal_word_read_quad_io(0x48, &mut buf),
        Err(Error::InvalidAlignment)
    );
    flash.word_read_quad_io(0x42, &mut buf).unwrap();
    flash.octal_word_read_quad_io(0x40, &mut buf).unwrap();
}

#[test]
fn suspend_requires_a_busy_chip_and_resume_a_suspended_one() {
    let (mut flash, bus) = init_flash(DummyConfig::default(), ChipType::W25Q128);
    assert_eq!(flash.erase_program_suspend(), Err(Error::NothingToSuspend));
    assert_eq!(flash.erase_program_resume(), Err(Error::NothingToResume));

    bus.0.borrow_mut().force_busy(5);
    flash.erase_program_suspend().unwrap();
    assert!(flash.status2().unwrap().suspended());
    assert!(!flash.is_busy().unwrap());

    flash.erase_program_resume().unwrap();
    assert!(flash.is_busy().unwrap());
}

#[test]
fn qspi_wiring_enters_qpi_during_init() {
    let bus = SharedBus::new(DummyConfig::default());
    let mut flash = Flash::new(bus.clone(), ChipType::W25Q128, Interface::Qspi);
    flash.init().unwrap();
    assert!(bus.0.borrow().in_qpi_mode());
    assert!(flash.dual_quad_spi());

    let mut buf = [0u8; 4];
    flash.read(0, &mut buf).unwrap();
    assert_eq!(buf, [0xFF; 4]);

    flash.deinit().unwrap();
    assert!(!bus.0.borrow().in_qpi_mode());
    assert!(!flash.is_initialized());
}

#[test]
fn identification_queries() {
    let (mut flash, _) = init_flash(DummyConfig::default(), ChipType::W25Q128);

    let id = flash.manufacturer_device_id().unwrap();
    assert_eq!(id.id_word(), 0xEF17);

    let jedec = flash.jedec_id().unwrap();
    assert_eq!(jedec.manufacturer, 0xEF);
    assert_eq!(jedec.device, 0x4018);

    let unique = flash.unique_id().unwrap();
    assert_eq!(unique.len(), 8);

    let sfdp = flash.sfdp().unwrap();
    assert!(sfdp.is_valid());
    assert_eq!(sfdp.revision(), (1, 6));

    flash.set_dual_quad_spi(true).unwrap();
    assert_eq!(flash.manufacturer_device_id_dual_io().unwrap().id_word(), 0xEF17);
    assert_eq!(flash.manufacturer_device_id_quad_io().unwrap().id_word(), 0xEF17);
}

#[test]
fn security_register_round_trip() {
    let (mut flash, _) = init_flash(DummyConfig::default(), ChipType::W25Q128);
    let mut payload = [0u8; 256];
    for (i, b) in payload.iter_mut().enumerate() {
        *b = i as u8;
    }
    flash
        .program_security_register(SecurityRegister::Two, &payload)
        .unwrap();

    let mut readback = [0u8; 256];
    flash
        .read_security_register(SecurityRegister::Two, &mut readback)
        .unwrap();
    assert_eq!(readback, payload);

    // other registers are untouched
    flash
        .read_security_register(SecurityRegister::One, &mut readback)
        .unwrap();
    assert_eq!(readback, [0xFF; 256]);

    flash.erase_security_register(SecurityRegister::Two).unwrap();
    flash
        .read_security_register(SecurityRegister::Two, &mut readback)
        .unwrap();
    assert_eq!(readback, [0xFF; 256]);
}

#[test]
fn block_locks() {
    let (mut flash, bus) = init_flash(DummyConfig::default(), ChipType::W25Q128);

    flash.individual_block_lock(0x25000).unwrap();
    assert!(flash.read_block_lock(0x25000).unwrap());
    assert!(bus.0.borrow().block_locked(0x25000));
    assert!(!flash.read_block_lock(0x35000).unwrap());

    flash.individual_block_unlock(0x25000).unwrap();
    assert!(!flash.read_block_lock(0x25000).unwrap());

    flash.global_block_lock().unwrap();
    assert!(flash.read_block_lock(0x7F0000).unwrap());
    flash.global_block_unlock().unwrap();
    assert!(!flash.read_block_lock(0x7F0000).unwrap());

    let capacity = ChipType::W25Q128.capacity();
    assert_eq!(
        flash.individual_block_lock(capacity),
        Err(Error::AddressOutOfRange { addr: capacity })
    );
}

#[test]
fn block_lock_operations_follow_the_write_protocol() {
    let (mut flash, bus) = init_flash(DummyConfig::default(), ChipType::W25Q128);

    flash.individual_block_lock(0x25000).unwrap();
    let log = opcode_sequence(&bus);
    assert_eq!(
        log,
        [opcodes::WREN, opcodes::BLOCK_LOCK, opcodes::RDSR1]
    );

    bus.0.borrow_mut().clear_transactions();
    flash.global_block_unlock().unwrap();
    let log = opcode_sequence(&bus);
    assert_eq!(
        log,
        [opcodes::WREN, opcodes::GLOBAL_BLOCK_UNLOCK, opcodes::RDSR1]
    );
}

#[test]
fn set_status2_tracks_only_the_confirmed_qe_bit() {
    // a write that does not stick must not flip the tracked flag
    let (mut flash, _) = init_flash(
        DummyConfig {
            stuck_status_writes: true,
            ..DummyConfig::default()
        },
        ChipType::W25Q128,
    );
    flash.set_status2(Status2::QE).unwrap();
    assert!(!flash.dual_quad_spi());

    let (mut flash, _) = init_flash(DummyConfig::default(), ChipType::W25Q128);
    flash.set_status2(Status2::QE).unwrap();
    assert!(flash.dual_quad_spi());
}

#[test]
fn write_disable_clears_the_latch() {
    let (mut flash, bus) = init_flash(DummyConfig::default(), ChipType::W25Q128);
    bus.0
        .borrow_mut()
        .execute(&mut SpiCommand::simple(opcodes::WREN))
        .unwrap();
    assert!(flash.status1().unwrap().write_enabled());

    flash.write_disable().unwrap();
    assert!(!flash.status1().unwrap().write_enabled());
}

#[test]
fn power_down_blocks_everything_but_release() {
    let (mut flash, _) = init_flash(DummyConfig::default(), ChipType::W25Q128);
    flash.power_down().unwrap();
    let mut buf = [0u8; 1];
    assert_eq!(flash.only_spi_read(0, &mut buf), Err(Error::Transport));
    flash.release_power_down().unwrap();
    flash.only_spi_read(0, &mut buf).unwrap();
}

#[test]
fn erased_then_programmed_data_round_trips() {
    let (mut flash, _) = init_flash(DummyConfig::default(), ChipType::W25Q128);
    let data: Vec<u8> = (0..4096).map(|i| (i * 7 % 256) as u8).collect();
    flash.write(0x3000, &data).unwrap();

    let mut buf = vec![0u8; 4096];
    flash.fast_read(0x3000, &mut buf).unwrap();
    assert_eq!(buf, data);

    flash.sector_erase_4k(0x3000).unwrap();
    flash.fast_read(0x3000, &mut buf).unwrap();
    assert!(buf.iter().all(|&b| b == 0xFF));
}
