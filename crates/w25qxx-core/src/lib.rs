//! w25qxx-core - Command-level driver for W25Qxx serial NOR flash
//!
//! This crate translates high-level storage operations (read, program,
//! erase, lock, status) into the exact opcode + address + dummy-cycle +
//! data sequences the W25Qxx family defines, and drives the multi-step
//! protocols (write-enable, busy-poll, suspend/resume, reset) around them.
//! The physical bus is abstracted behind the [`bus::FlashBus`] trait, so
//! the same sequencer works over single/dual/quad SPI or native QSPI and
//! can be tested against an in-memory chip emulator.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`)
//! - `alloc` - Enable heap allocation (buffer-flattening helpers)
//!
//! # Example
//!
//! ```ignore
//! use w25qxx_core::{chip::{ChipType, Interface}, driver::Flash};
//!
//! fn dump_id<B: w25qxx_core::bus::FlashBus>(bus: B) {
//!     let mut flash = Flash::new(bus, ChipType::W25Q128, Interface::Spi);
//!     flash.init().unwrap();
//!     let id = flash.jedec_id().unwrap();
//!     println!("manufacturer 0x{:02X} device 0x{:04X}", id.manufacturer, id.device);
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod bus;
pub mod chip;
pub mod driver;
pub mod error;
pub mod spi;
pub mod status;

pub use error::{Error, Result};
