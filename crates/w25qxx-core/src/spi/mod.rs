//! SPI transaction types and the W25Qxx opcode catalog
//!
//! Everything here is a pure value: commands are built per call and
//! consumed by the bus, nothing is persisted.

mod address;
mod command;
mod io_mode;
pub mod opcodes;

pub use address::AddressWidth;
pub use command::SpiCommand;
pub use io_mode::{check_io_mode_supported, IoMode};
