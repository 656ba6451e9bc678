//! W25Qxx instruction opcodes
//!
//! One byte per logical operation, exactly as the datasheet command table
//! defines them. Grouped by function.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before any write/erase operation
pub const WREN: u8 = 0x06;
/// Write Disable - clears WEL bit in status register
pub const WRDI: u8 = 0x04;
/// Write Enable for Volatile Status Register
pub const VOLATILE_SR_WREN: u8 = 0x50;

// ============================================================================
// Status register operations
// ============================================================================

/// Read Status Register 1
pub const RDSR1: u8 = 0x05;
/// Read Status Register 2
pub const RDSR2: u8 = 0x35;
/// Read Status Register 3
pub const RDSR3: u8 = 0x15;
/// Write Status Register 1
pub const WRSR1: u8 = 0x01;
/// Write Status Register 2
pub const WRSR2: u8 = 0x31;
/// Write Status Register 3
pub const WRSR3: u8 = 0x11;

// ============================================================================
// Read commands - 3-byte address
// ============================================================================

/// Read Data (low speed)
pub const READ: u8 = 0x03;
/// Fast Read (one dummy byte, full bus frequency)
pub const FAST_READ: u8 = 0x0B;
/// Fast Read Dual Output (1-1-2)
pub const FAST_READ_DUAL_OUT: u8 = 0x3B;
/// Fast Read Dual I/O (1-2-2)
pub const FAST_READ_DUAL_IO: u8 = 0xBB;
/// Fast Read Quad Output (1-1-4)
pub const FAST_READ_QUAD_OUT: u8 = 0x6B;
/// Fast Read Quad I/O (1-4-4)
pub const FAST_READ_QUAD_IO: u8 = 0xEB;
/// Word Read Quad I/O - address bit A0 must be 0
pub const WORD_READ_QUAD_IO: u8 = 0xE7;
/// Octal Word Read Quad I/O - address bits A3-A0 must be 0
pub const OCTAL_WORD_READ_QUAD_IO: u8 = 0xE3;

// ============================================================================
// Read commands - 4-byte address
// ============================================================================

/// Read Data with 4-byte address
pub const READ_4B: u8 = 0x13;
/// Fast Read with 4-byte address
pub const FAST_READ_4B: u8 = 0x0C;
/// Fast Read Dual Output with 4-byte address
pub const FAST_READ_DUAL_OUT_4B: u8 = 0x3C;
/// Fast Read Dual I/O with 4-byte address
pub const FAST_READ_DUAL_IO_4B: u8 = 0xBC;
/// Fast Read Quad Output with 4-byte address
pub const FAST_READ_QUAD_OUT_4B: u8 = 0x6C;
/// Fast Read Quad I/O with 4-byte address
pub const FAST_READ_QUAD_IO_4B: u8 = 0xEC;

// ============================================================================
// Page Program
// ============================================================================

/// Page Program with 3-byte address
pub const PAGE_PROGRAM: u8 = 0x02;
/// Page Program with 4-byte address
pub const PAGE_PROGRAM_4B: u8 = 0x12;
/// Quad Input Page Program with 3-byte address
pub const QUAD_PAGE_PROGRAM: u8 = 0x32;
/// Quad Input Page Program with 4-byte address
pub const QUAD_PAGE_PROGRAM_4B: u8 = 0x34;

// ============================================================================
// Erase commands
// ============================================================================

/// Sector Erase 4KB with 3-byte address
pub const SECTOR_ERASE_4K: u8 = 0x20;
/// Sector Erase 4KB with 4-byte address
pub const SECTOR_ERASE_4K_4B: u8 = 0x21;
/// Block Erase 32KB
pub const BLOCK_ERASE_32K: u8 = 0x52;
/// Block Erase 64KB with 3-byte address
pub const BLOCK_ERASE_64K: u8 = 0xD8;
/// Block Erase 64KB with 4-byte address
pub const BLOCK_ERASE_64K_4B: u8 = 0xDC;
/// Chip Erase
pub const CHIP_ERASE: u8 = 0xC7;
/// Chip Erase (alternate opcode, same behavior)
pub const CHIP_ERASE_ALT: u8 = 0x60;

// ============================================================================
// Suspend / Resume
// ============================================================================

/// Erase/Program Suspend
pub const SUSPEND: u8 = 0x75;
/// Erase/Program Resume
pub const RESUME: u8 = 0x7A;

// ============================================================================
// Power management
// ============================================================================

/// Deep Power Down
pub const POWER_DOWN: u8 = 0xB9;
/// Release from Deep Power Down / Read Device ID
pub const RELEASE_POWER_DOWN: u8 = 0xAB;

// ============================================================================
// Identification
// ============================================================================

/// Read Manufacturer / Device ID
pub const DEVICE_ID: u8 = 0x90;
/// Read Manufacturer / Device ID via Dual I/O
pub const DEVICE_ID_DUAL_IO: u8 = 0x92;
/// Read Manufacturer / Device ID via Quad I/O
pub const DEVICE_ID_QUAD_IO: u8 = 0x94;
/// Read JEDEC ID (manufacturer + 2 device bytes)
pub const JEDEC_ID: u8 = 0x9F;
/// Read 64-bit factory Unique ID
pub const UNIQUE_ID: u8 = 0x4B;
/// Read SFDP parameter table (JEDEC JESD216)
pub const SFDP: u8 = 0x5A;

// ============================================================================
// Security register operations
// ============================================================================

/// Erase Security Register
pub const ERASE_SECURITY_REGISTER: u8 = 0x44;
/// Program Security Register
pub const PROGRAM_SECURITY_REGISTER: u8 = 0x42;
/// Read Security Register
pub const READ_SECURITY_REGISTER: u8 = 0x48;

// ============================================================================
// Block lock
// ============================================================================

/// Individual Block Lock
pub const BLOCK_LOCK: u8 = 0x36;
/// Individual Block Unlock
pub const BLOCK_UNLOCK: u8 = 0x39;
/// Read Block Lock status
pub const READ_BLOCK_LOCK: u8 = 0x3D;
/// Global Block Lock
pub const GLOBAL_BLOCK_LOCK: u8 = 0x7E;
/// Global Block Unlock
pub const GLOBAL_BLOCK_UNLOCK: u8 = 0x98;

// ============================================================================
// Address mode and bus mode control
// ============================================================================

/// Enter 4-Byte Address Mode
pub const ENTER_4BYTE_MODE: u8 = 0xB7;
/// Exit 4-Byte Address Mode
pub const EXIT_4BYTE_MODE: u8 = 0xE9;
/// Set Burst with Wrap (standard SPI)
pub const SET_BURST_WITH_WRAP: u8 = 0x77;
/// Set Read Parameters (QPI only: dummy clocks + wrap length)
pub const SET_READ_PARAMETERS: u8 = 0xC0;
/// Enter QPI Mode
pub const ENTER_QPI_MODE: u8 = 0x38;
/// Exit QPI Mode (sent 4-4-4)
pub const EXIT_QPI_MODE: u8 = 0xFF;

// ============================================================================
// Software Reset
// ============================================================================

/// Enable Reset - must immediately precede RESET_DEVICE
pub const ENABLE_RESET: u8 = 0x66;
/// Reset Device - no-op unless armed by ENABLE_RESET
pub const RESET_DEVICE: u8 = 0x99;
