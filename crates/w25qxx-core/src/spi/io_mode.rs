//! SPI I/O modes

use crate::bus::BusFeatures;
use crate::error::{Error, Result};

/// I/O mode for SPI transactions
///
/// Represents how data is transferred on the bus, from single-wire to
/// quad-wire modes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IoMode {
    /// Standard SPI: 1-1-1 (cmd, addr, data all on single line)
    #[default]
    Single,
    /// Dual Output: 1-1-2 (data phase on 2 lines)
    DualOut,
    /// Dual I/O: 1-2-2 (addr and data on 2 lines)
    DualIo,
    /// Quad Output: 1-1-4 (data phase on 4 lines)
    QuadOut,
    /// Quad I/O: 1-4-4 (addr and data on 4 lines)
    QuadIo,
    /// QPI mode: 4-4-4 (everything on 4 lines)
    Qpi,
}

impl IoMode {
    /// Returns the number of data lines used for the command phase
    pub const fn cmd_lines(&self) -> u8 {
        match self {
            Self::Single | Self::DualOut | Self::DualIo | Self::QuadOut | Self::QuadIo => 1,
            Self::Qpi => 4,
        }
    }

    /// Returns the number of data lines used for the address phase
    pub const fn addr_lines(&self) -> u8 {
        match self {
            Self::Single | Self::DualOut | Self::QuadOut => 1,
            Self::DualIo => 2,
            Self::QuadIo | Self::Qpi => 4,
        }
    }

    /// Returns the number of data lines used for the data phase
    pub const fn data_lines(&self) -> u8 {
        match self {
            Self::Single => 1,
            Self::DualOut | Self::DualIo => 2,
            Self::QuadOut | Self::QuadIo | Self::Qpi => 4,
        }
    }

    /// Returns true if this mode uses multiple data lines
    pub const fn is_multi_io(&self) -> bool {
        !matches!(self, Self::Single)
    }

    /// Returns true if this mode requires the chip-side quad-enable bit
    pub const fn requires_quad_enable(&self) -> bool {
        matches!(self, Self::QuadOut | Self::QuadIo | Self::Qpi)
    }
}

/// Check that the bus can drive the requested lane width
///
/// Returns `Err(ModeMismatch)` instead of silently degrading to a
/// narrower mode.
pub fn check_io_mode_supported(mode: IoMode, features: BusFeatures) -> Result<()> {
    let required = match mode {
        IoMode::Single => return Ok(()),
        IoMode::DualOut => BusFeatures::DUAL_IN,
        IoMode::DualIo => BusFeatures::DUAL_IO,
        IoMode::QuadOut => BusFeatures::QUAD_IN,
        IoMode::QuadIo => BusFeatures::QUAD_IO,
        IoMode::Qpi => BusFeatures::QPI,
    };
    if features.contains(required) {
        Ok(())
    } else {
        Err(Error::ModeMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_counts() {
        assert_eq!(IoMode::Single.data_lines(), 1);
        assert_eq!(IoMode::DualIo.addr_lines(), 2);
        assert_eq!(IoMode::QuadIo.addr_lines(), 4);
        assert_eq!(IoMode::Qpi.cmd_lines(), 4);
    }

    #[test]
    fn capability_check_refuses_missing_lanes() {
        let single_only = BusFeatures::empty();
        assert!(check_io_mode_supported(IoMode::Single, single_only).is_ok());
        assert_eq!(
            check_io_mode_supported(IoMode::QuadIo, single_only),
            Err(Error::ModeMismatch)
        );
        assert!(check_io_mode_supported(IoMode::QuadIo, BusFeatures::QUAD_IO).is_ok());
    }
}
