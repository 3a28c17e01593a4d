//! Board presets and peripheral layout constants
//!
//! All peripheral addresses are derived from a board's peripheral base plus a
//! fixed per-peripheral offset. Reference this module instead of hardcoding
//! physical addresses.

/// BCM2708 (Pi 1, Pi Zero) peripheral base.
pub const BCM2708_PERI_BASE: u64 = 0x2000_0000;

/// BCM2709 / BCM2710 (Pi 2, Pi 3, Pi Zero 2) peripheral base.
pub const BCM2709_PERI_BASE: u64 = 0x3F00_0000;

/// BCM2711 (Pi 4) peripheral base in the low-peripheral address map.
pub const BCM2711_PERI_BASE: u64 = 0xFE00_0000;

/// GPIO controller offset from the peripheral base.
pub const GPIO_OFFSET: u64 = 0x20_0000;

/// PCM/I2S controller offset from the peripheral base.
pub const I2S_OFFSET: u64 = 0x20_3000;

/// Size of one mapped register block.
pub const BLOCK_SIZE: usize = 4 * 1024;

/// Page size used when the OS does not report one.
pub const DEFAULT_PAGE_SIZE: usize = 4 * 1024;

/// Physical-memory device.
pub const DEV_MEM_PATH: &str = "/dev/mem";

/// Pins routed to the PCM block on ALT0: PCM_CLK, PCM_FS, PCM_DIN, PCM_DOUT.
pub const PCM_PINS: [u8; 4] = [18, 19, 20, 21];

/// Word streamed into the TX FIFO (alternating bit pattern, easy to spot on a scope).
pub const TEST_PATTERN: u32 = 0xAAAA_AAAA;

/// SoC family, selects the peripheral base address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Board {
    /// BCM2708: Pi 1, Pi Zero
    #[default]
    Bcm2708,
    /// BCM2709 / BCM2710: Pi 2, Pi 3, Pi Zero 2
    Bcm2709,
    /// BCM2711: Pi 4
    Bcm2711,
}

impl Board {
    /// Physical base of the peripheral block for this SoC.
    pub const fn peripheral_base(self) -> u64 {
        match self {
            Self::Bcm2708 => BCM2708_PERI_BASE,
            Self::Bcm2709 => BCM2709_PERI_BASE,
            Self::Bcm2711 => BCM2711_PERI_BASE,
        }
    }

    /// Physical address of the GPIO block.
    #[allow(clippy::arithmetic_side_effects)] // constant bases, cannot overflow u64
    pub const fn gpio_base(self) -> u64 {
        self.peripheral_base() + GPIO_OFFSET
    }

    /// Physical address of the PCM/I2S block.
    #[allow(clippy::arithmetic_side_effects)] // constant bases, cannot overflow u64
    pub const fn i2s_base(self) -> u64 {
        self.peripheral_base() + I2S_OFFSET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcm2708_addresses_match_datasheet() {
        assert_eq!(Board::Bcm2708.gpio_base(), 0x2020_0000);
        assert_eq!(Board::Bcm2708.i2s_base(), 0x2020_3000);
    }

    #[test]
    fn default_board_is_bcm2708() {
        assert_eq!(Board::default(), Board::Bcm2708);
    }

    #[test]
    fn gpio_and_i2s_blocks_do_not_overlap() {
        for board in [Board::Bcm2708, Board::Bcm2709, Board::Bcm2711] {
            let gap = board.i2s_base() - board.gpio_base();
            assert!(gap >= BLOCK_SIZE as u64, "{board:?}: blocks overlap");
        }
    }
}
