//! Bring-up configuration
//!
//! [`BringupConfig::default`] reproduces the fixed constants of the board
//! bring-up: BCM2708 peripheral base, `/dev/mem`, PCM pins 18–21 on ALT0,
//! pattern `0xAAAA_AAAA`, one-second resync pause, no cycle limit.

use std::path::PathBuf;
use std::time::Duration;

use platform::config::{Board, DEV_MEM_PATH, GPIO_OFFSET, I2S_OFFSET, PCM_PINS, TEST_PATTERN};
use platform::i2s::DEFAULT_RESYNC_INTERVAL;
use platform::{FifoClear, FillLimit, I2sConfig};

/// Number of GPIO words logged after pin configuration (GPFSEL0..5, reserved,
/// GPSET0/1, reserved).
pub const GPIO_DUMP_WORDS: usize = 10;

/// Everything the orchestrator needs, resolved from defaults and CLI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BringupConfig {
    /// Physical-memory device.
    pub device: PathBuf,
    /// Physical peripheral base of the SoC.
    pub peripheral_base: u64,
    /// Pins routed to the PCM block.
    pub pins: Vec<u8>,
    /// Alternate function number for `pins` (0–5).
    pub alt: u8,
    /// Word written into the TX FIFO.
    pub pattern: u32,
    /// FIFO clear bits used during setup.
    pub fifo_clear: FifoClear,
    /// Pause after each resync.
    pub resync_interval: Duration,
    /// Stop after this many transmit cycles. `None` runs until cancelled.
    pub cycles: Option<u64>,
    /// Cap on FIFO writes per fill phase.
    pub fill_budget: Option<u64>,
}

impl Default for BringupConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEV_MEM_PATH),
            peripheral_base: Board::default().peripheral_base(),
            pins: PCM_PINS.to_vec(),
            alt: 0,
            pattern: TEST_PATTERN,
            fifo_clear: FifoClear::default(),
            resync_interval: DEFAULT_RESYNC_INTERVAL,
            cycles: None,
            fill_budget: None,
        }
    }
}

impl BringupConfig {
    /// Physical base of the GPIO block.
    pub fn gpio_base(&self) -> Option<u64> {
        self.peripheral_base.checked_add(GPIO_OFFSET)
    }

    /// Physical base of the PCM/I2S block.
    pub fn i2s_base(&self) -> Option<u64> {
        self.peripheral_base.checked_add(I2S_OFFSET)
    }

    /// Controller settings derived from this configuration.
    pub fn i2s_config(&self) -> I2sConfig {
        I2sConfig {
            fifo_clear: self.fifo_clear,
            test_pattern: self.pattern,
            resync_interval: self.resync_interval,
            ..I2sConfig::default()
        }
    }

    /// Bounds applied to every fill phase.
    pub fn fill_limit(&self) -> FillLimit {
        match self.fill_budget {
            Some(budget) => FillLimit::unbounded().with_max_writes(budget),
            None => FillLimit::unbounded(),
        }
    }
}
