//! PCM/I2S bring-up and transmit loop
//!
//! ## Bring-up sequence
//! ```text
//! [Disabled] → [FifoClearing] → [Configured] → [StandbyDisabled]
//!     → [Syncing] → [Enabled] → [Transmitting]
//! ```
//!
//! ## Transmit cycle (repeats until cancelled)
//! ```text
//! fill FIFO while CS_A.TXD → [Resyncing]: EN off, SYNC ^= 1, EN on
//!     → sleep resync interval → dump registers → [Transmitting]
//! ```
//!
//! The controller never caches a register: every TXD check is a fresh
//! volatile read, because the FIFO drains on its own at the PCM clock rate.

pub mod registers;

use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use thiserror::Error;

use crate::cancel::CancelToken;
use crate::config::TEST_PATTERN;
use crate::delay::delay_for;
use crate::mmio::{self, RegisterWindow, WindowError};

use self::registers::{
    CS_A, CS_EN, CS_STBY, CS_SYNC, CS_TXD, CS_TXON, FIFO_A, FIFO_CLEAR_LITERAL,
    FIFO_CLEAR_WITH_THRESHOLDS, MODE_A, MODE_FRAME_32, REGISTER_COUNT, TXC_A,
    TXC_TWO_CHANNELS_16BIT,
};

/// Settle time after disable, FIFO clear and enable.
pub const SETTLE_SHORT_US: u32 = 10;

/// Settle time after standby disable and sync.
pub const SETTLE_LONG_US: u32 = 50;

/// Pause between transmit cycles.
pub const DEFAULT_RESYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum I2sState {
    /// CS_A cleared; interface off.
    Disabled,
    /// FIFO clear bits written.
    FifoClearing,
    /// TXC_A and MODE_A written.
    Configured,
    /// RAM standby disabled.
    StandbyDisabled,
    /// SYNC written, readback pending.
    Syncing,
    /// Interface enabled, transmitter off.
    Enabled,
    /// Transmitter on, feeding the FIFO.
    Transmitting,
    /// Inside the EN-off / SYNC-toggle / EN-on sequence.
    Resyncing,
}

/// Value OR'd into CS_A during the FIFO clear step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FifoClear {
    /// TXCLR | RXCLR, exactly what the historical bring-up code wrote.
    #[default]
    Literal,
    /// TXCLR | RXCLR | `11 << 5`: the assumed intent of that code.
    WithThresholds,
}

impl FifoClear {
    /// Bits to OR into CS_A.
    pub const fn bits(self) -> u32 {
        match self {
            Self::Literal => FIFO_CLEAR_LITERAL,
            Self::WithThresholds => FIFO_CLEAR_WITH_THRESHOLDS,
        }
    }
}

/// Controller configuration.
#[derive(Debug, Clone, Copy)]
pub struct I2sConfig {
    /// FIFO clear pattern.
    pub fifo_clear: FifoClear,
    /// Word written into the TX FIFO.
    pub test_pattern: u32,
    /// Pause after each resync.
    pub resync_interval: Duration,
    /// Registers dumped after each cycle.
    pub dump_words: usize,
}

impl Default for I2sConfig {
    fn default() -> Self {
        Self {
            fifo_clear: FifoClear::default(),
            test_pattern: TEST_PATTERN,
            resync_interval: DEFAULT_RESYNC_INTERVAL,
            dump_words: REGISTER_COUNT,
        }
    }
}

/// I2S controller errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum I2sError {
    /// Register access failed.
    #[error("PCM register access failed: {0}")]
    Window(#[from] WindowError),
    /// Transmit-loop operation before the bring-up sequence finished.
    #[error("transmitter not running (state {0:?})")]
    NotTransmitting(I2sState),
}

/// Result of the bring-up sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupReport {
    /// Whether SYNC read back as set after the sync step. Diagnostic only.
    pub sync_observed: bool,
    /// CS_A after the transmitter was switched on.
    pub control: u32,
}

/// Bounds for one FIFO fill phase. Default: unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillLimit {
    /// Stop after this long, measured from the start of the phase.
    pub timeout: Option<Duration>,
    /// Stop after this many FIFO writes.
    pub max_writes: Option<u64>,
}

impl FillLimit {
    /// No bound: fill until TXD clears or the token is cancelled.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Bound the phase by wall-clock time.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Bound the phase by number of FIFO writes.
    pub fn with_max_writes(mut self, max_writes: u64) -> Self {
        self.max_writes = Some(max_writes);
        self
    }
}

/// Why a fill phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStop {
    /// TXD read as clear: the FIFO is full.
    FifoFull,
    /// The cancel token fired.
    Cancelled,
    /// [`FillLimit::timeout`] elapsed.
    TimedOut,
    /// [`FillLimit::max_writes`] reached.
    BudgetExhausted,
}

/// Outcome of one fill phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillOutcome {
    /// FIFO writes during this phase.
    pub written: u64,
    /// Why the phase ended.
    pub stop: FillStop,
}

/// Totals reported when the transmit loop returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Completed transmit cycles (fill + resync + pause + dump).
    pub cycles: u64,
    /// FIFO writes since the controller was created.
    pub fill_count: u64,
}

/// PCM/I2S controller over a borrowed register window.
pub struct I2sController<'w, W: RegisterWindow + ?Sized, D: DelayNs> {
    window: &'w W,
    delay: D,
    config: I2sConfig,
    state: I2sState,
    fill_count: u64,
}

impl<'w, W: RegisterWindow + ?Sized, D: DelayNs> I2sController<'w, W, D> {
    /// Wrap a PCM register window. No registers are touched until [`setup`](Self::setup).
    pub fn new(window: &'w W, delay: D, config: I2sConfig) -> Self {
        Self {
            window,
            delay,
            config,
            state: I2sState::Disabled,
            fill_count: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> I2sState {
        self.state
    }

    /// FIFO writes since creation. Increases by exactly one per write.
    pub fn fill_count(&self) -> u64 {
        self.fill_count
    }

    /// Active configuration.
    pub fn config(&self) -> &I2sConfig {
        &self.config
    }

    /// The delay source (tests inspect recorded settle times through this).
    pub fn delay(&self) -> &D {
        &self.delay
    }

    fn enter(&mut self, state: I2sState) {
        tracing::debug!("I2S {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn set_control_bits(&self, bits: u32) -> Result<(), I2sError> {
        self.window.modify(CS_A, |cs| cs | bits)?;
        Ok(())
    }

    /// Run the bring-up sequence, ending with the transmitter on.
    ///
    /// The SYNC readback is reported, never acted on.
    pub fn setup(&mut self) -> Result<SetupReport, I2sError> {
        tracing::info!("Disable I2S");
        self.enter(I2sState::Disabled);
        self.window.write(CS_A, 0)?;
        self.delay.delay_us(SETTLE_SHORT_US);

        tracing::info!("Clearing FIFOs ({:#x})", self.config.fifo_clear.bits());
        self.enter(I2sState::FifoClearing);
        self.set_control_bits(self.config.fifo_clear.bits())?;
        self.delay.delay_us(SETTLE_SHORT_US);

        tracing::info!("Setting TX channel settings");
        self.window.write(TXC_A, TXC_TWO_CHANNELS_16BIT)?;
        self.window.write(MODE_A, MODE_FRAME_32)?;
        self.enter(I2sState::Configured);

        tracing::info!("Disabling standby");
        self.set_control_bits(CS_STBY)?;
        self.enter(I2sState::StandbyDisabled);
        self.delay.delay_us(SETTLE_LONG_US);

        tracing::info!("Setting sync bit high");
        self.enter(I2sState::Syncing);
        self.set_control_bits(CS_SYNC)?;
        self.delay.delay_us(SETTLE_LONG_US);
        let sync_observed = self.window.read(CS_A)? & CS_SYNC != 0;
        if sync_observed {
            tracing::info!("SYNC bit high, as expected");
        } else {
            tracing::warn!("SYNC bit low, PCM clock may not be running");
        }

        self.set_control_bits(CS_EN)?;
        self.enter(I2sState::Enabled);
        self.delay.delay_us(SETTLE_SHORT_US);

        self.set_control_bits(CS_TXON)?;
        self.enter(I2sState::Transmitting);
        let control = self.window.read(CS_A)?;
        tracing::info!("Transmitter on, CS_A={control:#010x}");

        Ok(SetupReport {
            sync_observed,
            control,
        })
    }

    fn ensure_transmitting(&self) -> Result<(), I2sError> {
        match self.state {
            I2sState::Transmitting => Ok(()),
            other => Err(I2sError::NotTransmitting(other)),
        }
    }

    /// Write the test pattern while the FIFO accepts data.
    ///
    /// Checks, in order, the cancel token, the timeout, the write budget and
    /// then a fresh read of TXD before every write.
    pub fn fill_fifo(&mut self, cancel: &CancelToken, limit: FillLimit) -> Result<FillOutcome, I2sError> {
        self.ensure_transmitting()?;
        let deadline = limit
            .timeout
            .and_then(|timeout| Instant::now().checked_add(timeout));
        let mut written: u64 = 0;

        let stop = loop {
            if cancel.is_cancelled() {
                break FillStop::Cancelled;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                break FillStop::TimedOut;
            }
            if limit.max_writes.is_some_and(|max| written >= max) {
                break FillStop::BudgetExhausted;
            }
            if self.window.read(CS_A)? & CS_TXD == 0 {
                break FillStop::FifoFull;
            }

            self.window.write(FIFO_A, self.config.test_pattern)?;
            written = written.saturating_add(1);
            self.fill_count = self.fill_count.saturating_add(1);
            tracing::debug!("Filling FIFO, count={}", self.fill_count);
        };

        Ok(FillOutcome { written, stop })
    }

    /// Toggle SYNC with the interface briefly disabled: EN off, SYNC ^= 1, EN on.
    ///
    /// The order matters: it fixes which CS_A bits are asserted together.
    pub fn resync(&mut self) -> Result<(), I2sError> {
        self.ensure_transmitting()?;
        self.enter(I2sState::Resyncing);
        self.window.modify(CS_A, |cs| cs & !CS_EN)?;
        self.window.modify(CS_A, |cs| cs ^ CS_SYNC)?;
        self.window.modify(CS_A, |cs| cs | CS_EN)?;
        self.enter(I2sState::Transmitting);
        Ok(())
    }

    /// Log the first `dump_words` PCM registers.
    pub fn dump(&self) -> Result<(), I2sError> {
        mmio::dump(self.window, "I2S", self.config.dump_words)?;
        Ok(())
    }

    /// One transmit cycle: fill, resync, pause, dump.
    ///
    /// A cancelled fill returns straight away without resyncing. Timeout and
    /// budget stops count as the end of the fill phase.
    pub fn run_cycle(&mut self, cancel: &CancelToken, limit: FillLimit) -> Result<FillOutcome, I2sError> {
        let fill = self.fill_fifo(cancel, limit)?;
        if fill.stop == FillStop::Cancelled {
            return Ok(fill);
        }
        if fill.stop != FillStop::FifoFull {
            tracing::debug!("fill phase ended early: {:?} after {} writes", fill.stop, fill.written);
        }
        self.resync()?;
        delay_for(&mut self.delay, self.config.resync_interval);
        self.dump()?;
        Ok(fill)
    }

    /// Repeat [`run_cycle`](Self::run_cycle) until cancelled or `max_cycles` is reached.
    ///
    /// With `max_cycles = None` and a token nobody cancels, this never returns.
    pub fn run(
        &mut self,
        cancel: &CancelToken,
        limit: FillLimit,
        max_cycles: Option<u64>,
    ) -> Result<RunSummary, I2sError> {
        tracing::info!("going into loop");
        let mut cycles: u64 = 0;
        while !cancel.is_cancelled() && max_cycles.map_or(true, |max| cycles < max) {
            let fill = self.run_cycle(cancel, limit)?;
            if fill.stop == FillStop::Cancelled {
                break;
            }
            cycles = cycles.saturating_add(1);
        }
        let summary = RunSummary {
            cycles,
            fill_count: self.fill_count,
        };
        tracing::info!(
            "transmit loop stopped after {} cycles, {} FIFO writes",
            summary.cycles,
            summary.fill_count
        );
        Ok(summary)
    }
}
