//! Mock implementations for testing
//!
//! Register windows and a delay source that run on any host, for unit and
//! integration tests. Enabled for this crate's tests and, for downstream
//! crates, through the `mocks` feature.

#![cfg(any(test, feature = "mocks"))]

use std::cell::{Cell, RefCell};
use std::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::i2s::registers::{CS_A, CS_RXCLR, CS_SYNC, CS_TXCLR, CS_TXD, FIFO_A, REGISTER_COUNT};
use crate::mmio::{check_index, RegisterWindow, WindowError};

/// Default process-visible base address reported by mocks.
pub const MOCK_BASE: usize = 0x1000_0000;

/// Plain memory-backed register window.
///
/// Records every software write in order; [`poke`](Self::poke) changes a
/// register the way hardware would, without recording.
#[derive(Debug)]
pub struct MockWindow {
    base: usize,
    regs: RefCell<Vec<u32>>,
    writes: RefCell<Vec<(usize, u32)>>,
}

impl MockWindow {
    /// `words` zeroed registers at [`MOCK_BASE`].
    pub fn new(words: usize) -> Self {
        Self::with_base(MOCK_BASE, words)
    }

    /// `words` zeroed registers reporting `base` as their address.
    pub fn with_base(base: usize, words: usize) -> Self {
        Self {
            base,
            regs: RefCell::new(vec![0; words]),
            writes: RefCell::new(Vec::new()),
        }
    }

    /// Software writes so far, oldest first.
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.writes.borrow().clone()
    }

    /// Forget recorded writes.
    pub fn clear_writes(&self) {
        self.writes.borrow_mut().clear();
    }

    /// Hardware-side update: store `value` without recording a write.
    pub fn poke(&self, index: usize, value: u32) -> Result<(), WindowError> {
        let mut regs = self.regs.borrow_mut();
        let words = regs.len();
        let slot = regs
            .get_mut(index)
            .ok_or(WindowError::OutOfBounds { index, words })?;
        *slot = value;
        Ok(())
    }

    /// Stored value, bypassing any modelled hardware behaviour.
    pub fn peek(&self, index: usize) -> Result<u32, WindowError> {
        let regs = self.regs.borrow();
        regs.get(index)
            .copied()
            .ok_or(WindowError::OutOfBounds {
                index,
                words: regs.len(),
            })
    }
}

impl RegisterWindow for MockWindow {
    fn words(&self) -> usize {
        self.regs.borrow().len()
    }

    fn base_address(&self) -> usize {
        self.base
    }

    fn read(&self, index: usize) -> Result<u32, WindowError> {
        check_index(index, self.words())?;
        self.peek(index)
    }

    fn write(&self, index: usize, value: u32) -> Result<(), WindowError> {
        self.poke(index, value)?;
        self.writes.borrow_mut().push((index, value));
        Ok(())
    }
}

/// PCM block model on top of [`MockWindow`].
///
/// - CS_A.TXD reads as set while the modelled TX FIFO has free slots.
/// - Each FIFO_A write takes one slot and is kept in [`fifo_words`](Self::fifo_words).
/// - TXCLR / RXCLR self-clear; TXD cannot be written.
/// - Optionally refills the FIFO whenever SYNC changes, which stands in for
///   the FIFO draining during the pause between transmit cycles.
#[derive(Debug)]
pub struct MockPcmWindow {
    inner: MockWindow,
    free_slots: Cell<u64>,
    refill: Cell<Option<u64>>,
    sync_stuck_low: Cell<bool>,
    fifo: RefCell<Vec<u32>>,
}

impl MockPcmWindow {
    /// Full FIFO (TXD clear), SYNC behaves normally.
    pub fn new() -> Self {
        Self {
            inner: MockWindow::new(REGISTER_COUNT),
            free_slots: Cell::new(0),
            refill: Cell::new(None),
            sync_stuck_low: Cell::new(false),
            fifo: RefCell::new(Vec::new()),
        }
    }

    /// Start with `slots` free FIFO slots.
    #[must_use]
    pub fn with_fifo_capacity(self, slots: u64) -> Self {
        self.free_slots.set(slots);
        self
    }

    /// Reset free slots to `slots` on every SYNC edge.
    #[must_use]
    pub fn refill_on_sync_toggle(self, slots: u64) -> Self {
        self.refill.set(Some(slots));
        self
    }

    /// SYNC always reads back as 0, as with no PCM clock.
    #[must_use]
    pub fn with_sync_stuck_low(self) -> Self {
        self.sync_stuck_low.set(true);
        self
    }

    /// Free FIFO slots right now.
    pub fn free_slots(&self) -> u64 {
        self.free_slots.get()
    }

    /// Words pushed into the TX FIFO, oldest first.
    pub fn fifo_words(&self) -> Vec<u32> {
        self.fifo.borrow().clone()
    }

    /// CS_A as software would read it.
    pub fn control(&self) -> u32 {
        self.read(CS_A).unwrap_or_default()
    }

    /// Software writes so far, oldest first.
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.inner.writes()
    }

    /// Forget recorded writes.
    pub fn clear_writes(&self) {
        self.inner.clear_writes();
    }

    /// Stored value of any register, without modelled status bits.
    pub fn peek(&self, index: usize) -> Result<u32, WindowError> {
        self.inner.peek(index)
    }
}

impl Default for MockPcmWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterWindow for MockPcmWindow {
    fn words(&self) -> usize {
        self.inner.words()
    }

    fn base_address(&self) -> usize {
        self.inner.base_address()
    }

    fn read(&self, index: usize) -> Result<u32, WindowError> {
        let stored = self.inner.read(index)?;
        if index != CS_A {
            return Ok(stored);
        }
        let mut cs = stored & !CS_TXD;
        if self.free_slots.get() > 0 {
            cs |= CS_TXD;
        }
        if self.sync_stuck_low.get() {
            cs &= !CS_SYNC;
        }
        Ok(cs)
    }

    fn write(&self, index: usize, value: u32) -> Result<(), WindowError> {
        match index {
            CS_A => {
                let previous = self.inner.peek(CS_A)?;
                self.inner.write(CS_A, value)?;
                self.inner.poke(CS_A, value & !(CS_TXD | CS_TXCLR | CS_RXCLR))?;
                if (previous ^ value) & CS_SYNC != 0 {
                    if let Some(slots) = self.refill.get() {
                        self.free_slots.set(slots);
                    }
                }
            }
            FIFO_A => {
                self.inner.write(FIFO_A, value)?;
                self.fifo.borrow_mut().push(value);
                self.free_slots.set(self.free_slots.get().saturating_sub(1));
            }
            _ => self.inner.write(index, value)?,
        }
        Ok(())
    }
}

/// Delay source that records every request instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    calls: Vec<Duration>,
}

impl RecordingDelay {
    /// No calls recorded yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every requested delay, oldest first.
    pub fn calls(&self) -> &[Duration] {
        &self.calls
    }

    /// Sum of all requested delays.
    pub fn total(&self) -> Duration {
        self.calls.iter().sum()
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.calls.push(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_us(&mut self, us: u32) {
        self.calls.push(Duration::from_micros(u64::from(us)));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.calls.push(Duration::from_millis(u64::from(ms)));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_window_round_trip() {
        let window = MockWindow::new(4);
        for (index, value) in [(0, 0), (1, u32::MAX), (2, 0x8000_0001), (3, 0xAAAA_AAAA)] {
            window.write(index, value).unwrap();
            assert_eq!(window.read(index).unwrap(), value);
        }
        assert_eq!(window.writes().len(), 4);
    }

    #[test]
    fn test_mock_window_bounds() {
        let window = MockWindow::new(2);
        assert!(window.read(2).is_err());
        assert!(window.write(2, 0).is_err());
        assert!(window.writes().is_empty());
    }

    #[test]
    fn test_poke_is_not_recorded() {
        let window = MockWindow::new(2);
        window.poke(1, 5).unwrap();
        assert_eq!(window.read(1).unwrap(), 5);
        assert!(window.writes().is_empty());
    }

    #[test]
    fn test_pcm_txd_tracks_free_slots() {
        let pcm = MockPcmWindow::new().with_fifo_capacity(2);
        assert_ne!(pcm.control() & CS_TXD, 0);
        pcm.write(FIFO_A, 1).unwrap();
        pcm.write(FIFO_A, 2).unwrap();
        assert_eq!(pcm.control() & CS_TXD, 0);
        assert_eq!(pcm.fifo_words(), vec![1, 2]);
    }

    #[test]
    fn test_pcm_clear_bits_self_clear() {
        let pcm = MockPcmWindow::new();
        pcm.write(CS_A, CS_TXCLR | CS_RXCLR | CS_SYNC).unwrap();
        assert_eq!(pcm.control(), CS_SYNC);
        assert_eq!(pcm.writes(), vec![(CS_A, CS_TXCLR | CS_RXCLR | CS_SYNC)]);
    }

    #[test]
    fn test_pcm_refills_on_sync_edge_only() {
        let pcm = MockPcmWindow::new().refill_on_sync_toggle(4);
        pcm.write(CS_A, 1).unwrap();
        assert_eq!(pcm.free_slots(), 0);
        pcm.write(CS_A, 1 | CS_SYNC).unwrap();
        assert_eq!(pcm.free_slots(), 4);
    }

    #[test]
    fn test_recording_delay() {
        let mut delay = RecordingDelay::new();
        delay.delay_us(10);
        delay.delay_ms(1);
        assert_eq!(delay.calls().len(), 2);
        assert_eq!(delay.total(), Duration::from_micros(1_010));
    }
}
