//! PCM/I2S controller behaviour against the PCM block model.
//! Covers the bring-up end state, the SYNC alternation across resyncs and
//! the FIFO fill counter.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::time::Duration;

use platform::i2s::registers::{
    CS_EN, CS_STBY, CS_SYNC, CS_TXON, MODE_A, MODE_FRAME_32, TXC_A, TXC_TWO_CHANNELS_16BIT,
};
use platform::mocks::{MockPcmWindow, RecordingDelay};
use platform::{CancelToken, FillLimit, FillStop, I2sConfig, I2sController, I2sState};

fn fast_config() -> I2sConfig {
    I2sConfig {
        resync_interval: Duration::ZERO,
        ..I2sConfig::default()
    }
}

#[test]
fn setup_leaves_block_configured_and_transmitting() {
    let window = MockPcmWindow::new();
    let mut i2s = I2sController::new(&window, RecordingDelay::new(), fast_config());
    i2s.setup().unwrap();

    let run_bits = CS_STBY | CS_SYNC | CS_EN | CS_TXON;
    assert_eq!(window.control() & run_bits, run_bits);
    assert_eq!(window.peek(TXC_A).unwrap(), TXC_TWO_CHANNELS_16BIT);
    assert_eq!(window.peek(MODE_A).unwrap(), MODE_FRAME_32);
    assert_eq!(i2s.state(), I2sState::Transmitting);
}

#[test]
fn transmitted_words_are_all_the_test_pattern() {
    let window = MockPcmWindow::new().refill_on_sync_toggle(5);
    let mut i2s = I2sController::new(&window, RecordingDelay::new(), fast_config());
    i2s.setup().unwrap();
    i2s.run(&CancelToken::new(), FillLimit::unbounded(), Some(3))
        .unwrap();

    let words = window.fifo_words();
    assert_eq!(words.len(), 15);
    assert!(words.iter().all(|&w| w == platform::config::TEST_PATTERN));
}

#[test]
fn cancel_from_another_thread_stops_the_loop() {
    let cancel = CancelToken::new();
    let remote = cancel.clone();
    let handle = std::thread::spawn(move || {
        let window = MockPcmWindow::new().refill_on_sync_toggle(2);
        let mut i2s = I2sController::new(&window, RecordingDelay::new(), fast_config());
        i2s.setup().unwrap();
        i2s.run(&cancel, FillLimit::unbounded(), None).unwrap()
    });
    std::thread::sleep(Duration::from_millis(20));
    remote.cancel();
    let summary = handle.join().unwrap();
    // A cancel landing mid-fill leaves that partial cycle uncounted.
    assert!(summary.fill_count >= summary.cycles * 2);
    assert!(summary.fill_count <= (summary.cycles + 1) * 2);
}

proptest::proptest! {
    /// After k resyncs SYNC reads (k + 1) mod 2: setup leaves it at 1,
    /// so the sequence is 0, 1, 0, 1, ...
    #[test]
    fn sync_alternates_across_resyncs(resyncs in 1usize..40) {
        let window = MockPcmWindow::new();
        let mut i2s = I2sController::new(&window, RecordingDelay::new(), fast_config());
        i2s.setup().unwrap();

        for k in 1..=resyncs {
            i2s.resync().unwrap();
            let sync = u32::from(window.control() & CS_SYNC != 0);
            assert_eq!(sync, u32::try_from((k + 1) % 2).unwrap(), "after resync {k}");
            assert_eq!(window.control() & CS_EN, CS_EN);
        }
    }

    /// fill_count grows by exactly the number of FIFO writes and never drops.
    #[test]
    fn fill_count_is_monotonic(budgets in proptest::collection::vec(0u64..32, 1..12)) {
        let window = MockPcmWindow::new().refill_on_sync_toggle(16);
        let mut i2s = I2sController::new(&window, RecordingDelay::new(), fast_config());
        i2s.setup().unwrap();

        let mut previous = i2s.fill_count();
        for budget in budgets {
            let outcome = i2s
                .fill_fifo(&CancelToken::new(), FillLimit::unbounded().with_max_writes(budget))
                .unwrap();
            assert_eq!(outcome.written, budget.min(16));
            assert!(outcome.stop == FillStop::BudgetExhausted || outcome.stop == FillStop::FifoFull);
            assert_eq!(i2s.fill_count(), previous + outcome.written);
            assert!(i2s.fill_count() >= previous);
            previous = i2s.fill_count();
            i2s.resync().unwrap();
        }
        assert_eq!(u64::try_from(window.fifo_words().len()).unwrap(), i2s.fill_count());
    }
}
