//! Settle-time delays
//!
//! The I2S sequence only needs "at least this long" sleeps, so any
//! [`embedded_hal::delay::DelayNs`] works. [`StdDelay`] parks the calling
//! thread; tests use `mocks::RecordingDelay` to run without sleeping.

use std::time::Duration;

use embedded_hal::delay::DelayNs;

/// Thread-sleep backed delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl StdDelay {
    /// Create a delay source.
    pub fn new() -> Self {
        Self
    }
}

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(u64::from(us)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// Sleep for `duration` through a [`DelayNs`], saturating at `u32::MAX` ms.
pub fn delay_for<D: DelayNs + ?Sized>(delay: &mut D, duration: Duration) {
    let ms = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
    let rest_us = duration.subsec_micros() % 1_000;
    delay.delay_ms(ms);
    if rest_us > 0 {
        delay.delay_us(rest_us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::RecordingDelay;
    use std::time::Instant;

    #[test]
    fn std_delay_sleeps_at_least_requested_time() {
        let start = Instant::now();
        StdDelay::new().delay_ms(5);
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn delay_for_splits_millis_and_micros() {
        let mut delay = RecordingDelay::new();
        delay_for(&mut delay, Duration::from_micros(2_500));
        assert_eq!(
            delay.calls(),
            &[Duration::from_millis(2), Duration::from_micros(500)]
        );
    }

    #[test]
    fn delay_for_whole_millis_skips_micros() {
        let mut delay = RecordingDelay::new();
        delay_for(&mut delay, Duration::from_secs(1));
        assert_eq!(delay.calls(), &[Duration::from_millis(1_000)]);
    }

    #[test]
    fn delay_for_sleeps_at_least_requested_time() {
        let start = Instant::now();
        delay_for(&mut StdDelay, Duration::from_micros(2_500));
        assert!(start.elapsed() >= Duration::from_micros(2_500));
    }
}
