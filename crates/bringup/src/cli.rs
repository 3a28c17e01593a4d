//! Command-line interface

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use platform::config::{Board, DEV_MEM_PATH};
use platform::FifoClear;

use crate::config::BringupConfig;

/// SoC family preset for the peripheral base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BoardArg {
    /// Pi 1, Pi Zero (0x2000_0000)
    Bcm2708,
    /// Pi 2, Pi 3, Pi Zero 2 (0x3F00_0000)
    Bcm2709,
    /// Pi 4 (0xFE00_0000)
    Bcm2711,
}

impl From<BoardArg> for Board {
    fn from(board: BoardArg) -> Self {
        match board {
            BoardArg::Bcm2708 => Board::Bcm2708,
            BoardArg::Bcm2709 => Board::Bcm2709,
            BoardArg::Bcm2711 => Board::Bcm2711,
        }
    }
}

/// FIFO clear pattern written during setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FifoClearArg {
    /// TXCLR | RXCLR (0x18)
    Literal,
    /// TXCLR | RXCLR | 11 << 5 (0x178)
    WithThresholds,
}

impl From<FifoClearArg> for FifoClear {
    fn from(arg: FifoClearArg) -> Self {
        match arg {
            FifoClearArg::Literal => FifoClear::Literal,
            FifoClearArg::WithThresholds => FifoClear::WithThresholds,
        }
    }
}

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "bringup")]
#[command(about = "Route the PCM pins and stream a test pattern into the BCM283x I2S FIFO", long_about = None)]
#[command(version)]
pub struct Cli {
    /// SoC family (selects the peripheral base)
    #[arg(long, value_enum, default_value = "bcm2708")]
    pub board: BoardArg,

    /// Explicit physical peripheral base, overrides --board (hex with 0x prefix or decimal)
    #[arg(long, value_parser = parse_u64)]
    pub peripheral_base: Option<u64>,

    /// Physical-memory device
    #[arg(long, default_value = DEV_MEM_PATH)]
    pub device: PathBuf,

    /// Pins routed to the PCM block
    #[arg(long, value_delimiter = ',', default_values_t = [18u8, 19, 20, 21])]
    pub pins: Vec<u8>,

    /// Alternate function for --pins (0-5)
    #[arg(long, default_value_t = 0)]
    pub alt: u8,

    /// Word written into the TX FIFO (hex with 0x prefix or decimal)
    #[arg(long, value_parser = parse_u32, default_value = "0xAAAAAAAA")]
    pub pattern: u32,

    /// FIFO clear pattern
    #[arg(long, value_enum, default_value = "literal")]
    pub fifo_clear: FifoClearArg,

    /// Pause after each resync, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub resync_interval_ms: u64,

    /// Stop after this many transmit cycles (default: run until killed)
    #[arg(long)]
    pub cycles: Option<u64>,

    /// Cap on FIFO writes per fill phase
    #[arg(long)]
    pub fill_budget: Option<u64>,

    /// Log at debug level (per-write fill counter)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve flags into a [`BringupConfig`].
    pub fn config(&self) -> BringupConfig {
        BringupConfig {
            device: self.device.clone(),
            peripheral_base: self
                .peripheral_base
                .unwrap_or_else(|| Board::from(self.board).peripheral_base()),
            pins: self.pins.clone(),
            alt: self.alt,
            pattern: self.pattern,
            fifo_clear: self.fifo_clear.into(),
            resync_interval: Duration::from_millis(self.resync_interval_ms),
            cycles: self.cycles,
            fill_budget: self.fill_budget,
        }
    }
}

fn parse_u64(s: &str) -> Result<u64, String> {
    let s = s.trim().replace('_', "");
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number {s:?}: {e}"))
}

fn parse_u32(s: &str) -> Result<u32, String> {
    let value = parse_u64(s)?;
    u32::try_from(value).map_err(|_| format!("{value:#x} does not fit in 32 bits"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("bringup").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn no_flags_gives_default_config() {
        assert_eq!(parse(&[]).config(), BringupConfig::default());
    }

    #[test]
    fn board_selects_peripheral_base() {
        assert_eq!(parse(&["--board", "bcm2709"]).config().peripheral_base, 0x3F00_0000);
        assert_eq!(parse(&["--board", "bcm2711"]).config().peripheral_base, 0xFE00_0000);
    }

    #[test]
    fn explicit_base_overrides_board() {
        let config = parse(&["--board", "bcm2711", "--peripheral-base", "0x3f000000"]).config();
        assert_eq!(config.peripheral_base, 0x3F00_0000);
    }

    #[test]
    fn pins_and_pattern_parse() {
        let config = parse(&["--pins", "4,5", "--alt", "2", "--pattern", "0x0000_ffff"]).config();
        assert_eq!(config.pins, vec![4, 5]);
        assert_eq!(config.alt, 2);
        assert_eq!(config.pattern, 0xFFFF);
    }

    #[test]
    fn loop_bounds_parse() {
        let config = parse(&[
            "--cycles",
            "3",
            "--fill-budget",
            "128",
            "--resync-interval-ms",
            "10",
            "--fifo-clear",
            "with-thresholds",
        ])
        .config();
        assert_eq!(config.cycles, Some(3));
        assert_eq!(config.fill_budget, Some(128));
        assert_eq!(config.resync_interval, Duration::from_millis(10));
        assert_eq!(config.fifo_clear, FifoClear::WithThresholds);
    }

    #[test]
    fn pattern_wider_than_32_bits_is_rejected() {
        assert!(Cli::try_parse_from(["bringup", "--pattern", "0x1_0000_0000"]).is_err());
        assert!(parse_u32("nope").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
