//! BCM283x PCM/I2S bring-up
//!
//! Maps the GPIO and PCM register blocks from `/dev/mem`, routes the PCM pins
//! to their alternate function and keeps the I2S transmit FIFO fed with a
//! fixed test pattern so the bit clock, frame sync and data lines can be
//! probed.
//!
//! - [`config`] - resolved run configuration and its defaults
//! - [`cli`] - `clap` front end producing a [`config::BringupConfig`]
//! - [`orchestrator`] - acquisition of both mappings and the bring-up sequence

pub mod cli;
pub mod config;
pub mod orchestrator;

pub use config::BringupConfig;
pub use orchestrator::{bring_up, configure_gpio, run, Peripherals, BRINGUP_SEQUENCE_STEPS};
