//! User-space peripheral access layer for BCM283x boards
//!
//! This crate maps peripheral register blocks out of `/dev/mem` and drives
//! them directly, without any kernel driver in between.
//!
//! # Architecture Layers
//!
//! ```text
//! Orchestrator (bringup crate)
//!         ↓
//! Peripheral drivers (gpio, i2s)
//!         ↓
//! Register windows (mmio::RegisterWindow)
//!         ↓
//! Physical memory mapping (mapper, /dev/mem + mmap)
//! ```
//!
//! # Modules
//!
//! - [`mapper`] - `/dev/mem` access, page-aligned fixed mappings
//! - [`mmio`] - volatile, bounds-checked word access
//! - [`gpio`] - function select (input, output, alternate functions)
//! - [`i2s`] - PCM/I2S bring-up state machine and FIFO feed loop
//! - [`config`] - board presets and peripheral offsets
//! - [`delay`] - settle-time delays for the I2S sequence
//! - [`cancel`] - cancellation for the polling loops
//!
//! # Features
//!
//! - `mocks`: export register-window test doubles for downstream tests
//!
//! # Example
//!
//! ```no_run
//! use platform::{config, gpio::GpioConfigurator, mapper::DevMem};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mem = DevMem::open(DevMem::DEFAULT_PATH)?;
//! let base = config::Board::Bcm2709.peripheral_base();
//! let gpio = mem.open_peripheral(base + config::GPIO_OFFSET, config::BLOCK_SIZE)?;
//! GpioConfigurator::new(&gpio).configure_alt_function(&[18, 19, 20, 21], 0)?;
//! # Ok(())
//! # }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors — callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod cancel;
pub mod config;
pub mod delay;
pub mod gpio;
pub mod i2s;
pub mod mapper;
pub mod mmio;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use cancel::CancelToken;
pub use gpio::{AltFunction, GpioConfigurator, GpioError, GpioPin, PinFunction};
pub use i2s::{
    FifoClear, FillLimit, FillOutcome, FillStop, I2sConfig, I2sController, I2sError, I2sState,
    RunSummary, SetupReport,
};
pub use mapper::{DevMem, MapError, MappedRegion};
pub use mmio::{RegisterWindow, WindowError};
