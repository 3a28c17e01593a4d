//! Bring-up sequence for the PCM/I2S test transmitter.
//!
//! Initialization order (MUST be respected):
//!   1. Open the physical-memory device and map GPIO + PCM blocks
//!   2. Route the PCM pins: input first, then the alternate function
//!   3. Dump the GPIO function-select words
//!   4. Run the I2S bring-up sequence (PCM block disabled while configured)
//!   5. Enter the transmit loop
//!
//! Both mappings live in [`Peripherals`] for the whole run and are released
//! together when it drops. The GPIO configurator and the I2S controller only
//! borrow them.

use anyhow::{Context, Result};
use embedded_hal::delay::DelayNs;
use platform::config::BLOCK_SIZE;
use platform::delay::StdDelay;
use platform::mmio::{self, RegisterWindow};
use platform::{CancelToken, DevMem, GpioConfigurator, I2sController, MappedRegion, RunSummary};

use crate::config::{BringupConfig, GPIO_DUMP_WORDS};

/// Ordered list of bring-up steps, as logged at startup.
///
/// # Correctness Invariants
///
/// - Pins are switched to input before the alternate function is OR'd in;
///   otherwise stale function bits survive and select a different function.
/// - TXC_A and MODE_A are written while CS_A.EN is clear.
/// - TXON is set last, after EN.
pub const BRINGUP_SEQUENCE_STEPS: &[&str] = &[
    "1. Map: open the physical-memory device, map GPIO and PCM blocks",
    "2. GPIO: PCM pins to input, then to their alternate function",
    "3. GPIO: dump function-select registers",
    "4. I2S: disable, clear FIFOs, configure TXC/MODE, standby off, sync, enable, TX on",
    "5. I2S: fill FIFO, resync, pause, dump; repeat",
];

/// The two mapped peripheral blocks, acquired once per run.
#[derive(Debug)]
pub struct Peripherals {
    mem: DevMem,
    gpio: MappedRegion,
    i2s: MappedRegion,
}

impl Peripherals {
    /// Open the device and map both blocks. Any failure here is fatal.
    pub fn acquire(config: &BringupConfig) -> Result<Self> {
        tracing::info!("setup io");
        let mem = DevMem::open(&config.device)
            .with_context(|| format!("can't open {}", config.device.display()))?;

        let gpio_base = config
            .gpio_base()
            .context("GPIO base overflows the physical address space")?;
        let i2s_base = config
            .i2s_base()
            .context("PCM base overflows the physical address space")?;

        let gpio = mem
            .open_peripheral(gpio_base, BLOCK_SIZE)
            .with_context(|| format!("mapping GPIO block at {gpio_base:#010x}"))?;
        let i2s = mem
            .open_peripheral(i2s_base, BLOCK_SIZE)
            .with_context(|| format!("mapping PCM block at {i2s_base:#010x}"))?;

        Ok(Self { mem, gpio, i2s })
    }

    /// Device the blocks were mapped from.
    pub fn device(&self) -> &DevMem {
        &self.mem
    }

    /// GPIO register window.
    pub fn gpio(&self) -> &MappedRegion {
        &self.gpio
    }

    /// PCM/I2S register window.
    pub fn i2s(&self) -> &MappedRegion {
        &self.i2s
    }
}

/// Route `config.pins` to `config.alt`, then dump the first GPIO words.
pub fn configure_gpio<W: RegisterWindow + ?Sized>(gpio: &W, config: &BringupConfig) -> Result<()> {
    tracing::info!("Setting GPIO regs to alt{}", config.alt);
    GpioConfigurator::new(gpio)
        .configure_alt_function(&config.pins, config.alt)
        .context("configuring PCM pins")?;
    let dump_words = GPIO_DUMP_WORDS.min(gpio.words());
    mmio::dump(gpio, "GPIO", dump_words).context("dumping GPIO registers")?;
    Ok(())
}

/// Steps 2–5 over already-mapped windows.
///
/// Returns only when `cancel` fires or `config.cycles` transmit cycles have
/// completed.
pub fn bring_up<G, I, D>(
    gpio: &G,
    i2s: &I,
    delay: D,
    config: &BringupConfig,
    cancel: &CancelToken,
) -> Result<RunSummary>
where
    G: RegisterWindow + ?Sized,
    I: RegisterWindow + ?Sized,
    D: DelayNs,
{
    configure_gpio(gpio, config)?;

    let mut controller = I2sController::new(i2s, delay, config.i2s_config());
    let report = controller.setup().context("I2S bring-up sequence")?;
    tracing::debug!("I2S setup report: {report:?}");

    let summary = controller
        .run(cancel, config.fill_limit(), config.cycles)
        .context("I2S transmit loop")?;
    Ok(summary)
}

/// Full bring-up against the physical-memory device named in `config`.
pub fn run(config: &BringupConfig, cancel: &CancelToken) -> Result<RunSummary> {
    for step in BRINGUP_SEQUENCE_STEPS {
        tracing::debug!("{step}");
    }
    let peripherals = Peripherals::acquire(config)?;
    tracing::info!(
        "GPIO block at {:#x}, PCM block at {:#x} (via {})",
        peripherals.gpio().base_address(),
        peripherals.i2s().base_address(),
        peripherals.device().path().display()
    );
    bring_up(
        peripherals.gpio(),
        peripherals.i2s(),
        StdDelay::new(),
        config,
        cancel,
    )
}
