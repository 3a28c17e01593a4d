//! GPIO function select for the BCM283x GPIO block
//!
//! Each pin owns a 3-bit field in the GPFSEL registers: pin `p` lives in word
//! `p / 10` at bit offset `(p % 10) * 3`. Field codes are not linear in the
//! alternate-function number:
//!
//! | Function | Code  |
//! |----------|-------|
//! | Input    | 0b000 |
//! | Output   | 0b001 |
//! | ALT0     | 0b100 |
//! | ALT1     | 0b101 |
//! | ALT2     | 0b110 |
//! | ALT3     | 0b111 |
//! | ALT4     | 0b011 |
//! | ALT5     | 0b010 |
//!
//! Selecting output or an alternate function ORs the code into the field, so
//! the pin must be switched to input first.

use thiserror::Error;

use crate::mmio::{RegisterWindow, WindowError};

/// Number of GPIO pins on the BCM283x.
pub const PIN_COUNT: u8 = 54;

/// Pins per GPFSEL word.
const PINS_PER_FSEL: u8 = 10;

/// Width of one function field in bits.
const FSEL_FIELD_BITS: u8 = 3;

/// Mask of one function field (before shifting).
const FSEL_FIELD_MASK: u32 = 0b111;

/// Output-enable code.
const FSEL_OUTPUT: u32 = 0b001;

/// GPSET0: write-one-to-set output level for pins 0–31.
pub const GPSET0: usize = 7;

/// GPCLR0: write-one-to-clear output level for pins 0–31.
pub const GPCLR0: usize = 10;

/// GPIO configuration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GpioError {
    /// Pin number outside 0–53.
    #[error("invalid GPIO pin {0} (valid: 0..=53)")]
    InvalidPin(u8),
    /// Alternate function outside 0–5.
    #[error("invalid alternate function {0} (valid: 0..=5)")]
    InvalidFunction(u8),
    /// Register access failed.
    #[error(transparent)]
    Window(#[from] WindowError),
}

/// A validated GPIO pin number (0–53).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct GpioPin(u8);

impl GpioPin {
    /// Validate a pin number.
    pub fn new(pin: u8) -> Result<Self, GpioError> {
        if pin < PIN_COUNT {
            Ok(Self(pin))
        } else {
            Err(GpioError::InvalidPin(pin))
        }
    }

    /// Raw pin number.
    pub fn get(self) -> u8 {
        self.0
    }

    /// GPFSEL word index holding this pin's field.
    pub fn fsel_word(self) -> usize {
        usize::from(self.0 / PINS_PER_FSEL)
    }

    /// Bit offset of this pin's field within its GPFSEL word.
    #[allow(clippy::arithmetic_side_effects)] // (p % 10) * 3 <= 27
    pub fn fsel_shift(self) -> u32 {
        u32::from((self.0 % PINS_PER_FSEL) * FSEL_FIELD_BITS)
    }

    /// Field mask, already shifted into position.
    pub fn fsel_mask(self) -> u32 {
        FSEL_FIELD_MASK << self.fsel_shift()
    }
}

impl TryFrom<u8> for GpioPin {
    type Error = GpioError;

    fn try_from(pin: u8) -> Result<Self, Self::Error> {
        Self::new(pin)
    }
}

/// Alternate pin function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AltFunction {
    /// ALT0 (PCM on pins 18–21)
    Alt0,
    /// ALT1
    Alt1,
    /// ALT2
    Alt2,
    /// ALT3
    Alt3,
    /// ALT4
    Alt4,
    /// ALT5
    Alt5,
}

impl AltFunction {
    /// Hardware field code: `alt + 4` for ALT0–3, then 3 for ALT4 and 2 for ALT5.
    pub const fn code(self) -> u32 {
        match self {
            Self::Alt0 => 4,
            Self::Alt1 => 5,
            Self::Alt2 => 6,
            Self::Alt3 => 7,
            Self::Alt4 => 3,
            Self::Alt5 => 2,
        }
    }

    /// Alternate-function number (0–5).
    pub const fn number(self) -> u8 {
        match self {
            Self::Alt0 => 0,
            Self::Alt1 => 1,
            Self::Alt2 => 2,
            Self::Alt3 => 3,
            Self::Alt4 => 4,
            Self::Alt5 => 5,
        }
    }
}

impl TryFrom<u8> for AltFunction {
    type Error = GpioError;

    fn try_from(alt: u8) -> Result<Self, Self::Error> {
        match alt {
            0 => Ok(Self::Alt0),
            1 => Ok(Self::Alt1),
            2 => Ok(Self::Alt2),
            3 => Ok(Self::Alt3),
            4 => Ok(Self::Alt4),
            5 => Ok(Self::Alt5),
            other => Err(GpioError::InvalidFunction(other)),
        }
    }
}

/// Decoded contents of a pin's function field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinFunction {
    /// 0b000
    Input,
    /// 0b001
    Output,
    /// Any alternate function
    Alt(AltFunction),
}

impl PinFunction {
    /// Decode a 3-bit field value. Every code is meaningful.
    pub const fn from_code(code: u32) -> Self {
        match code & FSEL_FIELD_MASK {
            0 => Self::Input,
            1 => Self::Output,
            2 => Self::Alt(AltFunction::Alt5),
            3 => Self::Alt(AltFunction::Alt4),
            4 => Self::Alt(AltFunction::Alt0),
            5 => Self::Alt(AltFunction::Alt1),
            6 => Self::Alt(AltFunction::Alt2),
            _ => Self::Alt(AltFunction::Alt3),
        }
    }
}

/// Function-select driver over a mapped GPIO block.
pub struct GpioConfigurator<'w, W: RegisterWindow + ?Sized> {
    window: &'w W,
}

impl<'w, W: RegisterWindow + ?Sized> GpioConfigurator<'w, W> {
    /// Borrow a GPIO register window.
    pub fn new(window: &'w W) -> Self {
        Self { window }
    }

    /// Clear the pin's function field, making it an input.
    pub fn set_input(&self, pin: u8) -> Result<(), GpioError> {
        let pin = GpioPin::new(pin)?;
        self.window
            .modify(pin.fsel_word(), |word| word & !pin.fsel_mask())?;
        tracing::debug!("GPIO{} -> input", pin.get());
        Ok(())
    }

    /// OR the alternate-function code into the pin's field.
    ///
    /// Call [`set_input`](Self::set_input) first: stale bits in the field are
    /// kept, which yields a different function.
    pub fn set_alt_function(&self, pin: u8, alt: u8) -> Result<(), GpioError> {
        let pin = GpioPin::new(pin)?;
        let alt = AltFunction::try_from(alt)?;
        self.window.modify(pin.fsel_word(), |word| {
            word | (alt.code() << pin.fsel_shift())
        })?;
        tracing::debug!("GPIO{} -> ALT{}", pin.get(), alt.number());
        Ok(())
    }

    /// OR the output code into the pin's field. Call [`set_input`](Self::set_input) first.
    pub fn set_output(&self, pin: u8) -> Result<(), GpioError> {
        let pin = GpioPin::new(pin)?;
        self.window
            .modify(pin.fsel_word(), |word| word | (FSEL_OUTPUT << pin.fsel_shift()))?;
        tracing::debug!("GPIO{} -> output", pin.get());
        Ok(())
    }

    /// Input, then the given alternate function, for every pin in `pins`.
    ///
    /// Both arguments are validated before any register is touched.
    pub fn configure_alt_function(&self, pins: &[u8], alt: u8) -> Result<(), GpioError> {
        AltFunction::try_from(alt)?;
        for &pin in pins {
            GpioPin::new(pin)?;
        }
        for &pin in pins {
            self.set_input(pin)?;
            self.set_alt_function(pin, alt)?;
        }
        Ok(())
    }

    /// Read back a pin's current function.
    pub fn function_of(&self, pin: u8) -> Result<PinFunction, GpioError> {
        let pin = GpioPin::new(pin)?;
        let word = self.window.read(pin.fsel_word())?;
        Ok(PinFunction::from_code(word >> pin.fsel_shift()))
    }

    /// Drive the output pins selected by `mask` (pins 0–31) high.
    pub fn set_pins(&self, mask: u32) -> Result<(), GpioError> {
        self.window.write(GPSET0, mask)?;
        Ok(())
    }

    /// Drive the output pins selected by `mask` (pins 0–31) low.
    pub fn clear_pins(&self, mask: u32) -> Result<(), GpioError> {
        self.window.write(GPCLR0, mask)?;
        Ok(())
    }
}
