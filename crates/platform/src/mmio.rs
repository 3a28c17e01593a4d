//! Word-indexed register windows
//!
//! A [`RegisterWindow`] is a run of 32-bit registers reachable from a
//! peripheral's base address. Indices are word indices, not byte offsets:
//! index 4 is the register at byte offset 0x10.
//!
//! Hardware can change register contents at any time (FIFO flags, self-clearing
//! bits), so implementations must never cache a value: every `read` goes to the
//! device and every `write` reaches it before the call returns.

use thiserror::Error;

/// Bytes per register word.
pub const WORD_BYTES: usize = core::mem::size_of::<u32>();

/// Register access outside the mapped block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WindowError {
    /// The word index lies past the end of the window.
    #[error("register index {index} out of bounds (window holds {words} words)")]
    OutOfBounds {
        /// Requested word index.
        index: usize,
        /// Number of words in the window.
        words: usize,
    },
}

/// Volatile, bounds-checked access to a peripheral's registers.
///
/// Methods take `&self`: the registers are shared with the hardware, so a
/// window behaves like a cell rather than like owned memory.
pub trait RegisterWindow {
    /// Number of 32-bit words in the window.
    fn words(&self) -> usize;

    /// Process-visible address of word 0 (used for diagnostics only).
    fn base_address(&self) -> usize;

    /// Volatile read of word `index`.
    fn read(&self, index: usize) -> Result<u32, WindowError>;

    /// Volatile write of word `index`.
    fn write(&self, index: usize, value: u32) -> Result<(), WindowError>;

    /// Read-modify-write of word `index`.
    ///
    /// Not atomic with respect to the hardware: bits the device changes between
    /// the read and the write are overwritten.
    fn modify<F>(&self, index: usize, f: F) -> Result<(), WindowError>
    where
        F: FnOnce(u32) -> u32,
    {
        let value = self.read(index)?;
        self.write(index, f(value))
    }

    /// Address of word `index` as seen by this process.
    fn address_of(&self, index: usize) -> usize {
        self.base_address()
            .wrapping_add(index.wrapping_mul(WORD_BYTES))
    }
}

impl<W: RegisterWindow + ?Sized> RegisterWindow for &W {
    fn words(&self) -> usize {
        (**self).words()
    }

    fn base_address(&self) -> usize {
        (**self).base_address()
    }

    fn read(&self, index: usize) -> Result<u32, WindowError> {
        (**self).read(index)
    }

    fn write(&self, index: usize, value: u32) -> Result<(), WindowError> {
        (**self).write(index, value)
    }
}

/// Validate `index` against a window of `words` words.
pub fn check_index(index: usize, words: usize) -> Result<(), WindowError> {
    if index < words {
        Ok(())
    } else {
        Err(WindowError::OutOfBounds { index, words })
    }
}

/// Read the first `count` words of `window` as `(address, value)` pairs.
pub fn snapshot<W: RegisterWindow + ?Sized>(
    window: &W,
    count: usize,
) -> Result<Vec<(usize, u32)>, WindowError> {
    (0..count)
        .map(|index| Ok((window.address_of(index), window.read(index)?)))
        .collect()
}

/// Log the first `count` words of `window`, one line per register.
pub fn dump<W: RegisterWindow + ?Sized>(
    window: &W,
    label: &str,
    count: usize,
) -> Result<(), WindowError> {
    tracing::info!("{label} memory dump");
    for (address, value) in snapshot(window, count)? {
        tracing::info!("{label} memory address={address:#010x}: {value:#010x}");
    }
    Ok(())
}
