//! BCM283x PCM/I2S register map
//!
//! Source: BCM2835 ARM Peripherals, §8 "PCM / I2S Audio".
//!
//! # Key Constraints
//!
//! ## Word indices, not byte offsets
//! Everything here is indexed in 32-bit words from the PCM block base
//! (physical peripheral base + 0x20_3000). CS_A at byte 0x00 is index 0,
//! TXC_A at byte 0x10 is index 4.
//!
//! ## Configure while disabled
//! MODE_A and TXC_A may only be changed with CS_A.EN clear. The bring-up
//! sequence writes CS_A = 0 first for that reason.
//!
//! ## Read-only status bits
//! TXD (bit 19) is driven by the FIFO: set while the TX FIFO can accept at
//! least one more word. Software writes to it are ignored. Read-modify-write of
//! CS_A therefore writes back whatever TXD read as, harmlessly.
//!
//! ## SYNC is a round trip
//! SYNC (bit 24) reads back the written value only after two PCM clocks. It is
//! used here purely as a "clock is running" probe.

// ---------------------------------------------------------------------------
// Register indices
// ---------------------------------------------------------------------------

/// Control and status
pub const CS_A: usize = 0;

/// FIFO data (write: TX FIFO, read: RX FIFO)
pub const FIFO_A: usize = 1;

/// Mode: frame length, frame sync length, clock/frame polarity
pub const MODE_A: usize = 2;

/// Receive channel configuration
pub const RXC_A: usize = 3;

/// Transmit channel configuration
pub const TXC_A: usize = 4;

/// DMA request levels
pub const DREQ_A: usize = 5;

/// Interrupt enables
pub const INTEN_A: usize = 6;

/// Interrupt status and clear
pub const INTSTC_A: usize = 7;

/// Gray-code mode control
pub const GRAY: usize = 8;

/// Number of registers in the block (CS_A .. GRAY).
pub const REGISTER_COUNT: usize = 9;

// ---------------------------------------------------------------------------
// CS_A bits
// ---------------------------------------------------------------------------

/// PCM interface enable
pub const CS_EN: u32 = 1 << 0;

/// Receive enable
pub const CS_RXON: u32 = 1 << 1;

/// Transmit enable
pub const CS_TXON: u32 = 1 << 2;

/// Clear TX FIFO (self-clearing)
pub const CS_TXCLR: u32 = 1 << 3;

/// Clear RX FIFO (self-clearing)
pub const CS_RXCLR: u32 = 1 << 4;

/// TX FIFO threshold field, bits \[6:5\]
pub const CS_TXTHR_SHIFT: u32 = 5;

/// TX FIFO can accept data (read-only)
pub const CS_TXD: u32 = 1 << 19;

/// PCM clock sync helper
pub const CS_SYNC: u32 = 1 << 24;

/// RAM standby disable
pub const CS_STBY: u32 = 1 << 25;

// ---------------------------------------------------------------------------
// MODE_A
// ---------------------------------------------------------------------------

/// Frame length field shift, bits \[19:10\] (value = length - 1)
pub const MODE_FLEN_SHIFT: u32 = 10;

/// 32-bit frame: FLEN = 31.
pub const MODE_FRAME_32: u32 = 31 << MODE_FLEN_SHIFT;

// ---------------------------------------------------------------------------
// TXC_A
// ---------------------------------------------------------------------------

/// Channel 1 enable
pub const TXC_CH1EN: u32 = 1 << 30;

/// Channel 1 width field shift, bits \[19:16\] (value = width - 8)
pub const TXC_CH1WID_SHIFT: u32 = 16;

/// Channel 2 enable
pub const TXC_CH2EN: u32 = 1 << 14;

/// Channel 2 position field shift, bits \[13:4\]
pub const TXC_CH2POS_SHIFT: u32 = 4;

/// Channel 2 width field shift, bits \[3:0\] (value = width - 8)
pub const TXC_CH2WID_SHIFT: u32 = 0;

/// Both channels enabled, 16 bits each; channel 1 at bit 0, channel 2 at bit 16.
///
/// `1<<30 | 8<<16 | 1<<14 | 16<<4 | 8<<0` = `0x4008_4108`.
pub const TXC_TWO_CHANNELS_16BIT: u32 = TXC_CH1EN
    | (8 << TXC_CH1WID_SHIFT)
    | TXC_CH2EN
    | (16 << TXC_CH2POS_SHIFT)
    | (8 << TXC_CH2WID_SHIFT);

// ---------------------------------------------------------------------------
// FIFO clear patterns
// ---------------------------------------------------------------------------

/// What the historical bring-up code actually wrote: `1<<3 | 1<<4 | 11<5`.
///
/// `11<5` is a comparison (false, 0), so only TXCLR and RXCLR end up set.
pub const FIFO_CLEAR_LITERAL: u32 = CS_TXCLR | CS_RXCLR;

/// The same expression read as `11<<5`: TXCLR, RXCLR and `0b1011` placed at
/// the TXTHR field, which also spills into RXTHR bits \[8:7\].
///
/// Assumed intent only; never observed on hardware.
pub const FIFO_CLEAR_WITH_THRESHOLDS: u32 = CS_TXCLR | CS_RXCLR | (11 << CS_TXTHR_SHIFT);
