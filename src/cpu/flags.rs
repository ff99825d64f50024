//! Processor status register (P) bit masks.
//!
//! Bit 5 has no latch on the 2A03 and always reads back as 1. Bit 4 (break) only
//! exists in the copy of P pushed to the stack by BRK/PHP.

pub const FLAG_CARRY: u8 = 1 << 0;
pub const FLAG_ZERO: u8 = 1 << 1;
pub const FLAG_INTERRUPT_DISABLE: u8 = 1 << 2;
pub const FLAG_DECIMAL: u8 = 1 << 3; // settable, but ADC/SBC ignore it on the 2A03
pub const FLAG_BREAK: u8 = 1 << 4;
pub const FLAG_UNUSED: u8 = 1 << 5;
pub const FLAG_OVERFLOW: u8 = 1 << 6;
pub const FLAG_NEGATIVE: u8 = 1 << 7;

/// Status value right after power-on/reset: interrupts masked, bit 5 high.
pub const STATUS_AT_RESET: u8 = FLAG_INTERRUPT_DISABLE | FLAG_UNUSED;
