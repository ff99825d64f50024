//! PPU (Picture Processing Unit) emulation for the NES.
//!
//! See [PPU](https://www.nesdev.org/wiki/PPU), [PPU registers](https://www.nesdev.org/wiki/PPU_registers),
//! [PPU rendering](https://www.nesdev.org/wiki/PPU_rendering). The engine runs one dot per tick over
//! 341-dot scanlines and 262-scanline frames, raises the VBlank NMI, and emits one colour index per
//! visible dot to a [`crate::nes::Screen`].

pub mod bus;
pub mod ppu;
pub mod vram_addr;

#[cfg(test)]
mod tests;
