//! NES mappers for PRG/CHR memory mapping.

/// Nametable mirroring mode for PPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    /// $2000/$2400 share a bank, as do $2800/$2C00 (vertical scrolling games).
    Horizontal,
    /// $2000/$2800 share a bank, as do $2400/$2C00 (horizontal scrolling games).
    Vertical,
    /// Four independent nametables; the extra 2 KiB lives on the cartridge.
    FourScreen,
}

pub mod mapper;

pub mod mapper0;
