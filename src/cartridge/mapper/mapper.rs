//! Mapper trait: PRG/CHR memory access and mirroring.

use crate::cartridge::mapper::Mirroring;

/// What the core sees of a cartridge board: two read functions plus the mirroring mode.
pub trait Mapper {
    /// CPU read from PRG space ($4020–$FFFF).
    fn read_program(&self, addr: u16) -> u8;
    /// PPU read from the pattern tables ($0000–$1FFF).
    fn read_tiles(&self, addr: u16) -> u8;
    /// PPU write to the pattern tables; ignored unless the board carries CHR RAM.
    fn write_tiles(&mut self, addr: u16, data: u8);
    /// Current nametable mirroring for the PPU.
    fn mirroring(&self) -> Mirroring;
}
