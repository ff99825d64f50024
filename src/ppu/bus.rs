//! PPU-side address decoding.
//!
//! See [PPU memory map](https://www.nesdev.org/wiki/PPU_memory_map):
//! $0000–$1FFF pattern tables (cartridge), $2000–$3EFF nametables (console VRAM, laid
//! out by the cartridge's mirroring), $3F00–$3FFF palette RAM.

use crate::cartridge::{cartridge::Cartridge, mapper::Mirroring};

const NAMETABLE_LEN: usize = 0x400;

/// Memory the PPU owns: nametable RAM and palette RAM.
///
/// The console has 2 KiB of nametable RAM; the second 2 KiB is only reachable
/// with four-screen boards, which carry it on the cartridge.
pub struct Vram {
    pub nametables: [u8; 4 * NAMETABLE_LEN],
    /// Palette RAM $3F00-$3F1F; entries hold 6-bit colour indices.
    pub palette: [u8; 32],
}

impl Vram {
    pub fn new() -> Self {
        Self {
            nametables: [0; 4 * NAMETABLE_LEN],
            palette: [0; 32],
        }
    }
}

impl Default for Vram {
    fn default() -> Self {
        Self::new()
    }
}

/// The PPU's view of its address space for the duration of one access or tick.
pub struct PpuBus<'a> {
    cart: &'a mut Cartridge,
    vram: &'a mut Vram,
}

impl<'a> PpuBus<'a> {
    pub fn new(cart: &'a mut Cartridge, vram: &'a mut Vram) -> Self {
        Self { cart, vram }
    }

    pub fn read(&self, addr: u16) -> u8 {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => self.cart.read_tiles(addr),
            0x2000..=0x3EFF => {
                self.vram.nametables[nametable_index(addr, self.cart.mirroring())]
            }
            _ => self.vram.palette[palette_index(addr)],
        }
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => self.cart.write_tiles(addr, data),
            0x2000..=0x3EFF => {
                let index = nametable_index(addr, self.cart.mirroring());
                self.vram.nametables[index] = data;
            }
            // Only 6 bits per entry are wired.
            _ => self.vram.palette[palette_index(addr)] = data & 0x3F,
        }
    }
}

/// Map a nametable address ($2000–$3EFF) to an offset into [`Vram::nametables`].
pub fn nametable_index(addr: u16, mirroring: Mirroring) -> usize {
    let addr = (addr as usize - 0x2000) & 0x0FFF;
    let table = addr / NAMETABLE_LEN;
    let offset = addr % NAMETABLE_LEN;

    let bank = match mirroring {
        Mirroring::Horizontal => table / 2,
        Mirroring::Vertical => table % 2,
        Mirroring::FourScreen => table,
    };

    bank * NAMETABLE_LEN + offset
}

/// Resolve a palette address ($3F00–$3FFF) to its 32-byte RAM index.
/// $3F10, $3F14, $3F18 and $3F1C are the backdrop entries of the sprite palettes
/// and alias $3F00, $3F04, $3F08 and $3F0C.
pub fn palette_index(addr: u16) -> usize {
    let i = (addr & 0x1F) as usize;
    match i {
        0x10 | 0x14 | 0x18 | 0x1C => i - 0x10,
        _ => i,
    }
}
