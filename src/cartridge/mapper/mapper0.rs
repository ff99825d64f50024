//! Mapper 0 (NROM): no bank switching, 16/32 KiB PRG, 8 KiB CHR ROM or RAM.

use crate::cartridge::mapper::{Mirroring, mapper::Mapper};

/// NROM mapper: fixed PRG and CHR, 16 KiB PRG mirrored into $C000–$FFFF.
pub struct Mapper0 {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    mirroring: Mirroring,
}

impl Mapper0 {
    pub fn new(prg_rom: Vec<u8>, chr: Vec<u8>, chr_is_ram: bool, mirroring: Mirroring) -> Self {
        Self {
            prg_rom,
            chr,
            chr_is_ram,
            mirroring,
        }
    }
}

impl Mapper for Mapper0 {
    fn read_program(&self, addr: u16) -> u8 {
        match addr {
            0x8000..=0xFFFF if !self.prg_rom.is_empty() => {
                let offset = (addr - 0x8000) as usize;
                self.prg_rom[offset % self.prg_rom.len()]
            }
            // No PRG RAM on NROM boards; $4020–$7FFF is open.
            _ => 0,
        }
    }

    fn read_tiles(&self, addr: u16) -> u8 {
        self.chr
            .get((addr & 0x1FFF) as usize)
            .copied()
            .unwrap_or(0)
    }

    fn write_tiles(&mut self, addr: u16, data: u8) {
        if self.chr_is_ram {
            if let Some(byte) = self.chr.get_mut((addr & 0x1FFF) as usize) {
                *byte = data;
            }
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}
