//! NES cartridge loading from iNES format (.nes files).
//!
//! Implements the [iNES](https://www.nesdev.org/wiki/INES) format: 16-byte header (magic "NES\x1A",
//! PRG size in 16 KiB units, CHR size in 8 KiB units, flags 6–7 for mapper and mirroring), an
//! optional 512-byte trainer, then PRG ROM, then CHR ROM. A CHR size of 0 means the board carries
//! 8 KiB of CHR RAM instead. [NES 2.0](https://www.nesdev.org/wiki/NES_2.0) headers are rejected.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::cartridge::mapper::Mirroring;
use crate::cartridge::mapper::mapper::Mapper;
use crate::cartridge::mapper::mapper0::Mapper0;

const HEADER_LEN: usize = 16;
const TRAINER_LEN: usize = 512;
const PRG_BANK_LEN: usize = 16 * 1024;
const CHR_BANK_LEN: usize = 8 * 1024;
const MAGIC: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A];

const FLAG6_VERTICAL: u8 = 1 << 0;
const FLAG6_TRAINER: u8 = 1 << 2;
const FLAG6_FOUR_SCREEN: u8 = 1 << 3;
const FLAG7_NES2_MASK: u8 = 0x0C;
const FLAG7_NES2: u8 = 0x08;

/// Load-time failures; all of them stop the emulator before it boots.
#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("failed to read cartridge image: {0}")]
    Io(#[from] std::io::Error),

    #[error("not an iNES image (bad header magic)")]
    BadMagic,

    #[error("NES 2.0 headers are not supported")]
    Nes20Unsupported,

    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u8),

    #[error("image truncated: header promises {expected} bytes, file has {actual}")]
    Truncated { expected: usize, actual: usize },
}

/// Cartridge: the mapper that serves PRG to the CPU and CHR + mirroring to the PPU.
pub struct Cartridge {
    mapper: Box<dyn Mapper>,
    pub mapper_id: u8,
    pub prg_banks: u8,
    pub chr_banks: u8,
}

impl Cartridge {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CartridgeError> {
        let data = fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Parse an in-memory iNES image.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_LEN || data[0..4] != MAGIC {
            return Err(CartridgeError::BadMagic);
        }

        let prg_banks = data[4];
        let chr_banks = data[5];
        let flags6 = data[6];
        let flags7 = data[7];

        if flags7 & FLAG7_NES2_MASK == FLAG7_NES2 {
            return Err(CartridgeError::Nes20Unsupported);
        }

        let mapper_id = (flags7 & 0xF0) | (flags6 >> 4);

        let mirroring = if flags6 & FLAG6_FOUR_SCREEN != 0 {
            Mirroring::FourScreen
        } else if flags6 & FLAG6_VERTICAL != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        let prg_start = if flags6 & FLAG6_TRAINER != 0 {
            HEADER_LEN + TRAINER_LEN
        } else {
            HEADER_LEN
        };
        let prg_end = prg_start + prg_banks as usize * PRG_BANK_LEN;
        let chr_end = prg_end + chr_banks as usize * CHR_BANK_LEN;

        if data.len() < chr_end {
            return Err(CartridgeError::Truncated {
                expected: chr_end,
                actual: data.len(),
            });
        }

        let prg_rom = data[prg_start..prg_end].to_vec();
        let (chr, chr_is_ram) = if chr_banks == 0 {
            (vec![0; CHR_BANK_LEN], true)
        } else {
            (data[prg_end..chr_end].to_vec(), false)
        };

        let mapper: Box<dyn Mapper> = match mapper_id {
            0 => Box::new(Mapper0::new(prg_rom, chr, chr_is_ram, mirroring)),
            id => return Err(CartridgeError::UnsupportedMapper(id)),
        };

        tracing::info!(
            mapper = mapper_id,
            prg_kib = prg_banks as usize * 16,
            chr_kib = chr_banks as usize * 8,
            chr_ram = chr_is_ram,
            ?mirroring,
            "cartridge loaded"
        );

        Ok(Self {
            mapper,
            mapper_id,
            prg_banks,
            chr_banks,
        })
    }

    /// CPU read from $4020–$FFFF.
    pub fn read_program(&self, addr: u16) -> u8 {
        self.mapper.read_program(addr)
    }

    /// PPU read from the pattern tables.
    pub fn read_tiles(&self, addr: u16) -> u8 {
        self.mapper.read_tiles(addr)
    }

    pub fn write_tiles(&mut self, addr: u16, data: u8) {
        self.mapper.write_tiles(addr, data);
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mapper.mirroring()
    }
}

/// Builds an iNES image around `prg` (16 or 32 KiB) for tests.
#[cfg(test)]
pub(crate) fn nrom_image(prg: &[u8], chr_banks: u8, flags6: u8) -> Vec<u8> {
    let mut image = MAGIC.to_vec();
    image.extend_from_slice(&[(prg.len() / PRG_BANK_LEN) as u8, chr_banks, flags6]);
    image.resize(HEADER_LEN, 0);
    image.extend_from_slice(prg);
    image.resize(image.len() + chr_banks as usize * CHR_BANK_LEN, 0);
    image
}
