//! NES cartridge loading and mapper support.
//!
//! - **cartridge**: Parses iNES (.nes) images into PRG/CHR and a mapper.
//! - **mapper**: The [`mapper::mapper::Mapper`] trait and NROM (0), the one board
//!   without bank switching.

pub mod cartridge;
pub mod mapper;
