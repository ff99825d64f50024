//! Famicore: a cycle-counted NES (Nintendo Entertainment System) emulator core.
//!
//! Implements the NES chipset as documented on the
//! [NESdev Wiki](https://www.nesdev.org/wiki/NES_reference_guide): Ricoh 2A03 (CPU+APU),
//! 2C02 PPU, the NROM cartridge board and controller I/O, all driven by one master clock.
//!
//! ## Modules (NESdev references)
//!
//! - **nes** – the master clock: PPU every tick, CPU every 3rd, APU every 6th; the `Screen`
//!   and `Audio` collaborator traits
//! - **cpu** – [6502](https://www.nesdev.org/wiki/CPU) / 2A03: table-driven documented opcodes,
//!   per-cycle tick, [NMI](https://www.nesdev.org/wiki/NMI), IRQ, BRK
//! - **ppu** – [PPU](https://www.nesdev.org/wiki/PPU) rendering pipeline,
//!   [PPU registers](https://www.nesdev.org/wiki/PPU_registers), loopy scroll register, PPU bus
//! - **bus** – [CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map): RAM, PPU, APU,
//!   controllers, cartridge; OAM DMA
//! - **apu** – [APU](https://www.nesdev.org/wiki/APU): pulse×2, triangle, noise, frame counter,
//!   [APU Mixer](https://www.nesdev.org/wiki/APU_Mixer)
//! - **cartridge** – [iNES](https://www.nesdev.org/wiki/INES) loading; [Mapper](https://www.nesdev.org/wiki/Mapper) NROM (0)
//! - **controller** – [Controller reading](https://www.nesdev.org/wiki/Controller_reading): $4016 strobe, shift-out
//! - **config** – TOML host settings (scale, audio, key bindings)

pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod config;
pub mod controller;
pub mod cpu;
pub mod nes;
pub mod ppu;
