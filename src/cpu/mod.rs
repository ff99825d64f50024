//! 6502 CPU emulation for the NES (2A03 core, no decimal mode).
//!
//! Table-driven: [`opcodes::INSTRUCTIONS`] decodes each opcode into an operation,
//! an addressing mode and a base cycle cost; [`cpu::CPU`] resolves the operand,
//! executes, and amortizes the cost over its per-cycle `tick`.
//! Memory and I/O go through the [`crate::bus::Bus`] trait.

pub mod cpu;
pub mod flags;
pub mod opcodes;
