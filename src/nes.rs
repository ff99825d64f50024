//! The console: one master clock driving the PPU, CPU and APU in lock-step.
//!
//! Each call to [`Nes::tick`] is one PPU dot. The CPU (or the OAM DMA unit standing in for it)
//! runs on every third dot and the APU on every sixth, always in that order.

use crate::{
    apu::apu::APU,
    bus::{Bus, BusError, NesBus},
    cartridge::cartridge::Cartridge,
    controller::{Buttons, Port},
    cpu::cpu::CPU,
};

/// Framebuffer collaborator.
pub trait Screen {
    /// `colour` is a 6-bit index into the system palette.
    fn draw_pixel(&mut self, x: usize, y: usize, colour: u8);
    /// Called once per frame, after the last dot of scanline 260.
    fn present_frame(&mut self);
}

/// Audio collaborator: consumes register writes and the shared clock.
pub trait Audio {
    /// $4000–$4013, $4015 and $4017.
    fn write_register(&mut self, addr: u16, data: u8);
    /// $4015.
    fn read_status(&mut self) -> u8;
    /// One APU cycle (two CPU cycles).
    fn tick(&mut self);
    fn poll_irq(&self) -> bool {
        false
    }
}

pub struct Nes<S: Screen, A: Audio = APU> {
    pub cpu: CPU<NesBus<A>>,
    pub screen: S,
    clock: u64,
    cpu_cycles: u64,
}

impl<S: Screen, A: Audio> Nes<S, A> {
    /// Power on: the CPU jumps through the reset vector, the PPU waits before the pre-render line.
    pub fn new(cart: Cartridge, screen: S, apu: A) -> Self {
        let mut cpu = CPU::new(NesBus::new(cart, apu));
        cpu.reset();

        Self {
            cpu,
            screen,
            clock: 0,
            cpu_cycles: 0,
        }
    }

    /// Button state handle for one joypad, for the input side.
    pub fn buttons(&self, port: Port) -> Buttons {
        self.cpu.bus.joypads[port.index()].buttons()
    }

    /// Master clock ticks since power-on.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// CPU cycles since power-on, including those spent stalled by DMA.
    pub fn cpu_cycles(&self) -> u64 {
        self.cpu_cycles
    }

    /// Advance one PPU dot.
    pub fn tick(&mut self) -> Result<(), BusError> {
        self.cpu.bus.tick_ppu(&mut self.screen);
        if self.cpu.bus.poll_nmi() {
            self.cpu.nmi()?;
        }

        if self.clock % 3 == 0 {
            if self.cpu.bus.dma_active() {
                self.cpu.bus.step_dma(self.cpu_cycles);
            } else {
                self.cpu.tick()?;
            }
            self.cpu_cycles += 1;
        }

        if self.clock % 6 == 0 {
            self.cpu.bus.apu.tick();
        }

        self.clock += 1;
        Ok(())
    }

    /// Run until the current frame has been presented.
    pub fn run_frame(&mut self) -> Result<(), BusError> {
        let frame = self.cpu.bus.ppu.frame;
        while self.cpu.bus.ppu.frame == frame {
            self.tick()?;
        }
        Ok(())
    }
}
