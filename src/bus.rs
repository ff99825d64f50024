//! Memory bus and address decoding for the CPU side of the NES.
//!
//! Maps CPU addresses to RAM, PPU registers, APU, controllers and cartridge, and runs the
//! OAM DMA unit that stalls the CPU while it copies a RAM page into sprite memory.
//! See [CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map).

use thiserror::Error;

use crate::{
    apu::apu::APU,
    cartridge::cartridge::Cartridge,
    controller::Controller,
    nes::{Audio, Screen},
    ppu::{
        bus::{PpuBus, Vram},
        ppu::PPU,
    },
};

/// Fatal conditions raised by a bus access.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BusError {
    /// Real hardware has nothing to receive the write; reaching this means a broken image or a CPU bug.
    #[error("write to cartridge ROM at ${addr:04X}")]
    RomWrite { addr: u16 },
}

/// The CPU's view of memory and the interrupt lines it samples.
pub trait Bus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8) -> Result<(), BusError>;

    /// True while a DMA transfer owns the bus and the CPU must not run.
    fn dma_active(&self) -> bool {
        false
    }

    /// Edge-triggered: returns true once per NMI request.
    fn poll_nmi(&mut self) -> bool {
        false
    }

    /// Level-triggered: stays true until the source is acknowledged.
    fn poll_irq(&mut self) -> bool {
        false
    }
}

/// $4014 transfer state.
#[derive(Default)]
struct OamDma {
    active: bool,
    /// The first cycle(s) only wait for the CPU to land on an odd cycle.
    aligned: bool,
    page: u8,
    /// Next byte of the page to copy.
    offset: u8,
    data: u8,
}

/// Main NES bus: RAM, PPU and its VRAM, APU, cartridge and both joypads.
pub struct NesBus<A: Audio = APU> {
    pub ram: [u8; 2048],
    pub cart: Cartridge,
    pub ppu: PPU,
    pub vram: Vram,
    pub apu: A,
    pub joypads: [Controller; 2],
    dma: OamDma,
}

impl<A: Audio> NesBus<A> {
    pub fn new(cart: Cartridge, apu: A) -> Self {
        Self {
            ram: [0; 2048],
            cart,
            ppu: PPU::new(),
            vram: Vram::new(),
            apu,
            joypads: [Controller::new(), Controller::new()],
            dma: OamDma::default(),
        }
    }

    /// Advance the PPU by one dot.
    pub fn tick_ppu<S: Screen>(&mut self, screen: &mut S) {
        let mut bus = PpuBus::new(&mut self.cart, &mut self.vram);
        self.ppu.tick(&mut bus, screen);
    }

    /// One CPU cycle of OAM DMA. Reads happen on even cycles and writes on odd ones;
    /// the transfer ends with the 256th write.
    pub fn step_dma(&mut self, cpu_cycle: u64) {
        if !self.dma.active {
            return;
        }

        let odd = cpu_cycle % 2 == 1;
        if !self.dma.aligned {
            self.dma.aligned = odd;
            return;
        }

        if !odd {
            let addr = (self.dma.page as u16) << 8 | self.dma.offset as u16;
            self.dma.data = self.read(addr);
        } else {
            self.ppu.write_oam_dma(self.dma.data);
            self.dma.offset = self.dma.offset.wrapping_add(1);
            if self.dma.offset == 0 {
                self.dma.active = false;
            }
        }
    }

    fn start_dma(&mut self, page: u8) {
        tracing::debug!(page, "OAM DMA started");
        self.dma = OamDma {
            active: true,
            aligned: false,
            page,
            offset: 0,
            data: 0,
        };
        self.ppu.start_oam_dma();
    }
}

impl<A: Audio> Bus for NesBus<A> {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            // Internal RAM (mirrored 4x in 0x0000-0x1FFF)
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],
            // PPU registers $2000-$3FFF (mirrored every 8 bytes)
            0x2000..=0x3FFF => {
                let bus = PpuBus::new(&mut self.cart, &mut self.vram);
                self.ppu.read_register(addr & 0x0007, &bus)
            }
            0x4015 => self.apu.read_status(),
            // Bit 6 is left floating high by the open bus.
            0x4016 => self.joypads[0].read() | 0x40,
            0x4017 => self.joypads[1].read() | 0x40,
            0x4000..=0x401F => 0,
            0x4020..=0xFFFF => self.cart.read_program(addr),
        }
    }

    fn write(&mut self, addr: u16, data: u8) -> Result<(), BusError> {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize] = data,
            0x2000..=0x3FFF => {
                let mut bus = PpuBus::new(&mut self.cart, &mut self.vram);
                self.ppu.write_register(addr & 0x0007, data, &mut bus);
            }
            0x4014 => self.start_dma(data),
            0x4016 => {
                let strobe = data & 1 != 0;
                for pad in &mut self.joypads {
                    pad.set_strobe(strobe);
                }
            }
            0x4000..=0x4013 | 0x4015 | 0x4017 => self.apu.write_register(addr, data),
            // Test-mode registers.
            0x4018..=0x401F => {}
            0x4020..=0xFFFF => return Err(BusError::RomWrite { addr }),
        }
        Ok(())
    }

    fn dma_active(&self) -> bool {
        self.dma.active
    }

    fn poll_nmi(&mut self) -> bool {
        self.ppu.take_nmi()
    }

    fn poll_irq(&mut self) -> bool {
        self.apu.poll_irq()
    }
}
