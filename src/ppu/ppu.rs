//! NES PPU (Picture Processing Unit) implementation.
//!
//! A dot-by-dot state machine over (scanline, cycle). Each frame runs scanlines −1
//! (pre-render) through 260 and each scanline cycles −1 through 339, so one frame is
//! exactly 341 × 262 ticks. The background is produced from 16-bit shift registers fed
//! by the 8-cycle fetch pattern; sprites for the next scanline are evaluated and
//! fetched on the last cycle of the current one.
//!
//! Registers: $2000–$2007 (mirrored every 8 bytes up to $3FFF).

use crate::nes::Screen;
use crate::ppu::bus::PpuBus;
use crate::ppu::vram_addr::VramAddr;

/// NES 2C02-style 64-color palette (0xRRGGBB), indexed by the 6-bit colour from palette RAM.
pub const NES_PALETTE_RGB: [u32; 64] = [
    0x545454, 0x001E74, 0x081090, 0x300088, 0x440064, 0x5C0030, 0x540400, 0x3C1800, 0x202A00,
    0x083A00, 0x004000, 0x003C00, 0x00302C, 0x000000, 0x000000, 0x000000, 0x989698, 0x084CC4,
    0x3032EC, 0x5C1EE4, 0x8814B0, 0xA01464, 0x982220, 0x783C00, 0x545A00, 0x287200, 0x087C00,
    0x007628, 0x006678, 0x000000, 0x000000, 0x000000, 0xECEEEC, 0x3C7EEC, 0x5C5CEC, 0x8844EC,
    0xB02CEC, 0xE028B0, 0xD83C50, 0xC45400, 0xAC7000, 0x808800, 0x409C30, 0x20A458, 0x209A88,
    0x404040, 0x000000, 0x000000, 0xECEEEC, 0xA8BCEC, 0xBCACEC, 0xD4A0EC, 0xEC94EC, 0xEC90D4,
    0xEC9CB4, 0xE4B090, 0xDCC878, 0xD4DC78, 0xB8EC98, 0xA8ECBC, 0xA0E4E4, 0xA0A0A0, 0x000000,
    0x000000,
];

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 240;

/// OAM (Object Attribute Memory): 64 sprites × 4 bytes. Each entry: Y, tile, attr, X.
pub const OAM_LEN: usize = 256;
const SPRITES_PER_LINE: usize = 8;

// PPUCTRL ($2000)
pub const CTRL_NAMETABLE: u8 = 0x03;
pub const CTRL_INCREMENT_32: u8 = 0x04;
pub const CTRL_SPRITE_TABLE: u8 = 0x08;
pub const CTRL_BACKGROUND_TABLE: u8 = 0x10;
pub const CTRL_SPRITE_16: u8 = 0x20;
pub const CTRL_NMI_ENABLE: u8 = 0x80;

// PPUMASK ($2001)
pub const MASK_BACKGROUND_LEFT: u8 = 0x02;
pub const MASK_SPRITES_LEFT: u8 = 0x04;
pub const MASK_BACKGROUND: u8 = 0x08;
pub const MASK_SPRITES: u8 = 0x10;

// PPUSTATUS ($2002)
pub const STATUS_SPRITE_OVERFLOW: u8 = 0x20;
pub const STATUS_SPRITE_ZERO_HIT: u8 = 0x40;
pub const STATUS_VBLANK: u8 = 0x80;

// Sprite attribute byte
const SPRITE_PALETTE: u8 = 0x03;
const SPRITE_BEHIND_BACKGROUND: u8 = 0x20;
const SPRITE_FLIP_H: u8 = 0x40;
const SPRITE_FLIP_V: u8 = 0x80;

const LAST_CYCLE: i16 = 339;
const LAST_SCANLINE: i16 = 260;
const VBLANK_SCANLINE: i16 = 241;
/// Sprite-0 hit is never reported on this dot.
const SPRITE_ZERO_BLIND_CYCLE: i16 = 254;

/// PPU state: registers, scroll latches, OAM, and the rendering pipeline.
pub struct PPU {
    pub scanline: i16,
    pub cycle: i16,
    /// Completed frames.
    pub frame: u64,

    pub ctrl: u8,
    pub mask: u8,
    pub status: u8,
    /// OAM address for $2003/$2004 (byte index 0..255).
    pub oam_addr: u8,
    /// OAM: 64 sprites × 4 bytes (Y, tile, attr, X). Written via $2003/$2004 or $4014 DMA.
    pub oam: [u8; OAM_LEN],

    /// Current VRAM address.
    pub v: VramAddr,
    /// Temporary VRAM address; top-left of the screen while rendering.
    pub t: VramAddr,
    pub fine_x: u8,
    /// Shared first/second write toggle of $2005 and $2006.
    pub w: bool,
    data_buffer: u8,
    /// Raised on VBlank entry (or a PPUCTRL write enabling NMI inside VBlank); taken by the bus.
    nmi: bool,

    // Background fetch latches and shifters.
    bg_next_tile: u8,
    bg_next_attribute: u8,
    bg_next_lo: u8,
    bg_next_hi: u8,
    bg_pattern_lo: u16,
    bg_pattern_hi: u16,
    bg_attribute_lo: u16,
    bg_attribute_hi: u16,

    // Sprites for the current scanline.
    secondary_oam: [u8; 32],
    sprite_count: usize,
    sprite_zero_loaded: bool,
    sprite_pattern_lo: [u8; SPRITES_PER_LINE],
    sprite_pattern_hi: [u8; SPRITES_PER_LINE],
    sprite_attribute: [u8; SPRITES_PER_LINE],
    sprite_x: [u8; SPRITES_PER_LINE],
}

impl PPU {
    /// Create PPU at power-on: registers zeroed, positioned just before the pre-render scanline.
    pub fn new() -> Self {
        Self {
            scanline: -1,
            cycle: -1,
            frame: 0,
            ctrl: 0,
            mask: 0,
            status: 0,
            oam_addr: 0,
            oam: [0; OAM_LEN],
            v: VramAddr::default(),
            t: VramAddr::default(),
            fine_x: 0,
            w: false,
            data_buffer: 0,
            nmi: false,
            bg_next_tile: 0,
            bg_next_attribute: 0,
            bg_next_lo: 0,
            bg_next_hi: 0,
            bg_pattern_lo: 0,
            bg_pattern_hi: 0,
            bg_attribute_lo: 0,
            bg_attribute_hi: 0,
            secondary_oam: [0xFF; 32],
            sprite_count: 0,
            sprite_zero_loaded: false,
            sprite_pattern_lo: [0; SPRITES_PER_LINE],
            sprite_pattern_hi: [0; SPRITES_PER_LINE],
            sprite_attribute: [0; SPRITES_PER_LINE],
            sprite_x: [0; SPRITES_PER_LINE],
        }
    }

    /// Consume a pending NMI request.
    pub fn take_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi)
    }

    /// Sprites found for the scanline being drawn (at most 8).
    pub fn sprite_count(&self) -> usize {
        self.sprite_count
    }

    /// Secondary OAM as rebuilt by the last sprite evaluation.
    pub fn secondary_oam(&self) -> &[u8; 32] {
        &self.secondary_oam
    }

    fn rendering_enabled(&self) -> bool {
        self.mask & (MASK_BACKGROUND | MASK_SPRITES) != 0
    }

    /// Advance one dot: run this position's pipeline work, emit its pixel, move on.
    /// `present_frame` is called when the position wraps back to the start of a frame.
    pub fn tick<S: Screen>(&mut self, bus: &mut PpuBus, screen: &mut S) {
        self.update_state(bus);

        if (0..SCREEN_HEIGHT as i16).contains(&self.scanline)
            && (0..SCREEN_WIDTH as i16).contains(&self.cycle)
        {
            let colour = self.compose_pixel(bus);
            screen.draw_pixel(self.cycle as usize, self.scanline as usize, colour);
        }
        if (0..SCREEN_WIDTH as i16).contains(&self.cycle) && self.scanline < SCREEN_HEIGHT as i16 {
            self.shift_sprites();
        }

        self.cycle += 1;
        if self.cycle > LAST_CYCLE {
            self.cycle = -1;
            self.scanline += 1;
            if self.scanline > LAST_SCANLINE {
                self.scanline = -1;
            }
        }

        if self.scanline == -1 && self.cycle == -1 {
            self.frame += 1;
            screen.present_frame();
        }
    }

    fn update_state(&mut self, bus: &mut PpuBus) {
        let cycle = self.cycle;
        if cycle < 0 {
            return;
        }

        if self.scanline < SCREEN_HEIGHT as i16 {
            if self.scanline == -1 {
                if cycle == 0 {
                    self.start_frame();
                } else if (280..=304).contains(&cycle) && self.rendering_enabled() {
                    self.v.copy_y(self.t);
                }
            }

            if (cycle < 256 || (320..336).contains(&cycle)) && self.rendering_enabled() {
                self.shift_background();
                self.fetch_background(bus);
            }

            if cycle == 255 && self.rendering_enabled() {
                self.v.increment_y();
            }
            if cycle == 256 && self.rendering_enabled() {
                self.v.copy_x(self.t);
            }
            if (256..320).contains(&cycle) && self.rendering_enabled() {
                self.oam_addr = 0;
            }

            if cycle == LAST_CYCLE && self.scanline >= 0 {
                self.evaluate_sprites();
                self.load_sprites(bus);
            }
        } else if self.scanline == VBLANK_SCANLINE && cycle == 0 {
            self.status |= STATUS_VBLANK;
            if self.ctrl & CTRL_NMI_ENABLE != 0 {
                self.nmi = true;
            }
        }
    }

    /// Pre-render dot 0: clear the frame flags and the sprite pipeline.
    fn start_frame(&mut self) {
        self.status &= !(STATUS_VBLANK | STATUS_SPRITE_ZERO_HIT | STATUS_SPRITE_OVERFLOW);

        self.sprite_count = 0;
        self.sprite_zero_loaded = false;
        self.sprite_pattern_lo = [0; SPRITES_PER_LINE];
        self.sprite_pattern_hi = [0; SPRITES_PER_LINE];
        self.sprite_attribute = [0; SPRITES_PER_LINE];
        self.sprite_x = [0; SPRITES_PER_LINE];
    }

    /// Runs whenever rendering is on, so enabling the background mid-frame picks up live tiles.
    fn shift_background(&mut self) {
        self.bg_pattern_lo <<= 1;
        self.bg_pattern_hi <<= 1;
        self.bg_attribute_lo <<= 1;
        self.bg_attribute_hi <<= 1;
    }

    /// Sprites count down their X position, then shift out one pixel per dot.
    fn shift_sprites(&mut self) {
        if self.mask & MASK_SPRITES == 0 {
            return;
        }
        for i in 0..SPRITES_PER_LINE {
            if self.sprite_x[i] > 0 {
                self.sprite_x[i] -= 1;
            } else {
                self.sprite_pattern_lo[i] <<= 1;
                self.sprite_pattern_hi[i] <<= 1;
            }
        }
    }

    fn fetch_background(&mut self, bus: &mut PpuBus) {
        match self.cycle % 8 {
            0 => {
                let attribute_lo = if self.bg_next_attribute & 0b01 != 0 { 0xFF } else { 0 };
                let attribute_hi = if self.bg_next_attribute & 0b10 != 0 { 0xFF } else { 0 };
                self.bg_pattern_lo = (self.bg_pattern_lo & 0xFF00) | self.bg_next_lo as u16;
                self.bg_pattern_hi = (self.bg_pattern_hi & 0xFF00) | self.bg_next_hi as u16;
                self.bg_attribute_lo = (self.bg_attribute_lo & 0xFF00) | attribute_lo;
                self.bg_attribute_hi = (self.bg_attribute_hi & 0xFF00) | attribute_hi;
                self.bg_next_tile = bus.read(self.v.tile_addr());
            }
            2 => {
                let mut attribute = bus.read(self.v.attribute_addr());
                if self.v.coarse_y() & 0x02 != 0 {
                    attribute >>= 4;
                }
                if self.v.coarse_x() & 0x02 != 0 {
                    attribute >>= 2;
                }
                self.bg_next_attribute = attribute & 0x03;
            }
            4 => self.bg_next_lo = bus.read(self.background_row_addr()),
            6 => self.bg_next_hi = bus.read(self.background_row_addr() + 8),
            7 => self.v.increment_x(),
            _ => {}
        }
    }

    fn background_row_addr(&self) -> u16 {
        let table = if self.ctrl & CTRL_BACKGROUND_TABLE != 0 { 0x1000 } else { 0 };
        table + ((self.bg_next_tile as u16) << 4) + self.v.fine_y() as u16
    }

    /// Scan all of OAM for sprites covering the current scanline (drawn on the next one,
    /// since OAM Y is one less than the top row). The ninth match sets sprite overflow.
    fn evaluate_sprites(&mut self) {
        self.secondary_oam = [0xFF; 32];
        self.sprite_count = 0;
        self.sprite_zero_loaded = false;

        let height = self.sprite_height();
        for i in 0..OAM_LEN / 4 {
            let entry = &self.oam[i * 4..i * 4 + 4];
            let row = self.scanline - entry[0] as i16;
            if !(0..height).contains(&row) {
                continue;
            }

            if self.sprite_count == SPRITES_PER_LINE {
                self.status |= STATUS_SPRITE_OVERFLOW;
                break;
            }

            let slot = self.sprite_count * 4;
            self.secondary_oam[slot..slot + 4].copy_from_slice(entry);
            self.sprite_count += 1;
            if i == 0 {
                self.sprite_zero_loaded = true;
            }
        }
    }

    fn load_sprites(&mut self, bus: &mut PpuBus) {
        for slot in 0..SPRITES_PER_LINE {
            if slot >= self.sprite_count {
                self.sprite_pattern_lo[slot] = 0;
                self.sprite_pattern_hi[slot] = 0;
                self.sprite_attribute[slot] = 0;
                self.sprite_x[slot] = 0;
                continue;
            }

            let entry = &self.secondary_oam[slot * 4..slot * 4 + 4];
            let (y, tile, attribute, x) = (entry[0], entry[1], entry[2], entry[3]);

            let addr = self.sprite_row_addr(y, tile, attribute);
            let mut lo = bus.read(addr);
            let mut hi = bus.read(addr + 8);
            if attribute & SPRITE_FLIP_H != 0 {
                lo = lo.reverse_bits();
                hi = hi.reverse_bits();
            }

            self.sprite_pattern_lo[slot] = lo;
            self.sprite_pattern_hi[slot] = hi;
            self.sprite_attribute[slot] = attribute;
            self.sprite_x[slot] = x;
        }
    }

    fn sprite_height(&self) -> i16 {
        if self.ctrl & CTRL_SPRITE_16 != 0 { 16 } else { 8 }
    }

    /// Pattern address of the sprite row for the current scanline, in 8×8 or 8×16 mode.
    fn sprite_row_addr(&self, y: u8, tile: u8, attribute: u8) -> u16 {
        let height = self.sprite_height();
        let mut row = self.scanline - y as i16;
        if attribute & SPRITE_FLIP_V != 0 {
            row = height - 1 - row;
        }
        let row = row as u16;

        if height == 16 {
            let table = (tile as u16 & 0x01) << 12;
            let top = tile as u16 & 0xFE;
            let (tile, row) = if row < 8 { (top, row) } else { (top + 1, row - 8) };
            table | (tile << 4) | row
        } else {
            let table = if self.ctrl & CTRL_SPRITE_TABLE != 0 { 0x1000 } else { 0 };
            table | ((tile as u16) << 4) | row
        }
    }

    /// Combine background and sprite pixels for the current dot into a colour index.
    fn compose_pixel(&mut self, bus: &PpuBus) -> u8 {
        let x = self.cycle;
        let left_edge = x < 8;

        let mut bg_pixel = 0u8;
        let mut bg_palette = 0u8;
        if self.mask & MASK_BACKGROUND != 0 && !(left_edge && self.mask & MASK_BACKGROUND_LEFT == 0) {
            let bit = 15 - self.fine_x as u16;
            bg_pixel = (((self.bg_pattern_hi >> bit) & 1) << 1 | ((self.bg_pattern_lo >> bit) & 1)) as u8;
            bg_palette =
                (((self.bg_attribute_hi >> bit) & 1) << 1 | ((self.bg_attribute_lo >> bit) & 1)) as u8;
        }

        let mut fg_pixel = 0u8;
        let mut fg_palette = 0u8;
        let mut fg_in_front = false;
        let mut fg_is_sprite_zero = false;
        if self.mask & MASK_SPRITES != 0 && !(left_edge && self.mask & MASK_SPRITES_LEFT == 0) {
            for i in 0..self.sprite_count {
                if self.sprite_x[i] != 0 {
                    continue;
                }
                let pixel = (self.sprite_pattern_hi[i] >> 7) << 1 | (self.sprite_pattern_lo[i] >> 7);
                if pixel == 0 {
                    continue;
                }

                let attribute = self.sprite_attribute[i];
                fg_pixel = pixel;
                fg_palette = (attribute & SPRITE_PALETTE) + 4;
                fg_in_front = attribute & SPRITE_BEHIND_BACKGROUND == 0;
                fg_is_sprite_zero = i == 0 && self.sprite_zero_loaded;
                break;
            }
        }

        if fg_is_sprite_zero && bg_pixel != 0 {
            self.set_sprite_zero_hit();
        }

        let (pixel, palette) = match (bg_pixel, fg_pixel) {
            (0, 0) => (0, 0),
            (0, _) => (fg_pixel, fg_palette),
            (_, 0) => (bg_pixel, bg_palette),
            _ if fg_in_front => (fg_pixel, fg_palette),
            _ => (bg_pixel, bg_palette),
        };

        bus.read(0x3F00 + ((palette as u16) << 2) + pixel as u16) & 0x3F
    }

    fn set_sprite_zero_hit(&mut self) {
        if self.mask & MASK_BACKGROUND == 0 || self.mask & MASK_SPRITES == 0 {
            return;
        }
        if self.cycle == SPRITE_ZERO_BLIND_CYCLE {
            return;
        }
        self.status |= STATUS_SPRITE_ZERO_HIT;
    }

    /// CPU read of $2000–$2007 (`addr` already reduced to 0..=7). Write-only registers read as 0.
    pub fn read_register(&mut self, addr: u16, bus: &PpuBus) -> u8 {
        match addr & 0x07 {
            2 => self.read_status(),
            4 => self.oam[self.oam_addr as usize],
            7 => self.read_data(bus),
            _ => 0,
        }
    }

    /// CPU write of $2000–$2007.
    pub fn write_register(&mut self, addr: u16, data: u8, bus: &mut PpuBus) {
        match addr & 0x07 {
            0 => self.write_ctrl(data),
            1 => self.mask = data,
            3 => self.oam_addr = data,
            4 => {
                self.oam[self.oam_addr as usize] = data;
                self.oam_addr = self.oam_addr.wrapping_add(1);
            }
            5 => self.write_scroll(data),
            6 => self.write_addr(data),
            7 => {
                bus.write(self.v.get(), data);
                self.v.increment(self.vram_increment());
            }
            _ => {} // PPUSTATUS is read-only
        }
    }

    /// Read PPUSTATUS ($2002); clears vblank and the shared write toggle.
    pub fn read_status(&mut self) -> u8 {
        let status = self.status;
        self.status &= !STATUS_VBLANK;
        self.w = false;
        status
    }

    /// Write PPUCTRL ($2000). Enabling NMI while VBlank is already set fires one immediately.
    pub fn write_ctrl(&mut self, data: u8) {
        let was_enabled = self.ctrl & CTRL_NMI_ENABLE != 0;
        self.ctrl = data;
        self.t.set_nametable(data & CTRL_NAMETABLE);

        if !was_enabled && data & CTRL_NMI_ENABLE != 0 && self.status & STATUS_VBLANK != 0 {
            self.nmi = true;
        }
    }

    /// Write PPUSCROLL ($2005): first write = fine X and coarse X, second write = fine Y and coarse Y.
    pub fn write_scroll(&mut self, data: u8) {
        if !self.w {
            self.fine_x = data & 0x07;
            self.t.set_coarse_x(data >> 3);
        } else {
            self.t.set_fine_y(data & 0x07);
            self.t.set_coarse_y(data >> 3);
        }
        self.w = !self.w;
    }

    /// Write PPUADDR ($2006): high byte then low byte; the second write commits `t` to `v`.
    pub fn write_addr(&mut self, data: u8) {
        if !self.w {
            self.t.set_high_byte(data);
        } else {
            self.t.set_low_byte(data);
            self.v = self.t;
        }
        self.w = !self.w;
    }

    /// Read PPUDATA ($2007). Returns the previous read's value except in palette space,
    /// where the palette answers directly and the buffer picks up the nametable byte underneath.
    pub fn read_data(&mut self, bus: &PpuBus) -> u8 {
        let addr = self.v.get() & 0x3FFF;

        let data = if addr >= 0x3F00 {
            self.data_buffer = bus.read(addr - 0x1000);
            bus.read(addr)
        } else {
            let buffered = self.data_buffer;
            self.data_buffer = bus.read(addr);
            buffered
        };

        self.v.increment(self.vram_increment());
        data
    }

    fn vram_increment(&self) -> u16 {
        if self.ctrl & CTRL_INCREMENT_32 != 0 { 32 } else { 1 }
    }

    /// $4014 DMA setup: transfers always start at OAM address 0.
    pub fn start_oam_dma(&mut self) {
        self.oam_addr = 0;
    }

    /// One DMA byte into OAM at the current address.
    pub fn write_oam_dma(&mut self, data: u8) {
        self.oam[self.oam_addr as usize] = data;
        self.oam_addr = self.oam_addr.wrapping_add(1);
    }
}

impl Default for PPU {
    fn default() -> Self {
        Self::new()
    }
}
