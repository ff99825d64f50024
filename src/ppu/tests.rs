use crate::{
    cartridge::cartridge::{Cartridge, nrom_image},
    nes::Screen,
    ppu::{
        bus::{PpuBus, Vram},
        ppu::{
            CTRL_INCREMENT_32, CTRL_NMI_ENABLE, CTRL_SPRITE_16, MASK_BACKGROUND,
            MASK_BACKGROUND_LEFT, MASK_SPRITES, MASK_SPRITES_LEFT, PPU, SCREEN_HEIGHT,
            SCREEN_WIDTH, STATUS_SPRITE_OVERFLOW, STATUS_SPRITE_ZERO_HIT, STATUS_VBLANK,
        },
    },
};

const FRAME_TICKS: usize = 341 * 262;

struct TestScreen {
    pixels: Vec<u8>,
    frames: usize,
}

impl Screen for TestScreen {
    fn draw_pixel(&mut self, x: usize, y: usize, colour: u8) {
        self.pixels[y * SCREEN_WIDTH + x] = colour;
    }

    fn present_frame(&mut self) {
        self.frames += 1;
    }
}

struct Harness {
    ppu: PPU,
    cart: Cartridge,
    vram: Vram,
    screen: TestScreen,
}

impl Harness {
    fn new() -> Self {
        // 16 KiB PRG, CHR RAM, vertical mirroring.
        let cart = Cartridge::from_bytes(&nrom_image(&[0; 0x4000], 0, 0x01)).unwrap();
        Self {
            ppu: PPU::new(),
            cart,
            vram: Vram::new(),
            screen: TestScreen {
                pixels: vec![0xFF; SCREEN_WIDTH * SCREEN_HEIGHT],
                frames: 0,
            },
        }
    }

    fn write(&mut self, reg: u16, data: u8) {
        let mut bus = PpuBus::new(&mut self.cart, &mut self.vram);
        self.ppu.write_register(reg, data, &mut bus);
    }

    fn read(&mut self, reg: u16) -> u8 {
        let bus = PpuBus::new(&mut self.cart, &mut self.vram);
        self.ppu.read_register(reg, &bus)
    }

    fn set_addr(&mut self, addr: u16) {
        self.read(0x2002);
        self.write(0x2006, (addr >> 8) as u8);
        self.write(0x2006, addr as u8);
    }

    fn poke(&mut self, addr: u16, bytes: &[u8]) {
        self.set_addr(addr);
        for &b in bytes {
            self.write(0x2007, b);
        }
    }

    fn tick(&mut self) {
        let mut bus = PpuBus::new(&mut self.cart, &mut self.vram);
        self.ppu.tick(&mut bus, &mut self.screen);
    }

    fn run_until(&mut self, scanline: i16, cycle: i16) {
        while !(self.ppu.scanline == scanline && self.ppu.cycle == cycle) {
            self.tick();
        }
    }

    fn pixel(&self, x: usize, y: usize) -> u8 {
        self.screen.pixels[y * SCREEN_WIDTH + x]
    }

    /// Tile 1 is solid colour 1; the whole first nametable points at it.
    fn solid_background(&mut self) {
        let mut tile = [0u8; 16];
        tile[..8].fill(0xFF);
        self.poke(0x0010, &tile);
        self.poke(0x2000, &[1; 960]);
        self.poke(0x3F00, &[0x0F, 0x16]);
    }

    /// Pattern-table tile `index` with `rows` as its low plane and an empty high plane.
    fn tile(&mut self, index: u8, rows: [u8; 8]) {
        let mut tile = [0u8; 16];
        tile[..8].copy_from_slice(&rows);
        self.poke((index as u16) << 4, &tile);
    }

    /// Like [`Harness::solid_background`], but even columns use the empty tile 0.
    fn striped_background(&mut self) {
        self.solid_background();
        let stripes: Vec<u8> = (0..960).map(|i| (i % 2) as u8).collect();
        self.poke(0x2000, &stripes);
    }

    /// Second half of the setup after [`Harness::enable`]: horizontal scroll only.
    fn scroll_x(&mut self, x: u8) {
        self.read(0x2002);
        self.write(0x2005, x);
        self.write(0x2005, 0);
    }

    /// Scroll back to the top-left of nametable 0 (PPUADDR writes clobber `t`), then set PPUMASK.
    fn enable(&mut self, mask: u8) {
        self.read(0x2002);
        self.write(0x2000, 0);
        self.write(0x2005, 0);
        self.write(0x2005, 0);
        self.write(0x2001, mask);
    }

    fn hide_all_sprites(&mut self) {
        for i in 0..64 {
            self.ppu.oam[i * 4] = 0xFF;
        }
    }
}

#[test]
fn palette_backdrop_writes_alias_through_ppudata() {
    let mut h = Harness::new();

    for (mirror, base) in [(0x3F10, 0x3F00), (0x3F14, 0x3F04), (0x3F18, 0x3F08), (0x3F1C, 0x3F0C)] {
        h.poke(mirror, &[0x2A]);
        h.set_addr(base);
        assert_eq!(h.read(0x2007), 0x2A, "${mirror:04X}");
    }
}

#[test]
fn ppudata_reads_are_buffered_outside_palette() {
    let mut h = Harness::new();
    h.poke(0x2000, &[0x11, 0x22]);

    h.set_addr(0x2000);
    let stale = h.read(0x2007);
    assert_eq!(h.read(0x2007), 0x11);
    assert_eq!(h.read(0x2007), 0x22);
    assert_ne!(stale, 0x11);

    h.poke(0x3F01, &[0x05]);
    h.set_addr(0x3F01);
    assert_eq!(h.read(0x2007), 0x05);
}

#[test]
fn ppudata_increment_follows_ctrl() {
    let mut h = Harness::new();
    h.write(0x2000, CTRL_INCREMENT_32);
    h.poke(0x2000, &[0xAA, 0xBB]);

    h.write(0x2000, 0);
    h.set_addr(0x2020);
    h.read(0x2007);
    assert_eq!(h.read(0x2007), 0xBB);
}

#[test]
fn scroll_and_addr_share_the_write_toggle() {
    let mut h = Harness::new();

    h.write(0x2005, 0x7D); // X: coarse 15, fine 5
    assert!(h.ppu.w);
    h.write(0x2005, 0x5E); // Y: coarse 11, fine 6
    assert!(!h.ppu.w);

    assert_eq!(h.ppu.fine_x, 5);
    assert_eq!(h.ppu.t.coarse_x(), 15);
    assert_eq!(h.ppu.t.coarse_y(), 11);
    assert_eq!(h.ppu.t.fine_y(), 6);

    // A status read resets the toggle half-way through a pair.
    h.write(0x2006, 0x3F);
    h.read(0x2002);
    h.write(0x2006, 0x21);
    h.write(0x2006, 0x08);
    assert_eq!(h.ppu.v.get(), 0x2108);
}

#[test]
fn addr_first_write_masks_to_fourteen_bits() {
    let mut h = Harness::new();
    h.write(0x2006, 0xFF);
    h.write(0x2006, 0x00);
    assert_eq!(h.ppu.v.get(), 0x3F00);
}

#[test]
fn ctrl_write_sets_nametable_bits_of_t() {
    let mut h = Harness::new();
    h.write(0x2000, 0x03);
    assert_eq!(h.ppu.t.nametable(), 3);
}

#[test]
fn write_only_registers_read_as_zero() {
    let mut h = Harness::new();
    h.write(0x2000, 0xFF);
    h.write(0x2001, 0xFF);
    for reg in [0x2000, 0x2001, 0x2003, 0x2005, 0x2006] {
        assert_eq!(h.read(reg), 0);
    }
}

#[test]
fn oamdata_writes_advance_oamaddr() {
    let mut h = Harness::new();
    h.write(0x2003, 0x10);
    h.write(0x2004, 0xAB);
    h.write(0x2004, 0xCD);

    assert_eq!(h.ppu.oam[0x10], 0xAB);
    assert_eq!(h.ppu.oam[0x11], 0xCD);
    h.write(0x2003, 0x11);
    assert_eq!(h.read(0x2004), 0xCD);
}

#[test]
fn vblank_starts_at_scanline_241_and_raises_nmi() {
    let mut h = Harness::new();
    h.write(0x2000, CTRL_NMI_ENABLE);

    h.run_until(241, 0);
    assert_eq!(h.ppu.status & STATUS_VBLANK, 0);
    assert!(!h.ppu.take_nmi());

    h.tick();
    assert_ne!(h.ppu.status & STATUS_VBLANK, 0);
    assert!(h.ppu.take_nmi());
    assert!(!h.ppu.take_nmi());

    let status = h.read(0x2002);
    assert_ne!(status & STATUS_VBLANK, 0);
    assert_eq!(h.ppu.status & STATUS_VBLANK, 0);
}

#[test]
fn no_nmi_when_disabled() {
    let mut h = Harness::new();
    h.run_until(242, 0);
    assert_ne!(h.ppu.status & STATUS_VBLANK, 0);
    assert!(!h.ppu.take_nmi());
}

#[test]
fn enabling_nmi_inside_vblank_fires_immediately() {
    let mut h = Harness::new();
    h.run_until(250, 0);

    h.write(0x2000, CTRL_NMI_ENABLE);
    assert!(h.ppu.take_nmi());

    // Rewriting with NMI still enabled is not a new edge.
    h.write(0x2000, CTRL_NMI_ENABLE);
    assert!(!h.ppu.take_nmi());
}

#[test]
fn prerender_clears_status_flags() {
    let mut h = Harness::new();
    h.run_until(245, 0);
    h.ppu.status |= STATUS_SPRITE_ZERO_HIT | STATUS_SPRITE_OVERFLOW;

    h.run_until(-1, 1);
    assert_eq!(h.ppu.status, 0);
}

#[test]
fn full_frame_is_341_by_262_ticks() {
    let mut h = Harness::new();
    let mut vblank_edges = 0;
    let mut was_set = false;

    for _ in 0..FRAME_TICKS {
        h.tick();
        let set = h.ppu.status & STATUS_VBLANK != 0;
        if set && !was_set {
            vblank_edges += 1;
        }
        was_set = set;
    }

    assert_eq!(vblank_edges, 1);
    assert_eq!(h.screen.frames, 1);
    assert_eq!(h.ppu.frame, 1);
    assert_eq!((h.ppu.scanline, h.ppu.cycle), (-1, -1));

    h.tick();
    assert_eq!(h.screen.frames, 1);
}

#[test]
fn every_visible_dot_is_drawn_once_per_frame() {
    let mut h = Harness::new();
    h.poke(0x3F00, &[0x21]);

    for _ in 0..FRAME_TICKS {
        h.tick();
    }

    assert!(h.screen.pixels.iter().all(|&c| c == 0x21));
}

#[test]
fn nine_sprites_on_a_line_keep_eight_and_flag_overflow() {
    let mut h = Harness::new();
    h.hide_all_sprites();
    for i in 0..9 {
        h.ppu.oam[i * 4] = 10;
        h.ppu.oam[i * 4 + 1] = i as u8;
        h.ppu.oam[i * 4 + 3] = (i * 10) as u8;
    }

    h.ppu.scanline = 12;
    h.ppu.cycle = 339;
    h.tick();

    assert_eq!(h.ppu.sprite_count(), 8);
    assert_ne!(h.ppu.status & STATUS_SPRITE_OVERFLOW, 0);
    assert_eq!(&h.ppu.secondary_oam()[..], &h.ppu.oam[..32]);
}

#[test]
fn eight_sprites_do_not_overflow() {
    let mut h = Harness::new();
    h.hide_all_sprites();
    for i in 0..8 {
        h.ppu.oam[i * 4] = 10;
    }

    h.ppu.scanline = 17;
    h.ppu.cycle = 339;
    h.tick();

    assert_eq!(h.ppu.sprite_count(), 8);
    assert_eq!(h.ppu.status & STATUS_SPRITE_OVERFLOW, 0);
}

#[test]
fn tall_sprites_cover_sixteen_lines() {
    let mut h = Harness::new();
    h.hide_all_sprites();
    h.ppu.oam[0] = 10;
    h.write(0x2000, CTRL_SPRITE_16);

    h.ppu.scanline = 25;
    h.ppu.cycle = 339;
    h.tick();
    assert_eq!(h.ppu.sprite_count(), 1);

    h.ppu.scanline = 26;
    h.ppu.cycle = 339;
    h.tick();
    assert_eq!(h.ppu.sprite_count(), 0);
}

#[test]
fn oamaddr_is_cleared_during_sprite_fetch_window() {
    let mut h = Harness::new();
    h.hide_all_sprites();
    h.enable(MASK_BACKGROUND);
    h.run_until(5, 255);
    h.write(0x2003, 0x40);
    h.tick();
    assert_eq!(h.ppu.oam_addr, 0x40);
    h.tick();
    assert_eq!(h.ppu.oam_addr, 0);
}

#[test]
fn oamaddr_survives_scanlines_while_rendering_is_off() {
    let mut h = Harness::new();
    h.run_until(5, 255);
    h.write(0x2003, 0x40);
    h.run_until(6, 330);
    assert_eq!(h.ppu.oam_addr, 0x40);
}

#[test]
fn renders_solid_background_tiles() {
    let mut h = Harness::new();
    h.solid_background();
    h.hide_all_sprites();
    h.enable(MASK_BACKGROUND | MASK_BACKGROUND_LEFT);

    for _ in 0..2 * FRAME_TICKS {
        h.tick();
    }

    assert_eq!(h.pixel(0, 0), 0x16);
    assert_eq!(h.pixel(131, 77), 0x16);
    assert_eq!(h.pixel(255, 239), 0x16);
}

#[test]
fn hidden_left_column_shows_backdrop() {
    let mut h = Harness::new();
    h.solid_background();
    h.hide_all_sprites();
    h.enable(MASK_BACKGROUND);

    for _ in 0..2 * FRAME_TICKS {
        h.tick();
    }

    assert_eq!(h.pixel(7, 40), 0x0F);
    assert_eq!(h.pixel(8, 40), 0x16);
}

#[test]
fn fine_x_scroll_shifts_tiles_left() {
    let mut h = Harness::new();
    h.striped_background();
    h.hide_all_sprites();
    h.enable(MASK_BACKGROUND | MASK_BACKGROUND_LEFT);
    h.scroll_x(3);
    h.run_until(6, 0);

    // Column 1 (solid) spans pixels 8..16 of the nametable, moved 3 to the left.
    assert_eq!(h.pixel(4, 5), 0x0F);
    assert_eq!(h.pixel(5, 5), 0x16);
    assert_eq!(h.pixel(12, 5), 0x16);
    assert_eq!(h.pixel(13, 5), 0x0F);
    assert_eq!(h.pixel(21, 5), 0x16);
}

#[test]
fn coarse_x_scroll_skips_whole_tiles() {
    let mut h = Harness::new();
    h.striped_background();
    h.hide_all_sprites();
    h.enable(MASK_BACKGROUND | MASK_BACKGROUND_LEFT);
    h.scroll_x(8);
    h.run_until(6, 0);

    assert_eq!(h.pixel(0, 5), 0x16);
    assert_eq!(h.pixel(7, 5), 0x16);
    assert_eq!(h.pixel(8, 5), 0x0F);
    assert_eq!(h.pixel(16, 5), 0x16);
}

#[test]
fn background_enabled_mid_frame_draws_current_tiles() {
    let mut h = Harness::new();
    h.striped_background();
    h.hide_all_sprites();
    // Sprite rendering alone keeps the background fetches running.
    h.enable(MASK_SPRITES | MASK_SPRITES_LEFT);
    h.run_until(10, 0);
    assert_eq!(h.pixel(8, 9), 0x0F);

    h.write(0x2001, MASK_BACKGROUND | MASK_BACKGROUND_LEFT | MASK_SPRITES | MASK_SPRITES_LEFT);
    h.run_until(11, 0);

    assert_eq!(h.pixel(0, 10), 0x0F);
    assert_eq!(h.pixel(7, 10), 0x0F);
    assert_eq!(h.pixel(8, 10), 0x16);
    assert_eq!(h.pixel(15, 10), 0x16);
    assert_eq!(h.pixel(16, 10), 0x0F);
}

/// A single sprite over an empty background at OAM Y 50, X 100.
fn lone_sprite(tile: u8, attribute: u8) -> Harness {
    let mut h = Harness::new();
    // Tile 2: left column only. Tile 3 and the bottom half of the tall pair 4/5: top row only.
    h.tile(2, [0x80; 8]);
    h.tile(3, [0xFF, 0, 0, 0, 0, 0, 0, 0]);
    h.tile(5, [0xFF, 0, 0, 0, 0, 0, 0, 0]);
    h.poke(0x3F00, &[0x0F]);
    h.poke(0x3F11, &[0x30]);
    h.hide_all_sprites();
    h.ppu.oam[..4].copy_from_slice(&[50, tile, attribute, 100]);
    h.enable(MASK_SPRITES | MASK_SPRITES_LEFT);
    h
}

#[test]
fn horizontal_flip_mirrors_sprite_columns() {
    let mut h = lone_sprite(2, 0x00);
    h.run_until(52, 0);
    assert_eq!(h.pixel(100, 51), 0x30);
    assert_eq!(h.pixel(107, 51), 0x0F);

    let mut h = lone_sprite(2, 0x40);
    h.run_until(52, 0);
    assert_eq!(h.pixel(100, 51), 0x0F);
    assert_eq!(h.pixel(107, 51), 0x30);
}

#[test]
fn vertical_flip_mirrors_sprite_rows() {
    let mut h = lone_sprite(3, 0x00);
    h.run_until(60, 0);
    assert_eq!(h.pixel(100, 51), 0x30);
    assert_eq!(h.pixel(100, 58), 0x0F);

    let mut h = lone_sprite(3, 0x80);
    h.run_until(60, 0);
    assert_eq!(h.pixel(100, 51), 0x0F);
    assert_eq!(h.pixel(100, 58), 0x30);
    assert_eq!(h.pixel(107, 58), 0x30);
}

#[test]
fn tall_sprite_bottom_half_uses_the_next_tile() {
    let mut h = lone_sprite(4, 0x00);
    h.write(0x2000, CTRL_SPRITE_16);
    h.run_until(70, 0);

    assert_eq!(h.pixel(100, 51), 0x0F);
    assert_eq!(h.pixel(100, 58), 0x0F);
    assert_eq!(h.pixel(100, 59), 0x30);
    assert_eq!(h.pixel(100, 60), 0x0F);
    assert_eq!(h.pixel(100, 67), 0x0F);
}

fn sprite_scene(attribute: u8) -> Harness {
    let mut h = Harness::new();
    h.solid_background();
    h.poke(0x3F11, &[0x30]);
    h.hide_all_sprites();
    h.ppu.oam[..4].copy_from_slice(&[20, 1, attribute, 50]);
    h.enable(MASK_BACKGROUND | MASK_BACKGROUND_LEFT | MASK_SPRITES | MASK_SPRITES_LEFT);
    h
}

#[test]
fn sprite_in_front_covers_background() {
    let mut h = sprite_scene(0x00);
    h.run_until(22, 0);
    // Drawn one line below its OAM Y, at its OAM X.
    assert_eq!(h.pixel(50, 21), 0x30);
    assert_eq!(h.pixel(57, 21), 0x30);
    assert_eq!(h.pixel(49, 21), 0x16);
    assert_eq!(h.pixel(58, 21), 0x16);
    assert_eq!(h.pixel(50, 20), 0x16);
}

#[test]
fn sprite_behind_opaque_background_is_hidden() {
    let mut h = sprite_scene(0x20);
    h.run_until(22, 0);
    assert_eq!(h.pixel(50, 21), 0x16);
}

#[test]
fn sprite_zero_hit_needs_overlap() {
    let mut h = sprite_scene(0x00);

    h.run_until(21, 50);
    assert_eq!(h.ppu.status & STATUS_SPRITE_ZERO_HIT, 0);

    h.tick();
    assert_ne!(h.ppu.status & STATUS_SPRITE_ZERO_HIT, 0);
}

#[test]
fn sprite_zero_hit_requires_opaque_background() {
    let mut h = sprite_scene(0x00);
    h.write(0x2001, MASK_SPRITES | MASK_SPRITES_LEFT);

    h.run_until(30, 0);
    assert_eq!(h.ppu.status & STATUS_SPRITE_ZERO_HIT, 0);
}

/// Sprite 0 is a one-pixel-wide column at OAM X `x`, over the solid background.
fn sprite_zero_column(x: u8) -> Harness {
    let mut h = Harness::new();
    h.solid_background();
    h.tile(2, [0x80; 8]);
    h.poke(0x3F11, &[0x30]);
    h.hide_all_sprites();
    h.ppu.oam[..4].copy_from_slice(&[20, 2, 0x00, x]);
    h.enable(MASK_BACKGROUND | MASK_BACKGROUND_LEFT | MASK_SPRITES | MASK_SPRITES_LEFT);
    h
}

#[test]
fn sprite_zero_hit_is_never_reported_at_dot_254() {
    let mut h = sprite_zero_column(254);
    h.run_until(30, 0);
    assert_eq!(h.pixel(254, 21), 0x30);
    assert_eq!(h.ppu.status & STATUS_SPRITE_ZERO_HIT, 0);

    let mut h = sprite_zero_column(253);
    h.run_until(21, 253);
    assert_eq!(h.ppu.status & STATUS_SPRITE_ZERO_HIT, 0);
    h.tick();
    assert_ne!(h.ppu.status & STATUS_SPRITE_ZERO_HIT, 0);
}
