//! The 15-bit `v`/`t` VRAM address register ("loopy" register).
//!
//! ```text
//! yyy NN YYYYY XXXXX
//! ||| || ||||| +++++-- coarse X scroll
//! ||| || +++++-------- coarse Y scroll
//! ||| ++-------------- nametable select
//! +++----------------- fine Y scroll
//! ```
//!
//! See [PPU scrolling](https://www.nesdev.org/wiki/PPU_scrolling).

const COARSE_X: u16 = 0x001F;
const COARSE_Y: u16 = 0x03E0;
const NAMETABLE_X: u16 = 0x0400;
const NAMETABLE_Y: u16 = 0x0800;
const NAMETABLE: u16 = NAMETABLE_X | NAMETABLE_Y;
const FINE_Y: u16 = 0x7000;

const HORIZONTAL_BITS: u16 = COARSE_X | NAMETABLE_X;
const VERTICAL_BITS: u16 = COARSE_Y | NAMETABLE_Y | FINE_Y;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VramAddr(u16);

impl VramAddr {
    pub fn new(raw: u16) -> Self {
        Self(raw & 0x7FFF)
    }

    pub fn get(self) -> u16 {
        self.0
    }

    pub fn coarse_x(self) -> u8 {
        (self.0 & COARSE_X) as u8
    }

    pub fn coarse_y(self) -> u8 {
        ((self.0 & COARSE_Y) >> 5) as u8
    }

    pub fn nametable(self) -> u8 {
        ((self.0 & NAMETABLE) >> 10) as u8
    }

    pub fn fine_y(self) -> u8 {
        ((self.0 & FINE_Y) >> 12) as u8
    }

    pub fn set_coarse_x(&mut self, value: u8) {
        self.0 = (self.0 & !COARSE_X) | (value as u16 & 0x1F);
    }

    pub fn set_coarse_y(&mut self, value: u8) {
        self.0 = (self.0 & !COARSE_Y) | ((value as u16 & 0x1F) << 5);
    }

    pub fn set_nametable(&mut self, value: u8) {
        self.0 = (self.0 & !NAMETABLE) | ((value as u16 & 0x03) << 10);
    }

    pub fn set_fine_y(&mut self, value: u8) {
        self.0 = (self.0 & !FINE_Y) | ((value as u16 & 0x07) << 12);
    }

    /// First $2006 write: bits 8–13 from `data`, bit 14 cleared.
    pub fn set_high_byte(&mut self, data: u8) {
        self.0 = (self.0 & 0x00FF) | ((data as u16 & 0x3F) << 8);
    }

    /// Second $2006 write.
    pub fn set_low_byte(&mut self, data: u8) {
        self.0 = (self.0 & 0x7F00) | data as u16;
    }

    /// $2007 auto-increment.
    pub fn increment(&mut self, step: u16) {
        self.0 = self.0.wrapping_add(step) & 0x7FFF;
    }

    /// Next tile to the right, switching horizontal nametable after column 31.
    pub fn increment_x(&mut self) {
        if self.coarse_x() == 31 {
            self.0 &= !COARSE_X;
            self.0 ^= NAMETABLE_X;
        } else {
            self.0 += 1;
        }
    }

    /// Next pixel row. Coarse Y wraps at 29 into the other vertical nametable; a coarse Y
    /// of 30 or 31 (attribute rows) runs on to 31 and then wraps to 0 without switching.
    pub fn increment_y(&mut self) {
        let fine_y = self.fine_y();
        if fine_y < 7 {
            self.set_fine_y(fine_y + 1);
            return;
        }

        self.set_fine_y(0);
        match self.coarse_y() {
            29 => {
                self.set_coarse_y(0);
                self.0 ^= NAMETABLE_Y;
            }
            31 => self.set_coarse_y(0),
            y => self.set_coarse_y(y + 1),
        }
    }

    /// Copy coarse X and the horizontal nametable bit from `t`.
    pub fn copy_x(&mut self, t: VramAddr) {
        self.0 = (self.0 & !HORIZONTAL_BITS) | (t.0 & HORIZONTAL_BITS);
    }

    /// Copy fine Y, coarse Y and the vertical nametable bit from `t`.
    pub fn copy_y(&mut self, t: VramAddr) {
        self.0 = (self.0 & !VERTICAL_BITS) | (t.0 & VERTICAL_BITS);
    }

    /// Nametable byte for the current tile.
    pub fn tile_addr(self) -> u16 {
        0x2000 | (self.0 & 0x0FFF)
    }

    /// Attribute byte covering the current tile.
    pub fn attribute_addr(self) -> u16 {
        0x23C0 | (self.0 & NAMETABLE) | ((self.0 >> 4) & 0x38) | ((self.0 >> 2) & 0x07)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_pack_into_documented_bits() {
        let mut v = VramAddr::default();
        v.set_coarse_x(0x15);
        v.set_coarse_y(0x0A);
        v.set_nametable(2);
        v.set_fine_y(5);

        assert_eq!(v.get(), 0b101_10_01010_10101);
        assert_eq!(v.coarse_x(), 0x15);
        assert_eq!(v.coarse_y(), 0x0A);
        assert_eq!(v.nametable(), 2);
        assert_eq!(v.fine_y(), 5);
    }

    #[test]
    fn increment_x_wraps_into_next_nametable() {
        let mut v = VramAddr::default();
        v.set_coarse_x(31);
        v.increment_x();
        assert_eq!(v.coarse_x(), 0);
        assert_eq!(v.nametable(), 1);

        v.set_coarse_x(31);
        v.increment_x();
        assert_eq!(v.nametable(), 0);
    }

    #[test]
    fn increment_y_wraps_at_row_29() {
        let mut v = VramAddr::default();
        v.set_fine_y(7);
        v.set_coarse_y(29);
        v.increment_y();

        assert_eq!(v.fine_y(), 0);
        assert_eq!(v.coarse_y(), 0);
        assert_eq!(v.nametable(), 2);
    }

    #[test]
    fn increment_y_from_row_31_does_not_switch_nametable() {
        let mut v = VramAddr::default();
        v.set_fine_y(7);
        v.set_coarse_y(31);
        v.increment_y();

        assert_eq!(v.coarse_y(), 0);
        assert_eq!(v.nametable(), 0);

        v.set_fine_y(7);
        v.set_coarse_y(30);
        v.increment_y();
        assert_eq!(v.coarse_y(), 31);
    }

    #[test]
    fn copies_only_the_named_axis() {
        let t = VramAddr::new(0x7FFF);

        let mut v = VramAddr::default();
        v.copy_x(t);
        assert_eq!(v.get(), 0x041F);

        let mut v = VramAddr::default();
        v.copy_y(t);
        assert_eq!(v.get(), 0x7BE0);
    }

    #[test]
    fn attribute_address_groups_four_by_four_tiles() {
        let mut v = VramAddr::default();
        v.set_nametable(1);
        v.set_coarse_x(9);
        v.set_coarse_y(17);

        assert_eq!(v.tile_addr(), 0x2400 + 17 * 32 + 9);
        assert_eq!(v.attribute_addr(), 0x27C0 + (17 / 4) * 8 + 9 / 4);
    }
}
