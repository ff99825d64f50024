//! NES controller input handling.
//!
//! Implements the standard NES controller shift register protocol:
//! while bit 0 of $4016 is held high the pad keeps reporting button A; once it
//! drops, each read of $4016/$4017 returns the next button in the order
//! A, B, Select, Start, Up, Down, Left, Right. After all eight the official pad
//! returns 1.
//!
//! Button state is written by the host's input side, possibly from another thread,
//! so it lives in a shared atomic byte ([`Buttons`]) instead of the controller itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

pub const BUTTON_A: u8 = 1 << 0;
pub const BUTTON_B: u8 = 1 << 1;
pub const BUTTON_SELECT: u8 = 1 << 2;
pub const BUTTON_START: u8 = 1 << 3;
pub const BUTTON_UP: u8 = 1 << 4;
pub const BUTTON_DOWN: u8 = 1 << 5;
pub const BUTTON_LEFT: u8 = 1 << 6;
pub const BUTTON_RIGHT: u8 = 1 << 7;

/// Joypad port, read through $4016 (`One`) or $4017 (`Two`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    One,
    Two,
}

impl Port {
    pub fn index(self) -> usize {
        match self {
            Port::One => 0,
            Port::Two => 1,
        }
    }
}

/// Handle to one pad's pressed buttons, one bit per `BUTTON_*` constant.
#[derive(Clone, Default)]
pub struct Buttons(Arc<AtomicU8>);

impl Buttons {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole button byte (one snapshot per host poll).
    pub fn set(&self, state: u8) {
        self.0.store(state, Ordering::Relaxed);
    }

    pub fn press(&self, button: u8) {
        self.0.fetch_or(button, Ordering::Relaxed);
    }

    pub fn release(&self, button: u8) {
        self.0.fetch_and(!button, Ordering::Relaxed);
    }

    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Relaxed)
    }
}

/// One NES controller port.
pub struct Controller {
    buttons: Buttons,
    /// Next button to report, 0 (A) through 7 (Right); 8 once exhausted.
    index: u8,
    strobe: bool,
}

impl Controller {
    /// Create a new controller with no buttons pressed.
    pub fn new() -> Self {
        Self::with_buttons(Buttons::new())
    }

    pub fn with_buttons(buttons: Buttons) -> Self {
        Controller {
            buttons,
            index: 0,
            strobe: false,
        }
    }

    /// A second handle onto this pad's button state, for the input side.
    pub fn buttons(&self) -> Buttons {
        self.buttons.clone()
    }

    /// One serial read: bit 0 carries the button, the upper bits are left to the bus.
    pub fn read(&mut self) -> u8 {
        if self.strobe {
            return self.buttons.get() & BUTTON_A;
        }
        if self.index >= 8 {
            return 1;
        }

        let bit = (self.buttons.get() >> self.index) & 1;
        self.index += 1;
        bit
    }

    /// Bit 0 of a $4016 write. Holding it high keeps the shift register at button A.
    pub fn set_strobe(&mut self, strobe: bool) {
        self.strobe = strobe;
        if strobe {
            self.index = 0;
        }
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}
