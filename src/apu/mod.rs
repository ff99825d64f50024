//! Audio collaborator: the 2A03's sound channels behind the [`crate::nes::Audio`] trait.
//!
//! Pulse ×2, triangle and noise with their envelope, sweep, linear and length units; the
//! 4/5-step frame counter and its IRQ; a non-linear mixer resampled to 44.1 kHz.
//! Delta modulation (DMC) playback is not emulated.

pub mod apu;
