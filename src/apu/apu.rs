//! NES APU: the audio half of the Ricoh 2A03.
//!
//! Two pulse channels, triangle and noise, clocked once per APU cycle (two CPU cycles) by the
//! console's master clock, plus the [frame counter](https://www.nesdev.org/wiki/APU_Frame_Counter)
//! that drives envelopes, length counters and sweeps and can raise the frame IRQ. Output goes
//! through the non-linear [mixer](https://www.nesdev.org/wiki/APU_Mixer) into a 44.1 kHz buffer
//! the host drains.

use crate::nes::Audio;

pub const SAMPLE_RATE: u32 = 44_100;

/// NTSC APU clock is half the CPU's 1.789773 MHz.
const APU_CYCLES_PER_SAMPLE: f64 = 1_789_773.0 / 2.0 / SAMPLE_RATE as f64;

/// Length counter lookup table: 5-bit index from register → count. APU_Length_Counter.
const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, 12, 16, 24, 18, 48, 20, 96, 22,
    192, 24, 72, 26, 16, 28, 32, 30,
];

/// Noise periods in CPU cycles (NTSC).
const NOISE_PERIOD_TABLE: [u16; 16] = [
    4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
];

const PULSE_DUTY: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0], // 12.5%
    [0, 1, 1, 0, 0, 0, 0, 0], // 25%
    [0, 1, 1, 1, 1, 0, 0, 0], // 50%
    [1, 0, 0, 1, 1, 1, 1, 1], // 25% negated
];

const TRIANGLE_SEQUENCE: [u8; 32] = [
    15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12,
    13, 14, 15,
];

// Frame counter steps, in APU cycles.
const STEP_1: u32 = 3729;
const STEP_2: u32 = 7457;
const STEP_3: u32 = 11186;
const STEP_4: u32 = 14915;
const STEP_5: u32 = 18641;

pub const STATUS_FRAME_IRQ: u8 = 0x40;

#[derive(Default)]
struct LengthCounter {
    enabled: bool,
    halt: bool,
    value: u8,
}

impl LengthCounter {
    fn load(&mut self, index: u8) {
        if self.enabled {
            self.value = LENGTH_TABLE[(index & 0x1F) as usize];
        }
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.value = 0;
        }
    }

    fn clock(&mut self) {
        if !self.halt && self.value > 0 {
            self.value -= 1;
        }
    }

    fn active(&self) -> bool {
        self.value > 0
    }
}

/// Volume envelope shared by pulse and noise. The loop flag doubles as the length counter halt.
#[derive(Default)]
struct Envelope {
    start: bool,
    looping: bool,
    constant: bool,
    /// Constant volume, or the divider period when decaying.
    volume: u8,
    divider: u8,
    decay: u8,
}

impl Envelope {
    fn write(&mut self, data: u8) {
        self.looping = data & 0x20 != 0;
        self.constant = data & 0x10 != 0;
        self.volume = data & 0x0F;
    }

    fn clock(&mut self) {
        if self.start {
            self.start = false;
            self.decay = 15;
            self.divider = self.volume;
            return;
        }

        if self.divider > 0 {
            self.divider -= 1;
            return;
        }
        self.divider = self.volume;
        if self.decay > 0 {
            self.decay -= 1;
        } else if self.looping {
            self.decay = 15;
        }
    }

    fn output(&self) -> u8 {
        if self.constant { self.volume } else { self.decay }
    }
}

/// Square channel ($4000–$4003, $4004–$4007).
struct Pulse {
    /// Pulse 1 negates its sweep with ones' complement, pulse 2 with two's complement.
    ones_complement: bool,
    duty: u8,
    step: u8,
    period: u16,
    timer: u16,
    envelope: Envelope,
    length: LengthCounter,
    sweep_enabled: bool,
    sweep_period: u8,
    sweep_negate: bool,
    sweep_shift: u8,
    sweep_divider: u8,
    sweep_reload: bool,
}

impl Pulse {
    fn new(ones_complement: bool) -> Self {
        Self {
            ones_complement,
            duty: 0,
            step: 0,
            period: 0,
            timer: 0,
            envelope: Envelope::default(),
            length: LengthCounter::default(),
            sweep_enabled: false,
            sweep_period: 0,
            sweep_negate: false,
            sweep_shift: 0,
            sweep_divider: 0,
            sweep_reload: false,
        }
    }

    fn write(&mut self, reg: u16, data: u8) {
        match reg {
            0 => {
                self.duty = data >> 6;
                self.length.halt = data & 0x20 != 0;
                self.envelope.write(data);
            }
            1 => {
                self.sweep_enabled = data & 0x80 != 0;
                self.sweep_period = (data >> 4) & 0x07;
                self.sweep_negate = data & 0x08 != 0;
                self.sweep_shift = data & 0x07;
                self.sweep_reload = true;
            }
            2 => self.period = (self.period & 0x0700) | data as u16,
            _ => {
                self.period = (self.period & 0x00FF) | ((data & 0x07) as u16) << 8;
                self.length.load(data >> 3);
                self.envelope.start = true;
                self.step = 0;
            }
        }
    }

    /// Period the sweep unit would move to; also decides muting even with the sweep off.
    fn sweep_target(&self) -> u16 {
        let delta = self.period >> self.sweep_shift;
        if !self.sweep_negate {
            return self.period + delta;
        }
        let delta = if self.ones_complement { delta + 1 } else { delta };
        self.period.saturating_sub(delta)
    }

    fn muted(&self) -> bool {
        self.period < 8 || self.sweep_target() > 0x7FF
    }

    fn clock_sweep(&mut self) {
        if self.sweep_divider == 0 && self.sweep_enabled && self.sweep_shift > 0 && !self.muted() {
            self.period = self.sweep_target();
        }
        if self.sweep_divider == 0 || self.sweep_reload {
            self.sweep_divider = self.sweep_period;
            self.sweep_reload = false;
        } else {
            self.sweep_divider -= 1;
        }
    }

    fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.period;
            self.step = (self.step + 1) & 7;
        } else {
            self.timer -= 1;
        }
    }

    fn output(&self) -> u8 {
        if !self.length.active() || self.muted() || PULSE_DUTY[self.duty as usize][self.step as usize] == 0
        {
            return 0;
        }
        self.envelope.output()
    }
}

/// Triangle channel ($4008–$400B). Its timer runs at the CPU rate.
#[derive(Default)]
struct Triangle {
    /// Control flag: halts the length counter and keeps the linear counter reloading.
    control: bool,
    linear_load: u8,
    linear: u8,
    linear_reload: bool,
    period: u16,
    timer: u16,
    step: u8,
    length: LengthCounter,
}

impl Triangle {
    fn write(&mut self, reg: u16, data: u8) {
        match reg {
            0 => {
                self.control = data & 0x80 != 0;
                self.length.halt = self.control;
                self.linear_load = data & 0x7F;
            }
            2 => self.period = (self.period & 0x0700) | data as u16,
            3 => {
                self.period = (self.period & 0x00FF) | ((data & 0x07) as u16) << 8;
                self.length.load(data >> 3);
                self.linear_reload = true;
            }
            _ => {}
        }
    }

    fn clock_linear(&mut self) {
        if self.linear_reload {
            self.linear = self.linear_load;
        } else if self.linear > 0 {
            self.linear -= 1;
        }
        if !self.control {
            self.linear_reload = false;
        }
    }

    fn clock_timer(&mut self) {
        if self.timer > 0 {
            self.timer -= 1;
            return;
        }
        self.timer = self.period;
        if self.length.active() && self.linear > 0 {
            self.step = (self.step + 1) & 31;
        }
    }

    fn output(&self) -> u8 {
        // Ultrasonic periods are silenced instead of aliasing.
        if self.period < 2 {
            return 0;
        }
        TRIANGLE_SEQUENCE[self.step as usize]
    }
}

/// Noise channel ($400C–$400F): 15-bit LFSR. Its timer runs at the CPU rate.
struct Noise {
    short_mode: bool,
    period: u16,
    timer: u16,
    shift: u16,
    envelope: Envelope,
    length: LengthCounter,
}

impl Noise {
    fn new() -> Self {
        Self {
            short_mode: false,
            period: NOISE_PERIOD_TABLE[0],
            timer: 0,
            shift: 1,
            envelope: Envelope::default(),
            length: LengthCounter::default(),
        }
    }

    fn write(&mut self, reg: u16, data: u8) {
        match reg {
            0 => {
                self.length.halt = data & 0x20 != 0;
                self.envelope.write(data);
            }
            2 => {
                self.short_mode = data & 0x80 != 0;
                self.period = NOISE_PERIOD_TABLE[(data & 0x0F) as usize];
            }
            3 => {
                self.length.load(data >> 3);
                self.envelope.start = true;
            }
            _ => {}
        }
    }

    fn clock_timer(&mut self) {
        if self.timer > 0 {
            self.timer -= 1;
            return;
        }
        self.timer = self.period - 1;

        let tap = if self.short_mode { 6 } else { 1 };
        let feedback = (self.shift ^ (self.shift >> tap)) & 1;
        self.shift = (self.shift >> 1) | (feedback << 14);
    }

    fn output(&self) -> u8 {
        if !self.length.active() || self.shift & 1 != 0 {
            return 0;
        }
        self.envelope.output()
    }
}

#[derive(Default)]
struct FrameCounter {
    five_step: bool,
    irq_inhibit: bool,
    irq: bool,
    cycle: u32,
}

/// Which units a frame counter step clocks.
#[derive(Debug, PartialEq, Eq)]
enum FrameEvent {
    None,
    Quarter,
    Half,
}

impl FrameCounter {
    fn clock(&mut self) -> FrameEvent {
        self.cycle += 1;
        match (self.cycle, self.five_step) {
            (STEP_1, _) | (STEP_3, _) => FrameEvent::Quarter,
            (STEP_2, _) => FrameEvent::Half,
            (STEP_4, false) => {
                if !self.irq_inhibit {
                    self.irq = true;
                }
                self.cycle = 0;
                FrameEvent::Half
            }
            (STEP_5, true) => {
                self.cycle = 0;
                FrameEvent::Half
            }
            _ => FrameEvent::None,
        }
    }
}

/// Audio processing unit with a 44.1 kHz sample buffer.
pub struct APU {
    pulse: [Pulse; 2],
    triangle: Triangle,
    noise: Noise,
    frame: FrameCounter,
    sample_phase: f64,
    samples: Vec<f32>,
}

impl Default for APU {
    fn default() -> Self {
        Self::new()
    }
}

impl APU {
    pub fn new() -> Self {
        Self {
            pulse: [Pulse::new(true), Pulse::new(false)],
            triangle: Triangle::default(),
            noise: Noise::new(),
            frame: FrameCounter::default(),
            sample_phase: 0.0,
            samples: Vec::new(),
        }
    }

    /// Hand the samples produced since the last call to the host.
    pub fn take_samples(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.samples)
    }

    fn clock_quarter_frame(&mut self) {
        for pulse in &mut self.pulse {
            pulse.envelope.clock();
        }
        self.noise.envelope.clock();
        self.triangle.clock_linear();
    }

    fn clock_half_frame(&mut self) {
        self.clock_quarter_frame();
        for pulse in &mut self.pulse {
            pulse.length.clock();
            pulse.clock_sweep();
        }
        self.triangle.length.clock();
        self.noise.length.clock();
    }

    fn mix(&self) -> f32 {
        let pulse = (self.pulse[0].output() + self.pulse[1].output()) as f32;
        let tnd = 3.0 * self.triangle.output() as f32 + 2.0 * self.noise.output() as f32;

        let pulse_out = if pulse == 0.0 {
            0.0
        } else {
            95.52 / (8128.0 / pulse + 100.0)
        };
        let tnd_out = if tnd == 0.0 {
            0.0
        } else {
            163.67 / (24329.0 / tnd + 100.0)
        };
        pulse_out + tnd_out
    }
}

impl Audio for APU {
    fn write_register(&mut self, addr: u16, data: u8) {
        match addr {
            0x4000..=0x4003 => self.pulse[0].write(addr - 0x4000, data),
            0x4004..=0x4007 => self.pulse[1].write(addr - 0x4004, data),
            0x4008..=0x400B => self.triangle.write(addr - 0x4008, data),
            0x400C..=0x400F => self.noise.write(addr - 0x400C, data),
            0x4015 => {
                self.pulse[0].length.set_enabled(data & 0x01 != 0);
                self.pulse[1].length.set_enabled(data & 0x02 != 0);
                self.triangle.length.set_enabled(data & 0x04 != 0);
                self.noise.length.set_enabled(data & 0x08 != 0);
            }
            0x4017 => {
                self.frame.five_step = data & 0x80 != 0;
                self.frame.irq_inhibit = data & 0x40 != 0;
                if self.frame.irq_inhibit {
                    self.frame.irq = false;
                }
                self.frame.cycle = 0;
                if self.frame.five_step {
                    self.clock_half_frame();
                }
            }
            // $4010–$4013: DMC is not emulated.
            _ => {}
        }
    }

    /// Bits 0–3: length counter running per channel; bit 6: frame IRQ, cleared by the read.
    fn read_status(&mut self) -> u8 {
        let mut status = 0;
        for (bit, active) in [
            self.pulse[0].length.active(),
            self.pulse[1].length.active(),
            self.triangle.length.active(),
            self.noise.length.active(),
        ]
        .into_iter()
        .enumerate()
        {
            if active {
                status |= 1 << bit;
            }
        }
        if self.frame.irq {
            status |= STATUS_FRAME_IRQ;
        }
        self.frame.irq = false;
        status
    }

    fn tick(&mut self) {
        match self.frame.clock() {
            FrameEvent::Quarter => self.clock_quarter_frame(),
            FrameEvent::Half => self.clock_half_frame(),
            FrameEvent::None => {}
        }

        for pulse in &mut self.pulse {
            pulse.clock_timer();
        }
        for _ in 0..2 {
            self.triangle.clock_timer();
            self.noise.clock_timer();
        }

        self.sample_phase += 1.0;
        if self.sample_phase >= APU_CYCLES_PER_SAMPLE {
            self.sample_phase -= APU_CYCLES_PER_SAMPLE;
            let sample = self.mix();
            self.samples.push(sample);
        }
    }

    fn poll_irq(&self) -> bool {
        self.frame.irq
    }
}
