//! NES emulator entry point.
//!
//! Loads a cartridge and runs the console in a window with sound.
//! Usage: famicore <ROM> [--config PATH] [--scale N] [--mute] [--trace] [-v...]

use std::path::PathBuf;
use std::process::ExitCode;

use ansi_term::Colour::Red;
use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser};
use famicore::{
    apu::apu::{APU, SAMPLE_RATE},
    cartridge::cartridge::Cartridge,
    config::{Config, KeyBindings, MAX_SCALE},
    controller::{Buttons, Port},
    nes::{Nes, Screen},
    ppu::ppu::{NES_PALETTE_RGB, SCREEN_HEIGHT, SCREEN_WIDTH},
};
use minifb::{Key, ScaleMode, Window, WindowOptions};
use rodio::{OutputStream, Sink, buffer::SamplesBuffer};
use tracing::Level;

/// Queued audio chunks (one per frame) before new ones are dropped to cap latency.
const MAX_QUEUED_FRAMES: usize = 4;

#[derive(Parser)]
#[command(version, about = "Cycle-counted NES emulator")]
struct Args {
    /// iNES image to run.
    rom: PathBuf,
    /// TOML settings file; defaults are used when it does not exist.
    #[arg(long, default_value = "famicore.toml")]
    config: PathBuf,
    /// Window scale, overriding the config file.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=MAX_SCALE as i64))]
    scale: Option<u8>,
    #[arg(long)]
    mute: bool,
    /// Print every executed instruction.
    #[arg(long)]
    trace: bool,
    /// -v info, -vv debug, -vvv trace.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// 256×240 RGB framebuffer handed to the window once per frame.
struct Framebuffer {
    pixels: Vec<u32>,
}

impl Screen for Framebuffer {
    fn draw_pixel(&mut self, x: usize, y: usize, colour: u8) {
        self.pixels[y * SCREEN_WIDTH + x] = NES_PALETTE_RGB[(colour & 0x3F) as usize];
    }

    fn present_frame(&mut self) {}
}

struct Speaker {
    // Dropping the stream stops playback.
    _stream: OutputStream,
    sink: Sink,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("{} {err:#}", Red.bold().paint("error:"));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> Result<()> {
    let mut config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(scale) = args.scale {
        config.scale = scale as usize;
    }
    config.audio.mute |= args.mute;

    let cart = Cartridge::load(&args.rom)
        .with_context(|| format!("loading {}", args.rom.display()))?;
    let screen = Framebuffer {
        pixels: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT],
    };
    let mut nes = Nes::new(cart, screen, APU::new());
    nes.cpu.trace = args.trace;

    let pads = [
        (resolve_bindings(&config.player1)?, nes.buttons(Port::One)),
        (resolve_bindings(&config.player2)?, nes.buttons(Port::Two)),
    ];

    let speaker = if config.audio.mute {
        None
    } else {
        match open_audio(config.audio.volume) {
            Ok(speaker) => Some(speaker),
            Err(err) => {
                tracing::warn!("audio disabled: {err:#}");
                None
            }
        }
    };

    let mut window = Window::new(
        "Famicore",
        SCREEN_WIDTH * config.scale,
        SCREEN_HEIGHT * config.scale,
        WindowOptions {
            resize: true,
            scale_mode: ScaleMode::AspectRatioStretch,
            ..WindowOptions::default()
        },
    )
    .context("creating window")?;
    window.set_target_fps(60);

    while window.is_open() && !window.is_key_down(Key::Escape) {
        for (bindings, buttons) in &pads {
            poll_pad(&window, bindings, buttons);
        }

        nes.run_frame().context("emulation stopped")?;

        let samples = nes.cpu.bus.apu.take_samples();
        if let Some(speaker) = &speaker {
            if speaker.sink.len() < MAX_QUEUED_FRAMES {
                speaker.sink.append(SamplesBuffer::new(1, SAMPLE_RATE, samples));
            }
        }

        window
            .update_with_buffer(&nes.screen.pixels, SCREEN_WIDTH, SCREEN_HEIGHT)
            .context("updating window")?;
    }

    Ok(())
}

fn open_audio(volume: f32) -> Result<Speaker> {
    let (stream, handle) = OutputStream::try_default()?;
    let sink = Sink::try_new(&handle)?;
    sink.set_volume(volume);
    Ok(Speaker {
        _stream: stream,
        sink,
    })
}

fn poll_pad(window: &Window, bindings: &[(Key, u8)], buttons: &Buttons) {
    let state = bindings
        .iter()
        .filter(|(key, _)| window.is_key_down(*key))
        .fold(0, |state, (_, bit)| state | bit);
    buttons.set(state);
}

fn resolve_bindings(bindings: &KeyBindings) -> Result<Vec<(Key, u8)>> {
    bindings
        .buttons()
        .into_iter()
        .map(|(name, bit)| {
            key_from_name(name)
                .map(|key| (key, bit))
                .ok_or_else(|| anyhow!("unknown key name `{name}` in key bindings"))
        })
        .collect()
}

fn key_from_name(name: &str) -> Option<Key> {
    let key = match name {
        "A" => Key::A,
        "B" => Key::B,
        "C" => Key::C,
        "D" => Key::D,
        "E" => Key::E,
        "F" => Key::F,
        "G" => Key::G,
        "H" => Key::H,
        "I" => Key::I,
        "J" => Key::J,
        "K" => Key::K,
        "L" => Key::L,
        "M" => Key::M,
        "N" => Key::N,
        "O" => Key::O,
        "P" => Key::P,
        "Q" => Key::Q,
        "R" => Key::R,
        "S" => Key::S,
        "T" => Key::T,
        "U" => Key::U,
        "V" => Key::V,
        "W" => Key::W,
        "X" => Key::X,
        "Y" => Key::Y,
        "Z" => Key::Z,
        "0" => Key::Key0,
        "1" => Key::Key1,
        "2" => Key::Key2,
        "3" => Key::Key3,
        "4" => Key::Key4,
        "5" => Key::Key5,
        "6" => Key::Key6,
        "7" => Key::Key7,
        "8" => Key::Key8,
        "9" => Key::Key9,
        "Up" => Key::Up,
        "Down" => Key::Down,
        "Left" => Key::Left,
        "Right" => Key::Right,
        "Enter" => Key::Enter,
        "Space" => Key::Space,
        "Tab" => Key::Tab,
        "Backspace" => Key::Backspace,
        "LeftShift" => Key::LeftShift,
        "RightShift" => Key::RightShift,
        "LeftCtrl" => Key::LeftCtrl,
        "RightCtrl" => Key::RightCtrl,
        "LeftAlt" => Key::LeftAlt,
        "RightAlt" => Key::RightAlt,
        "Comma" => Key::Comma,
        "Period" => Key::Period,
        "Slash" => Key::Slash,
        "Semicolon" => Key::Semicolon,
        "Apostrophe" => Key::Apostrophe,
        _ => return None,
    };
    Some(key)
}
