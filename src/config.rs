//! Host settings read from an optional TOML file.
//!
//! ```toml
//! scale = 3
//!
//! [audio]
//! volume = 0.5
//! mute = false
//!
//! [player1]
//! a = "Z"
//! start = "Enter"
//! ```
//!
//! Every field is optional. Key names are resolved to window keys by the binary.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controller::{
    BUTTON_A, BUTTON_B, BUTTON_DOWN, BUTTON_LEFT, BUTTON_RIGHT, BUTTON_SELECT, BUTTON_START,
    BUTTON_UP,
};

pub const MAX_SCALE: usize = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("config file parsing error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Integer window scale over the 256×240 picture.
    pub scale: usize,
    pub audio: AudioConfig,
    pub player1: KeyBindings,
    pub player2: KeyBindings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AudioConfig {
    pub volume: f32,
    pub mute: bool,
}

/// Host key name for each joypad button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyBindings {
    pub a: String,
    pub b: String,
    pub select: String,
    pub start: String,
    pub up: String,
    pub down: String,
    pub left: String,
    pub right: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scale: 2,
            audio: AudioConfig::default(),
            player1: KeyBindings::default(),
            player2: KeyBindings::player2(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            volume: 0.5,
            mute: false,
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::from_names(["Z", "X", "RightShift", "Enter", "Up", "Down", "Left", "Right"])
    }
}

impl KeyBindings {
    fn player2() -> Self {
        Self::from_names(["K", "J", "U", "I", "W", "S", "A", "D"])
    }

    fn from_names(names: [&str; 8]) -> Self {
        let [a, b, select, start, up, down, left, right] = names.map(String::from);
        Self {
            a,
            b,
            select,
            start,
            up,
            down,
            left,
            right,
        }
    }

    /// Key name paired with the `BUTTON_*` bit it drives.
    pub fn buttons(&self) -> [(&str, u8); 8] {
        [
            (self.a.as_str(), BUTTON_A),
            (self.b.as_str(), BUTTON_B),
            (self.select.as_str(), BUTTON_SELECT),
            (self.start.as_str(), BUTTON_START),
            (self.up.as_str(), BUTTON_UP),
            (self.down.as_str(), BUTTON_DOWN),
            (self.left.as_str(), BUTTON_LEFT),
            (self.right.as_str(), BUTTON_RIGHT),
        ]
    }
}

impl Config {
    /// Read `path`. A missing file is not an error: defaults are used and a warning is logged.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let config = Self::parse(&text)?;
                tracing::info!(path = %path.display(), "loaded config");
                Ok(config)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_SCALE).contains(&self.scale) {
            return Err(ConfigError::Invalid {
                field: "scale",
                reason: format!("{} is outside 1..={MAX_SCALE}", self.scale),
            });
        }
        if !(0.0..=1.0).contains(&self.audio.volume) {
            return Err(ConfigError::Invalid {
                field: "audio.volume",
                reason: format!("{} is outside 0.0..=1.0", self.audio.volume),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = Config::parse(
            r#"
            scale = 4

            [audio]
            mute = true

            [player1]
            a = "Space"
            "#,
        )
        .unwrap();

        assert_eq!(config.scale, 4);
        assert!(config.audio.mute);
        assert_eq!(config.audio.volume, 0.5);
        assert_eq!(config.player1.a, "Space");
        assert_eq!(config.player1.b, "X");
        assert_eq!(config.player2, KeyBindings::player2());
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(matches!(
            Config::parse("scale = 0"),
            Err(ConfigError::Invalid { field: "scale", .. })
        ));
        assert!(matches!(
            Config::parse("[audio]\nvolume = 1.5"),
            Err(ConfigError::Invalid { field: "audio.volume", .. })
        ));
    }

    #[test]
    fn rejects_unknown_fields_and_bad_syntax() {
        assert!(matches!(Config::parse("fullscreen = true"), Err(ConfigError::Parse(_))));
        assert!(matches!(Config::parse("scale = "), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load("/nonexistent/famicore.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn bindings_cover_every_button_once() {
        let mask = KeyBindings::default()
            .buttons()
            .iter()
            .fold(0u8, |mask, &(_, bit)| mask | bit);
        assert_eq!(mask, 0xFF);
    }
}
