//! Configuration system

pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Persisted display mode preferences
///
/// Drives [`Display::switch_display_mode`](crate::display::Display::switch_display_mode)
/// at startup and whenever the player changes video options.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DisplaySettings {
    /// Run in a desktop window rather than exclusive fullscreen
    pub windowed: bool,
    /// Back buffer width in pixels
    pub width: u32,
    /// Back buffer height in pixels
    pub height: u32,
    /// Requested color depth; only 16 and 32 are valid in fullscreen
    pub bpp: u32,
    /// Fullscreen refresh rate in Hz; 0 selects the driver default
    pub refresh_hz: u32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            windowed: true,
            width: 640,
            height: 480,
            bpp: 16,
            refresh_hz: 0,
        }
    }
}

impl Config for DisplaySettings {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_settings_defaults() {
        let settings = DisplaySettings::default();
        assert!(settings.windowed);
        assert_eq!((settings.width, settings.height), (640, 480));
        assert_eq!(settings.bpp, 16);
        assert_eq!(settings.refresh_hz, 0);
    }

    #[test]
    fn test_display_settings_toml_round_trip() {
        let settings = DisplaySettings {
            windowed: false,
            width: 800,
            height: 600,
            bpp: 32,
            refresh_hz: 60,
        };

        let text = toml::to_string_pretty(&settings).unwrap();
        let parsed: DisplaySettings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let parsed: DisplaySettings = toml::from_str("width = 1024\nheight = 768\n").unwrap();
        assert_eq!((parsed.width, parsed.height), (1024, 768));
        assert!(parsed.windowed);
        assert_eq!(parsed.bpp, 16);
    }
}
