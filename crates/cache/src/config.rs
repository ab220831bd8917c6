//! Compositor options controlling diagnostics and debug highlighting.
//!
//! Options can be loaded from a TOML file, environment variables, or created
//! programmatically. All options default to off.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const ENV_FRAME_STATISTICS: &str = "SKY_SHOW_FRAME_STATISTICS";
const ENV_RASTERIZER_STATISTICS: &str = "SKY_SHOW_RASTERIZER_STATISTICS";
const ENV_HIGHLIGHT_RASTERIZED: &str = "SKY_HIGHLIGHT_RASTERIZED_IMAGES";

/// A single boolean compositor toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositorOption {
    /// Overlay the frame index and last frame duration
    DisplayFrameStatistics,
    /// Overlay raster cache hit/fill/eviction counters
    DisplayRasterizerStatistics,
    /// Draw a checkerboard over every freshly rasterized picture
    HighlightRasterizedImages,
}

/// Configuration for the compositor.
///
/// Expected file format:
/// ```toml
/// show_frame_statistics = true
/// show_rasterizer_statistics = false
/// highlight_rasterized_images = false
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorOptions {
    pub show_frame_statistics: bool,
    pub show_rasterizer_statistics: bool,
    pub highlight_rasterized_images: bool,
}

impl CompositorOptions {
    /// Returns true if `option` is turned on
    pub fn is_enabled(&self, option: CompositorOption) -> bool {
        match option {
            CompositorOption::DisplayFrameStatistics => self.show_frame_statistics,
            CompositorOption::DisplayRasterizerStatistics => self.show_rasterizer_statistics,
            CompositorOption::HighlightRasterizedImages => self.highlight_rasterized_images,
        }
    }

    pub fn set_enabled(&mut self, option: CompositorOption, enabled: bool) {
        let slot = match option {
            CompositorOption::DisplayFrameStatistics => &mut self.show_frame_statistics,
            CompositorOption::DisplayRasterizerStatistics => &mut self.show_rasterizer_statistics,
            CompositorOption::HighlightRasterizedImages => &mut self.highlight_rasterized_images,
        };
        *slot = enabled;
    }

    /// Builder form of [`set_enabled`](Self::set_enabled) turning `option` on
    pub fn with(mut self, option: CompositorOption) -> Self {
        self.set_enabled(option, true);
        self
    }

    /// Returns the default options file location for the current platform.
    ///
    /// - macOS: ~/Library/Application Support/sky/compositor.toml
    /// - Linux: ~/.config/sky/compositor.toml
    /// - Windows: %APPDATA%\sky\compositor.toml
    pub fn default_config_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("sky").join("compositor.toml")
        } else {
            PathBuf::from("sky/compositor.toml")
        }
    }

    /// Loads the default options file if it exists, then applies environment
    /// overrides on top.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be parsed, or if an
    /// environment variable holds an invalid value.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_config_path();
        let base = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        base.apply_env()
    }

    /// Loads options from environment variables.
    ///
    /// Environment variables (accepting `1/0`, `true/false`, `on/off`, `yes/no`):
    /// - `SKY_SHOW_FRAME_STATISTICS`
    /// - `SKY_SHOW_RASTERIZER_STATISTICS`
    /// - `SKY_HIGHLIGHT_RASTERIZED_IMAGES`
    ///
    /// # Errors
    /// Returns an error if any environment variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }

    /// Overrides fields with any environment variables that are set
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        let overrides = [
            (ENV_FRAME_STATISTICS, CompositorOption::DisplayFrameStatistics),
            (ENV_RASTERIZER_STATISTICS, CompositorOption::DisplayRasterizerStatistics),
            (ENV_HIGHLIGHT_RASTERIZED, CompositorOption::HighlightRasterizedImages),
        ];

        for (name, option) in overrides {
            if let Ok(value) = std::env::var(name) {
                let enabled =
                    parse_flag(&value).ok_or_else(|| ConfigError::InvalidValue(name.to_string()))?;
                self.set_enabled(option, enabled);
            }
        }

        Ok(self)
    }

    /// Loads options from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Parses options from a TOML string. Missing keys keep their defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Saves options to a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path.as_ref(), self.to_toml()?)?;
        Ok(())
    }

    /// Converts options to TOML format.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid value for a configuration parameter
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    /// I/O error reading or writing configuration file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Malformed TOML
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Options could not be encoded as TOML
    #[error("serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
