//! Configuration for lipi.
//!
//! Loaded with the following precedence (highest to lowest):
//! 1. CLI flags (--font-size, --theme, --shell, ...)
//! 2. Environment variables (LIPI_FONT_SIZE, LIPI_THEME, ...)
//! 3. Config file (~/.config/lipi/config.toml, or XDG_CONFIG_HOME)
//! 4. Built-in defaults

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// CLI overrides collected by `main`
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub font_size: Option<f32>,
    pub theme: Option<ThemeName>,
    pub shell: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
}

impl ThemeName {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "dark" => Some(ThemeName::Dark),
            "light" => Some(ThemeName::Light),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Font file path; when unset, common monospace fonts are probed
    pub font_path: Option<PathBuf>,
    /// Font size in points
    pub font_size: f32,
    /// Initial dimensions (columns, rows)
    pub dimensions: (u16, u16),
    pub theme: ThemeName,
    /// Shell command (None = $SHELL)
    pub shell: Option<String>,
    pub cursor_blink: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            font_path: None,
            font_size: 14.0,
            dimensions: (80, 24),
            theme: ThemeName::Dark,
            shell: None,
            cursor_blink: true,
        }
    }
}

impl Config {
    /// Default config file location following XDG conventions
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg).join("lipi/config.toml"));
        }
        env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join(".config/lipi/config.toml"))
    }

    pub fn load(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load with full precedence: file, then env, then CLI
    pub fn load_with_args(args: &CliArgs) -> Result<Self, ConfigError> {
        let path = args.config_path.clone().or_else(Self::default_path);
        let mut config = match path {
            Some(ref p) if p.exists() => Self::load(p)?,
            _ => Config::default(),
        };

        config.apply_env();
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(size) = env::var("LIPI_FONT_SIZE") {
            if let Ok(size) = size.parse() {
                self.font_size = size;
            }
        }
        if let Ok(theme) = env::var("LIPI_THEME") {
            if let Some(theme) = ThemeName::parse(&theme) {
                self.theme = theme;
            }
        }
        if let Ok(shell) = env::var("LIPI_SHELL") {
            self.shell = Some(shell);
        }
        if let Ok(font) = env::var("LIPI_FONT_PATH") {
            self.font_path = Some(PathBuf::from(font));
        }
    }

    fn apply_args(&mut self, args: &CliArgs) {
        if let Some(size) = args.font_size {
            self.font_size = size;
        }
        if let Some(theme) = args.theme {
            self.theme = theme;
        }
        if let Some(ref shell) = args.shell {
            self.shell = Some(shell.clone());
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(4.0..=128.0).contains(&self.font_size) {
            return Err(ConfigError::Invalid(format!(
                "font_size {} out of range 4..=128",
                self.font_size
            )));
        }
        if self.dimensions.0 < 2 || self.dimensions.1 < 2 {
            return Err(ConfigError::Invalid(format!(
                "dimensions {:?} too small",
                self.dimensions
            )));
        }
        Ok(())
    }

    pub fn colors(&self) -> ColorScheme {
        match self.theme {
            ThemeName::Dark => ColorScheme::dark(),
            ThemeName::Light => ColorScheme::light(),
        }
    }
}

/// Resolved RGB colors for the renderer
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub foreground: (u8, u8, u8),
    pub background: (u8, u8, u8),
    pub cursor: (u8, u8, u8),
    /// ANSI colors 0-15
    pub ansi: [(u8, u8, u8); 16],
}

impl ColorScheme {
    pub fn dark() -> Self {
        ColorScheme {
            foreground: (212, 212, 212),
            background: (18, 18, 18),
            cursor: (255, 255, 255),
            ansi: [
                (0, 0, 0),
                (205, 49, 49),
                (13, 188, 121),
                (229, 229, 16),
                (36, 114, 200),
                (188, 63, 188),
                (17, 168, 205),
                (229, 229, 229),
                (102, 102, 102),
                (241, 76, 76),
                (35, 209, 139),
                (245, 245, 67),
                (59, 142, 234),
                (214, 112, 214),
                (41, 184, 219),
                (255, 255, 255),
            ],
        }
    }

    pub fn light() -> Self {
        ColorScheme {
            foreground: (40, 40, 40),
            background: (250, 250, 250),
            cursor: (30, 30, 30),
            ansi: [
                (0, 0, 0),
                (170, 0, 0),
                (0, 140, 0),
                (153, 153, 0),
                (0, 0, 178),
                (178, 0, 178),
                (0, 166, 178),
                (191, 191, 191),
                (85, 85, 85),
                (230, 0, 0),
                (0, 200, 0),
                (230, 230, 0),
                (0, 0, 255),
                (230, 0, 230),
                (0, 230, 230),
                (255, 255, 255),
            ],
        }
    }
}
