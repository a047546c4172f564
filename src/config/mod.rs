//! # Configuration Management Module
//!
//! Engine settings loaded from a TOML file. Menu definitions live in their own
//! files under `[menus].dir` and are handled by [`crate::menu::registry`].
//!
//! ## Configuration Structure
//!
//! - [`EngineConfig`] - lore wrapping, update intervals, command surface
//! - [`MenusConfig`] - where menu definition files live
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gridmenus::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("gridmenus.toml").await?;
//!     let config = Config::load("gridmenus.toml").await?;
//!     println!("Menus from: {}", config.menus.dir);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [engine]
//! max_line_length = 30
//! force_word_break = true
//! default_lore_color = "§7"
//! min_update_interval_secs = 0.05
//! default_update_interval_secs = 1.0
//! command_permission = "gridmenus.command"
//! base_command = "gui"
//! xp_points_per_level_fallback = 100
//!
//! [menus]
//! dir = "menus"
//!
//! [logging]
//! level = "info"
//! file = "gridmenus.log"
//! ```
//!
//! Every key has a default, so a partial file (or an empty one) loads.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::format::TextFormatter;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub menus: MenusConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Lore wrap width in characters.
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    /// Hard-split words longer than the wrap width.
    #[serde(default = "default_true")]
    pub force_word_break: bool,
    #[serde(default = "default_lore_color")]
    pub default_lore_color: String,
    /// Floor applied to a menu's `update_interval`.
    #[serde(default = "default_min_update_interval")]
    pub min_update_interval_secs: f64,
    /// Interval used when a menu with live items sets none.
    #[serde(default = "default_update_interval")]
    pub default_update_interval_secs: f64,
    #[serde(default = "default_command_permission")]
    pub command_permission: String,
    /// Label of the generic "open by id" command.
    #[serde(default = "default_base_command")]
    pub base_command: String,
    /// Points per level for `has exp` when the host cannot report totals. 0 disables.
    #[serde(default = "default_xp_per_level")]
    pub xp_points_per_level_fallback: u32,
}

fn default_max_line_length() -> usize {
    30
}

fn default_true() -> bool {
    true
}

fn default_lore_color() -> String {
    "§7".to_string()
}

fn default_min_update_interval() -> f64 {
    0.05
}

fn default_update_interval() -> f64 {
    1.0
}

fn default_command_permission() -> String {
    "gridmenus.command".to_string()
}

fn default_base_command() -> String {
    "gui".to_string()
}

fn default_xp_per_level() -> u32 {
    100
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_line_length: default_max_line_length(),
            force_word_break: true,
            default_lore_color: default_lore_color(),
            min_update_interval_secs: default_min_update_interval(),
            default_update_interval_secs: default_update_interval(),
            command_permission: default_command_permission(),
            base_command: default_base_command(),
            xp_points_per_level_fallback: default_xp_per_level(),
        }
    }
}

impl EngineConfig {
    pub fn text_formatter(&self) -> TextFormatter {
        TextFormatter::new(
            self.max_line_length,
            self.force_word_break,
            self.default_lore_color.clone(),
        )
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_line_length == 0 {
            return Err(anyhow!("engine.max_line_length must be at least 1"));
        }
        if !(self.min_update_interval_secs.is_finite() && self.min_update_interval_secs > 0.0) {
            return Err(anyhow!("engine.min_update_interval_secs must be a positive number"));
        }
        if !self.default_update_interval_secs.is_finite() {
            return Err(anyhow!("engine.default_update_interval_secs must be a number"));
        }
        if self.base_command.trim().is_empty() || self.base_command.contains(char::is_whitespace) {
            return Err(anyhow!("engine.base_command must be a single word"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenusConfig {
    #[serde(default = "default_menus_dir")]
    pub dir: String,
}

fn default_menus_dir() -> String {
    "menus".to_string()
}

impl Default for MenusConfig {
    fn default() -> Self {
        Self {
            dir: default_menus_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: Some("gridmenus.log".to_string()),
        }
    }
}

impl Config {
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config
            .engine
            .validate()
            .map_err(|e| anyhow!("Invalid config file {}: {}", path, e))?;

        Ok(config)
    }

    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}
