//! Configuration module for the invite tracker bot.
//!
//! Handles loading and validation of the tracker parameters (rewards,
//! thresholds, message style) and of the Telegram API credentials.

mod settings;
mod tracker;

pub use settings::{BotSettings, ConfigError, TelegramConfig};
pub use tracker::{Preset, Presentation, Style, TrackerConfig, ValidationError};

/// Default path of the tracker configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "tracker.json";
