//! Application settings and Telegram configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Telegram API configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Telegram API ID (obtain from <https://my.telegram.org>).
    pub api_id: i32,

    /// Telegram API hash (obtain from <https://my.telegram.org>).
    pub api_hash: String,

    /// Bot token issued by `@BotFather`. Empty until provided.
    #[serde(default)]
    pub bot_token: String,

    /// Path to the session file.
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,
}

fn default_session_path() -> PathBuf {
    PathBuf::from("invite_tracker.session")
}

impl TelegramConfig {
    /// Creates configuration from environment variables.
    ///
    /// Expects `TG_API_ID` and `TG_API_HASH` to be set. `TELEGRAM_BOT_TOKEN`
    /// may be missing, in which case [`Self::has_bot_token`] returns false.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_id: i32 = std::env::var("TG_API_ID")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_ID"))?
            .parse()
            .map_err(|_| ConfigError::InvalidApiId)?;

        let api_hash = std::env::var("TG_API_HASH")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_HASH"))?;

        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default();

        let session_path = std::env::var("TG_SESSION_PATH")
            .map_or_else(|_| default_session_path(), PathBuf::from);

        Ok(Self {
            api_id,
            api_hash,
            bot_token: bot_token.trim().to_owned(),
            session_path,
        })
    }

    #[must_use]
    pub fn has_bot_token(&self) -> bool {
        !self.bot_token.is_empty()
    }

    /// Checks the `<bot id>:<secret>` shape of a bot token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed.
    pub fn check_bot_token(token: &str) -> Result<(), ConfigError> {
        match token.split_once(':') {
            Some((id, secret))
                if !id.is_empty()
                    && id.chars().all(|c| c.is_ascii_digit())
                    && !secret.is_empty() =>
            {
                Ok(())
            }
            _ => Err(ConfigError::InvalidBotToken),
        }
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("api_id", &self.api_id)
            .field("session_path", &self.session_path)
            .finish_non_exhaustive()
    }
}

/// Bot-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Minimum interval between outgoing messages in milliseconds.
    #[serde(default = "default_min_reply_interval")]
    pub min_reply_interval_ms: u64,
}

fn default_min_reply_interval() -> u64 {
    1000
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            min_reply_interval_ms: default_min_reply_interval(),
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self {
            min_reply_interval_ms: std::env::var("MIN_REPLY_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_min_reply_interval),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid API ID format (must be a positive integer)")]
    InvalidApiId,

    #[error("Invalid bot token format (expected <bot id>:<secret>)")]
    InvalidBotToken,
}
