//! Tracker configuration: ledger parameters plus message presentation.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::{KeyRange, LedgerParams};

/// Errors that can occur while loading or validating the tracker config.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Withdrawal threshold must be at least 1")]
    InvalidThreshold,

    #[error("Notification cadence must be at least 1")]
    InvalidCadence,

    #[error("Key range is empty: min {min} > max {max}")]
    InvalidKeyRange { min: u32, max: u32 },

    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("Withdrawal URL must start with https:// or tg:// (got '{0}')")]
    InvalidWithdrawalUrl(String),

    #[error("Unknown preset: {0} (expected birri, milestone or grand)")]
    UnknownPreset(String),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Message template family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    /// "Invite Progress" card with a withdrawal link once eligible.
    #[default]
    Progress,
    /// "Milestone Achieved" dashboard with a check/back toggle.
    Milestone,
}

/// Texts and links used when rendering replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presentation {
    #[serde(default)]
    pub style: Style,

    /// Channel handle shown in the progress header, may be empty.
    #[serde(default)]
    pub channel: String,

    /// Currency label appended to balances.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Target of the "Request Withdrawal" button. Empty hides the button.
    #[serde(default)]
    pub withdrawal_url: String,
}

fn default_currency() -> String {
    "ETB".to_owned()
}

impl Default for Presentation {
    fn default() -> Self {
        Self {
            style: Style::Progress,
            channel: String::new(),
            currency: default_currency(),
            withdrawal_url: String::new(),
        }
    }
}

/// Built-in parameter sets matching the known deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    /// Notify every 2 invites, withdraw at 6.
    #[default]
    Birri,
    /// Milestone dashboard every 4 invites, withdraw at 6.
    Milestone,
    /// Notify every 10 invites, withdraw at 200.
    Grand,
}

impl std::str::FromStr for Preset {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "birri" | "default" => Ok(Self::Birri),
            "milestone" => Ok(Self::Milestone),
            "grand" => Ok(Self::Grand),
            other => Err(ValidationError::UnknownPreset(other.to_owned())),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Birri => "birri",
            Self::Milestone => "milestone",
            Self::Grand => "grand",
        };
        f.write_str(name)
    }
}

/// Complete tracker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TrackerConfig {
    #[serde(default)]
    pub ledger: LedgerParams,

    #[serde(default)]
    pub presentation: Presentation,
}

impl TrackerConfig {
    /// Returns the configuration of a built-in preset.
    #[must_use]
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Birri => Self {
                ledger: LedgerParams {
                    reward_per_invite: 50,
                    withdrawal_threshold: 6,
                    notification_cadence: 2,
                    key_range: KeyRange::SIX_DIGITS,
                },
                presentation: Presentation {
                    style: Style::Progress,
                    channel: "@Digital_Birri".to_owned(),
                    currency: default_currency(),
                    withdrawal_url: "https://t.me/withdraw_bot".to_owned(),
                },
            },
            Preset::Milestone => Self {
                ledger: LedgerParams {
                    reward_per_invite: 50,
                    withdrawal_threshold: 6,
                    notification_cadence: 4,
                    key_range: KeyRange::SIX_DIGITS,
                },
                presentation: Presentation {
                    style: Style::Milestone,
                    ..Presentation::default()
                },
            },
            Preset::Grand => Self {
                ledger: LedgerParams {
                    reward_per_invite: 50,
                    withdrawal_threshold: 200,
                    notification_cadence: 10,
                    key_range: KeyRange::SIX_DIGITS,
                },
                presentation: Presentation {
                    style: Style::Progress,
                    withdrawal_url: "https://t.me/withdraw_bot".to_owned(),
                    ..Presentation::default()
                },
            },
        }
    }

    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Saves configuration to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ValidationError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates the configuration, returning the first problem found.
    ///
    /// # Errors
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.issues().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Returns every problem found in the configuration.
    #[must_use]
    pub fn issues(&self) -> Vec<ValidationError> {
        let mut issues = Vec::new();
        let ledger = &self.ledger;

        if ledger.withdrawal_threshold == 0 {
            issues.push(ValidationError::InvalidThreshold);
        }
        if ledger.notification_cadence == 0 {
            issues.push(ValidationError::InvalidCadence);
        }
        if ledger.key_range.min > ledger.key_range.max {
            issues.push(ValidationError::InvalidKeyRange {
                min: ledger.key_range.min,
                max: ledger.key_range.max,
            });
        }

        let presentation = &self.presentation;
        if presentation.currency.trim().is_empty() {
            issues.push(ValidationError::EmptyField("currency"));
        }
        let url = presentation.withdrawal_url.trim();
        if !url.is_empty() && !url.starts_with("https://") && !url.starts_with("tg://") {
            issues.push(ValidationError::InvalidWithdrawalUrl(url.to_owned()));
        }

        issues
    }

    /// Creates an example configuration for users to reference.
    #[must_use]
    pub fn example() -> Self {
        Self::preset(Preset::Birri)
    }
}
