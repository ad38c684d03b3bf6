//! Command, callback and reply types.

use std::fmt;

use crate::ledger::UserId;

/// Slash commands understood by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// Register and show own progress.
    Start,

    /// Show own progress.
    Status,

    /// Reveal own withdrawal key.
    Key,

    /// Show help information.
    Help,
}

impl BotCommand {
    /// Parses a command from a message text.
    ///
    /// Accepts an optional `@BotName` suffix and ignores case and trailing
    /// arguments. Returns `None` if the message is not a known command.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let command = text.strip_prefix('/')?;

        let word = command.split_whitespace().next()?;
        let name = word.split_once('@').map_or(word, |(name, _bot)| name);

        match name.to_lowercase().as_str() {
            "start" => Some(Self::Start),
            "status" | "check" | "balance" => Some(Self::Status),
            "key" | "withdraw" => Some(Self::Key),
            "help" => Some(Self::Help),
            _ => None,
        }
    }

    /// Returns the command name as it appears in help.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Status => "status",
            Self::Key => "key",
            Self::Help => "help",
        }
    }

    /// Returns all available commands with their aliases and descriptions.
    #[must_use]
    pub fn all_commands() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("/start", "", "Start tracking your invites"),
            ("/status", "(/check, /balance)", "Show your invites and balance"),
            ("/key", "(/withdraw)", "Reveal your withdrawal key (private chat)"),
            ("/help", "", "Show this help message"),
        ]
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name())
    }
}

/// Actions carried by inline button payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Show the progress view of a user (`check_<id>`).
    Check(UserId),

    /// Return to the milestone dashboard (`back_<id>`).
    Back(UserId),

    /// Reveal the withdrawal key of a user (`key_<id>`).
    Key(UserId),
}

impl CallbackAction {
    /// Parses a callback payload.
    #[must_use]
    pub fn parse(data: &[u8]) -> Option<Self> {
        let data = std::str::from_utf8(data).ok()?;
        let (action, id) = data.split_once('_')?;
        let id = UserId(id.parse::<i64>().ok()?);

        match action {
            "check" => Some(Self::Check(id)),
            "back" => Some(Self::Back(id)),
            "key" => Some(Self::Key(id)),
            _ => None,
        }
    }

    /// Encodes the action as a button payload.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Check(id) => format!("check_{id}"),
            Self::Back(id) => format!("back_{id}"),
            Self::Key(id) => format!("key_{id}"),
        }
    }
}

/// An inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyButton {
    Callback { label: String, action: CallbackAction },
    Url { label: String, url: String },
}

impl ReplyButton {
    #[must_use]
    pub fn callback(label: impl Into<String>, action: CallbackAction) -> Self {
        Self::Callback {
            label: label.into(),
            action,
        }
    }

    #[must_use]
    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Url {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// A message to send, with optional inline keyboard rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub buttons: Vec<Vec<ReplyButton>>,
}

impl Reply {
    /// Creates a plain text reply.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    /// Appends a row holding a single button.
    #[must_use]
    pub fn with_button(mut self, button: ReplyButton) -> Self {
        self.buttons.push(vec![button]);
        self
    }
}

/// How to answer a pressed inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackResponse {
    /// Replace the message the button belongs to.
    Edit(Reply),

    /// Show a modal alert to the presser only.
    Alert(String),

    /// Show a short notification to the presser only.
    Toast(String),
}

/// Who sent a command and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    pub sender: UserId,
    pub sender_name: String,
    /// Whether the command arrived in a private chat with the bot.
    pub private: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start() {
        assert_eq!(BotCommand::parse("/start"), Some(BotCommand::Start));
        assert_eq!(BotCommand::parse("  /start  "), Some(BotCommand::Start));
    }

    #[test]
    fn test_parse_with_bot_suffix() {
        assert_eq!(
            BotCommand::parse("/status@InviteTrackerBot"),
            Some(BotCommand::Status)
        );
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(BotCommand::parse("/check"), Some(BotCommand::Status));
        assert_eq!(BotCommand::parse("/balance"), Some(BotCommand::Status));
        assert_eq!(BotCommand::parse("/withdraw"), Some(BotCommand::Key));
    }

    #[test]
    fn test_parse_case_insensitive_with_args() {
        assert_eq!(BotCommand::parse("/START ref123"), Some(BotCommand::Start));
        assert_eq!(BotCommand::parse("/Help me"), Some(BotCommand::Help));
    }

    #[test]
    fn test_parse_non_commands() {
        assert_eq!(BotCommand::parse("hello"), None);
        assert_eq!(BotCommand::parse("/"), None);
        assert_eq!(BotCommand::parse("/unknown"), None);
        assert_eq!(BotCommand::parse("start"), None);
    }

    #[test]
    fn test_callback_parse() {
        assert_eq!(
            CallbackAction::parse(b"check_12345"),
            Some(CallbackAction::Check(UserId(12345)))
        );
        assert_eq!(
            CallbackAction::parse(b"back_7"),
            Some(CallbackAction::Back(UserId(7)))
        );
        assert_eq!(
            CallbackAction::parse(b"key_-100"),
            Some(CallbackAction::Key(UserId(-100)))
        );
    }

    #[test]
    fn test_callback_parse_invalid() {
        assert_eq!(CallbackAction::parse(b"check_abc"), None);
        assert_eq!(CallbackAction::parse(b"refresh_1"), None);
        assert_eq!(CallbackAction::parse(b"check"), None);
        assert_eq!(CallbackAction::parse(&[0xff, 0xfe]), None);
    }

    #[test]
    fn test_callback_encode_matches_parse() {
        let action = CallbackAction::Key(UserId(987_654_321));
        assert_eq!(action.encode(), "key_987654321");
        assert_eq!(CallbackAction::parse(action.encode().as_bytes()), Some(action));
    }
}
