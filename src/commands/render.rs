//! Message templates for both presentation styles.

use super::types::{CallbackAction, Reply, ReplyButton};
use crate::config::{Presentation, Style};
use crate::ledger::Progress;

const RULE: &str = "-----------------------";
const FOOTER: &str = "Keep inviting to earn more rewards!";

/// Renders replies from ledger results.
#[derive(Debug, Clone)]
pub struct Renderer {
    presentation: Presentation,
}

impl Renderer {
    #[must_use]
    pub const fn new(presentation: Presentation) -> Self {
        Self { presentation }
    }

    #[must_use]
    pub const fn style(&self) -> Style {
        self.presentation.style
    }

    /// Reply to `/start`.
    #[must_use]
    pub fn welcome(&self, progress: &Progress) -> Reply {
        match self.presentation.style {
            Style::Progress => self.progress_card(progress),
            Style::Milestone => Reply::text(
                "Welcome! I'm an invite tracking bot. I'll keep track of how many users \
                 each person invites to the group.\n\nClick 'Check' to view your progress!",
            )
            .with_button(check_button(progress)),
        }
    }

    /// Group notification sent when the cadence fires.
    #[must_use]
    pub fn notification(&self, progress: &Progress) -> Reply {
        match self.presentation.style {
            Style::Progress => self.progress_card(progress),
            Style::Milestone => self.milestone_dashboard(progress),
        }
    }

    /// View shown by the "Check" button and `/status`.
    #[must_use]
    pub fn check_view(&self, progress: &Progress) -> Reply {
        match self.presentation.style {
            Style::Progress => self.progress_card(progress),
            Style::Milestone => {
                let mut text = format!(
                    "📊 Your Progress:\n{RULE}\n{}\n🚀 Remaining for withdrawal: {} more people\n{}\n",
                    self.stats(progress),
                    progress.remaining_to_threshold,
                    tracking_since(progress),
                );
                if progress.milestone_reached {
                    text.push_str("🔑 Withdrawal: unlocked\n");
                }
                text.push_str(&format!("{RULE}\n\n{FOOTER}"));

                let mut reply = Reply::text(text).with_button(ReplyButton::callback(
                    "Back",
                    CallbackAction::Back(progress.identity),
                ));
                if progress.milestone_reached {
                    reply = reply.with_button(key_button(progress));
                }
                reply
            }
        }
    }

    /// View shown by the "Back" button.
    #[must_use]
    pub fn back_view(&self, progress: &Progress) -> Reply {
        self.milestone_dashboard(progress)
    }

    fn progress_card(&self, progress: &Progress) -> Reply {
        let header = if self.presentation.channel.is_empty() {
            "📊 Invite Progress:".to_owned()
        } else {
            format!("📊 Invite Progress: {}", self.presentation.channel)
        };

        let text = format!(
            "{header}\n{RULE}\n{}\n🚀 Remaining for withdrawal: {} more people\n{}\n{RULE}\n\n{FOOTER}",
            self.stats(progress),
            progress.remaining_to_threshold,
            tracking_since(progress),
        );

        let mut reply = Reply::text(text).with_button(check_button(progress));
        if progress.milestone_reached {
            reply = reply.with_button(key_button(progress));
            if !self.presentation.withdrawal_url.is_empty() {
                reply = reply.with_button(ReplyButton::url(
                    "Request Withdrawal",
                    self.presentation.withdrawal_url.clone(),
                ));
            }
        }
        reply
    }

    fn milestone_dashboard(&self, progress: &Progress) -> Reply {
        let next_goal = progress.until_next_notification.map_or_else(
            || "🚀 Next Goal: keep inviting".to_owned(),
            |n| format!("🚀 Next Goal: Invite {n} more"),
        );

        let text = format!(
            "🎉 Milestone Achieved! 🎉👏\n\n📋 Dashboard:\n{RULE}\n{}\n{next_goal}\n{RULE}\n\n{FOOTER}",
            self.stats(progress),
        );

        let mut reply = Reply::text(text).with_button(check_button(progress));
        if progress.milestone_reached {
            reply = reply.with_button(key_button(progress));
        }
        reply
    }

    fn stats(&self, progress: &Progress) -> String {
        format!(
            "👤 Name: {}\n👥 Invites: {} people\n💰 Balance: {} {}",
            progress.display_name, progress.invite_count, progress.balance, self.presentation.currency
        )
    }

    /// Text for an identity the ledger has never seen.
    #[must_use]
    pub fn not_found() -> String {
        "No invitation data found. Send /start to begin tracking.".to_owned()
    }

    /// Text for a key request below the threshold.
    #[must_use]
    pub fn not_eligible(remaining: u64) -> String {
        format!(
            "🚫 Not yet eligible. Invite {remaining} more {} to unlock your withdrawal key.",
            if remaining == 1 { "person" } else { "people" }
        )
    }

    /// Text revealing a withdrawal key.
    #[must_use]
    pub fn key_reveal(key: &str) -> String {
        format!("🔑 Your withdrawal key: {key}\nKeep it private.")
    }
}

fn tracking_since(progress: &Progress) -> String {
    format!("📅 Tracking since: {}", progress.first_seen.format("%Y-%m-%d"))
}

fn check_button(progress: &Progress) -> ReplyButton {
    ReplyButton::callback("Check", CallbackAction::Check(progress.identity))
}

fn key_button(progress: &Progress) -> ReplyButton {
    ReplyButton::callback("🔑 Reveal Key", CallbackAction::Key(progress.identity))
}
