//! Command handler implementation.

use std::sync::Arc;

use tracing::{debug, info};

use super::render::Renderer;
use super::types::{BotCommand, CallbackAction, CallbackResponse, CommandContext, Reply};
use crate::config::{Presentation, Style};
use crate::ledger::{InviteLedger, LedgerError, UserId};

/// Routes commands, membership events and button presses to the ledger and
/// renders the replies.
#[derive(Debug)]
pub struct CommandHandler {
    /// Shared invite ledger.
    ledger: Arc<InviteLedger>,

    /// Message templates.
    renderer: Renderer,
}

impl CommandHandler {
    /// Creates a new command handler.
    #[must_use]
    pub const fn new(ledger: Arc<InviteLedger>, presentation: Presentation) -> Self {
        Self {
            ledger,
            renderer: Renderer::new(presentation),
        }
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<InviteLedger> {
        &self.ledger
    }

    /// Tries to parse and execute a command from a message.
    ///
    /// Returns `None` if the message is not a command.
    pub fn try_handle(&self, message_text: &str, ctx: &CommandContext) -> Option<Reply> {
        let command = BotCommand::parse(message_text)?;

        debug!("Handling command {} from user {}", command, ctx.sender);
        Some(self.execute(command, ctx))
    }

    /// Executes a parsed command.
    pub fn execute(&self, command: BotCommand, ctx: &CommandContext) -> Reply {
        match command {
            BotCommand::Start => self.handle_start(ctx),
            BotCommand::Status => self.handle_status(ctx),
            BotCommand::Key => self.handle_key(ctx),
            BotCommand::Help => Self::handle_help(),
        }
    }

    fn handle_start(&self, ctx: &CommandContext) -> Reply {
        let progress = self.ledger.register(ctx.sender, &ctx.sender_name);
        self.renderer.welcome(&progress)
    }

    fn handle_status(&self, ctx: &CommandContext) -> Reply {
        match self.ledger.snapshot(ctx.sender) {
            Ok(progress) => self.renderer.check_view(&progress),
            Err(_) => Reply::text(Renderer::not_found()),
        }
    }

    fn handle_key(&self, ctx: &CommandContext) -> Reply {
        if !ctx.private {
            return Reply::text(
                "Use /key in a private chat with me, or tap 🔑 Reveal Key on your progress card.",
            );
        }

        match self.ledger.issue_or_reveal_withdrawal_key(ctx.sender) {
            Ok(key) => Reply::text(Renderer::key_reveal(&key.to_string())),
            Err(LedgerError::NotEligible { remaining, .. }) => {
                Reply::text(Renderer::not_eligible(remaining))
            }
            Err(LedgerError::NotFound(_)) => Reply::text(Renderer::not_found()),
        }
    }

    fn handle_help() -> Reply {
        let mut lines = vec!["Invite Tracker Bot Commands".to_owned(), String::new()];

        for (cmd, aliases, desc) in BotCommand::all_commands() {
            let alias_str = if aliases.is_empty() {
                String::new()
            } else {
                format!(" {aliases}")
            };
            lines.push(format!("  {cmd}{alias_str} - {desc}"));
        }

        Reply::text(lines.join("\n"))
    }

    /// Credits `actor` for every member in a "users added" event.
    ///
    /// Returns the notifications that became due, in order.
    pub fn handle_members_added(
        &self,
        actor: UserId,
        actor_name: &str,
        members: &[UserId],
    ) -> Vec<Reply> {
        let mut notifications = Vec::new();

        for &member in members {
            let outcome = self.ledger.record_invite(actor, member, actor_name);

            if !outcome.counted {
                debug!("Not counting self-join of user {}", member);
                continue;
            }

            if outcome.notify_due
                && let Some(progress) = outcome.progress
            {
                info!(
                    "User {} reached {} invites, sending progress",
                    actor, progress.invite_count
                );
                notifications.push(self.renderer.notification(&progress));
            }
        }

        notifications
    }

    /// Handles a pressed inline button.
    pub fn handle_callback(&self, action: CallbackAction, presser: UserId) -> CallbackResponse {
        debug!("Callback {:?} pressed by user {}", action, presser);

        match action {
            CallbackAction::Check(identity) => match self.ledger.snapshot(identity) {
                Ok(progress) => CallbackResponse::Edit(self.renderer.check_view(&progress)),
                Err(_) => CallbackResponse::Toast("No invitation data found.".to_owned()),
            },
            CallbackAction::Back(identity) => {
                if self.renderer.style() != Style::Milestone {
                    return CallbackResponse::Toast("Nothing to go back to.".to_owned());
                }
                match self.ledger.snapshot(identity) {
                    Ok(progress) => CallbackResponse::Edit(self.renderer.back_view(&progress)),
                    Err(_) => CallbackResponse::Toast("No invitation data found.".to_owned()),
                }
            }
            CallbackAction::Key(identity) => {
                if identity != presser {
                    return CallbackResponse::Toast(
                        "This button belongs to someone else.".to_owned(),
                    );
                }
                match self.ledger.issue_or_reveal_withdrawal_key(identity) {
                    Ok(key) => CallbackResponse::Alert(Renderer::key_reveal(&key.to_string())),
                    Err(LedgerError::NotEligible { remaining, .. }) => {
                        CallbackResponse::Alert(Renderer::not_eligible(remaining))
                    }
                    Err(LedgerError::NotFound(_)) => {
                        CallbackResponse::Toast("No invitation data found.".to_owned())
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Preset, TrackerConfig};
    use crate::ledger::SeededKeyGenerator;

    const ALICE: UserId = UserId(100);
    const BOB: UserId = UserId(200);

    fn handler(preset: Preset) -> CommandHandler {
        let config = TrackerConfig::preset(preset);
        let ledger = InviteLedger::new(config.ledger).with_key_generator(SeededKeyGenerator::new(1));
        CommandHandler::new(Arc::new(ledger), config.presentation)
    }

    fn ctx(sender: UserId, private: bool) -> CommandContext {
        CommandContext {
            sender,
            sender_name: "Alice".to_owned(),
            private,
        }
    }

    fn members(range: std::ops::Range<i64>) -> Vec<UserId> {
        range.map(UserId).collect()
    }

    #[test]
    fn test_non_command_ignored() {
        let handler = handler(Preset::Birri);
        assert!(handler.try_handle("hello everyone", &ctx(ALICE, false)).is_none());
    }

    #[test]
    fn test_start_registers_user() {
        let handler = handler(Preset::Birri);
        let reply = handler.try_handle("/start", &ctx(ALICE, true)).unwrap();
        assert!(reply.text.contains("👥 Invites: 0 people"));
        assert!(handler.ledger().snapshot(ALICE).is_ok());
    }

    #[test]
    fn test_status_without_record() {
        let handler = handler(Preset::Birri);
        let reply = handler.try_handle("/status", &ctx(ALICE, true)).unwrap();
        assert!(reply.text.starts_with("No invitation data found"));
        assert!(reply.buttons.is_empty());
    }

    #[test]
    fn test_members_added_notifies_on_cadence() {
        let handler = handler(Preset::Birri);
        let notes = handler.handle_members_added(ALICE, "Alice", &members(1000..1005));
        assert_eq!(notes.len(), 2);
        assert!(notes[0].text.contains("👥 Invites: 2 people"));
        assert!(notes[1].text.contains("👥 Invites: 4 people"));
    }

    #[test]
    fn test_self_join_produces_nothing() {
        let handler = handler(Preset::Birri);
        handler.handle_members_added(ALICE, "Alice", &members(1000..1001));
        let notes = handler.handle_members_added(ALICE, "Alice", &[ALICE]);
        assert!(notes.is_empty());
        assert_eq!(handler.ledger().snapshot(ALICE).unwrap().invite_count, 1);
    }

    #[test]
    fn test_join_by_link_leaves_no_record() {
        let handler = handler(Preset::Birri);
        assert!(handler.handle_members_added(BOB, "Bob", &[BOB]).is_empty());
        assert_eq!(
            handler.handle_callback(CallbackAction::Check(BOB), ALICE),
            CallbackResponse::Toast("No invitation data found.".to_owned())
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_notifications_show_their_own_count() {
        let handler = Arc::new(handler(Preset::Birri));

        let tasks: Vec<_> = (0..8)
            .map(|batch| {
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    (0..50)
                        .flat_map(|i| {
                            handler.handle_members_added(
                                ALICE,
                                "Alice",
                                &[UserId(10_000 + batch * 100 + i)],
                            )
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut shown = Vec::new();
        for task in tasks {
            for note in task.await.unwrap() {
                let count: u64 = note
                    .text
                    .split("👥 Invites: ")
                    .nth(1)
                    .and_then(|rest| rest.split(' ').next())
                    .and_then(|n| n.parse().ok())
                    .unwrap();
                shown.push(count);
            }
        }

        shown.sort_unstable();
        assert_eq!(shown, (1..=200).map(|n| n * 2).collect::<Vec<u64>>());
    }

    #[test]
    fn test_key_command_in_group_is_refused() {
        let handler = handler(Preset::Birri);
        handler.handle_members_added(ALICE, "Alice", &members(1000..1006));
        let reply = handler.try_handle("/key", &ctx(ALICE, false)).unwrap();
        assert!(reply.text.contains("private chat"));
        assert!(!handler.ledger().snapshot(ALICE).unwrap().key_issued);
    }

    #[test]
    fn test_key_command_flow() {
        let handler = handler(Preset::Birri);
        let reply = handler.try_handle("/key", &ctx(ALICE, true)).unwrap();
        assert!(reply.text.starts_with("No invitation data found"));

        handler.handle_members_added(ALICE, "Alice", &members(1000..1005));
        let reply = handler.try_handle("/key", &ctx(ALICE, true)).unwrap();
        assert!(reply.text.contains("Invite 1 more person"));

        handler.handle_members_added(ALICE, "Alice", &members(1005..1006));
        let first = handler.try_handle("/withdraw", &ctx(ALICE, true)).unwrap();
        let second = handler.try_handle("/key", &ctx(ALICE, true)).unwrap();
        assert!(first.text.starts_with("🔑 Your withdrawal key: "));
        assert_eq!(first, second);
    }

    #[test]
    fn test_check_callback() {
        let handler = handler(Preset::Birri);
        assert_eq!(
            handler.handle_callback(CallbackAction::Check(ALICE), BOB),
            CallbackResponse::Toast("No invitation data found.".to_owned())
        );

        handler.handle_members_added(ALICE, "Alice", &members(1000..1003));
        match handler.handle_callback(CallbackAction::Check(ALICE), BOB) {
            CallbackResponse::Edit(reply) => assert!(reply.text.contains("👥 Invites: 3 people")),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_key_callback_only_for_owner() {
        let handler = handler(Preset::Birri);
        handler.handle_members_added(ALICE, "Alice", &members(1000..1006));

        assert_eq!(
            handler.handle_callback(CallbackAction::Key(ALICE), BOB),
            CallbackResponse::Toast("This button belongs to someone else.".to_owned())
        );
        assert!(!handler.ledger().snapshot(ALICE).unwrap().key_issued);

        let first = handler.handle_callback(CallbackAction::Key(ALICE), ALICE);
        let second = handler.handle_callback(CallbackAction::Key(ALICE), ALICE);
        assert!(matches!(&first, CallbackResponse::Alert(text) if text.starts_with("🔑")));
        assert_eq!(first, second);
    }

    #[test]
    fn test_key_callback_not_eligible() {
        let handler = handler(Preset::Birri);
        handler.handle_members_added(ALICE, "Alice", &members(1000..1002));
        assert!(matches!(
            handler.handle_callback(CallbackAction::Key(ALICE), ALICE),
            CallbackResponse::Alert(text) if text.contains("Invite 4 more people")
        ));
    }

    #[test]
    fn test_back_callback_milestone_style() {
        let handler = handler(Preset::Milestone);
        let notes = handler.handle_members_added(ALICE, "Alice", &members(1000..1004));
        assert_eq!(notes.len(), 1);
        assert!(notes[0].text.starts_with("🎉 Milestone Achieved!"));

        match handler.handle_callback(CallbackAction::Back(ALICE), BOB) {
            CallbackResponse::Edit(reply) => assert!(reply.text.starts_with("🎉")),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_back_callback_progress_style() {
        let handler = handler(Preset::Birri);
        handler.handle_members_added(ALICE, "Alice", &members(1000..1002));
        assert!(matches!(
            handler.handle_callback(CallbackAction::Back(ALICE), ALICE),
            CallbackResponse::Toast(_)
        ));
    }

    #[test]
    fn test_help_lists_commands() {
        let handler = handler(Preset::Grand);
        let reply = handler.try_handle("/help", &ctx(ALICE, false)).unwrap();
        for (cmd, _, _) in BotCommand::all_commands() {
            assert!(reply.text.contains(cmd));
        }
    }
}
