//! Maps an event to the messages it should produce.

use tracing::debug;

use crate::commands::{CallbackAction, CallbackResponse, CommandHandler};
use crate::telegram::{EventKind, Outgoing};

/// Runs `event` through the handler and returns what to send back.
pub fn route(handler: &CommandHandler, event: &EventKind) -> Vec<Outgoing> {
    match event {
        EventKind::Command { text, ctx } => handler
            .try_handle(text, ctx)
            .map(Outgoing::Reply)
            .into_iter()
            .collect(),
        EventKind::MembersAdded {
            actor,
            actor_name,
            members,
        } => handler
            .handle_members_added(*actor, actor_name, members)
            .into_iter()
            .map(Outgoing::Reply)
            .collect(),
        EventKind::Callback { data, presser } => {
            let response = match CallbackAction::parse(data) {
                Some(action) => handler.handle_callback(action, *presser),
                None => {
                    debug!("Unknown callback payload from user {}", presser);
                    CallbackResponse::Toast("Unknown action.".to_owned())
                }
            };
            vec![Outgoing::Answer(response)]
        }
    }
}
