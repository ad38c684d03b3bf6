//! Conversion of raw Telegram updates into chat events.

use grammers_client::update::{CallbackQuery, Message, Update};
use grammers_tl_types as tl;

use crate::commands::{CallbackResponse, CommandContext, Reply};
use crate::ledger::UserId;

/// What happened, stripped of transport details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A text message starting with `/`.
    Command { text: String, ctx: CommandContext },

    /// Members joined the group. `actor` is whoever the platform reports
    /// as the sender of the service message.
    MembersAdded {
        actor: UserId,
        actor_name: String,
        members: Vec<UserId>,
    },

    /// An inline button was pressed.
    Callback { data: Vec<u8>, presser: UserId },
}

/// Transport object the answer must be delivered through.
#[derive(Debug, Clone)]
pub enum Origin {
    Message(Message),
    Callback(CallbackQuery),
}

/// An incoming event together with where it came from.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    pub kind: EventKind,
    pub origin: Origin,
}

/// Something to send back for an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// Reply to the originating message.
    Reply(Reply),

    /// Answer the originating button press.
    Answer(CallbackResponse),
}

/// Converts an update into an event, dropping everything the bot ignores.
pub fn convert(update: Update) -> Option<ChatEvent> {
    match update {
        Update::NewMessage(message) if !message.outgoing() => from_message(message),
        Update::CallbackQuery(query) => Some(from_callback(query)),
        _ => None,
    }
}

fn from_message(message: Message) -> Option<ChatEvent> {
    let (sender, private, action) = match &message.raw {
        tl::enums::Message::Message(m) => (
            sender_of(m.from_id.as_ref(), &m.peer_id)?,
            user_of(&m.peer_id).is_some(),
            None,
        ),
        tl::enums::Message::Service(m) => (
            sender_of(m.from_id.as_ref(), &m.peer_id)?,
            user_of(&m.peer_id).is_some(),
            Some(m.action.clone()),
        ),
        tl::enums::Message::Empty(_) => return None,
    };

    let sender_name = message
        .sender()
        .and_then(|peer| peer.name().map(str::to_owned))
        .unwrap_or_default();

    let kind = if let Some(action) = action {
        EventKind::MembersAdded {
            members: added_members(&action, sender)?,
            actor: sender,
            actor_name: sender_name,
        }
    } else {
        let text = message.text();
        if !text.trim_start().starts_with('/') {
            return None;
        }
        EventKind::Command {
            text: text.to_owned(),
            ctx: CommandContext {
                sender,
                sender_name,
                private,
            },
        }
    };

    Some(ChatEvent {
        kind,
        origin: Origin::Message(message),
    })
}

fn from_callback(query: CallbackQuery) -> ChatEvent {
    ChatEvent {
        kind: EventKind::Callback {
            data: query.data().to_vec(),
            presser: UserId(query.raw.user_id),
        },
        origin: Origin::Callback(query),
    }
}

/// Members a service message adds to the group, if it is a join at all.
///
/// Joins by link or by request are reported with the joiner as sender, so
/// they come back as a self-join of `actor`.
pub fn added_members(action: &tl::enums::MessageAction, actor: UserId) -> Option<Vec<UserId>> {
    match action {
        tl::enums::MessageAction::ChatAddUser(add) => {
            Some(add.users.iter().copied().map(UserId).collect())
        }
        tl::enums::MessageAction::ChatJoinedByLink(_)
        | tl::enums::MessageAction::ChatJoinedByRequest => Some(vec![actor]),
        _ => None,
    }
}

/// Sender of a message: `from_id` when present, otherwise the private chat
/// peer.
fn sender_of(from: Option<&tl::enums::Peer>, peer: &tl::enums::Peer) -> Option<UserId> {
    match from {
        Some(from) => user_of(from),
        None => user_of(peer),
    }
}

fn user_of(peer: &tl::enums::Peer) -> Option<UserId> {
    match peer {
        tl::enums::Peer::User(user) => Some(UserId(user.user_id)),
        _ => None,
    }
}
