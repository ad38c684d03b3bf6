//! Command handling module.
//!
//! Turns slash commands, membership events and inline button presses into
//! ledger calls and renders the replies. Nothing here talks to Telegram.

mod handler;
mod render;
mod types;

pub use handler::CommandHandler;
pub use render::Renderer;
pub use types::{
    BotCommand, CallbackAction, CallbackResponse, CommandContext, Reply, ReplyButton,
};
