//! Telegram transport module.
//!
//! Owns the bot connection: sign-in, the update stream, and delivery of
//! replies and callback answers, throttled by a rate limiter.

mod client;
mod events;
mod rate_limiter;

pub use client::{TelegramBot, TelegramError};
pub use events::{added_members, ChatEvent, EventKind, Origin, Outgoing};
pub use rate_limiter::RateLimiter;
