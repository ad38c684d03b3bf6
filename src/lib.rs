//! Invite Tracker Bot Library
//!
//! A Telegram bot that counts how many members each user invites into a
//! group and rewards them once they reach a threshold.
//!
//! This crate provides the core functionality for:
//! - Accounting invites per inviter and issuing withdrawal keys
//! - Loading and validating tracker configurations
//! - Connecting to Telegram via `MTProto` as a bot
//! - Routing commands, joins and button presses to the ledger

pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod ledger;
pub mod telegram;
