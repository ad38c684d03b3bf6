//! Event dispatch module.
//!
//! Receives chat events from the transport, runs them through the command
//! handler and sends the resulting replies back.

mod router;
mod runner;

pub use router::route;
pub use runner::{DispatcherMessage, EventDispatcher};
