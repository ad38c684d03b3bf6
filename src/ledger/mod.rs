//! Invite accounting core.
//!
//! Tracks how many members each user has brought into the group, decides
//! when a progress notification is due, and hands out withdrawal keys to
//! users who reached the threshold.
//!
//! The ledger is purely in-memory and synchronous: every operation takes the
//! registry lock once, mutates or reads, and returns. Nothing here performs
//! I/O or spawns tasks.

mod keys;
mod policy;
mod record;
mod registry;

pub use keys::{KeyGenerator, SeededKeyGenerator, ThreadRngKeyGenerator};
pub use policy::{EveryNth, NotificationCadence};
pub use record::{InviteeRecord, KeyRange, UserId, WithdrawalKey};
pub use registry::{InviteLedger, InviteOutcome, LedgerError, LedgerParams, Progress};
