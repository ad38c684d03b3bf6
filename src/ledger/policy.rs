//! Notification cadence policies.

/// Decides after which invite counts a progress notification is sent.
pub trait NotificationCadence: Send + Sync + std::fmt::Debug {
    /// Returns true when reaching `invite_count` should trigger a notification.
    fn is_due(&self, invite_count: u64) -> bool;

    /// Invites left until the next notification, if the policy can tell.
    fn until_next(&self, _invite_count: u64) -> Option<u64> {
        None
    }
}

/// Notify on every `n`th invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EveryNth(u64);

impl EveryNth {
    /// Creates the policy. A zero interval is treated as 1.
    #[must_use]
    pub const fn new(n: u64) -> Self {
        Self(if n == 0 { 1 } else { n })
    }

    #[must_use]
    pub const fn interval(&self) -> u64 {
        self.0
    }
}

impl NotificationCadence for EveryNth {
    fn is_due(&self, invite_count: u64) -> bool {
        invite_count > 0 && invite_count % self.0 == 0
    }

    fn until_next(&self, invite_count: u64) -> Option<u64> {
        Some(self.0 - invite_count % self.0)
    }
}
