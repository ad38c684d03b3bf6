//! Per-inviter records and the values stored in them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform-assigned user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Inclusive range withdrawal keys are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    pub min: u32,
    pub max: u32,
}

impl KeyRange {
    /// Six-digit codes, `100000..=999999`.
    pub const SIX_DIGITS: Self = Self {
        min: 100_000,
        max: 999_999,
    };

    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Number of decimal digits in the upper bound. Keys are padded to it.
    #[must_use]
    pub fn width(&self) -> usize {
        self.max.to_string().len()
    }

    #[must_use]
    pub const fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }

    /// Wraps a raw value drawn from this range into a key.
    #[must_use]
    pub fn key(&self, value: u32) -> WithdrawalKey {
        WithdrawalKey {
            value,
            width: self.width(),
        }
    }
}

impl Default for KeyRange {
    fn default() -> Self {
        Self::SIX_DIGITS
    }
}

/// Fixed-width numeric code granted once an inviter reaches the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WithdrawalKey {
    value: u32,
    width: usize,
}

impl WithdrawalKey {
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.value
    }
}

impl fmt::Display for WithdrawalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.value, width = self.width)
    }
}

/// Invite progress of a single inviter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteeRecord {
    /// Registry key.
    pub identity: UserId,

    /// Name captured on first contact. Never refreshed.
    pub display_name: String,

    /// Qualifying invites credited so far.
    pub invite_count: u64,

    /// Set at most once, on the first eligible reveal request.
    pub withdrawal_key: Option<WithdrawalKey>,

    /// When the record was created.
    pub first_seen: DateTime<Utc>,
}

impl InviteeRecord {
    /// Creates an empty record for a newly observed user.
    #[must_use]
    pub fn new(identity: UserId, display_name: impl Into<String>) -> Self {
        Self {
            identity,
            display_name: display_name.into(),
            invite_count: 0,
            withdrawal_key: None,
            first_seen: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_zero_padded_to_range_width() {
        let range = KeyRange::new(0, 9999);
        assert_eq!(range.key(42).to_string(), "0042");
        assert_eq!(KeyRange::SIX_DIGITS.key(123_456).to_string(), "123456");
    }

    #[test]
    fn test_key_range_contains() {
        let range = KeyRange::SIX_DIGITS;
        assert!(range.contains(100_000));
        assert!(range.contains(999_999));
        assert!(!range.contains(99_999));
        assert!(!range.contains(1_000_000));
    }

    #[test]
    fn test_new_record_starts_empty() {
        let record = InviteeRecord::new(UserId(7), "Abebe");
        assert_eq!(record.invite_count, 0);
        assert_eq!(record.display_name, "Abebe");
        assert!(record.withdrawal_key.is_none());
    }
}
