//! The invite ledger: registry of inviter records plus the reward policy.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::{
    EveryNth, InviteeRecord, KeyGenerator, KeyRange, NotificationCadence, ThreadRngKeyGenerator,
    UserId, WithdrawalKey,
};

/// Errors returned by ledger lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("No invitation data for user {0}")]
    NotFound(UserId),

    #[error("User {identity} needs {remaining} more invites before withdrawal")]
    NotEligible { identity: UserId, remaining: u64 },
}

/// Reward and threshold parameters of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerParams {
    /// Balance credited per qualifying invite.
    pub reward_per_invite: u64,

    /// Invite count at which a withdrawal key can be requested.
    pub withdrawal_threshold: u64,

    /// A progress notification is due every this many invites.
    pub notification_cadence: u64,

    /// Range withdrawal keys are drawn from.
    #[serde(default)]
    pub key_range: KeyRange,
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            reward_per_invite: 50,
            withdrawal_threshold: 6,
            notification_cadence: 2,
            key_range: KeyRange::SIX_DIGITS,
        }
    }
}

/// Read-only view of an inviter's progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub identity: UserId,
    pub display_name: String,
    pub invite_count: u64,
    pub balance: u64,
    pub remaining_to_threshold: u64,
    pub milestone_reached: bool,
    /// Invites left until the next progress notification.
    pub until_next_notification: Option<u64>,
    /// Whether a withdrawal key has already been allocated.
    pub key_issued: bool,
    pub first_seen: DateTime<Utc>,
}

/// Result of [`InviteLedger::record_invite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteOutcome {
    /// Inviter progress right after the event, taken under the same lock as
    /// the increment. `None` when an untracked user joined by themselves.
    pub progress: Option<Progress>,
    /// Whether the event was counted. False for self-joins.
    pub counted: bool,
    /// Whether the collaborator should send a progress notification.
    pub notify_due: bool,
}

/// In-memory registry of invite progress, keyed by inviter.
///
/// All operations run under one registry-wide lock, so every
/// read-modify-write on a record is atomic. The lock is never held across
/// an `.await`.
#[derive(Debug)]
pub struct InviteLedger {
    params: LedgerParams,
    cadence: Box<dyn NotificationCadence>,
    keys: Box<dyn KeyGenerator>,
    records: Mutex<HashMap<UserId, InviteeRecord>>,
}

impl InviteLedger {
    /// Creates an empty ledger with an every-Nth cadence and thread-RNG keys.
    #[must_use]
    pub fn new(params: LedgerParams) -> Self {
        Self {
            params,
            cadence: Box::new(EveryNth::new(params.notification_cadence)),
            keys: Box::new(ThreadRngKeyGenerator),
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the notification cadence policy.
    #[must_use]
    pub fn with_cadence(mut self, cadence: impl NotificationCadence + 'static) -> Self {
        self.cadence = Box::new(cadence);
        self
    }

    /// Replaces the withdrawal key generator.
    #[must_use]
    pub fn with_key_generator(mut self, keys: impl KeyGenerator + 'static) -> Self {
        self.keys = Box::new(keys);
        self
    }

    /// Number of tracked inviters.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Returns the record for `identity`, creating an empty one if absent.
    ///
    /// `display_name_hint` is only used when the record is created.
    pub fn ensure_record(&self, identity: UserId, display_name_hint: &str) -> InviteeRecord {
        let mut records = self.records.lock();
        Self::entry(&mut records, identity, display_name_hint).clone()
    }

    /// Registers a user on first contact and returns their progress.
    pub fn register(&self, identity: UserId, display_name_hint: &str) -> Progress {
        let mut records = self.records.lock();
        let record = Self::entry(&mut records, identity, display_name_hint);
        self.progress_of(record)
    }

    /// Credits `inviter` with bringing in `new_member`.
    ///
    /// A self-join (`inviter == new_member`) is absorbed: no record is
    /// created, the count stays unchanged and no notification is due.
    pub fn record_invite(
        &self,
        inviter: UserId,
        new_member: UserId,
        inviter_name_hint: &str,
    ) -> InviteOutcome {
        let mut records = self.records.lock();

        if inviter == new_member {
            debug!("Ignoring self-join of user {}", inviter);
            return InviteOutcome {
                progress: records.get(&inviter).map(|record| self.progress_of(record)),
                counted: false,
                notify_due: false,
            };
        }

        let record = Self::entry(&mut records, inviter, inviter_name_hint);
        record.invite_count += 1;
        let notify_due = self.cadence.is_due(record.invite_count);

        debug!(
            "User {} invited {} (total: {}, notify: {})",
            inviter, new_member, record.invite_count, notify_due
        );

        InviteOutcome {
            progress: Some(self.progress_of(record)),
            counted: true,
            notify_due,
        }
    }

    /// Computes the progress view of an existing record.
    pub fn snapshot(&self, identity: UserId) -> Result<Progress, LedgerError> {
        let records = self.records.lock();
        records
            .get(&identity)
            .map(|record| self.progress_of(record))
            .ok_or(LedgerError::NotFound(identity))
    }

    /// Returns the withdrawal key of an eligible user, allocating it on the
    /// first call.
    pub fn issue_or_reveal_withdrawal_key(
        &self,
        identity: UserId,
    ) -> Result<WithdrawalKey, LedgerError> {
        let mut records = self.records.lock();
        let record = records
            .get_mut(&identity)
            .ok_or(LedgerError::NotFound(identity))?;

        if record.invite_count < self.params.withdrawal_threshold {
            return Err(LedgerError::NotEligible {
                identity,
                remaining: self.params.withdrawal_threshold - record.invite_count,
            });
        }

        if let Some(key) = record.withdrawal_key {
            return Ok(key);
        }

        let key = self.keys.generate(self.params.key_range);
        record.withdrawal_key = Some(key);
        info!("Issued withdrawal key to user {}", identity);
        Ok(key)
    }

    fn entry<'a>(
        records: &'a mut HashMap<UserId, InviteeRecord>,
        identity: UserId,
        display_name_hint: &str,
    ) -> &'a mut InviteeRecord {
        records.entry(identity).or_insert_with(|| {
            debug!("Tracking new inviter {} ({})", identity, display_name_hint);
            InviteeRecord::new(identity, display_name_hint)
        })
    }

    fn progress_of(&self, record: &InviteeRecord) -> Progress {
        let threshold = self.params.withdrawal_threshold;
        Progress {
            identity: record.identity,
            display_name: record.display_name.clone(),
            invite_count: record.invite_count,
            balance: record
                .invite_count
                .saturating_mul(self.params.reward_per_invite),
            remaining_to_threshold: threshold.saturating_sub(record.invite_count),
            milestone_reached: record.invite_count >= threshold,
            until_next_notification: self.cadence.until_next(record.invite_count),
            key_issued: record.withdrawal_key.is_some(),
            first_seen: record.first_seen,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ledger::SeededKeyGenerator;

    const ALICE: UserId = UserId(1001);

    fn ledger(threshold: u64, cadence: u64) -> InviteLedger {
        InviteLedger::new(LedgerParams {
            reward_per_invite: 50,
            withdrawal_threshold: threshold,
            notification_cadence: cadence,
            key_range: KeyRange::SIX_DIGITS,
        })
        .with_key_generator(SeededKeyGenerator::new(7))
    }

    fn invite_n(ledger: &InviteLedger, inviter: UserId, n: i64) -> Vec<InviteOutcome> {
        (0..n)
            .map(|i| ledger.record_invite(inviter, UserId(50_000 + i), "Alice"))
            .collect()
    }

    #[test]
    fn test_ensure_record_creates_once() {
        let ledger = ledger(6, 2);
        let first = ledger.ensure_record(ALICE, "Alice");
        assert_eq!(first.invite_count, 0);

        invite_n(&ledger, ALICE, 3);
        let again = ledger.ensure_record(ALICE, "Renamed");
        assert_eq!(again.invite_count, 3);
        assert_eq!(again.display_name, "Alice");
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_counts_exactly() {
        let ledger = ledger(200, 10);
        invite_n(&ledger, ALICE, 37);
        assert_eq!(ledger.snapshot(ALICE).map(|p| p.invite_count), Ok(37));
    }

    #[test]
    fn test_self_join_is_ignored() {
        let ledger = ledger(6, 2);
        invite_n(&ledger, ALICE, 1);

        let outcome = ledger.record_invite(ALICE, ALICE, "Alice");
        assert!(!outcome.counted);
        assert!(!outcome.notify_due);
        assert_eq!(outcome.progress.map(|p| p.invite_count), Some(1));
    }

    #[test]
    fn test_self_join_does_not_create_record() {
        let ledger = ledger(6, 2);
        let bob = UserId(2002);

        let outcome = ledger.record_invite(bob, bob, "Bob");
        assert_eq!(outcome.progress, None);
        assert!(!outcome.counted);
        assert!(!outcome.notify_due);
        assert_eq!(ledger.snapshot(bob), Err(LedgerError::NotFound(bob)));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_notify_due_follows_cadence() {
        for cadence in [2, 4, 10] {
            let ledger = ledger(200, cadence);
            for outcome in invite_n(&ledger, ALICE, 40) {
                let count = outcome.progress.unwrap().invite_count;
                assert_eq!(outcome.notify_due, count % cadence == 0, "cadence={cadence}");
            }
        }
    }

    #[derive(Debug)]
    struct AtCounts(&'static [u64]);

    impl NotificationCadence for AtCounts {
        fn is_due(&self, invite_count: u64) -> bool {
            self.0.contains(&invite_count)
        }
    }

    #[test]
    fn test_custom_cadence() {
        let ledger = ledger(6, 2).with_cadence(AtCounts(&[1, 5]));
        let due: Vec<bool> = invite_n(&ledger, ALICE, 6).iter().map(|o| o.notify_due).collect();
        assert_eq!(due, [true, false, false, false, true, false]);
        assert_eq!(ledger.snapshot(ALICE).unwrap().until_next_notification, None);
    }

    #[test]
    fn test_snapshot_unknown_is_not_found() {
        let ledger = ledger(6, 2);
        assert_eq!(ledger.snapshot(ALICE), Err(LedgerError::NotFound(ALICE)));

        ledger.ensure_record(ALICE, "Alice");
        assert!(ledger.snapshot(ALICE).is_ok());

        let bob = UserId(2002);
        ledger.record_invite(bob, UserId(3003), "Bob");
        assert!(ledger.snapshot(bob).is_ok());
    }

    #[test]
    fn test_balance_and_remaining() {
        let ledger = ledger(6, 2);
        invite_n(&ledger, ALICE, 6);
        let progress = ledger.snapshot(ALICE).unwrap();
        assert_eq!(progress.balance, 300);
        assert_eq!(progress.remaining_to_threshold, 0);

        let ledger = InviteLedger::new(LedgerParams {
            reward_per_invite: 50,
            withdrawal_threshold: 200,
            notification_cadence: 10,
            key_range: KeyRange::SIX_DIGITS,
        });
        invite_n(&ledger, ALICE, 205);
        let progress = ledger.snapshot(ALICE).unwrap();
        assert_eq!(progress.balance, 10_250);
        assert_eq!(progress.remaining_to_threshold, 0);
        assert!(progress.milestone_reached);
    }

    #[test]
    fn test_key_not_eligible_below_threshold() {
        let ledger = ledger(6, 2);
        invite_n(&ledger, ALICE, 5);
        assert_eq!(
            ledger.issue_or_reveal_withdrawal_key(ALICE),
            Err(LedgerError::NotEligible {
                identity: ALICE,
                remaining: 1
            })
        );
        assert!(!ledger.snapshot(ALICE).unwrap().key_issued);
    }

    #[test]
    fn test_key_unknown_user() {
        let ledger = ledger(6, 2);
        assert_eq!(
            ledger.issue_or_reveal_withdrawal_key(ALICE),
            Err(LedgerError::NotFound(ALICE))
        );
    }

    #[test]
    fn test_key_is_issued_once() {
        let ledger = ledger(6, 2);
        invite_n(&ledger, ALICE, 6);

        let first = ledger.issue_or_reveal_withdrawal_key(ALICE).unwrap();
        invite_n(&ledger, ALICE, 4);
        let second = ledger.issue_or_reveal_withdrawal_key(ALICE).unwrap();

        assert_eq!(first, second);
        assert!(KeyRange::SIX_DIGITS.contains(first.value()));
        assert!(ledger.snapshot(ALICE).unwrap().key_issued);
    }

    #[test]
    fn test_register_returns_progress() {
        let ledger = ledger(6, 2);
        let progress = ledger.register(ALICE, "Alice");
        assert_eq!(progress.invite_count, 0);
        assert_eq!(progress.remaining_to_threshold, 6);
        assert_eq!(progress.until_next_notification, Some(2));
        assert!(!progress.milestone_reached);
        assert_eq!(progress.first_seen, ledger.snapshot(ALICE).unwrap().first_seen);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let ledger = ledger(6, 2);
        let outcomes = invite_n(&ledger, ALICE, 2);
        assert!(!outcomes[0].notify_due);
        assert!(outcomes[1].notify_due);
        let progress = ledger.snapshot(ALICE).unwrap();
        assert_eq!(progress.invite_count, 2);
        assert_eq!(progress.balance, 100);
        assert_eq!(progress.remaining_to_threshold, 4);

        let third = ledger.record_invite(ALICE, UserId(60_003), "Alice");
        assert!(!third.notify_due);

        let fourth = ledger.record_invite(ALICE, UserId(60_004), "Alice");
        assert!(fourth.notify_due);
        assert_eq!(ledger.snapshot(ALICE).unwrap().remaining_to_threshold, 2);

        ledger.record_invite(ALICE, UserId(60_005), "Alice");
        let sixth = ledger.record_invite(ALICE, UserId(60_006), "Alice");
        assert!(sixth.notify_due);
        let progress = ledger.snapshot(ALICE).unwrap();
        assert_eq!(progress.remaining_to_threshold, 0);
        assert!(progress.milestone_reached);

        let key = ledger.issue_or_reveal_withdrawal_key(ALICE).unwrap();
        assert_eq!(key.to_string().len(), 6);
        assert_eq!(ledger.issue_or_reveal_withdrawal_key(ALICE), Ok(key));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_invites_are_not_lost() {
        let ledger = Arc::new(ledger(6, 2));

        let tasks: Vec<_> = (0..100)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                tokio::spawn(async move {
                    ledger.record_invite(ALICE, UserId(70_000 + i), "Alice")
                })
            })
            .collect();

        let mut due = 0;
        let mut seen = Vec::new();
        for task in tasks {
            let outcome = task.await.unwrap();
            let count = outcome.progress.unwrap().invite_count;
            if outcome.notify_due {
                due += 1;
                assert_eq!(count % 2, 0);
            }
            seen.push(count);
        }

        seen.sort_unstable();
        assert_eq!(seen, (1..=100).collect::<Vec<u64>>());
        assert_eq!(ledger.snapshot(ALICE).unwrap().invite_count, 100);
        assert_eq!(due, 50);
    }
}
