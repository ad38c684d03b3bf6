//! Withdrawal key generation.
//!
//! Keys are reward codes, not credentials, so a non-cryptographic RNG is
//! fine. Uniqueness is probabilistic only.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{KeyRange, WithdrawalKey};

/// Source of fresh withdrawal keys.
pub trait KeyGenerator: Send + Sync + std::fmt::Debug {
    /// Draws a key uniformly from `range`.
    fn generate(&self, range: KeyRange) -> WithdrawalKey;
}

/// Draws keys from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngKeyGenerator;

impl KeyGenerator for ThreadRngKeyGenerator {
    fn generate(&self, range: KeyRange) -> WithdrawalKey {
        let (lo, hi) = bounds(range);
        range.key(rand::thread_rng().gen_range(lo..=hi))
    }
}

/// Deterministic generator backed by a seeded `StdRng`.
#[derive(Debug)]
pub struct SeededKeyGenerator {
    rng: Mutex<StdRng>,
}

impl SeededKeyGenerator {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl KeyGenerator for SeededKeyGenerator {
    fn generate(&self, range: KeyRange) -> WithdrawalKey {
        let (lo, hi) = bounds(range);
        let value = self.rng.lock().gen_range(lo..=hi);
        range.key(value)
    }
}

fn bounds(range: KeyRange) -> (u32, u32) {
    if range.min <= range.max {
        (range.min, range.max)
    } else {
        (range.max, range.min)
    }
}
