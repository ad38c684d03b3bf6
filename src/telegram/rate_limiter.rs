//! Rate limiter for outgoing bot messages.
//!
//! Spaces replies and callback answers so a burst of joins does not trip
//! Telegram's flood protection, and holds all sends back while a
//! `FLOOD_WAIT` penalty is in effect.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Default, Clone, Copy)]
struct LimiterState {
    /// When the last send was let through.
    last_send: Option<Instant>,

    /// Sends are blocked until this instant after a flood wait.
    blocked_until: Option<Instant>,
}

impl LimiterState {
    fn wait_needed(&self, now: Instant, min_interval: Duration) -> Duration {
        let spacing = self
            .last_send
            .map_or(Duration::ZERO, |last| {
                min_interval.saturating_sub(now.saturating_duration_since(last))
            });
        let penalty = self
            .blocked_until
            .map_or(Duration::ZERO, |until| until.saturating_duration_since(now));
        spacing.max(penalty)
    }
}

/// Rate limiter that enforces minimum intervals between sends.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum duration between allowed sends.
    min_interval: Duration,

    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Creates a new rate limiter with the specified minimum interval.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// Waits until a send is allowed, then marks it as performed.
    ///
    /// Concurrent callers queue on the internal lock, so sends go out one
    /// at a time. Returns the duration waited.
    pub async fn wait_and_acquire(&self) -> Duration {
        let mut state = self.state.lock().await;

        let wait = state.wait_needed(Instant::now(), self.min_interval);
        if !wait.is_zero() {
            debug!("Rate limiter: waiting {:?} before next send", wait);
            tokio::time::sleep(wait).await;
        }

        let now = Instant::now();
        state.last_send = Some(now);
        if state.blocked_until.is_some_and(|until| until <= now) {
            state.blocked_until = None;
        }
        wait
    }

    /// Blocks further sends for `wait_seconds` after a flood wait error.
    pub async fn handle_flood_wait(&self, wait_seconds: u32) {
        warn!(
            "Received flood wait from Telegram: {} seconds",
            wait_seconds
        );
        let until = Instant::now() + Duration::from_secs(u64::from(wait_seconds));
        let mut state = self.state.lock().await;
        state.blocked_until = Some(state.blocked_until.map_or(until, |current| current.max(until)));
    }
}
