//! Event dispatcher loop.
//!
//! Every incoming event is handled on its own task, so a slow send never
//! holds up ledger accounting for later events. The ledger serializes the
//! accounting itself; the rate limiter serializes the sends.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use super::route;
use crate::commands::CommandHandler;
use crate::telegram::{ChatEvent, EventKind, TelegramBot};

/// How long shutdown waits for in-flight events.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Messages that can be sent to the dispatcher.
#[derive(Debug, Clone)]
pub enum DispatcherMessage {
    /// Stop the dispatcher.
    Shutdown,
}

/// Routes chat events to the command handler and delivers the replies.
pub struct EventDispatcher {
    /// Telegram bot client.
    bot: Arc<TelegramBot>,

    /// Command handler owning the ledger.
    handler: Arc<CommandHandler>,

    /// Interval between ledger summaries in the log.
    report_interval: Duration,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    #[must_use]
    pub const fn new(bot: Arc<TelegramBot>, handler: Arc<CommandHandler>) -> Self {
        Self {
            bot,
            handler,
            report_interval: Duration::from_secs(600),
        }
    }

    /// Sets the interval between ledger summaries.
    #[must_use]
    pub const fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// Runs the dispatch loop until shutdown or until the event stream ends.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<ChatEvent>,
        mut control: mpsc::Receiver<DispatcherMessage>,
    ) {
        info!("Event dispatcher started");

        let mut in_flight = JoinSet::new();
        let mut report_timer = interval(self.report_interval);
        report_timer.tick().await;

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        warn!("Update stream ended");
                        break;
                    };
                    in_flight.spawn(dispatch(
                        Arc::clone(&self.bot),
                        Arc::clone(&self.handler),
                        event,
                    ));
                }
                _ = report_timer.tick() => {
                    info!("Tracking {} inviters", self.handler.ledger().len());
                }
                msg = control.recv() => {
                    match msg {
                        Some(DispatcherMessage::Shutdown) | None => {
                            info!("Dispatcher shutting down");
                            break;
                        }
                    }
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!("Event task failed: {}", e);
                    }
                }
            }
        }

        if tokio::time::timeout(DRAIN_TIMEOUT, async {
            while in_flight.join_next().await.is_some() {}
        })
        .await
        .is_err()
        {
            warn!("Abandoning {} unfinished events", in_flight.len());
            in_flight.abort_all();
        }
    }
}

/// Handles one event and sends whatever it produced.
async fn dispatch(bot: Arc<TelegramBot>, handler: Arc<CommandHandler>, event: ChatEvent) {
    if let EventKind::MembersAdded { actor, members, .. } = &event.kind {
        debug!("User {} added {} member(s)", actor, members.len());
    }

    for outgoing in route(&handler, &event.kind) {
        if let Err(e) = bot.deliver(&event.origin, outgoing).await {
            warn!("Failed to deliver reply: {}", e);
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handler", &self.handler)
            .field("report_interval", &self.report_interval)
            .finish_non_exhaustive()
    }
}
