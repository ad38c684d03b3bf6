//! Telegram client wrapper for the invite tracker bot.

use std::sync::Arc;
use std::time::Duration;

use grammers_client::client::UpdatesConfiguration;
use grammers_client::message::InputMessage;
use grammers_client::update::{CallbackQuery, Message};
use grammers_client::{Client, InvocationError, SenderPool, sender};
use grammers_session::storages::SqliteSession;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::events::{self, ChatEvent, Origin, Outgoing};
use super::RateLimiter;
use crate::commands::{CallbackResponse, Reply, ReplyButton};
use crate::config::TelegramConfig;

/// Capacity of the queue between the update stream and the dispatcher.
const EVENT_QUEUE_SIZE: usize = 256;

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Sign in failed: {0}")]
    SignInFailed(String),

    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("API invocation error: {0}")]
    Invocation(String),

    #[error("Cannot deliver {0} through this origin")]
    WrongOrigin(&'static str),
}

impl From<InvocationError> for TelegramError {
    fn from(err: InvocationError) -> Self {
        let err_str = err.to_string();

        if (err_str.contains("FLOOD_WAIT") || err_str.contains("flood"))
            && let Some(seconds) = extract_flood_wait_seconds(&err_str)
        {
            return Self::FloodWait(seconds);
        }

        Self::Invocation(err_str)
    }
}

/// Extracts flood wait seconds from an error message.
fn extract_flood_wait_seconds(err_msg: &str) -> Option<u32> {
    let patterns = ["FLOOD_WAIT_", "flood wait "];
    let lowered = err_msg.to_lowercase();

    for pattern in patterns {
        if let Some(idx) = lowered.find(&pattern.to_lowercase()) {
            let start = idx + pattern.len();
            let num_str: String = lowered[start..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if let Ok(seconds) = num_str.parse() {
                return Some(seconds);
            }
        }
    }
    None
}

/// Connected, signed-in bot account.
pub struct TelegramBot {
    /// Handle to the sender pool for disconnection.
    handle: sender::SenderPoolHandle,

    /// Spacing between outgoing messages.
    rate_limiter: RateLimiter,

    /// Background task running the sender pool.
    _pool_task: JoinHandle<()>,

    /// Background task feeding updates into the event queue.
    _update_task: JoinHandle<()>,
}

impl TelegramBot {
    /// Connects to Telegram, signs in with the bot token if the session is
    /// not authorized yet, and starts streaming updates.
    ///
    /// Returns the bot together with the receiving end of the event queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be opened, the connection
    /// fails, or the bot token is rejected.
    pub async fn start(
        config: &TelegramConfig,
        min_reply_interval: Duration,
    ) -> Result<(Self, mpsc::Receiver<ChatEvent>), TelegramError> {
        info!("Connecting to Telegram...");

        let session = Arc::new(
            SqliteSession::open(&config.session_path)
                .await
                .map_err(|e| TelegramError::Session(e.to_string()))?,
        );

        let SenderPool {
            runner,
            updates,
            handle,
        } = SenderPool::new(Arc::clone(&session), config.api_id);

        let client = Client::new(handle.clone());

        let pool_task = tokio::spawn(async move {
            runner.run().await;
        });

        let is_authorized = client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))?;

        if is_authorized {
            info!("Reusing authorized session");
        } else {
            info!("Signing in with bot token...");
            client
                .bot_sign_in(&config.bot_token, &config.api_hash)
                .await
                .map_err(|e| TelegramError::SignInFailed(e.to_string()))?;
            info!("Bot signed in");
        }

        let (tx, rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let update_task = tokio::spawn(async move {
            let mut stream = client
                .stream_updates(
                    updates,
                    UpdatesConfiguration {
                        catch_up: false,
                        ..Default::default()
                    },
                )
                .await;

            loop {
                match stream.next().await {
                    Ok(update) => {
                        let Some(event) = events::convert(update) else {
                            continue;
                        };
                        if tx.send(event).await.is_err() {
                            debug!("Event queue closed, stopping update stream");
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Update stream failed: {}", e);
                        break;
                    }
                }
            }

            stream.sync_update_state();
        });

        Ok((
            Self {
                handle: handle.thin,
                rate_limiter: RateLimiter::new(min_reply_interval),
                _pool_task: pool_task,
                _update_task: update_task,
            },
            rx,
        ))
    }

    /// Sends `outgoing` back through the object the event arrived on.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails or the outgoing kind does not
    /// fit the origin.
    pub async fn deliver(&self, origin: &Origin, outgoing: Outgoing) -> Result<(), TelegramError> {
        self.rate_limiter.wait_and_acquire().await;

        let result = match (origin, outgoing) {
            (Origin::Message(message), Outgoing::Reply(reply)) => {
                send_reply(message, &reply).await
            }
            (Origin::Callback(query), Outgoing::Answer(response)) => {
                answer_callback(query, response).await
            }
            (Origin::Message(_), Outgoing::Answer(_)) => {
                Err(TelegramError::WrongOrigin("a callback answer"))
            }
            (Origin::Callback(_), Outgoing::Reply(_)) => {
                Err(TelegramError::WrongOrigin("a message reply"))
            }
        };

        if let Err(TelegramError::FloodWait(seconds)) = &result {
            warn!("Flood wait triggered: {} seconds", seconds);
            self.rate_limiter.handle_flood_wait(*seconds).await;
        }
        result
    }

    /// Disconnects from Telegram.
    pub fn disconnect(&self) {
        info!("Disconnecting from Telegram...");
        self.handle.quit();
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot")
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

/// Replies to an incoming message.
async fn send_reply(message: &Message, reply: &Reply) -> Result<(), TelegramError> {
    debug!("Replying: \"{}\"", truncate_for_log(&reply.text, 30));
    message.reply(to_input_message(reply)).await?;
    Ok(())
}

/// Answers a pressed inline button.
async fn answer_callback(
    query: &CallbackQuery,
    response: CallbackResponse,
) -> Result<(), TelegramError> {
    match response {
        CallbackResponse::Edit(reply) => {
            debug!("Editing message: \"{}\"", truncate_for_log(&reply.text, 30));
            query.answer().edit(to_input_message(&reply)).await?;
        }
        CallbackResponse::Alert(text) => {
            query.answer().alert(text).send().await?;
        }
        CallbackResponse::Toast(text) => {
            query.answer().text(text).send().await?;
        }
    }
    Ok(())
}

/// Builds the outgoing message with its inline keyboard.
fn to_input_message(reply: &Reply) -> InputMessage {
    let message = InputMessage::text(reply.text.as_str());
    if reply.buttons.is_empty() {
        return message;
    }

    let rows: Vec<Vec<_>> = reply
        .buttons
        .iter()
        .map(|row| {
            row.iter()
                .map(|btn| match btn {
                    ReplyButton::Callback { label, action } => {
                        button::inline(label.as_str(), action.encode().into_bytes())
                    }
                    ReplyButton::Url { label, url } => button::url(label.as_str(), url.as_str()),
                })
                .collect()
        })
        .collect();

    message.reply_markup(&reply_markup::inline(rows))
}

/// Truncates a string for logging purposes.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}
