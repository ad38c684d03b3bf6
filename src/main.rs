//! Invite Tracker Bot - Main Entry Point
//!
//! A Telegram bot that counts group invites per user, posts progress
//! updates and hands out withdrawal keys.

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use dialoguer::Password;
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use invite_tracker_bot::commands::CommandHandler;
use invite_tracker_bot::config::{
    BotSettings, Preset, TelegramConfig, TrackerConfig, DEFAULT_CONFIG_PATH,
};
use invite_tracker_bot::dispatcher::{DispatcherMessage, EventDispatcher};
use invite_tracker_bot::ledger::InviteLedger;
use invite_tracker_bot::telegram::TelegramBot;

/// Telegram bot that tracks group invites and rewards inviters.
#[derive(Parser, Debug)]
#[command(name = "invite_tracker_bot")]
#[command(about = "Count group invites per user and reward them")]
#[command(version)]
struct Args {
    /// Path to the tracker JSON configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Built-in preset used when the configuration file does not exist
    /// (birri, milestone, grand).
    #[arg(short, long, default_value = "birri")]
    preset: String,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Seconds between ledger summaries in the log.
    #[arg(long, default_value_t = 600)]
    report_interval: u64,

    /// Generate an example configuration file and exit.
    #[arg(long)]
    generate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    let preset: Preset = args.preset.parse().context("Invalid --preset")?;

    if args.generate_config {
        return generate_example_config(preset);
    }

    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let mut tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;

    if !tg_config.has_bot_token() {
        tg_config.bot_token = prompt_bot_token()?;
    }
    TelegramConfig::check_bot_token(&tg_config.bot_token)?;

    let bot_settings = BotSettings::from_env_with_defaults();

    let tracker_config = load_tracker_config(&args.config, preset)?;
    tracker_config
        .validate()
        .context("Tracker configuration validation failed")?;

    let params = tracker_config.ledger;
    info!(
        "Reward {} {} per invite, withdrawal at {} invites, notify every {} invites",
        params.reward_per_invite,
        tracker_config.presentation.currency,
        params.withdrawal_threshold,
        params.notification_cadence
    );

    let ledger = Arc::new(InviteLedger::new(params));
    let handler = Arc::new(CommandHandler::new(
        Arc::clone(&ledger),
        tracker_config.presentation,
    ));

    let (bot, events) = TelegramBot::start(
        &tg_config,
        Duration::from_millis(bot_settings.min_reply_interval_ms),
    )
    .await
    .context("Failed to start Telegram bot")?;
    let bot = Arc::new(bot);

    let (dispatcher_tx, dispatcher_rx) = mpsc::channel::<DispatcherMessage>(8);

    let dispatcher = EventDispatcher::new(Arc::clone(&bot), handler)
        .with_report_interval(Duration::from_secs(args.report_interval.max(1)));

    info!("Starting invite tracker bot...");

    let mut dispatcher_handle = tokio::spawn(async move {
        dispatcher.run(events, dispatcher_rx).await;
    });

    info!("Bot is running. Use Ctrl+C to stop.");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            let _ = dispatcher_tx.send(DispatcherMessage::Shutdown).await;
            let _ = (&mut dispatcher_handle).await;
        }
        _ = &mut dispatcher_handle => {
            info!("Dispatcher stopped");
        }
    }

    info!("Shutting down... ({} inviters tracked)", ledger.len());
    bot.disconnect();

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads the tracker config file, falling back to a preset when it is absent.
fn load_tracker_config(path: &str, preset: Preset) -> Result<TrackerConfig> {
    if Path::new(path).exists() {
        let config = TrackerConfig::load_from_file(path)
            .with_context(|| format!("Failed to load tracker configuration from {path}"))?;
        info!("Loaded tracker configuration from {}", path);
        Ok(config)
    } else {
        info!("No configuration at {}, using '{}' preset", path, preset);
        Ok(TrackerConfig::preset(preset))
    }
}

/// Asks for the bot token on an interactive terminal.
fn prompt_bot_token() -> Result<String> {
    if !std::io::stdin().is_terminal() {
        bail!("TELEGRAM_BOT_TOKEN is not set");
    }

    let token: String = Password::new()
        .with_prompt("Enter the bot token from @BotFather")
        .interact()?;
    Ok(token.trim().to_owned())
}

/// Generates an example configuration file.
fn generate_example_config(preset: Preset) -> Result<()> {
    let path = "tracker.example.json";
    TrackerConfig::preset(preset).save_to_file(path)?;

    println!("✓ Example configuration ({preset}) written to: {path}");
    println!("\nTo use this bot:");
    println!("1. Copy {path} to {DEFAULT_CONFIG_PATH}");
    println!("2. Adjust rewards, thresholds and texts");
    println!("3. Create a .env file with TG_API_ID, TG_API_HASH and TELEGRAM_BOT_TOKEN");
    println!("4. Run: invite_tracker_bot");

    Ok(())
}
