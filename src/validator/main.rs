//! Standalone validator for tracker configuration files.
//!
//! Checks a `tracker.json` file for invalid thresholds, cadences, key
//! ranges and links, and prints a summary of the resulting reward scheme.

use std::process::ExitCode;

use clap::Parser;

use invite_tracker_bot::config::{Preset, Style, TrackerConfig, DEFAULT_CONFIG_PATH};

/// Tracker configuration validator.
#[derive(Parser, Debug)]
#[command(name = "validate_tracker_config")]
#[command(about = "Validates tracker configuration files for the invite tracker bot")]
#[command(version)]
struct Args {
    /// Path to the JSON configuration file to validate.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    file: String,

    /// Generate an example configuration file at the specified path.
    #[arg(long)]
    generate_example: Option<String>,

    /// Preset used by --generate-example (birri, milestone, grand).
    #[arg(long, default_value = "birri")]
    preset: String,

    /// Show the full reward scheme.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(output_path) = args.generate_example {
        return generate_example(&output_path, &args.preset);
    }

    validate_config(&args.file, args.verbose)
}

fn generate_example(output_path: &str, preset: &str) -> ExitCode {
    let preset: Preset = match preset.parse() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("✗ {e}");
            return ExitCode::FAILURE;
        }
    };

    match TrackerConfig::preset(preset).save_to_file(output_path) {
        Ok(()) => {
            println!("✓ Example configuration ({preset}) written to: {output_path}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to write example file: {e}");
            ExitCode::FAILURE
        }
    }
}

fn validate_config(path: &str, verbose: bool) -> ExitCode {
    println!("Validating: {path}\n");

    let config = match TrackerConfig::load_from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("✗ Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let ledger = &config.ledger;
    let presentation = &config.presentation;

    if verbose {
        println!("Reward per invite:     {} {}", ledger.reward_per_invite, presentation.currency);
        println!("Withdrawal threshold:  {} invites", ledger.withdrawal_threshold);
        println!("Notify every:          {} invites", ledger.notification_cadence);
        println!("Key range:             {}..={}", ledger.key_range.min, ledger.key_range.max);
        println!(
            "Style:                 {}",
            match presentation.style {
                Style::Progress => "progress",
                Style::Milestone => "milestone",
            }
        );
        println!();
    }

    let mut warnings = 0;
    if ledger.reward_per_invite == 0 {
        warnings += 1;
        println!("  ⚠ Warning: reward per invite is 0, balances will always be 0");
    }
    if ledger.notification_cadence > ledger.withdrawal_threshold && ledger.withdrawal_threshold > 0 {
        warnings += 1;
        println!("  ⚠ Warning: first notification comes after the withdrawal threshold");
    }
    if presentation.withdrawal_url.is_empty() && presentation.style == Style::Progress {
        warnings += 1;
        println!("  ⚠ Warning: no withdrawal_url, the 'Request Withdrawal' button is hidden");
    }

    let issues = config.issues();
    for issue in &issues {
        println!("  ✗ Error: {issue}");
    }

    println!();

    if issues.is_empty() {
        println!("✓ Configuration is valid!");
        if warnings > 0 {
            println!("  ({warnings} warning(s))");
        }
        println!(
            "\nA user reaching the threshold holds {} {}.",
            ledger.withdrawal_threshold.saturating_mul(ledger.reward_per_invite),
            presentation.currency
        );
        ExitCode::SUCCESS
    } else {
        println!("✗ Validation failed: {} error(s)", issues.len());
        ExitCode::FAILURE
    }
}
