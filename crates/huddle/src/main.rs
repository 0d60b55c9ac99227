// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Huddle - realtime presence and bot event gateway.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use huddle_config::{ConfigError, HuddleConfig};
use huddle_core::HuddleError;

/// Huddle - realtime presence and bot event gateway.
#[derive(Parser, Debug)]
#[command(name = "huddle", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Start the gateway server.
    Serve,
    /// Validate configuration and exit.
    CheckConfig,
}

fn load_config(cli: &Cli) -> Result<HuddleConfig, HuddleError> {
    let result = match &cli.config {
        Some(path) => huddle_config::load_and_validate_path(path),
        None => huddle_config::load_and_validate(),
    };
    report_config_errors(result)
}

/// Render config diagnostics to stderr and collapse them into one error.
fn report_config_errors(
    result: Result<HuddleConfig, Vec<ConfigError>>,
) -> Result<HuddleConfig, HuddleError> {
    result.map_err(|errors| {
        huddle_config::render_errors(&errors);
        HuddleError::Config(format!("{} problem(s) found", errors.len()))
    })
}

fn summary(config: &HuddleConfig) -> String {
    format!(
        "listening on {}:{}, {} bot(s), {} session(s), api {}",
        config.server.host,
        config.server.port,
        config.bots.len(),
        config.sessions.len(),
        if config.server.bearer_token.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    )
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("huddle: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("huddle: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::CheckConfig) => {
            println!("huddle: config OK ({})", summary(&config));
        }
        None => {
            println!("huddle: use --help for available commands");
        }
    }
}
