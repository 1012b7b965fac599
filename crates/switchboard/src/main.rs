// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Switchboard - multi-tenant helpdesk for WhatsApp and Facebook Messenger.
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
use switchboard_config::SwitchboardConfig;

/// Switchboard - multi-tenant helpdesk for WhatsApp and Facebook Messenger.
#[derive(Parser, Debug)]
#[command(name = "switchboard", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway: provider webhooks and the agent hub.
    Serve,
    /// Validate configuration and exit.
    Check,
}

fn load(path: Option<&PathBuf>) -> SwitchboardConfig {
    let loaded = match path {
        Some(path) => switchboard_config::load_and_validate_path(path),
        None => switchboard_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            switchboard_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

/// One-line description of what `serve` would start with.
fn summary(config: &SwitchboardConfig) -> String {
    let enabled: Vec<&str> = [
        ("whatsapp", config.whatsapp.enabled),
        ("facebook", config.facebook.enabled),
    ]
    .into_iter()
    .filter_map(|(name, on)| on.then_some(name))
    .collect();
    format!(
        "listen={}:{} database={} providers=[{}]",
        config.server.host,
        config.server.port,
        config.storage.database_path,
        enabled.join(",")
    )
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load(cli.config.as_ref());

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Check) => {
            println!("switchboard: config ok ({})", summary(&config));
            if let Err(e) = switchboard_config::validation::require_pseudonym_salt(&config) {
                switchboard_config::render_errors(&[e]);
                std::process::exit(1);
            }
        }
        None => {
            println!("switchboard: use --help for available commands");
        }
    }
}
