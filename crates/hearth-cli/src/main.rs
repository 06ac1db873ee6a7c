// SPDX-License-Identifier: MIT

//! `hearth`: a direct, in-process client over the automation store (§4.6,
//! §4.7). Unlike `hearthd`, this binary owns no event sources, no worker
//! backend, and no HTTP server — it opens the same state directory the
//! daemon writes to and performs the same store-level reads and writes a
//! caller would otherwise make over the HTTP API. Run it only against a
//! state directory that no `hearthd` has open at the same time; the store
//! is built for exactly one writer.

mod commands;
mod output;
mod state;

use clap::{Parser, Subcommand};
use hearth_core::ListenerCache;
use hearth_engine::AutomationRegistry;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "hearth", version, about = "Inspect and edit the hearth automation store")]
struct Cli {
    #[arg(long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage event- and schedule-triggered automations
    Automation(commands::automation::AutomationArgs),
    /// Inspect worker task rows
    Worker(commands::worker::WorkerArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let store = state::open_store()?;

    match cli.command {
        Command::Automation(args) => {
            let registry = AutomationRegistry::new(store, ListenerCache::default());
            commands::automation::run(&registry, args, cli.format)
        }
        Command::Worker(args) => commands::worker::run(&store, args, cli.format),
    }
}
