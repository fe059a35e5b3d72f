//! # rdm-cli
//!
//! Command-line interface for RDM accountability goals.
//!
//! - `rdm goal create/pledge/activate/status/list` — manage goals
//! - `rdm reflect` — record a check-in
//! - `rdm claim` — submit completion evidence
//! - `rdm settle` — evaluate and settle a claimed goal (idempotent)
//! - `rdm sweep` — expire overdue goals
//! - `rdm ledger show/verify` — inspect a goal's settlement ledger

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rdm_lifecycle::{RdmConfig, StoreLayout};
use tracing_subscriber::EnvFilter;

use commands::Context;

/// RDM — pledge tokens on a goal, reflect, and settle the outcome.
#[derive(Parser)]
#[command(name = "rdm", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Print results as JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage goals.
    Goal {
        #[command(subcommand)]
        command: commands::goal::GoalCommands,
    },
    /// Record a reflection check-in on an active goal.
    Reflect(commands::settle::ReflectArgs),
    /// Submit a completion claim with evidence.
    Claim(commands::settle::ClaimArgs),
    /// Settle a claimed (or overdue) goal. Safe to repeat.
    Settle {
        /// Goal ID.
        id: String,
    },
    /// Expire every overdue goal that has no accepted claim.
    Sweep,
    /// Inspect settlement ledgers.
    Ledger {
        #[command(subcommand)]
        command: commands::ledger::LedgerCommands,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays parseable with --json.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("rdm_lifecycle=info".parse()?)
                .add_directive("rdm_cli=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let layout = StoreLayout::for_project(&project_root);
    let config = RdmConfig::load_or_default(&layout.config_file)?;
    tracing::debug!(root = %layout.root.display(), "loaded project config");
    let ctx = Context {
        layout,
        config,
        json: cli.json,
    };

    match &cli.command {
        Commands::Goal { command } => commands::goal::execute(command, &ctx),
        Commands::Reflect(args) => commands::settle::reflect(args, &ctx),
        Commands::Claim(args) => commands::settle::claim(args, &ctx),
        Commands::Settle { id } => commands::settle::settle(id, &ctx),
        Commands::Sweep => commands::settle::sweep(&ctx),
        Commands::Ledger { command } => commands::ledger::execute(command, &ctx),
    }
}
