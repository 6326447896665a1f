//! Bankdata CLI - sync bank account data into blob storage

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

mod commands;
mod output;

use commands::{banks, link, status, sync};

/// Bankdata - pull bank account data from GoCardless into storage
#[derive(Parser)]
#[command(name = "bds", version, about, long_about = None)]
struct Cli {
    /// Log progress to stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch account data and write one export per bank
    Sync {
        /// Bank key (optional, syncs all banks if not specified)
        #[arg(long)]
        bank: Option<String>,
        /// Keep exports in memory instead of writing them
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show requisition status and days of access left per bank
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create an authorization link for a bank
    Link {
        /// Bank key, e.g. mbank
        bank: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List supported banks
    Banks {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };

    // RUST_LOG takes precedence over -v
    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Sync { bank, dry_run, json } => sync::run(bank, dry_run, json).await,
        Commands::Status { json } => status::run(json).await,
        Commands::Link { bank, json } => link::run(&bank, json).await,
        Commands::Banks { json } => banks::run(json),
    }
}
