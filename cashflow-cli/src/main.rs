//! Cashflow CLI - daily cash-flow balances in your terminal

use std::process::ExitCode;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;

mod commands;
mod output;

use commands::{list, process, run as scheduler, show};

/// Cashflow - daily cash-flow balances in your terminal
#[derive(Parser)]
#[command(name = "cf", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompute the balance for a single date
    Process {
        /// Date to process (YYYY-MM-DD)
        date: NaiveDate,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Recompute balances for a date range, oldest first
    ProcessRange {
        /// First date (YYYY-MM-DD)
        start: NaiveDate,
        /// Last date, inclusive (YYYY-MM-DD)
        end: NaiveDate,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the stored balance for a date
    Get {
        /// Date to look up (YYYY-MM-DD)
        date: NaiveDate,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the compact summary for a date
    Summary {
        /// Date to look up (YYYY-MM-DD)
        date: NaiveDate,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored balances in a date range
    Period {
        /// First date (YYYY-MM-DD)
        start: NaiveDate,
        /// Last date, inclusive (YYYY-MM-DD)
        end: NaiveDate,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored balances page by page, newest first
    List {
        /// Page number
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Page size (capped at 100)
        #[arg(long, default_value_t = 10)]
        size: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the periodic scheduler until interrupted
    Run,
}

#[tokio::main]
async fn main() -> ExitCode {
    // RUST_LOG controls verbosity, e.g. RUST_LOG=debug cf run
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Process { date, json } => process::run(date, json).await,
        Commands::ProcessRange { start, end, json } => process::run_range(start, end, json).await,
        Commands::Get { date, json } => show::run(date, json).await,
        Commands::Summary { date, json } => show::run_summary(date, json).await,
        Commands::Period { start, end, json } => list::run_period(start, end, json).await,
        Commands::List { page, size, json } => list::run_paginated(page, size, json).await,
        Commands::Run => scheduler::run().await,
    }
}
