//! Marquee: rotation scheduler for fixed-purpose displays
//!
//! Main binary with subcommands:
//! - `play`: run the rotation daemon against a schedule document
//! - `check`: evaluate a schedule document and print its current state

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod check;
mod daemon;

#[derive(Parser)]
#[command(name = "marquee")]
#[command(about = "Rotation scheduler for fixed-purpose displays", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the rotation daemon until interrupted
    Play {
        /// Path to the schedule document (JSON)
        #[arg(long, env = "MARQUEE_SCHEDULE")]
        schedule: PathBuf,
    },

    /// Evaluate a schedule document and print its current state
    Check {
        /// Path to the schedule document (JSON)
        #[arg(long, env = "MARQUEE_SCHEDULE")]
        schedule: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "marquee=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play { schedule } => daemon::run(&schedule).await,
        Commands::Check { schedule } => check::run(&schedule),
    }
}
