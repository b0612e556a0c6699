pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mcupdate")]
#[command(about = "Watches Minecraft feedback sections and broadcasts new articles", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Seed, then poll until interrupted
    Run {
        /// Poll interval override (e.g., "60s", "5m", "1h")
        #[arg(short, long)]
        interval: Option<String>,

        /// Read "<caller-id> <command>" lines from stdin while running
        #[arg(long)]
        console: bool,
    },
    /// Run one check now
    Check,
    /// Show the latest article of every feed without recording it
    Latest,
    /// Send a feed's latest article to every destination
    Push {
        /// Feed name or alias (e.g., "beta")
        feed: String,
    },
    /// Show recorded articles and destinations
    Status,
    /// Manage notification destinations
    Destinations {
        #[command(subcommand)]
        action: DestinationAction,
    },
}

#[derive(Subcommand)]
pub enum DestinationAction {
    /// Register a destination
    Add {
        id: String,
    },
    /// Unregister a destination
    Remove {
        id: String,
    },
    /// List registered destinations
    List,
}
