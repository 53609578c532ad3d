//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path (TOML)
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect several users concurrently with simulated attempts
    Simulate {
        /// Number of users
        #[arg(short, long, default_value_t = 4)]
        users: usize,
        /// Connect requests per user
        #[arg(short, long, default_value_t = 6)]
        attempts: usize,
        /// Target address dialed by every user
        #[arg(short, long, default_value = "10.0.0.1")]
        target: String,
    },
    /// Fail connects until the user is locked out, then reset
    Lockout {
        /// User name
        #[arg(short, long, default_value = "mallory")]
        name: String,
    },
    /// Open sessions, let time pass and sweep expired ones
    Sessions {
        /// Sessions to open
        #[arg(short, long, default_value_t = 3)]
        count: usize,
        /// Simulated minutes of inactivity before the sweep
        #[arg(short, long, default_value_t = 45)]
        idle_minutes: u64,
    },
    /// Print the effective configuration as TOML
    Config,
}
