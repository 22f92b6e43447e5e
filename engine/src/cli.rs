//! CLI interface for Courtside
//!
//! Defines the commands and global flags using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Courtside basketball analytics assistant
///
/// Answers questions about UC Davis basketball and its conference opponents
/// from a local statistics database.
#[derive(Parser, Debug)]
#[command(name = "courtside")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API
    Serve {
        /// Override the configured bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the configured bind port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Ask a single question
    Ask {
        /// The question to ask
        question: String,

        /// Thread to continue
        #[arg(long, value_name = "ID")]
        thread: Option<String>,
    },

    /// List the tables the assistant can query
    Tables,

    /// Run system diagnostics
    Doctor,
}
