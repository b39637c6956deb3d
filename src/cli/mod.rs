//! CLI module for Tubechat.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Tubechat - Ask questions about YouTube videos
///
/// Fetches a video's captions, indexes them, and answers questions using only
/// the parts of the transcript relevant to each question.
#[derive(Parser, Debug)]
#[command(name = "tubechat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "TUBECHAT_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host from config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port from config)
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,
    },

    /// Ask a single question about a video
    Ask {
        /// YouTube video ID or URL
        video: String,

        /// The question to ask
        question: String,
    },

    /// Print the transcript of a video
    Transcript {
        /// YouTube video ID or URL
        video: String,

        /// Preferred caption language (repeatable, in priority order)
        #[arg(short, long = "language")]
        languages: Vec<String>,

        /// Prefix each segment with its start time
        #[arg(short, long)]
        timestamps: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
