//! CLI module for Svar.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Svar - YouTube Transcript Q&A
///
/// Ask questions about YouTube videos, answered strictly from their
/// transcripts. The name "Svar" comes from the Norwegian word for "answer."
#[derive(Parser, Debug)]
#[command(name = "svar")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Svar and write the default configuration
    Init,

    /// Fetch, translate, chunk, and index a video's transcript
    Process {
        /// YouTube URL or video ID
        video: String,
    },

    /// Ask a question about a processed video
    Ask {
        /// YouTube URL or video ID
        video: String,

        /// The question to ask
        question: String,

        /// Number of transcript chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Show whether a video has been processed
    Status {
        /// YouTube URL or video ID
        video: String,
    },

    /// List the caption languages available for a video
    Languages {
        /// YouTube URL or video ID
        video: String,
    },

    /// Run the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "5000")]
        port: u16,
    },
}
