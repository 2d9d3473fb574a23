//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Messenger Export - flatten a threads_db2 database into a delimited
/// file and download referenced attachments.
#[derive(Parser, Debug)]
#[command(name = "messenger-export")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Optional TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full export: scan, normalize, download, write.
    Export {
        /// Path to the threads_db2 database file.
        db: PathBuf,

        /// Output file path.
        #[arg(short, long, default_value = "messenger_chat.csv")]
        output: PathBuf,

        /// Directory for downloaded attachments.
        #[arg(short, long)]
        files_dir: Option<PathBuf>,

        /// Skip attachment downloads entirely.
        #[arg(long)]
        skip_downloads: bool,

        /// Abort the run on the first failed download.
        #[arg(long)]
        fail_fast: bool,
    },

    /// Scan the database and print summary statistics without writing.
    Stats {
        /// Path to the threads_db2 database file.
        db: PathBuf,
    },

    /// List the resolved contacts table.
    Contacts {
        /// Path to the threads_db2 database file.
        db: PathBuf,

        /// Maximum number of contacts to show (0 = all).
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },
}
