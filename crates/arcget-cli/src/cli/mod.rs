//! CLI for the arcget archive retrieval client.

mod commands;

use anyhow::Result;
use arcget_core::config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_checksum, run_retrieve, run_status};

/// Top-level CLI for the arcget archive client.
#[derive(Debug, Parser)]
#[command(name = "arcget")]
#[command(about = "arcget: retrieve stored files from an archive server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Retrieve a stored file from the archive server.
    Retrieve {
        /// File id to retrieve.
        file_id: String,

        /// Specific archived version (latest when omitted).
        #[arg(long, value_name = "N")]
        file_version: Option<u32>,

        /// Directory to save into (default: configured retrieve dir, else the
        /// current directory).
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Print the SHA-256 of the saved file.
        #[arg(long)]
        checksum: bool,
    },

    /// Print the server status document.
    Status,

    /// Compute SHA-256 of a local file (e.g. after a retrieve).
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Retrieve {
                file_id,
                file_version,
                output_dir,
                checksum,
            } => run_retrieve(&cfg, &file_id, file_version, output_dir.as_deref(), checksum),
            CliCommand::Status => run_status(&cfg),
            CliCommand::Checksum { path } => run_checksum(&path),
        }
    }
}
