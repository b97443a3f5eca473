//! CLI for the ALS lazy-load scheduler.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_config_init, run_config_show, run_session};

/// Top-level CLI for the ALS session replayer.
#[derive(Debug, Parser)]
#[command(name = "als")]
#[command(about = "ALS: adaptive lazy-load scheduler session replayer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Replay a session script against a simulated importer and print
    /// the loaded-modules report.
    Run {
        /// Path to the session script (TOML).
        script: PathBuf,

        /// Emit the report as JSON instead of a table.
        #[arg(long)]
        json: bool,

        /// How long to let delayed/idle dispatches settle after the
        /// last step, in milliseconds.
        #[arg(long, default_value = "5000", value_name = "MS")]
        settle_ms: u64,
    },

    /// Print the effective configuration.
    ConfigShow,

    /// Create the default config file if it does not exist yet.
    ConfigInit,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Run {
                script,
                json,
                settle_ms,
            } => run_session(&script, json, settle_ms).await?,
            CliCommand::ConfigShow => run_config_show()?,
            CliCommand::ConfigInit => run_config_init()?,
        }

        Ok(())
    }
}
