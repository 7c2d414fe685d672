//! CLI for the apiq request scheduler.

mod commands;

use anyhow::Result;
use apiq_core::config;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use commands::{run_bulk, run_call, run_completions, run_manpage, CallArgs};

/// Top-level CLI for apiq.
#[derive(Debug, Parser)]
#[command(name = "apiq")]
#[command(about = "apiq: bounded, retrying HTTP request runner", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Send one request and print the result as JSON.
    Call {
        /// HTTP verb (GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS).
        method: String,

        /// Path relative to the base URL, or an absolute http(s) URL.
        path: String,

        /// JSON request body.
        #[arg(long, value_name = "JSON")]
        data: Option<String>,

        /// Name echoed back in the result.
        #[arg(long)]
        alias: Option<String>,

        /// Attempts including the first; only timeouts are retried.
        #[arg(long, value_name = "N")]
        attempts: Option<u32>,

        /// Override the configured base URL.
        #[arg(long, value_name = "URL")]
        base_url: Option<String>,
    },

    /// Send a TOML file of `[[call]]` tables as one bulk group.
    Bulk {
        /// Path to the bulk file.
        file: PathBuf,

        /// Wait for every call instead of failing on the first error.
        #[arg(long)]
        continue_with_failure: bool,

        /// Override the configured base URL.
        #[arg(long, value_name = "URL")]
        base_url: Option<String>,
    },

    /// Print shell completions.
    Completions {
        shell: Shell,
    },

    /// Print the man page (roff) to stdout.
    Manpage,
}

fn load_config(base_url: Option<String>) -> Result<config::ApiqConfig> {
    let mut cfg = config::load_or_init()?;
    tracing::debug!("loaded config: {:?}", cfg);
    if let Some(url) = base_url {
        cfg.base_url = url;
    }
    Ok(cfg)
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Call {
                method,
                path,
                data,
                alias,
                attempts,
                base_url,
            } => {
                let cfg = load_config(base_url)?;
                let args = CallArgs {
                    method,
                    path,
                    data,
                    alias,
                    attempts,
                };
                run_call(&cfg, args).await?;
            }
            CliCommand::Bulk {
                file,
                continue_with_failure,
                base_url,
            } => {
                let cfg = load_config(base_url)?;
                run_bulk(&cfg, &file, continue_with_failure).await?;
            }
            CliCommand::Completions { shell } => run_completions(shell),
            CliCommand::Manpage => run_manpage()?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
