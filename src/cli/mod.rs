//! cli
//!
//! Command-line interface layer for gitpane.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install logging and load configuration
//! - Delegate to command handlers
//! - Does NOT touch repositories directly
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap, builds an
//! [`Engine`](crate::engine::Engine) from the loaded config, and hands the
//! command to a handler running on a tokio runtime. Stdout carries only
//! command output; logs go to stderr.

pub mod args;
pub mod commands;

pub use args::{Cli, Command, Shell};

use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;
use crate::engine::Engine;

/// Environment variable holding a tracing filter; overrides the flags.
pub const LOG_ENV: &str = "GITPANE_LOG";

fn default_filter(debug: bool, quiet: bool) -> &'static str {
    if debug {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    }
}

/// Install the stderr subscriber. Safe to call more than once.
pub fn init_logging(debug: bool, quiet: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_filter(debug, quiet)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse_args();
    init_logging(cli.debug, cli.quiet);

    if let Command::Completion { shell } = cli.command {
        commands::completion(shell)?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(path) = config.loaded_from() {
        tracing::debug!(path = %path.display(), "loaded config");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let dir = cli.directory();
    let engine = Engine::from_config(config);
    runtime.block_on(commands::dispatch(cli.command, &dir, engine))
}
