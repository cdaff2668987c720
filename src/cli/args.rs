//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Repository to operate on (default: current directory)
//! - `--config <path>`: Use this config file instead of the default lookup
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Log errors only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// gitpane - Git repository access core behind a JSON command surface
#[derive(Parser, Debug)]
#[command(name = "gitpane")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if gitpane was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Config file to load instead of the default lookup
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub debug: bool,

    /// Log errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// The repository directory commands operate on.
    pub fn directory(&self) -> PathBuf {
        self.cwd.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve JSON requests on stdin, one per line
    #[command(
        name = "serve",
        long_about = "Read one JSON request per stdin line and write one JSON response per \
            stdout line.\n\n\
            Requests run concurrently; responses may arrive out of order and carry the \
            request_id they answer. Logs go to stderr.",
        after_help = "\
EXAMPLES:
    echo '{\"command\":\"get_branch_list\",\"directory\":\".\"}' | gitpane serve

    # cancel a slow push
    {\"command\":\"push_current_branch\",\"directory\":\"/r\",\"request_id\":\"7\"}
    {\"command\":\"cancel\",\"target\":\"7\"}"
    )]
    Serve,

    /// Run a single JSON request and print the response
    #[command(name = "exec")]
    Exec {
        /// The request, or `-` to read it from stdin
        request: String,
    },

    /// List local and remote branches
    #[command(name = "branches")]
    Branches {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show commit history, newest first
    #[command(name = "log")]
    Log {
        /// Branch to walk (default: the checked-out branch)
        #[arg(short, long)]
        branch: Option<String>,

        /// Show at most this many commits
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show uncommitted changes
    #[command(name = "status")]
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show the unified diff of one file
    #[command(name = "diff")]
    Diff {
        /// Repository-relative path
        path: String,

        /// Diff the file as changed by this commit
        #[arg(long, conflicts_with_all = ["staged", "unstaged"])]
        commit: Option<String>,

        /// Index against HEAD
        #[arg(long, conflicts_with = "unstaged")]
        staged: bool,

        /// Working tree against the index
        #[arg(long)]
        unstaged: bool,
    },

    /// Generate shell completion scripts
    #[command(name = "completion")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn diff_flags_conflict() {
        let parsed = Cli::try_parse_from(["gitpane", "diff", "a.txt", "--staged", "--unstaged"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["gitpane", "status", "--cwd", "/tmp/r", "--debug"]).unwrap();
        assert_eq!(cli.directory(), PathBuf::from("/tmp/r"));
        assert!(cli.debug);
    }
}
