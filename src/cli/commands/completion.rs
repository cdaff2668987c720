//! completion command - Print a shell completion script

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::{generate, Shell as Target};

use crate::cli::args::{Cli, Shell};

impl From<Shell> for Target {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => Target::Bash,
            Shell::Zsh => Target::Zsh,
            Shell::Fish => Target::Fish,
            Shell::PowerShell => Target::PowerShell,
        }
    }
}

/// Write the completion script for `shell` to stdout.
pub fn completion(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    let bin = cmd.get_name().to_string();
    generate(Target::from(shell), &mut cmd, bin, &mut std::io::stdout().lock());
    Ok(())
}
