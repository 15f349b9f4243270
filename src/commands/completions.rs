//! # Completions Command Implementation
//!
//! `uniconf completions <shell>` prints a `clap_complete` script covering the
//! subcommands and the global project flags (`--dir`, `--config`,
//! `--settings`, `--temp-dir`). Typical installs:
//!
//! ```bash
//! uniconf completions bash > ~/.local/share/bash-completion/completions/uniconf
//! uniconf completions zsh > "${fpath[1]}/_uniconf"
//! uniconf completions fish > ~/.config/fish/completions/uniconf.fish
//! ```

use anyhow::Result;
use clap::{Args, CommandFactory, ValueEnum};
use clap_complete::{generate, Shell};
use std::io;

use crate::cli::Cli;

const BIN_NAME: &str = "uniconf";

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
    Elvish,
}

impl From<CompletionShell> for Shell {
    fn from(shell: CompletionShell) -> Self {
        match shell {
            CompletionShell::Bash => Shell::Bash,
            CompletionShell::Zsh => Shell::Zsh,
            CompletionShell::Fish => Shell::Fish,
            CompletionShell::PowerShell => Shell::PowerShell,
            CompletionShell::Elvish => Shell::Elvish,
        }
    }
}

/// Print a tab-completion script for uniconf's subcommands and project flags
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell the script is written for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}

/// Write the script to stdout. No configuration is loaded.
pub fn execute(args: CompletionsArgs) -> Result<()> {
    write_completions(args.shell, &mut io::stdout());
    Ok(())
}

fn write_completions(shell: CompletionShell, out: &mut dyn io::Write) {
    let mut cmd = Cli::command();
    let shell: Shell = shell.into();
    generate(shell, &mut cmd, BIN_NAME, out);
}
