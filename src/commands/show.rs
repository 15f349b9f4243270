//! # Show Command Implementation
//!
//! Prints the resolved configuration, or the subtree found at a dotted path.
//! This is also what runs when `uniconf` is invoked without a subcommand.

use anyhow::{anyhow, Result};
use clap::Args;

use uniconf::Uniconf;

use super::{emit, render_value, GlobalArgs, OutputFormat};

/// Print the resolved configuration
#[derive(Args, Debug, Default)]
pub struct ShowArgs {
    /// Dotted path of the subtree to print (longest matching key wins)
    #[arg(short = 'j', long = "jsonpath", value_name = "PATH")]
    pub path: Option<String>,
}

pub fn render(uniconf: &Uniconf, args: &ShowArgs, format: OutputFormat) -> Result<String> {
    let value = match args.path.as_deref() {
        None => uniconf.config(),
        Some(path) => uniconf
            .get(path)
            .ok_or_else(|| anyhow!("No configuration value at '{}'", path))?,
    };
    render_value(value, format)
}

/// Execute the `show` command.
pub fn execute(args: ShowArgs, global: &GlobalArgs) -> Result<()> {
    let uniconf = global.load()?;
    emit(&render(&uniconf, &args, global.output)?);
    Ok(())
}
