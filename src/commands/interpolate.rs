//! # Interpolate Command Implementation
//!
//! Substitutes `${key.path}` and `${function(args)}` expressions in a string
//! against the resolved configuration.

use anyhow::{Context, Result};
use clap::Args;

use uniconf::Uniconf;

use super::{emit, GlobalArgs};

/// Substitute ${...} expressions in a string
#[derive(Args, Debug)]
pub struct InterpolateArgs {
    /// Text containing ${...} expressions
    #[arg(value_name = "TEXT")]
    pub text: String,
}

pub fn render(uniconf: &Uniconf, args: &InterpolateArgs) -> Result<String> {
    uniconf
        .interpolate(&args.text)
        .with_context(|| format!("Failed to interpolate '{}'", args.text))
}

/// Execute the `interpolate` command.
pub fn execute(args: InterpolateArgs, global: &GlobalArgs) -> Result<()> {
    let uniconf = global.load()?;
    emit(&render(&uniconf, &args)?);
    Ok(())
}
