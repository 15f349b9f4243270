//! # Explain Command Implementation
//!
//! Prints the resolved subtree at a path together with the load history of
//! every leaf below it: the documents that set the leaf, in merge order. The
//! last entry of each history is the document whose value won.

use anyhow::Result;
use clap::Args;

use uniconf::Uniconf;

use super::{emit, render_value, GlobalArgs, OutputFormat};

/// Show a subtree and which documents set each value in it
#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Dotted path to explain
    #[arg(short, long, value_name = "PATH", default_value = ".")]
    pub jsonpath: String,
}

pub fn render(uniconf: &Uniconf, args: &ExplainArgs, format: OutputFormat) -> Result<String> {
    render_value(&uniconf.explain(&args.jsonpath).to_value(), format)
}

/// Execute the `explain` command.
pub fn execute(args: ExplainArgs, global: &GlobalArgs) -> Result<()> {
    let uniconf = global.load()?;
    emit(&render(&uniconf, &args, global.output)?);
    Ok(())
}
