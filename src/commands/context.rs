//! # Context Command Implementation
//!
//! Loads the configuration, selects one entity through the handler declared
//! under `entities.<name>`, and prints the configuration with the entity
//! stored under `contexts` and its `context` block merged into the root.
//! With `--only`, just the selected entity is printed.

use anyhow::{Context as _, Result};
use clap::Args;

use uniconf::process::DEFAULT_PHASE;
use uniconf::value::Value;
use uniconf::Uniconf;

use super::{emit, render_value, GlobalArgs, OutputFormat};

/// Select an entity as a context and print the configuration with it merged in
#[derive(Args, Debug)]
pub struct ContextArgs {
    /// Entity kind, a key of the `entities` block
    #[arg(short, long, value_name = "NAME", env = "UNICONF_CONTEXT_NAME")]
    pub name: String,

    /// Dotted id of the entity, e.g. `prod.install`
    #[arg(short, long, value_name = "ID", env = "UNICONF_CONTEXT_ID")]
    pub id: String,

    /// Phase nested `from` keys are processed for
    #[arg(long, value_name = "PHASE", default_value = DEFAULT_PHASE)]
    pub phase: String,

    /// Print only the selected entity
    #[arg(long)]
    pub only: bool,
}

pub fn render(uniconf: &mut Uniconf, args: &ContextArgs, format: OutputFormat) -> Result<String> {
    let entity = uniconf
        .process_context(&args.name, &args.id, &args.phase)
        .with_context(|| format!("Failed to select {} '{}'", args.name, args.id))?;
    if args.only {
        render_value(&Value::Object(entity), format)
    } else {
        render_value(uniconf.config(), format)
    }
}

/// Execute the `context` command.
pub fn execute(args: ContextArgs, global: &GlobalArgs) -> Result<()> {
    let mut uniconf = global.load()?;
    emit(&render(&mut uniconf, &args, global.output)?);
    Ok(())
}
