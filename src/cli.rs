//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{self, GlobalArgs, OutputFormat};

/// uniconf - Resolve hierarchical configuration from files, env, git, and remote sources
#[derive(Parser, Debug)]
#[command(name = "uniconf")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute; prints the whole configuration when omitted
    #[command(subcommand)]
    command: Option<Commands>,

    /// Project directory; the config file and scenario directories are resolved below it
    #[arg(
        short = 'C',
        long,
        global = true,
        value_name = "DIR",
        env = "UNICONF_DIR",
        default_value = "."
    )]
    dir: PathBuf,

    /// Root configuration document, relative to the project directory
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        env = "UNICONF_CONFIG_FILE",
        default_value = ".unipipe/config.yaml"
    )]
    config: PathBuf,

    /// Settings file (defaults to ~/.uniconf.yaml when present)
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Scratch directory for git checkouts and downloads (cleared on every run)
    #[arg(long, global = true, value_name = "DIR", env = "UNICONF_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "yaml")]
    output: OutputFormat,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resolved configuration, or the subtree at a path
    Show(commands::show::ShowArgs),

    /// Merge a named block found at every prefix of a path
    Collect(commands::collect::CollectArgs),

    /// Merge the levels of a nested container hierarchy
    Children(commands::children::ChildrenArgs),

    /// Show a subtree and which documents set each value in it
    Explain(commands::explain::ExplainArgs),

    /// Print the configuration as dotted key paths
    Flatten(commands::flatten::FlattenArgs),

    /// Substitute ${...} expressions in a string
    Interpolate(commands::interpolate::InterpolateArgs),

    /// Display the include tree
    Tree(commands::tree::TreeArgs),

    /// Select an entity as a context and print the configuration with it merged in
    Context(commands::context::ContextArgs),

    /// Print a tab-completion script for uniconf's subcommands and project flags
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        let global = GlobalArgs {
            dir: self.dir,
            config: self.config,
            settings: self.settings,
            temp_dir: self.temp_dir,
            output: self.output,
        };

        match self.command {
            None => commands::show::execute(commands::show::ShowArgs::default(), &global),
            Some(Commands::Show(args)) => commands::show::execute(args, &global),
            Some(Commands::Collect(args)) => commands::collect::execute(args, &global),
            Some(Commands::Children(args)) => commands::children::execute(args, &global),
            Some(Commands::Explain(args)) => commands::explain::execute(args, &global),
            Some(Commands::Flatten(args)) => commands::flatten::execute(args, &global),
            Some(Commands::Interpolate(args)) => commands::interpolate::execute(args, &global),
            Some(Commands::Tree(args)) => commands::tree::execute(args, &global),
            Some(Commands::Context(args)) => commands::context::execute(args, &global),
            Some(Commands::Completions(args)) => commands::completions::execute(args),
        }
    }
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // Already initialized when running under a test harness
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}
