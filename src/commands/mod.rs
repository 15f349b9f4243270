//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the `uniconf`
//! command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module typically contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - A `render` function that produces the command output as a string.
//! - An `execute` function that loads the configuration, renders, and prints.
//!
//! Loading is shared: every command resolves the same root document with the
//! same settings through [`GlobalArgs::load`].

pub mod children;
pub mod collect;
pub mod completions;
pub mod context;
pub mod explain;
pub mod flatten;
pub mod interpolate;
pub mod show;
pub mod tree;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::debug;

use uniconf::value::{to_json_string, to_yaml_string, Value};
use uniconf::{Settings, Source, Uniconf};

/// Name of the source holding the root document and project scenarios.
pub const PROJECT_SOURCE_NAME: &str = "project";

/// Output format for commands that print configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub dir: PathBuf,
    pub config: PathBuf,
    pub settings: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub output: OutputFormat,
}

impl GlobalArgs {
    /// Settings from the settings file, with command-line overrides applied.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::load(self.settings.as_deref())
            .context("Failed to load settings")?;
        settings.root_id = self.config.to_string_lossy().into_owned();
        match &self.temp_dir {
            Some(temp_dir) => settings.temp_dir = temp_dir.clone(),
            None if settings.temp_dir.is_relative() => {
                settings.temp_dir = self.dir.join(&settings.temp_dir)
            }
            None => {}
        }
        Ok(settings)
    }

    /// Resolve the root document and everything it includes.
    pub fn load(&self) -> Result<Uniconf> {
        let settings = self.settings()?;
        debug!("Using settings {:?}", settings);

        let mut uniconf = Uniconf::new(settings);
        uniconf.set_root_source(Source::file(PROJECT_SOURCE_NAME, self.dir.clone()));
        uniconf.load().with_context(|| {
            format!(
                "Failed to load configuration from {}",
                self.dir.join(&self.config).display()
            )
        })?;
        Ok(uniconf)
    }
}

/// Render a value in the requested format.
pub fn render_value(value: &Value, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Yaml => to_yaml_string(value)?,
        OutputFormat::Json => to_json_string(value)?,
    };
    Ok(rendered)
}

/// Print rendered output, adding a trailing newline when missing.
pub fn emit(rendered: &str) {
    if rendered.ends_with('\n') {
        print!("{}", rendered);
    } else {
        println!("{}", rendered);
    }
}
