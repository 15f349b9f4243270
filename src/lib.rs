//! # uniconf
//!
//! A hierarchical configuration loader. A root document names other
//! documents to include (`from`), those documents come from pluggable sources
//! (local files, environment variables, git repositories, remote URLs,
//! in-memory maps), and everything is deep-merged into one tree with
//! deterministic "most specific document wins" precedence.
//!
//! ## Quick Example
//!
//! ```
//! use serde_json::json;
//! use uniconf::{Settings, Source, Uniconf};
//!
//! let mut uniconf = Uniconf::new(Settings {
//!     env_config_var: None,
//!     temp_dir: std::env::temp_dir().join("uniconf-doc-example"),
//!     ..Settings::default()
//! });
//! uniconf.set_root_source(Source::map(
//!     "project",
//!     vec![
//!         ("root", "from: [defaults, prod]\nlog_level: DEBUG\n"),
//!         ("defaults", "log_level: INFO\nsteps: [build]\n"),
//!         ("prod", "steps: [build, deploy]\n"),
//!     ],
//! ));
//! uniconf.load().unwrap();
//!
//! assert_eq!(uniconf.config()["log_level"], json!("DEBUG"));
//! assert_eq!(uniconf.config()["steps"], json!(["build", "deploy"]));
//! ```
//!
//! ## Core Concepts
//!
//! - **Values (`value`)**: the configuration tree model and YAML/JSON codecs.
//! - **Merging (`merge`)**: deep merge with per-type precedence rules.
//! - **Paths (`path`, `collect`)**: longest-prefix dotted lookup, flattening,
//!   and parameter collection along nested paths.
//! - **Sources (`source`, `transport`, `git`)**: where documents come from and
//!   how git and remote sources are fetched.
//! - **Entities (`entity`, `config`)**: one loaded document, its provenance,
//!   and the `sources`/`from` keys that drive includes.
//! - **Engine (`engine`)**: include resolution, the merged result, history,
//!   and derived views.
//! - **Interpolation (`interpolate`)**: `${...}` substitution over the
//!   flattened configuration.
//! - **Processing (`process`)**: nested `from` keys resolved against
//!   parameter blocks after loading, and context selection.

pub mod collect;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod git;
pub mod interpolate;
pub mod merge;
pub mod path;
pub mod process;
pub mod settings;
pub mod source;
pub mod transport;
pub mod value;

pub use engine::Uniconf;
pub use error::{Error, Result};
pub use settings::Settings;
pub use source::Source;

#[cfg(test)]
mod merge_proptest;
