//! # Error Handling
//!
//! This module defines the centralized error type for `uniconf`. It uses the
//! `thiserror` library to create an `Error` enum covering every failure mode
//! of a resolution run, with messages that name the source and document
//! involved.
//!
//! ## Recoverable vs. fatal
//!
//! Only [`Error::NotFound`] is recoverable: a missing file, environment
//! variable, map entry, or remote document makes the include that referenced
//! it a no-op, and the engine logs and skips it. Every other variant aborts
//! the run. Use [`Error::is_not_found`] to tell them apart.
//!
//! The `Result` type alias is used to return `Result<T, Error>` from
//! functions throughout the crate.

use thiserror::Error;

/// Main error type for uniconf operations
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration document could not be parsed or has an invalid shape.
    ///
    /// Includes an optional hint about how to fix the document.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A document id does not exist in the source it was requested from.
    #[error("{kind} {id} not found in source '{source_name}'")]
    NotFound {
        /// What was looked up: "file", "environment variable", "map entry", ...
        kind: String,
        id: String,
        source_name: String,
    },

    /// An include or the engine referenced a source name nobody registered.
    #[error("Source '{name}' is not registered")]
    SourceNotRegistered { name: String },

    /// A `sources` entry declared a type this build does not know.
    #[error("Unknown source type '{source_type}' for source '{name}'")]
    UnknownSourceType { name: String, source_type: String },

    /// A source could not be materialized (directory setup, missing fields).
    #[error("Source '{name}' could not be loaded: {message}")]
    SourceLoad { name: String, message: String },

    /// An error occurred while cloning a Git repository.
    ///
    /// Includes the repository URL, ref, error message, and an optional hint.
    #[error("Git clone error for {url}@{r#ref}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    GitClone {
        url: String,
        r#ref: String,
        message: String,
        /// Optional hint for how to resolve the clone issue
        hint: Option<String>,
    },

    /// An error occurred while executing a Git command.
    #[error("Git command failed for {url}: {command} - {stderr}")]
    GitCommand {
        command: String,
        url: String,
        stderr: String,
    },

    /// A remote server answered with a status other than success or "absent".
    #[error("Network operation error: {url} - {message}")]
    Network { url: String, message: String },

    /// An HTTP request failed before a usable response arrived (DNS, TLS, connect, body read).
    #[error("HTTP request failed for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The include graph nested deeper than the configured bound.
    #[error("Include depth {depth} exceeded: {chain}")]
    IncludeDepthExceeded { depth: usize, chain: String },

    /// A `${...}` expression could not be evaluated.
    #[error("Interpolation error: {message} (expression: {expression})")]
    Interpolation { message: String, expression: String },

    /// A context was requested that the configuration does not define.
    #[error("Context error: {message}")]
    Context { message: String },

    /// The tool settings are invalid or missing required values.
    #[error("Settings error: {message}")]
    Settings { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON parsing error, wrapped from `serde_json::Error`.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Build a [`Error::NotFound`] for `id` in `source_name`.
    pub fn not_found(kind: &str, id: &str, source_name: &str) -> Self {
        Error::NotFound {
            kind: kind.to_string(),
            id: id.to_string(),
            source_name: source_name.to_string(),
        }
    }

    /// Whether this error only means "nothing there"; the caller may skip it.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
