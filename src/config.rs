//! # Document Keys Interpreted by the Engine
//!
//! A configuration document is free-form, except for two top-level keys that
//! drive include resolution:
//!
//! - **`sources`**: a mapping of source name to [`SourceConfig`], registering
//!   new named sources the first time they are seen.
//!
//! - **`from`**: a string or list of strings, each an [`IncludeEntry`] of the
//!   form `source:scenario` or a bare `scenario` resolved against the
//!   document's own source.
//!
//! ```yaml
//! sources:
//!   drupipe:
//!     repo: https://github.com/example/drupipe-scenarios.git
//!     ref: v1.2
//!     prefix: refs/tags/
//!     autoload: defaults
//! from:
//!   - drupipe:helm/blocks
//!   - env:UNICONF
//! ```
//!
//! After processing, the engine replaces `from` with `from_processed`.
//!
//! Two more top-level keys are read on demand by context processing:
//! `entities` maps an entity name to an [`EntityHandler`], and `contexts`
//! holds the objects selected so far.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::{Map, Value};

/// Key holding the source declarations of a document.
pub const SOURCES_KEY: &str = "sources";
/// Key holding the include list of a document.
pub const FROM_KEY: &str = "from";
/// Key the processed include list is moved to.
pub const FROM_PROCESSED_KEY: &str = "from_processed";
/// Key holding the entity handlers used by context processing.
pub const ENTITIES_KEY: &str = "entities";
/// Key the selected context objects are stored under.
pub const CONTEXTS_KEY: &str = "contexts";
/// Key inside a context object that is merged into the configuration root.
pub const CONTEXT_KEY: &str = "context";
/// Processor name enabling key-level `from` processing for an entity.
pub const FROM_PROCESSOR: &str = "from_processor";

/// One entry of a `sources` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// `file`, `env`, `repo` (alias `git`), `map`, or `remote`; inferred when absent.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    /// Root directory of a file source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Clone URL of a git source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// Branch or tag of a git source.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    /// Ref namespace of a git source, e.g. `refs/tags/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Base URL of a remote source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Inline documents of a map source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entries: Option<Map<String, Value>>,
    /// Scenario included automatically right after registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoload: Option<String>,
}

/// The closed set of source kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    File,
    Env,
    Git,
    Map,
    Remote,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::File => "file",
            SourceKind::Env => "env",
            SourceKind::Git => "repo",
            SourceKind::Map => "map",
            SourceKind::Remote => "remote",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SourceConfig {
    /// Determine the kind of the source declared as `name`.
    pub fn kind(&self, name: &str) -> Result<SourceKind> {
        if let Some(source_type) = &self.source_type {
            return match source_type.as_str() {
                "file" => Ok(SourceKind::File),
                "env" => Ok(SourceKind::Env),
                "repo" | "git" => Ok(SourceKind::Git),
                "map" => Ok(SourceKind::Map),
                "remote" => Ok(SourceKind::Remote),
                other => Err(Error::UnknownSourceType {
                    name: name.to_string(),
                    source_type: other.to_string(),
                }),
            };
        }

        if self.repo.is_some() {
            Ok(SourceKind::Git)
        } else if self.url.is_some() {
            Ok(SourceKind::Remote)
        } else if self.path.is_some() {
            Ok(SourceKind::File)
        } else if self.entries.is_some() {
            Ok(SourceKind::Map)
        } else {
            Err(Error::ConfigParse {
                message: format!("source '{}' has no type and none can be inferred", name),
                hint: Some(
                    "Set 'type' to one of file, env, repo, map, remote, or give 'repo', 'url', or 'path'"
                        .to_string(),
                ),
            })
        }
    }
}

/// Parse a `sources` block into named declarations, in document order.
pub fn parse_sources(value: &Value) -> Result<Vec<(String, SourceConfig)>> {
    let map = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Object(map) => map,
        _ => {
            return Err(Error::ConfigParse {
                message: "'sources' must be a mapping of source name to settings".to_string(),
                hint: None,
            })
        }
    };

    map.iter()
        .map(|(name, raw)| {
            let config = match raw {
                Value::Null => SourceConfig::default(),
                other => serde_json::from_value::<SourceConfig>(other.clone()).map_err(|e| {
                    Error::ConfigParse {
                        message: format!("invalid settings for source '{}': {}", name, e),
                        hint: None,
                    }
                })?,
            };
            Ok((name.clone(), config))
        })
        .collect()
}

/// How to select one entity of a kind (a job, an environment) as a context.
///
/// ```yaml
/// entities:
///   job:
///     children_key: jobs
///     processors: [from_processor]
///     retrieve_handler: DeepCollectChildren
///     context_name: job
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityHandler {
    /// Key holding the nested entities, e.g. `jobs` for `jobs.prod.jobs.install`.
    pub children_key: String,
    #[serde(default)]
    pub processors: Vec<String>,
    #[serde(default)]
    pub retrieve_handler: RetrieveHandler,
    /// Name the selected object is stored under in `contexts`.
    pub context_name: String,
}

impl EntityHandler {
    pub fn from_value(name: &str, value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|e| Error::ConfigParse {
            message: format!("invalid handler for entity '{}': {}", name, e),
            hint: Some("An entity needs 'children_key' and 'context_name'".to_string()),
        })
    }

    pub fn has_processor(&self, name: &str) -> bool {
        self.processors.iter().any(|p| p == name)
    }
}

/// How an entity id is turned into an object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrieveHandler {
    /// [`crate::collect::collect_children`] over the handler's children key.
    #[default]
    DeepCollectChildren,
}

/// Parse a `from` value: a string or a list of strings.
pub fn parse_from_list(value: &Value) -> Result<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(entry) => Ok(vec![entry.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(entry) => Ok(entry.clone()),
                other => Err(Error::ConfigParse {
                    message: format!(
                        "'from' entries must be strings, found {}",
                        crate::value::type_name(other)
                    ),
                    hint: Some("Quote the entry, e.g. - \"source:scenario\"".to_string()),
                }),
            })
            .collect(),
        other => Err(Error::ConfigParse {
            message: format!(
                "'from' must be a string or a list of strings, found {}",
                crate::value::type_name(other)
            ),
            hint: Some("Write 'from: [source:scenario]'".to_string()),
        }),
    }
}

/// A single `from` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeEntry {
    /// Explicit source name; `None` means the including document's own source.
    pub source: Option<String>,
    pub scenario: String,
}

impl IncludeEntry {
    /// Split `source:scenario` at the first colon.
    ///
    /// # Examples
    ///
    /// ```
    /// use uniconf::config::IncludeEntry;
    ///
    /// let entry = IncludeEntry::parse("drupipe:helm/blocks");
    /// assert_eq!(entry.source.as_deref(), Some("drupipe"));
    /// assert_eq!(entry.scenario, "helm/blocks");
    ///
    /// assert_eq!(IncludeEntry::parse("defaults").source, None);
    /// ```
    pub fn parse(entry: &str) -> Self {
        match entry.split_once(':') {
            Some((source, scenario)) if !source.is_empty() => IncludeEntry {
                source: Some(source.to_string()),
                scenario: scenario.to_string(),
            },
            Some((_, scenario)) => IncludeEntry {
                source: None,
                scenario: scenario.to_string(),
            },
            None => IncludeEntry {
                source: None,
                scenario: entry.to_string(),
            },
        }
    }

    /// The source this entry reads from, given the including document's source.
    pub fn source_or<'a>(&'a self, own_source: &'a str) -> &'a str {
        self.source.as_deref().unwrap_or(own_source)
    }
}

impl fmt::Display for IncludeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}:{}", source, self.scenario),
            None => f.write_str(&self.scenario),
        }
    }
}
