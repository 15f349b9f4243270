//! # Sources
//!
//! A source is a named provider of configuration documents. Every source
//! shares the same capabilities:
//!
//! - lazy materialization ([`Source::load_source`]), which clones git sources
//!   and prepares remote download directories exactly once
//! - include resolution ([`Source::resolve_include_ids`]), which expands a
//!   scenario name into the ids that actually exist
//! - reading a document by id ([`Source::read_entity`]), which reports a
//!   recoverable not-found error for missing ids
//! - an entity registry, so that every id is processed at most once
//!
//! The kinds form a closed set ([`SourceBackend`]); new kinds are new variants.

pub mod env;
pub mod file;
pub mod git;
pub mod map;
pub mod remote;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{debug, info};
use url::Url;

use crate::config::{SourceConfig, SourceKind};
use crate::entity::{ConfigEntity, EntitySlot, RawEntity};
use crate::error::{Error, Result};
use crate::path::encode_path_component;
use crate::settings::Settings;
use crate::transport::Transport;

pub use env::EnvSource;
pub use file::FileSource;
pub use git::GitSource;
pub use map::{MapEntry, MapSource};
pub use remote::RemoteSource;

/// Directory below the temp dir holding git checkouts and remote downloads.
pub const SOURCES_STORAGE_DIR: &str = "sources";

/// What a source needs from the engine while fetching.
#[derive(Clone, Copy)]
pub struct SourceContext<'a> {
    pub settings: &'a Settings,
    pub transport: &'a dyn Transport,
}

#[derive(Debug, Clone)]
pub enum SourceBackend {
    File(FileSource),
    Env(EnvSource),
    Git(GitSource),
    Map(MapSource),
    Remote(RemoteSource),
}

#[derive(Debug, Clone)]
pub struct Source {
    name: String,
    autoload: Option<String>,
    loaded: bool,
    registry: HashMap<String, EntitySlot>,
    backend: SourceBackend,
}

impl Source {
    pub fn new(name: impl Into<String>, backend: SourceBackend) -> Self {
        Self {
            name: name.into(),
            autoload: None,
            loaded: false,
            registry: HashMap::new(),
            backend,
        }
    }

    pub fn file(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self::new(name, SourceBackend::File(FileSource::new(root)))
    }

    pub fn env(name: impl Into<String>) -> Self {
        Self::new(name, SourceBackend::Env(EnvSource))
    }

    pub fn map<I, K, E>(name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, E)>,
        K: Into<String>,
        E: Into<MapEntry>,
    {
        let entries: BTreeMap<String, MapEntry> = entries
            .into_iter()
            .map(|(id, entry)| (id.into(), entry.into()))
            .collect();
        Self::new(name, SourceBackend::Map(MapSource::new(entries)))
    }

    /// Build a source from a `sources` block entry.
    ///
    /// Git and remote sources get the deterministic local directory
    /// `<temp_dir>/sources/<name>`.
    pub fn from_config(name: &str, config: &SourceConfig, settings: &Settings) -> Result<Self> {
        let storage_dir = settings
            .temp_dir
            .join(SOURCES_STORAGE_DIR)
            .join(encode_path_component(name));

        let backend = match config.kind(name)? {
            SourceKind::File => {
                SourceBackend::File(FileSource::new(config.path.as_deref().unwrap_or(".")))
            }
            SourceKind::Env => SourceBackend::Env(EnvSource),
            SourceKind::Git => {
                let url = config.repo.as_deref().ok_or_else(|| Error::SourceLoad {
                    name: name.to_string(),
                    message: "git source requires 'repo'".to_string(),
                })?;
                SourceBackend::Git(GitSource::new(
                    url,
                    config.git_ref.as_deref().unwrap_or(&settings.default_ref),
                    config
                        .prefix
                        .as_deref()
                        .unwrap_or(&settings.default_ref_prefix),
                    storage_dir,
                ))
            }
            SourceKind::Map => {
                let mut entries = BTreeMap::new();
                if let Some(declared) = &config.entries {
                    for (id, value) in declared {
                        entries.insert(id.clone(), MapEntry::from_value(id, value)?);
                    }
                }
                SourceBackend::Map(MapSource::new(entries))
            }
            SourceKind::Remote => {
                let url = config.url.as_deref().ok_or_else(|| Error::SourceLoad {
                    name: name.to_string(),
                    message: "remote source requires 'url'".to_string(),
                })?;
                SourceBackend::Remote(RemoteSource::new(Url::parse(url)?, storage_dir))
            }
        };

        let mut source = Self::new(name, backend);
        source.autoload = config.autoload.clone();
        Ok(source)
    }

    /// Resolve a relative file root against `base`, the directory of the
    /// source that declared this one. Other kinds are returned unchanged.
    pub fn relative_to(mut self, base: &Path) -> Self {
        if let SourceBackend::File(file) = &mut self.backend {
            file.rebase(base);
        }
        self
    }

    pub fn with_autoload(mut self, id: impl Into<String>) -> Self {
        self.autoload = Some(id.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SourceKind {
        match self.backend {
            SourceBackend::File(_) => SourceKind::File,
            SourceBackend::Env(_) => SourceKind::Env,
            SourceBackend::Git(_) => SourceKind::Git,
            SourceBackend::Map(_) => SourceKind::Map,
            SourceBackend::Remote(_) => SourceKind::Remote,
        }
    }

    pub fn backend(&self) -> &SourceBackend {
        &self.backend
    }

    /// Root directory ids are resolved against; `None` for env and map sources.
    pub fn path(&self) -> Option<&Path> {
        match &self.backend {
            SourceBackend::File(file) => Some(file.root()),
            SourceBackend::Git(git) => Some(git.checkout().root()),
            SourceBackend::Remote(remote) => Some(remote.cache().root()),
            SourceBackend::Env(_) | SourceBackend::Map(_) => None,
        }
    }

    pub fn autoload(&self) -> Option<&str> {
        self.autoload.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Materialize the source. Idempotent once it has succeeded.
    pub fn load_source(&mut self, ctx: SourceContext<'_>) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        match &self.backend {
            SourceBackend::Git(git) => {
                info!("Loading source '{}' from {} ({})", self.name, git.url(), git.full_ref());
                git.clone_into_checkout(ctx.transport)?;
            }
            SourceBackend::Remote(remote) => {
                info!("Loading source '{}' from {}", self.name, remote.base());
                remote.prepare()?;
            }
            SourceBackend::File(_) | SourceBackend::Env(_) | SourceBackend::Map(_) => {}
        }
        self.loaded = true;
        Ok(())
    }

    /// Expand a scenario name into the existing ids it addresses, most general first.
    pub fn resolve_include_ids(&self, scenario: &str, ctx: SourceContext<'_>) -> Result<Vec<String>> {
        let ids = match &self.backend {
            SourceBackend::File(file) => file.resolve_include_ids(scenario, ctx.settings),
            SourceBackend::Env(env) => env.resolve_include_ids(scenario),
            SourceBackend::Git(git) => git.resolve_include_ids(scenario, ctx.settings),
            SourceBackend::Map(map) => map.resolve_include_ids(scenario),
            SourceBackend::Remote(remote) => {
                remote.resolve_include_ids(scenario, ctx.settings, ctx.transport)?
            }
        };
        debug!("Source '{}' resolved '{}' to {:?}", self.name, scenario, ids);
        Ok(ids)
    }

    /// Fetch the raw document `id`.
    pub fn read_entity(&self, id: &str, ctx: SourceContext<'_>) -> Result<RawEntity> {
        match &self.backend {
            SourceBackend::File(file) => file.read(&self.name, id),
            SourceBackend::Env(env) => env.read(&self.name, id),
            SourceBackend::Git(git) => git.read(&self.name, id),
            SourceBackend::Map(map) => map.read(&self.name, id),
            SourceBackend::Remote(remote) => remote.read(&self.name, id, ctx.transport),
        }
    }

    pub fn slot(&self, id: &str) -> Option<&EntitySlot> {
        self.registry.get(id)
    }

    /// Whether `id` is loaded or being loaded.
    pub fn is_known(&self, id: &str) -> bool {
        self.registry.contains_key(id)
    }

    /// A fully loaded entity.
    pub fn entity(&self, id: &str) -> Option<Rc<ConfigEntity>> {
        match self.registry.get(id) {
            Some(EntitySlot::Loaded(entity)) => Some(Rc::clone(entity)),
            _ => None,
        }
    }

    /// Loaded entities, in no particular order.
    pub fn entities(&self) -> impl Iterator<Item = &Rc<ConfigEntity>> {
        self.registry.values().filter_map(|slot| match slot {
            EntitySlot::Loaded(entity) => Some(entity),
            EntitySlot::Loading => None,
        })
    }

    pub(crate) fn mark_loading(&mut self, id: &str) {
        self.registry.insert(id.to_string(), EntitySlot::Loading);
    }

    pub(crate) fn store(&mut self, entity: Rc<ConfigEntity>) {
        self.registry
            .insert(entity.key.id.clone(), EntitySlot::Loaded(entity));
    }

    pub(crate) fn forget(&mut self, id: &str) {
        self.registry.remove(id);
    }

    /// Drop all loaded entities and the materialization flag.
    pub fn reset(&mut self) {
        self.registry.clear();
        self.loaded = false;
    }
}
