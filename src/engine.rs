//! # Resolution Engine
//!
//! [`Uniconf`] owns everything one resolution run needs: the tool settings,
//! the source registry, the transport, and the merged result. There is no
//! process-wide state; two engines never see each other's sources.
//!
//! ## Loading
//!
//! [`Uniconf::load`] reads the root entity from the root source and processes
//! it recursively:
//!
//! 1. sources declared under `sources` are registered (first registration of
//!    a name wins) and their `autoload` scenarios appended to the entity's
//!    include list
//! 2. every `from` entry is resolved to ids by its source, and each id not
//!    seen before is loaded the same way and merged into an includes
//!    accumulator, in declaration order
//! 3. the entity's own keys are merged on top, with `from` renamed to
//!    `from_processed`
//!
//! The result is that later includes override earlier ones and a document's
//! own keys override everything it includes.
//!
//! An id is loaded at most once per source. A reference to an id that is
//! still being processed is a cycle and is skipped with a warning; a
//! reference to an id already loaded elsewhere is skipped too, so a shared
//! include keeps the position where it was first reached. Nesting deeper
//! than `max_include_depth` aborts the run.
//!
//! After the root entity, the document in the `env_config_var` environment
//! variable (`UNICONF` by default) is merged on top, unless the include
//! graph already loaded it.
//!
//! A failed load leaves the engine as if [`Uniconf::reset`] had been called:
//! nothing from the partial run survives, including sources that documents
//! of that run declared.
//!
//! ## After loading
//!
//! [`Uniconf::process_from_keys`] resolves nested `from` keys against
//! parameter blocks of the merged tree (see [`crate::process`]), and
//! [`Uniconf::process_context`] selects one entity through the handlers
//! declared under `entities`, storing it under `contexts` and merging its
//! `context` block into the root.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{debug, info, warn};

use crate::collect;
use crate::config::{
    parse_from_list, parse_sources, EntityHandler, IncludeEntry, RetrieveHandler, CONTEXTS_KEY,
    CONTEXT_KEY, ENTITIES_KEY, FROM_KEY, FROM_PROCESSED_KEY, FROM_PROCESSOR, SOURCES_KEY,
};
use crate::entity::{ConfigEntity, EntityKey, EntitySlot, ParsedEntity};
use crate::error::{Error, Result};
use crate::interpolate::Interpolator;
use crate::merge::merge;
use crate::path::{flatten, search_prefixes, search_prefixes_mut, FlatConfig};
use crate::process::{FromCache, FromProcessor};
use crate::settings::Settings;
use crate::source::{Source, SourceContext};
use crate::transport::{SystemTransport, Transport};
use crate::value::{to_json_string, to_yaml_string, Map, Value};

/// Name of the source the env overlay is read from.
pub const ENV_SOURCE_NAME: &str = "env";

/// Leaf path to the entities that set it, in merge order.
pub type LoadHistory = BTreeMap<String, Vec<String>>;

/// Result of [`Uniconf::explain`].
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub path: String,
    /// The resolved subtree, `None` when the path does not exist.
    pub value: Option<Value>,
    /// History entries at or below `path`.
    pub history: LoadHistory,
}

impl Explanation {
    /// Render as a single document with `value` and `history` keys.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("path".to_string(), Value::String(self.path.clone()));
        map.insert("value".to_string(), self.value.clone().unwrap_or(Value::Null));
        let history = self
            .history
            .iter()
            .map(|(path, labels)| {
                (
                    path.clone(),
                    Value::Array(labels.iter().cloned().map(Value::String).collect()),
                )
            })
            .collect();
        map.insert("history".to_string(), Value::Object(history));
        Value::Object(map)
    }
}

/// A node of the include tree.
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeNode {
    pub key: EntityKey,
    pub title: String,
    pub children: Vec<IncludeNode>,
}

pub struct Uniconf {
    settings: Settings,
    sources: BTreeMap<String, Source>,
    /// Sources registered by documents or on demand during a load.
    declared: BTreeSet<String>,
    root_source: Option<String>,
    transport: Box<dyn Transport>,
    interpolator: Interpolator,
    config: Value,
    flat: FlatConfig,
    history: LoadHistory,
    roots: Vec<EntityKey>,
    from_cache: FromCache,
    loaded: bool,
}

impl fmt::Debug for Uniconf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uniconf")
            .field("settings", &self.settings)
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .field("root_source", &self.root_source)
            .field("roots", &self.roots)
            .field("loaded", &self.loaded)
            .finish_non_exhaustive()
    }
}

impl Uniconf {
    pub fn new(settings: Settings) -> Self {
        Self::with_transport(settings, Box::new(SystemTransport))
    }

    pub fn with_transport(settings: Settings, transport: Box<dyn Transport>) -> Self {
        Self {
            settings,
            sources: BTreeMap::new(),
            declared: BTreeSet::new(),
            root_source: None,
            transport,
            interpolator: Interpolator::default(),
            config: Value::Object(Map::new()),
            flat: FlatConfig::new(),
            history: LoadHistory::new(),
            roots: Vec::new(),
            from_cache: FromCache::new(),
            loaded: false,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Register a source. Returns false, keeping the existing one, if the name is taken.
    pub fn add_source(&mut self, source: Source) -> bool {
        if self.sources.contains_key(source.name()) {
            info!(
                "Source '{}' is already registered, keeping the first registration",
                source.name()
            );
            return false;
        }
        info!("Registered {} source '{}'", source.kind(), source.name());
        self.sources.insert(source.name().to_string(), source);
        true
    }

    /// Register a source on behalf of the current load; it goes away on reset.
    fn declare_source(&mut self, source: Source) -> bool {
        let name = source.name().to_string();
        let added = self.add_source(source);
        if added {
            self.declared.insert(name);
        }
        added
    }

    /// Register `name` as the source the root entity is read from.
    pub fn set_root_source(&mut self, source: Source) {
        let name = source.name().to_string();
        self.add_source(source);
        self.root_source = Some(name);
    }

    pub fn source(&self, name: &str) -> Option<&Source> {
        self.sources.get(name)
    }

    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.sources.values()
    }

    /// A loaded entity by key.
    pub fn entity(&self, key: &EntityKey) -> Option<Rc<ConfigEntity>> {
        self.sources.get(&key.source)?.entity(&key.id)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Resolve the root entity and everything it includes.
    ///
    /// Does nothing when the configuration is already loaded. A missing root
    /// document or any error other than a skipped include aborts the run and
    /// resets the engine, so a later call starts from scratch.
    pub fn load(&mut self) -> Result<()> {
        if self.loaded {
            debug!("Configuration already loaded");
            return Ok(());
        }

        match self.run_load() {
            Ok(()) => {
                self.loaded = true;
                self.flatten_config();
                Ok(())
            }
            Err(e) => {
                debug!("Load failed, discarding partial state: {}", e);
                self.reset();
                Err(e)
            }
        }
    }

    fn run_load(&mut self) -> Result<()> {
        self.clear_temp_dir()?;

        let root_name = self.root_source.clone().ok_or_else(|| Error::SourceNotRegistered {
            name: "<root>".to_string(),
        })?;
        let root_key = EntityKey::new(root_name, self.settings.root_id.clone());
        info!("Loading configuration from {}", root_key);

        self.ensure_source_loaded(&root_key.source)?;
        let mut chain = Vec::new();
        let root = self.load_entity(&root_key, None, 0, &mut chain)?;
        merge(&mut self.config, &root.config);
        self.roots.push(root.key.clone());

        self.load_env_overlay()
    }

    fn clear_temp_dir(&self) -> Result<()> {
        match fs::remove_dir_all(&self.settings.temp_dir) {
            Ok(()) => {
                debug!("Removed {}", self.settings.temp_dir.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn load_env_overlay(&mut self) -> Result<()> {
        let Some(var) = self.settings.env_config_var.clone() else {
            return Ok(());
        };
        if std::env::var_os(&var).is_none() {
            return Ok(());
        }

        if !self.sources.contains_key(ENV_SOURCE_NAME) {
            self.declare_source(Source::env(ENV_SOURCE_NAME));
        }
        self.ensure_source_loaded(ENV_SOURCE_NAME)?;

        let key = EntityKey::new(ENV_SOURCE_NAME, var);
        if self.is_known(&key) {
            debug!("{} was already merged through the include graph", key);
            return Ok(());
        }

        let mut chain = Vec::new();
        match self.load_entity(&key, None, 0, &mut chain) {
            Ok(entity) => {
                merge(&mut self.config, &entity.config);
                self.roots.push(entity.key.clone());
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                warn!("Skipping {}: {}", key, e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn context(&self) -> SourceContext<'_> {
        SourceContext {
            settings: &self.settings,
            transport: self.transport.as_ref(),
        }
    }

    fn is_known(&self, key: &EntityKey) -> bool {
        self.sources
            .get(&key.source)
            .is_some_and(|source| source.is_known(&key.id))
    }

    fn ensure_source_loaded(&mut self, name: &str) -> Result<()> {
        let ctx = SourceContext {
            settings: &self.settings,
            transport: self.transport.as_ref(),
        };
        let source = self
            .sources
            .get_mut(name)
            .ok_or_else(|| Error::SourceNotRegistered {
                name: name.to_string(),
            })?;
        source.load_source(ctx)
    }

    /// Read, parse and process one entity, registering it in its source.
    fn load_entity(
        &mut self,
        key: &EntityKey,
        parent: Option<&EntityKey>,
        depth: usize,
        chain: &mut Vec<String>,
    ) -> Result<Rc<ConfigEntity>> {
        if depth > self.settings.max_include_depth {
            let mut links = chain.clone();
            links.push(key.to_string());
            return Err(Error::IncludeDepthExceeded {
                depth,
                chain: links.join(" -> "),
            });
        }

        let source = self
            .sources
            .get(&key.source)
            .ok_or_else(|| Error::SourceNotRegistered {
                name: key.source.clone(),
            })?;
        if let Some(entity) = source.entity(&key.id) {
            return Ok(entity);
        }
        let raw = source.read_entity(&key.id, self.context())?;

        self.source_mut(&key.source)?.mark_loading(&key.id);
        chain.push(key.to_string());
        let result = raw
            .parse()
            .and_then(|parsed| self.process_entity(parsed, parent, depth, chain));
        chain.pop();

        let source = self.source_mut(&key.source)?;
        match result {
            Ok(entity) => {
                debug!("Loaded {} ({} includes)", key, entity.includes.len());
                let entity = Rc::new(entity);
                source.store(Rc::clone(&entity));
                Ok(entity)
            }
            Err(e) => {
                source.forget(&key.id);
                Err(e)
            }
        }
    }

    fn source_mut(&mut self, name: &str) -> Result<&mut Source> {
        self.sources
            .get_mut(name)
            .ok_or_else(|| Error::SourceNotRegistered {
                name: name.to_string(),
            })
    }

    /// Register sources, expand includes, and merge the entity's own keys on top.
    fn process_entity(
        &mut self,
        parsed: ParsedEntity,
        parent: Option<&EntityKey>,
        depth: usize,
        chain: &mut Vec<String>,
    ) -> Result<ConfigEntity> {
        let ParsedEntity {
            key,
            format,
            stream,
            mut data,
        } = parsed;

        let mut from = match data.get(FROM_KEY) {
            Some(value) => parse_from_list(value)?,
            None => Vec::new(),
        };

        if let Some(declared) = data.get(SOURCES_KEY) {
            let base = self.declaring_dir(&key.source);
            for (name, config) in parse_sources(declared)? {
                let mut source = Source::from_config(&name, &config, &self.settings)?;
                if let Some(base) = &base {
                    source = source.relative_to(base);
                }
                let autoload = source.autoload().map(str::to_string);
                if self.declare_source(source) {
                    if let Some(id) = autoload {
                        debug!("Autoloading {}:{} for {}", name, id, key);
                        from.push(format!("{}:{}", name, id));
                    }
                }
            }
        }

        let mut includes = Value::Object(Map::new());
        let mut children = Vec::new();
        for entry in &from {
            let include = IncludeEntry::parse(entry);
            let source_name = include.source_or(&key.source).to_string();
            debug!("Processing include '{}' of {}", entry, key);

            self.ensure_source_loaded(&source_name)?;
            let ids = self.sources[&source_name].resolve_include_ids(&include.scenario, self.context())?;
            if ids.is_empty() {
                warn!("Include '{}' of {} matched no documents", entry, key);
            }

            for id in ids {
                let child_key = EntityKey::new(source_name.clone(), id);
                match self.sources[&source_name].slot(&child_key.id) {
                    Some(EntitySlot::Loading) => {
                        warn!(
                            "Skipping include of {} from {}: include cycle ({})",
                            child_key,
                            key,
                            chain.join(" -> ")
                        );
                        continue;
                    }
                    Some(EntitySlot::Loaded(_)) => {
                        debug!("Skipping include of {} from {}: already loaded", child_key, key);
                        continue;
                    }
                    None => {}
                }

                match self.load_entity(&child_key, Some(&key), depth + 1, chain) {
                    Ok(child) => {
                        merge(&mut includes, &child.config);
                        children.push(child.key.clone());
                    }
                    Err(e) if e.is_not_found() => {
                        warn!("Skipping include '{}' of {}: {}", entry, key, e);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        data.shift_remove(FROM_KEY);
        if !from.is_empty() {
            let processed = from.into_iter().map(Value::String).collect();
            data.insert(FROM_PROCESSED_KEY.to_string(), Value::Array(processed));
        }

        let own = Value::Object(data);
        self.record_history(&key.to_string(), &own);
        merge(&mut includes, &own);

        Ok(ConfigEntity {
            title: key.id.clone(),
            key,
            parent: parent.cloned(),
            format,
            stream,
            config: includes,
            includes: children,
        })
    }

    /// Directory relative file sources declared by `source_name` resolve against.
    ///
    /// Sources without a directory (env, map) defer to the root source.
    fn declaring_dir(&self, source_name: &str) -> Option<PathBuf> {
        let own = self.sources.get(source_name).and_then(Source::path);
        let root = || {
            self.root_source
                .as_deref()
                .and_then(|name| self.sources.get(name))
                .and_then(Source::path)
        };
        own.or_else(root).map(Path::to_path_buf)
    }

    fn record_history(&mut self, label: &str, own: &Value) {
        for path in flatten(own).into_keys() {
            self.history.entry(path).or_default().push(label.to_string());
        }
    }

    /// The merged configuration.
    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Rebuild the flat view from the current configuration.
    pub fn flatten_config(&mut self) -> &FlatConfig {
        self.flat = flatten(&self.config);
        &self.flat
    }

    /// The flat view as of the last [`Uniconf::flatten_config`].
    pub fn flat_config(&self) -> &FlatConfig {
        &self.flat
    }

    pub fn history(&self) -> &LoadHistory {
        &self.history
    }

    /// Look up a dotted path in the merged configuration.
    pub fn get(&self, path: &str) -> Option<&Value> {
        search_prefixes(&self.config, path)
    }

    pub fn collect_params(&self, path: &str, key: &str) -> Map<String, Value> {
        collect::collect_params(&self.config, path, key)
    }

    pub fn collect_children(&self, path: &str, key: &str) -> Map<String, Value> {
        collect::collect_children(&self.config, path, key)
    }

    /// The subtree at `path` together with which entities set the leaves below it.
    pub fn explain(&self, path: &str) -> Explanation {
        let path = path.trim_matches('.');
        let nested_prefix = format!("{}.", path);
        let history = self
            .history
            .iter()
            .filter(|(leaf, _)| path.is_empty() || *leaf == path || leaf.starts_with(&nested_prefix))
            .map(|(leaf, labels)| (leaf.clone(), labels.clone()))
            .collect();
        Explanation {
            path: path.to_string(),
            value: self.get(path).cloned(),
            history,
        }
    }

    /// The include tree, one node per root-level entity.
    pub fn include_tree(&self) -> Vec<IncludeNode> {
        self.roots
            .iter()
            .filter_map(|key| self.include_node(key, 0))
            .collect()
    }

    fn include_node(&self, key: &EntityKey, depth: usize) -> Option<IncludeNode> {
        let entity = self.entity(key)?;
        let children = if depth < self.settings.max_include_depth {
            entity
                .includes
                .iter()
                .filter_map(|child| self.include_node(child, depth + 1))
                .collect()
        } else {
            Vec::new()
        };
        Some(IncludeNode {
            key: entity.key.clone(),
            title: entity.title.clone(),
            children,
        })
    }

    pub fn to_yaml(&self) -> Result<String> {
        to_yaml_string(&self.config)
    }

    pub fn to_json(&self) -> Result<String> {
        to_json_string(&self.config)
    }

    pub fn interpolator_mut(&mut self) -> &mut Interpolator {
        &mut self.interpolator
    }

    /// Substitute `${...}` expressions using the flat view.
    pub fn interpolate(&self, input: &str) -> Result<String> {
        self.interpolator.interpolate(input, &self.flat)
    }

    /// Process nested `from` keys in the subtree at `path` for `phase`.
    ///
    /// Returns how many entries were merged. The flat view is rebuilt when
    /// anything changed. A path that does not exist processes nothing.
    pub fn process_from_keys(&mut self, path: &str, phase: &str) -> Result<usize> {
        let lookup = self.config.clone();
        let Some(subtree) = search_prefixes_mut(&mut self.config, path) else {
            debug!("Nothing to process at '{}'", path);
            return Ok(0);
        };

        let count = FromProcessor::new(
            &lookup,
            &self.flat,
            &self.interpolator,
            phase,
            &mut self.from_cache,
        )
        .process(subtree)?;
        info!("Processed {} 'from' entries below '{}' ({})", count, path, phase);

        if count > 0 {
            self.flatten_config();
        }
        Ok(count)
    }

    /// Select entity `id` of kind `entity` as a context and return it.
    ///
    /// The handler under `entities.<entity>` names the children key the
    /// entity lives in and the context name it is stored under. With the
    /// `from_processor` processor, nested `from` keys below the children key
    /// are processed for `phase` first.
    pub fn process_context(
        &mut self,
        entity: &str,
        id: &str,
        phase: &str,
    ) -> Result<Map<String, Value>> {
        let handler = self.entity_handler(entity)?;

        if handler.has_processor(FROM_PROCESSOR) {
            self.process_from_keys(&handler.children_key, phase)?;
        }

        let object = match handler.retrieve_handler {
            RetrieveHandler::DeepCollectChildren => self.collect_children(id, &handler.children_key),
        };
        debug!(
            "Context '{}' from {} '{}' has {} keys",
            handler.context_name,
            entity,
            id,
            object.len()
        );
        self.set_context(&handler.context_name, object.clone());
        Ok(object)
    }

    fn entity_handler(&self, entity: &str) -> Result<EntityHandler> {
        let entities = self.config.get(ENTITIES_KEY).ok_or_else(|| Error::Context {
            message: format!("contexts are not defined: no '{}' block", ENTITIES_KEY),
        })?;
        let raw = entities.get(entity).ok_or_else(|| Error::Context {
            message: format!("entity '{}' is not defined under '{}'", entity, ENTITIES_KEY),
        })?;
        EntityHandler::from_value(entity, raw)
    }

    /// Store `object` as `contexts.<name>` and merge its `context` block into the root.
    pub fn set_context(&mut self, name: &str, object: Map<String, Value>) {
        let overlay = object.get(CONTEXT_KEY).cloned();

        if let Value::Object(root) = &mut self.config {
            let contexts = root
                .entry(CONTEXTS_KEY)
                .or_insert_with(|| Value::Object(Map::new()));
            if !contexts.is_object() {
                warn!("Replacing non-mapping '{}' with a mapping", CONTEXTS_KEY);
                *contexts = Value::Object(Map::new());
            }
            if let Value::Object(contexts) = contexts {
                contexts.insert(name.to_string(), Value::Object(object));
            }
        }

        if let Some(overlay) = overlay {
            merge(&mut self.config, &overlay);
            self.record_history(&format!("{}:{}", CONTEXT_KEY, name), &overlay);
        }
        self.flatten_config();
    }

    /// Forget everything loaded and every source a document declared.
    ///
    /// Sources added with [`Uniconf::add_source`] or
    /// [`Uniconf::set_root_source`] stay registered but are materialized
    /// again on next load.
    pub fn reset(&mut self) {
        self.config = Value::Object(Map::new());
        self.flat.clear();
        self.history.clear();
        self.roots.clear();
        self.from_cache.clear();
        for name in std::mem::take(&mut self.declared) {
            debug!("Unregistering source '{}'", name);
            self.sources.remove(&name);
        }
        for source in self.sources.values_mut() {
            source.reset();
        }
        self.loaded = false;
    }
}
