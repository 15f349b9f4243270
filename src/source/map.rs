//! In-memory source: documents supplied up front, keyed by id.

use std::collections::BTreeMap;

use crate::entity::{EntityKey, Payload, RawEntity};
use crate::error::{Error, Result};
use crate::path::expand_hierarchy;
use crate::value::{Format, Map, Value};

/// A document of a map source.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEntry {
    /// An already-decoded mapping.
    Tree(Map<String, Value>),
    /// YAML text.
    Raw(Vec<u8>),
}

impl MapEntry {
    /// Build an entry from a value declared inline in a `sources` block.
    ///
    /// Mappings are taken as-is, strings as YAML text, null as an empty document.
    pub fn from_value(id: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(MapEntry::Tree(map.clone())),
            Value::String(text) => Ok(MapEntry::Raw(text.clone().into_bytes())),
            Value::Null => Ok(MapEntry::Tree(Map::new())),
            other => Err(Error::ConfigParse {
                message: format!(
                    "map entry '{}' must be a mapping or YAML text, found {}",
                    id,
                    crate::value::type_name(other)
                ),
                hint: None,
            }),
        }
    }
}

impl From<Map<String, Value>> for MapEntry {
    fn from(map: Map<String, Value>) -> Self {
        MapEntry::Tree(map)
    }
}

impl From<&str> for MapEntry {
    fn from(text: &str) -> Self {
        MapEntry::Raw(text.as_bytes().to_vec())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MapSource {
    entries: BTreeMap<String, MapEntry>,
}

impl MapSource {
    pub fn new(entries: BTreeMap<String, MapEntry>) -> Self {
        Self { entries }
    }

    pub fn insert(&mut self, id: impl Into<String>, entry: impl Into<MapEntry>) {
        self.entries.insert(id.into(), entry.into());
    }

    /// Keys among the slash prefixes of `scenario`; a leading `/` means the literal key.
    pub fn resolve_include_ids(&self, scenario: &str) -> Vec<String> {
        let ids = if scenario.starts_with('/') {
            vec![scenario.to_string()]
        } else {
            expand_hierarchy(scenario, '/')
        };
        ids.into_iter()
            .filter(|id| self.entries.contains_key(id))
            .collect()
    }

    pub fn read(&self, source_name: &str, id: &str) -> Result<RawEntity> {
        let key = EntityKey::new(source_name, id);
        match self.entries.get(id) {
            Some(MapEntry::Tree(tree)) => Ok(RawEntity {
                key,
                format: Format::Json,
                payload: Payload::Tree(tree.clone()),
            }),
            Some(MapEntry::Raw(stream)) => Ok(RawEntity::from_stream(key, Format::Yaml, stream.clone())),
            None => Err(Error::not_found("map entry", id, source_name)),
        }
    }
}
