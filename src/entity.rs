//! Config entities
//!
//! An entity goes through three stages, each its own type so a half-processed
//! document can never be handed out:
//!
//! 1. [`RawEntity`]: the payload fetched from a source
//! 2. [`ParsedEntity`]: the payload decoded into a mapping
//! 3. [`ConfigEntity`]: sources registered, includes expanded and merged;
//!    produced only by the engine
//!
//! Sources keep a registry of [`EntitySlot`]s keyed by id. A slot is
//! `Loading` while the entity's includes are being expanded, which is how
//! back-references are told apart from ids that were already fully loaded.

use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::value::{parse_document, Format, Map, Value};

/// Identifies an entity across all sources.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey {
    pub source: String,
    pub id: String,
}

impl EntityKey {
    pub fn new(source: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.id)
    }
}

/// Content as delivered by a source.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Bytes still to be decoded in the entity's format.
    Stream(Vec<u8>),
    /// An already-decoded document (in-memory map sources).
    Tree(Map<String, Value>),
}

#[derive(Debug, Clone)]
pub struct RawEntity {
    pub key: EntityKey,
    pub format: Format,
    pub payload: Payload,
}

impl RawEntity {
    pub fn from_stream(key: EntityKey, format: Format, stream: Vec<u8>) -> Self {
        Self {
            key,
            format,
            payload: Payload::Stream(stream),
        }
    }

    /// Decode the payload. The document must be a mapping (or empty).
    pub fn parse(self) -> Result<ParsedEntity> {
        let (stream, data) = match self.payload {
            Payload::Stream(stream) => {
                let data = parse_document(self.format, &stream)?;
                (stream, data)
            }
            Payload::Tree(data) => {
                let stream = serde_json::to_vec(&data)?;
                (stream, data)
            }
        };
        Ok(ParsedEntity {
            key: self.key,
            format: self.format,
            stream,
            data,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ParsedEntity {
    pub key: EntityKey,
    pub format: Format,
    pub stream: Vec<u8>,
    /// The document as written, `sources` and `from` included.
    pub data: Map<String, Value>,
}

/// A fully processed entity.
#[derive(Debug, Clone)]
pub struct ConfigEntity {
    pub key: EntityKey,
    /// Display name; defaults to the id.
    pub title: String,
    /// The entity whose `from` list loaded this one. Provenance only.
    pub parent: Option<EntityKey>,
    pub format: Format,
    pub stream: Vec<u8>,
    /// Includes merged in declaration order, then the entity's own keys on top.
    pub config: Value,
    /// Children merged into `config`, in merge order.
    pub includes: Vec<EntityKey>,
}

impl ConfigEntity {
    pub fn id(&self) -> &str {
        &self.key.id
    }

    pub fn source_name(&self) -> &str {
        &self.key.source
    }
}

/// Registry state of an id within a source.
#[derive(Debug, Clone)]
pub enum EntitySlot {
    /// Includes are being expanded; a reference now is a cycle.
    Loading,
    Loaded(Rc<ConfigEntity>),
}
