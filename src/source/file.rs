//! File-backed source: documents below a root directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::trace;

use crate::entity::{EntityKey, RawEntity};
use crate::error::{Error, Result};
use crate::path::expand_hierarchy;
use crate::settings::Settings;
use crate::value::Format;

#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Anchor a relative root below `base`; absolute roots are kept.
    pub fn rebase(&mut self, base: &Path) {
        if self.root.is_relative() {
            self.root = base.join(&self.root);
        }
    }

    /// Candidate ids for a scenario, most general first.
    ///
    /// `helm/blocks` yields, for each of `helm` and `helm/blocks`, the files
    /// `scenarios/<id>.yaml`, `.yml`, `.json` and `scenarios/<id>/config.yaml`.
    /// A scenario starting with `/` is a literal path relative to the root.
    pub fn candidates(scenario: &str, settings: &Settings) -> Vec<String> {
        if let Some(literal) = scenario.strip_prefix('/') {
            let literal = literal.trim_matches('/');
            return if literal.is_empty() {
                Vec::new()
            } else {
                vec![literal.to_string()]
            };
        }

        let mut candidates = Vec::new();
        for id in expand_hierarchy(scenario, '/') {
            let base = if settings.includes_dir.is_empty() {
                id
            } else {
                format!("{}/{}", settings.includes_dir.trim_end_matches('/'), id)
            };
            candidates.push(format!("{}.yaml", base));
            candidates.push(format!("{}.yml", base));
            candidates.push(format!("{}.json", base));
            candidates.push(format!("{}/{}", base, settings.main_config_file));
        }
        candidates
    }

    /// Candidate ids that exist on disk, in candidate order.
    pub fn resolve_include_ids(&self, scenario: &str, settings: &Settings) -> Vec<String> {
        Self::candidates(scenario, settings)
            .into_iter()
            .filter(|candidate| {
                let exists = self.root.join(candidate).is_file();
                trace!("Checking {} in {}: {}", candidate, self.root.display(), exists);
                exists
            })
            .collect()
    }

    pub fn read(&self, source_name: &str, id: &str) -> Result<RawEntity> {
        let path = self.root.join(id);
        let stream = match fs::read(&path) {
            Ok(stream) => stream,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::not_found("file", &path.display().to_string(), source_name))
            }
            Err(e) => return Err(e.into()),
        };
        let format = Format::from_extension(id).unwrap_or(Format::Yaml);
        Ok(RawEntity::from_stream(
            EntityKey::new(source_name, id),
            format,
            stream,
        ))
    }
}
