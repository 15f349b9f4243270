//! Git-backed source: a shallow checkout resolved like a file source.

use std::path::PathBuf;

use crate::entity::RawEntity;
use crate::error::Result;
use crate::settings::Settings;
use crate::transport::Transport;

use super::file::FileSource;

#[derive(Debug, Clone)]
pub struct GitSource {
    url: String,
    git_ref: String,
    prefix: String,
    checkout: FileSource,
}

impl GitSource {
    pub fn new(
        url: impl Into<String>,
        git_ref: impl Into<String>,
        prefix: impl Into<String>,
        checkout_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            url: url.into(),
            git_ref: git_ref.into(),
            prefix: prefix.into(),
            checkout: FileSource::new(checkout_dir),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The full ref that is checked out, e.g. `refs/heads/master`.
    pub fn full_ref(&self) -> String {
        format!("{}{}", self.prefix, self.git_ref)
    }

    pub fn checkout(&self) -> &FileSource {
        &self.checkout
    }

    pub fn clone_into_checkout(&self, transport: &dyn Transport) -> Result<()> {
        transport.clone_ref(&self.url, &self.prefix, &self.git_ref, self.checkout.root())
    }

    pub fn resolve_include_ids(&self, scenario: &str, settings: &Settings) -> Vec<String> {
        self.checkout.resolve_include_ids(scenario, settings)
    }

    pub fn read(&self, source_name: &str, id: &str) -> Result<RawEntity> {
        self.checkout.read(source_name, id)
    }
}
