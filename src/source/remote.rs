//! Remote source: documents below a base URL, downloaded on demand.
//!
//! Downloads land in a local directory and are then read exactly like a
//! file source, so a document is fetched at most once per run.

use std::fs;
use std::path::PathBuf;

use log::debug;
use url::Url;

use crate::entity::RawEntity;
use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::transport::Transport;

use super::file::FileSource;

#[derive(Debug, Clone)]
pub struct RemoteSource {
    base: Url,
    cache: FileSource,
}

impl RemoteSource {
    /// `base` is treated as a directory: a missing trailing `/` is added.
    pub fn new(mut base: Url, cache_dir: impl Into<PathBuf>) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self {
            base,
            cache: FileSource::new(cache_dir),
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn cache(&self) -> &FileSource {
        &self.cache
    }

    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(self.cache.root())?;
        Ok(())
    }

    /// Candidate ids that exist remotely, downloading each on first sight.
    pub fn resolve_include_ids(
        &self,
        scenario: &str,
        settings: &Settings,
        transport: &dyn Transport,
    ) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for candidate in FileSource::candidates(scenario, settings) {
            if self.download(&candidate, transport)? {
                ids.push(candidate);
            }
        }
        Ok(ids)
    }

    pub fn read(&self, source_name: &str, id: &str, transport: &dyn Transport) -> Result<RawEntity> {
        if !self.download(id, transport)? {
            return Err(Error::not_found(
                "remote document",
                self.base.join(id)?.as_str(),
                source_name,
            ));
        }
        self.cache.read(source_name, id)
    }

    /// Make sure `id` is in the local cache. Returns false when it does not exist remotely.
    fn download(&self, id: &str, transport: &dyn Transport) -> Result<bool> {
        let local = self.cache.root().join(id);
        if local.is_file() {
            return Ok(true);
        }
        let url = self.base.join(id)?;
        match transport.fetch(&url)? {
            Some(content) => {
                debug!("Downloaded {} to {}", url, local.display());
                if let Some(parent) = local.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&local, content)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
