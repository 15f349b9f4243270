//! # Transport Abstraction
//!
//! Git checkouts and HTTP downloads are the only operations that leave the
//! machine. They sit behind the [`Transport`] trait so that sources stay
//! testable: tests inject a transport that writes fixture files instead of
//! cloning or downloading.
//!
//! [`SystemTransport`] is the default. It shells out to the system `git`,
//! inheriting whatever authentication it is configured with, downloads over
//! HTTP(S) with a blocking `reqwest` request, and reads `file://` URLs
//! directly.

use std::path::Path;
use log::debug;
use reqwest::StatusCode;
use url::Url;

use crate::error::{Error, Result};

/// Fetch operations used by git and remote sources.
pub trait Transport: Send + Sync {
    /// Check out `prefix + git_ref` of `url` into `target_dir`, shallowly.
    ///
    /// Any previous content of `target_dir` is replaced.
    fn clone_ref(&self, url: &str, prefix: &str, git_ref: &str, target_dir: &Path) -> Result<()>;

    /// Download a document.
    ///
    /// Returns `Ok(None)` when the server reports the document does not
    /// exist, and an error for any other failure.
    fn fetch(&self, url: &Url) -> Result<Option<Vec<u8>>>;
}

/// The default transport, backed by the `git` executable and `reqwest`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTransport;

impl Transport for SystemTransport {
    fn clone_ref(&self, url: &str, prefix: &str, git_ref: &str, target_dir: &Path) -> Result<()> {
        crate::git::clone_ref(url, prefix, git_ref, target_dir)
    }

    fn fetch(&self, url: &Url) -> Result<Option<Vec<u8>>> {
        if url.scheme() == "file" {
            return fetch_file(url);
        }
        fetch_http(url)
    }
}

fn fetch_file(url: &Url) -> Result<Option<Vec<u8>>> {
    let path = url.to_file_path().map_err(|_| Error::Network {
        url: url.to_string(),
        message: "not a valid local file URL".to_string(),
    })?;
    match std::fs::read(&path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn fetch_http(url: &Url) -> Result<Option<Vec<u8>>> {
    debug!("Fetching {}", url);
    let http_error = |source| Error::Http {
        url: url.to_string(),
        source,
    };

    let response = reqwest::blocking::get(url.as_str()).map_err(http_error)?;
    let status = response.status();
    if is_absent(status) {
        debug!("{} reported {}", url, status);
        return Ok(None);
    }
    if !status.is_success() {
        return Err(Error::Network {
            url: url.to_string(),
            message: format!("HTTP status {}", status),
        });
    }

    let body = response.bytes().map_err(http_error)?;
    Ok(Some(body.to_vec()))
}

/// Statuses meaning the document does not exist, as opposed to a failed request.
fn is_absent(status: StatusCode) -> bool {
    status == StatusCode::NOT_FOUND || status == StatusCode::GONE
}
