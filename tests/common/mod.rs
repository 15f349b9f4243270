//! Shared test utilities for integration and E2E tests.
//!
//! This module provides common fixtures and helper functions to reduce
//! duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new()
//!         .with_config("from: [base]\n")
//!         .with_scenario("base", "a: 1\n");
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

use uniconf::{Settings, Source, Uniconf};

/// Re-export commonly used test dependencies for convenience.
#[allow(unused_imports)]
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::configs;
    pub use super::TestFixture;
}

/// Common configuration YAML snippets for testing.
#[allow(dead_code)]
pub mod configs {
    /// Root including two project scenarios and overriding one key.
    pub const LAYERED: &str = "\
from: [base, prod]
log_level: DEBUG
";

    /// Most general scenario.
    pub const BASE: &str = "\
log_level: INFO
replicas: 1
steps: [build, test]
";

    /// More specific scenario.
    pub const PROD: &str = "\
replicas: 3
steps: [test, deploy]
";

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "invalid: yaml: content:";
}

/// Path of the root document inside a fixture.
pub const CONFIG_PATH: &str = ".unipipe/config.yaml";

/// A project directory with a root document and scenario files.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write the root document.
    pub fn with_config(self, content: &str) -> Self {
        self.with_file(CONFIG_PATH, content)
    }

    /// Write `scenarios/<name>.yaml`.
    pub fn with_scenario(self, name: &str, content: &str) -> Self {
        self.with_file(&format!("scenarios/{}.yaml", name), content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the root document.
    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join(CONFIG_PATH)
    }

    /// Settings for this project with the env overlay disabled.
    pub fn settings(&self) -> Settings {
        Settings {
            root_id: CONFIG_PATH.to_string(),
            temp_dir: self.temp_dir.path().join(".unipipe_temp"),
            env_config_var: None,
            ..Settings::default()
        }
    }

    /// An engine rooted at this project, not yet loaded.
    pub fn engine(&self) -> Uniconf {
        self.engine_with(self.settings())
    }

    pub fn engine_with(&self, settings: Settings) -> Uniconf {
        let mut uniconf = Uniconf::new(settings);
        uniconf.set_root_source(Source::file("project", self.path()));
        uniconf
    }

    /// Get access to the underlying TempDir for advanced usage.
    pub fn temp_dir(&self) -> &assert_fs::TempDir {
        &self.temp_dir
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
