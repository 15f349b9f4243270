//! Tool settings
//!
//! These control how uniconf lays out and locates documents, not what the
//! documents contain. All fields have defaults, so an absent or partial
//! settings file is fine.
//!
//! Lookup order for the settings file:
//!
//! 1. an explicit path (`--settings`), which must exist
//! 2. `~/.uniconf.yaml` when present
//! 3. built-in defaults
//!
//! CLI flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File name of the per-user settings file in the home directory.
pub const SETTINGS_FILE_NAME: &str = ".uniconf.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Scratch directory for git checkouts and remote downloads; cleared on load.
    pub temp_dir: PathBuf,
    /// Directory below a file source root where scenarios live.
    pub includes_dir: String,
    /// File name tried inside a scenario directory (`scenarios/<id>/config.yaml`).
    pub main_config_file: String,
    /// Id of the root entity in the root source.
    pub root_id: String,
    /// Environment variable merged on top of the root entity, if set.
    pub env_config_var: Option<String>,
    /// Maximum include nesting before the run is aborted.
    pub max_include_depth: usize,
    /// Ref used by git sources without a `ref`.
    pub default_ref: String,
    /// Ref prefix used by git sources without a `prefix`.
    pub default_ref_prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from(".unipipe_temp"),
            includes_dir: "scenarios".to_string(),
            main_config_file: "config.yaml".to_string(),
            root_id: "root".to_string(),
            env_config_var: Some("UNICONF".to_string()),
            max_include_depth: 32,
            default_ref: "master".to_string(),
            default_ref_prefix: "refs/heads/".to_string(),
        }
    }
}

impl Settings {
    /// Parse settings from YAML text. Empty text yields the defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(content).map_err(|e| Error::Settings {
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `explicit`, else from the home directory file, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(Error::Settings {
                    message: format!("settings file {} does not exist", path.display()),
                });
            }
            return Self::from_file(path);
        }

        match default_settings_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading settings from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| match e {
            Error::Settings { message } => Error::Settings {
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.max_include_depth == 0 {
            return Err(Error::Settings {
                message: "max_include_depth must be at least 1".to_string(),
            });
        }
        if self.root_id.is_empty() {
            return Err(Error::Settings {
                message: "root_id must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// `~/.uniconf.yaml`, when a home directory is known.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(SETTINGS_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.temp_dir, PathBuf::from(".unipipe_temp"));
        assert_eq!(settings.includes_dir, "scenarios");
        assert_eq!(settings.main_config_file, "config.yaml");
        assert_eq!(settings.root_id, "root");
        assert_eq!(settings.env_config_var.as_deref(), Some("UNICONF"));
        assert_eq!(settings.default_ref, "master");
        assert_eq!(settings.default_ref_prefix, "refs/heads/");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings = Settings::from_yaml("includes_dir: blocks\nmax_include_depth: 4\n").unwrap();
        assert_eq!(settings.includes_dir, "blocks");
        assert_eq!(settings.max_include_depth, 4);
        assert_eq!(settings.root_id, "root");
    }

    #[test]
    fn test_env_config_var_can_be_disabled() {
        let settings = Settings::from_yaml("env_config_var: ~\n").unwrap();
        assert_eq!(settings.env_config_var, None);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Settings::from_yaml("").unwrap(), Settings::default());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = Settings::from_yaml("tmp_dir: x\n").unwrap_err();
        assert!(matches!(err, Error::Settings { .. }));
    }

    #[test]
    fn test_zero_depth_is_rejected() {
        let err = Settings::from_yaml("max_include_depth: 0\n").unwrap_err();
        assert!(err.to_string().contains("max_include_depth"));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "temp_dir: /tmp/uniconf-work").unwrap();
        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.temp_dir, PathBuf::from("/tmp/uniconf-work"));
    }

    #[test]
    fn test_load_missing_explicit_file_is_an_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/uniconf.yaml"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
