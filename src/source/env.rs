//! Environment-variable source: each variable holds a JSON document.

use std::env;

use crate::entity::{EntityKey, RawEntity};
use crate::error::{Error, Result};
use crate::path::expand_hierarchy;
use crate::value::Format;

#[derive(Debug, Clone, Default)]
pub struct EnvSource;

impl EnvSource {
    /// Set variables among the underscore prefixes of `scenario`.
    ///
    /// `UNICONF_TEST_MULTIPART` checks `UNICONF`, `UNICONF_TEST`, and
    /// `UNICONF_TEST_MULTIPART`, in that order.
    pub fn resolve_include_ids(&self, scenario: &str) -> Vec<String> {
        expand_hierarchy(scenario, '_')
            .into_iter()
            .filter(|name| env::var_os(name).is_some())
            .collect()
    }

    pub fn read(&self, source_name: &str, id: &str) -> Result<RawEntity> {
        match env::var(id) {
            Ok(value) => Ok(RawEntity::from_stream(
                EntityKey::new(source_name, id),
                Format::Json,
                value.into_bytes(),
            )),
            Err(env::VarError::NotPresent) => {
                Err(Error::not_found("environment variable", id, source_name))
            }
            Err(env::VarError::NotUnicode(_)) => Err(Error::SourceLoad {
                name: source_name.to_string(),
                message: format!("environment variable {} is not valid unicode", id),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_resolve_progressive_names() {
        env::set_var("UNICONF_ENVTEST", r#"{"a": 1}"#);
        env::set_var("UNICONF_ENVTEST_DEEP_X", r#"{"a": 2}"#);
        env::remove_var("UNICONF_ENVTEST_DEEP");

        let ids = EnvSource.resolve_include_ids("UNICONF_ENVTEST_DEEP_X");
        // UNICONF itself may or may not be set by the surrounding environment
        let ids: Vec<_> = ids.into_iter().filter(|id| id != "UNICONF").collect();
        assert_eq!(ids, vec!["UNICONF_ENVTEST", "UNICONF_ENVTEST_DEEP_X"]);

        env::remove_var("UNICONF_ENVTEST");
        env::remove_var("UNICONF_ENVTEST_DEEP_X");
    }

    #[test]
    #[serial]
    fn test_read_parses_json() {
        env::set_var("UNICONF_ENVTEST_READ", r#"{"log_level": "DEBUG"}"#);
        let raw = EnvSource.read("env", "UNICONF_ENVTEST_READ").unwrap();
        assert_eq!(raw.format, Format::Json);
        assert_eq!(raw.parse().unwrap().data["log_level"], json!("DEBUG"));
        env::remove_var("UNICONF_ENVTEST_READ");
    }

    #[test]
    #[serial]
    fn test_read_missing_is_not_found() {
        env::remove_var("UNICONF_ENVTEST_MISSING");
        let err = EnvSource.read("env", "UNICONF_ENVTEST_MISSING").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("environment variable"));
    }
}
