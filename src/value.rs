//! Configuration tree values and document codecs
//!
//! Every loaded document and the final merged result are represented as a
//! [`Value`], which is `serde_json::Value`: a tagged union of null, bool,
//! number, string, sequence, and string-keyed mapping. YAML documents are
//! parsed through `serde_yaml::Value` and converted, so anything YAML can
//! express beyond that model is normalized on the way in:
//!
//! - non-string mapping keys are stringified (`1: a` becomes `"1": a`)
//! - tagged values keep their inner value and drop the tag
//! - non-finite floats become null
//!
//! Mappings keep their keys in document order; keys added by a merge go last.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use serde_json::{Map, Value};

/// Serialization format of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// Infer the format from a file name's extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use uniconf::value::Format;
    ///
    /// assert_eq!(Format::from_extension("scenarios/helm.yml"), Some(Format::Yaml));
    /// assert_eq!(Format::from_extension("scenarios/helm.json"), Some(Format::Json));
    /// assert_eq!(Format::from_extension("README"), None);
    /// ```
    pub fn from_extension(path: &str) -> Option<Format> {
        let extension = std::path::Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())?;
        match extension {
            "yaml" | "yml" => Some(Format::Yaml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Yaml => "yaml",
            Format::Json => "json",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse raw bytes of the given format into a [`Value`] of any shape.
pub fn parse(format: Format, stream: &[u8]) -> Result<Value> {
    if stream.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Value::Null);
    }
    match format {
        Format::Yaml => {
            let yaml: serde_yaml::Value = serde_yaml::from_slice(stream)?;
            Ok(from_yaml(yaml))
        }
        Format::Json => Ok(serde_json::from_slice(stream)?),
    }
}

/// Parse a configuration document, which must be a mapping at the top level.
///
/// Empty documents (and documents holding only `null`) yield an empty map.
pub fn parse_document(format: Format, stream: &[u8]) -> Result<Map<String, Value>> {
    match parse(format, stream)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(Error::ConfigParse {
            message: format!(
                "top-level {} document must be a mapping, found {}",
                format,
                type_name(&other)
            ),
            hint: Some("Wrap the content in a key, e.g. 'params: ...'".to_string()),
        }),
    }
}

/// Convert a YAML value into the configuration tree model.
pub fn from_yaml(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => yaml_number(&n),
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => Value::Array(seq.into_iter().map(from_yaml).collect()),
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                map.insert(yaml_key(key), from_yaml(value));
            }
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => from_yaml(tagged.value),
    }
}

fn yaml_number(n: &serde_yaml::Number) -> Value {
    if let Some(u) = n.as_u64() {
        Value::from(u)
    } else if let Some(i) = n.as_i64() {
        Value::from(i)
    } else {
        n.as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        serde_yaml::Value::Tagged(tagged) => yaml_key(tagged.value),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// Get a human-readable type name for a value
///
/// Used for logging and error messages to describe the type of a value.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "Null",
        Value::Bool(_) => "Bool",
        Value::Number(_) => "Number",
        Value::String(_) => "String",
        Value::Array(_) => "Sequence",
        Value::Object(_) => "Mapping",
    }
}

/// Render a value as a YAML document, prefixed with a `---` marker.
pub fn to_yaml_string(value: &Value) -> Result<String> {
    Ok(format!("---\n{}", serde_yaml::to_string(value)?))
}

/// Render a value as pretty-printed JSON.
pub fn to_json_string(value: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Render a scalar for string contexts (interpolation, flat views).
///
/// Strings are returned without quotes; everything else is compact JSON.
pub fn display_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
