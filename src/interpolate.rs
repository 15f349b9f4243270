//! `${...}` substitution over the flattened configuration
//!
//! An expression is either a dotted key (an optional `context.` prefix is
//! ignored) or a function call with a single argument, `fn("arg")`. Two
//! functions are always available:
//!
//! - `deepGet("prefix")`: the value at `prefix`, or the subtree below it
//!   rebuilt from the flat table
//! - `env("NAME")`: a process environment variable
//!
//! More can be added with [`Interpolator::register`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::{Error, Result};
use crate::path::FlatConfig;
use crate::value::{display_scalar, Map, Value};

/// Signature of a function callable from an expression.
pub type InterpolationFn = Box<dyn Fn(&FlatConfig, &str) -> Result<Value>>;

/// A pattern compiled on first use.
type Pattern = LazyLock<std::result::Result<Regex, regex::Error>>;

static EXPRESSION: Pattern = LazyLock::new(|| Regex::new(r"\$\{([^}]*)\}"));
static CALL: Pattern = LazyLock::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\((.*)\)$"));
const CONTEXT_PREFIX: &str = "context.";

pub struct Interpolator {
    functions: BTreeMap<String, InterpolationFn>,
}

impl Default for Interpolator {
    fn default() -> Self {
        let mut interpolator = Self {
            functions: BTreeMap::new(),
        };
        interpolator.register("deepGet", |flat, prefix| Ok(deep_get(flat, prefix)));
        interpolator.register("env", |_, name| {
            std::env::var(name)
                .map(Value::String)
                .map_err(|_| Error::Interpolation {
                    message: format!("environment variable '{}' is not set", name),
                    expression: format!("env(\"{}\")", name),
                })
        });
        interpolator
    }
}

impl Interpolator {
    /// Register (or replace) a function.
    pub fn register<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&FlatConfig, &str) -> Result<Value> + 'static,
    {
        self.functions.insert(name.to_string(), Box::new(function));
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Replace every `${...}` in `input`.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use uniconf::interpolate::Interpolator;
    /// use uniconf::path::flatten;
    ///
    /// let flat = flatten(&json!({"params": {"branch": "master"}}));
    /// let out = Interpolator::default()
    ///     .interpolate("deploy ${context.params.branch}", &flat)
    ///     .unwrap();
    /// assert_eq!(out, "deploy master");
    /// ```
    pub fn interpolate(&self, input: &str, flat: &FlatConfig) -> Result<String> {
        let expression = compiled(&EXPRESSION)?;
        let call = compiled(&CALL)?;

        let mut failure = None;
        let output = expression.replace_all(input, |caps: &Captures<'_>| {
            match self.evaluate(caps[1].trim(), flat, call) {
                Ok(value) => display_scalar(&value),
                Err(e) => {
                    failure.get_or_insert(e);
                    String::new()
                }
            }
        });

        match failure {
            Some(e) => Err(e),
            None => Ok(output.into_owned()),
        }
    }

    fn evaluate(&self, expr: &str, flat: &FlatConfig, call: &Regex) -> Result<Value> {
        if let Some(caps) = call.captures(expr) {
            let name = &caps[1];
            let function = self.functions.get(name).ok_or_else(|| Error::Interpolation {
                message: format!("unknown function '{}'", name),
                expression: expr.to_string(),
            })?;
            let argument = self.argument(caps[2].trim(), flat, expr)?;
            return function(flat, &argument);
        }

        let key = expr.strip_prefix(CONTEXT_PREFIX).unwrap_or(expr);
        flat.get(key).cloned().ok_or_else(|| Error::Interpolation {
            message: format!("unknown key '{}'", key),
            expression: expr.to_string(),
        })
    }

    /// A quoted literal, or a bare key looked up in the flat table.
    fn argument(&self, raw: &str, flat: &FlatConfig, expr: &str) -> Result<String> {
        for quote in ['"', '\''] {
            if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
                return Ok(raw[1..raw.len() - 1].to_string());
            }
        }
        let key = raw.strip_prefix(CONTEXT_PREFIX).unwrap_or(raw);
        flat.get(key)
            .map(display_scalar)
            .ok_or_else(|| Error::Interpolation {
                message: format!("unknown key '{}' in function argument", key),
                expression: expr.to_string(),
            })
    }
}

fn compiled(pattern: &'static Pattern) -> Result<&'static Regex> {
    pattern.as_ref().map_err(|e| Error::Regex(e.clone()))
}

/// The value at `prefix`, or the subtree below it rebuilt from the flat table.
///
/// Returns null when nothing matches.
pub fn deep_get(flat: &FlatConfig, prefix: &str) -> Value {
    let prefix = prefix.trim_matches('.');
    if let Some(value) = flat.get(prefix) {
        return value.clone();
    }

    let nested_prefix = format!("{}.", prefix);
    let mut subtree = Value::Object(Map::new());
    let mut found = false;
    for (key, value) in flat.range(nested_prefix.clone()..) {
        let Some(rest) = key.strip_prefix(&nested_prefix) else {
            break;
        };
        insert_path(&mut subtree, rest, value.clone());
        found = true;
    }

    if found {
        subtree
    } else {
        Value::Null
    }
}

fn insert_path(tree: &mut Value, path: &str, value: Value) {
    let mut current = tree;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let Value::Object(map) = current else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}
