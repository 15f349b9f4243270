//! Scoped parameter collection
//!
//! Two ways of gathering the effective parameters of a nested entity:
//!
//! - [`collect_params`] merges a named block (`params`) found at every prefix
//!   of a path, shallowest first.
//! - [`collect_children`] walks a container hierarchy (`jobs.prod.jobs.install`)
//!   and merges each level with the container key stripped.
//!
//! Both work on clones of the looked-up subtrees, so the input tree is never
//! modified and the result shares nothing with it.

use log::debug;

use crate::merge::merge;
use crate::path::{join_key, search_prefixes};
use crate::value::{Map, Value};

/// Merge `<prefix>.<key>` for every prefix of `path`, deeper prefixes winning.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use uniconf::collect::collect_params;
///
/// let tree = json!({
///     "prod": {"params": {"branch": "master", "replicas": 1},
///              "install": {"params": {"replicas": 3}}}
/// });
/// let params = collect_params(&tree, "prod.install", "params");
/// assert_eq!(serde_json::Value::Object(params), json!({"branch": "master", "replicas": 3}));
/// ```
pub fn collect_params(tree: &Value, path: &str, key: &str) -> Map<String, Value> {
    let mut params = Value::Object(Map::new());
    let mut prefix = String::new();

    for segment in segments(path) {
        prefix = join_key(&prefix, segment);
        let lookup = join_key(&prefix, key);
        match search_prefixes(tree, &lookup) {
            Some(found @ Value::Object(_)) => merge(&mut params, found),
            Some(Value::Null) | None => {}
            Some(other) => debug!(
                "Ignoring non-mapping value at '{}' ({}) while collecting params",
                lookup,
                crate::value::type_name(other)
            ),
        }
    }

    into_map(params)
}

/// Merge every level of `key.a.key.b...` for the path `a.b...`, without `key`.
///
/// This is how a job nested as `jobs.prod.jobs.install` gets the cumulative
/// parameters of every ancestor level with `collect_children(tree, "prod.install", "jobs")`.
pub fn collect_children(tree: &Value, path: &str, key: &str) -> Map<String, Value> {
    let mut params = Value::Object(Map::new());
    let mut prefix = String::new();

    for segment in segments(path) {
        prefix = join_key(&join_key(&prefix, key), segment);
        match search_prefixes(tree, &prefix) {
            Some(Value::Object(level)) => {
                let mut level = level.clone();
                level.shift_remove(key);
                merge(&mut params, &Value::Object(level));
            }
            Some(Value::Null) | None => {}
            Some(other) => debug!(
                "Ignoring non-mapping value at '{}' ({}) while collecting children",
                prefix,
                crate::value::type_name(other)
            ),
        }
    }

    into_map(params)
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.trim_matches('.').split('.').filter(|s| !s.is_empty())
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn jobs_tree() -> Value {
        json!({
            "jobs": {
                "prod": {
                    "params": {"branch": "master"},
                    "jobs": {
                        "install": {"params": {"pipeline": {"name": "x"}}}
                    }
                }
            }
        })
    }

    #[test]
    fn test_collect_children_merges_every_level() {
        let result = collect_children(&jobs_tree(), "prod.install", "jobs");
        let result = Value::Object(result);
        assert_eq!(result["params"]["branch"], json!("master"));
        assert_eq!(result["params"]["pipeline"]["name"], json!("x"));
        assert!(result.get("jobs").is_none());
    }

    #[test]
    fn test_collect_children_deeper_level_overrides() {
        let tree = json!({
            "jobs": {
                "prod": {
                    "timeout": 10,
                    "jobs": {"install": {"timeout": 20}}
                }
            }
        });
        let result = collect_children(&tree, "prod.install", "jobs");
        assert_eq!(result["timeout"], json!(20));
    }

    #[test]
    fn test_collect_children_missing_levels_are_skipped() {
        let result = collect_children(&jobs_tree(), "prod.missing", "jobs");
        assert_eq!(Value::Object(result), json!({"params": {"branch": "master"}}));
    }

    #[test]
    fn test_collect_children_does_not_mutate_tree() {
        let tree = jobs_tree();
        let before = tree.clone();
        let _ = collect_children(&tree, "prod.install", "jobs");
        assert_eq!(tree, before);
    }

    #[test]
    fn test_collect_params_along_path() {
        let tree = json!({
            "params": {"ignored": true},
            "a": {
                "params": {"level": "a", "steps": ["build"]},
                "b": {"params": {"level": "b", "steps": ["test"]}}
            }
        });
        let result = collect_params(&tree, "a.b", "params");
        assert_eq!(
            Value::Object(result),
            json!({"level": "b", "steps": ["build", "test"]})
        );
    }

    #[test]
    fn test_collect_params_with_dotted_literal_key() {
        let tree = json!({"helm.blocks": {"params": {"chart": "nginx"}}});
        let result = collect_params(&tree, "helm.blocks", "params");
        assert_eq!(result["chart"], json!("nginx"));
    }

    #[test]
    fn test_collect_params_ignores_scalars() {
        let tree = json!({"a": {"params": "oops"}});
        assert!(collect_params(&tree, "a", "params").is_empty());
    }

    #[test]
    fn test_collect_empty_path() {
        assert!(collect_params(&jobs_tree(), "", "params").is_empty());
        assert!(collect_children(&jobs_tree(), ".", "jobs").is_empty());
    }
}
