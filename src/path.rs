//! Key-path utilities for uniconf
//!
//! Configuration keys may themselves contain dots (`helm.blocks` as a literal
//! key next to a nested `helm: {blocks: ...}`), so dotted paths are resolved
//! with a longest-prefix search rather than a plain split-and-descend.

use std::collections::BTreeMap;

use crate::value::Value;

/// Dotted key path to leaf value, as produced by [`flatten`].
pub type FlatConfig = BTreeMap<String, Value>;

/// Look up a dotted path in a configuration tree.
///
/// At every level the longest run of remaining segments is tried as a literal
/// key first, then shorter runs down to a single segment. When a prefix
/// matches but the rest of the path cannot be resolved below it, the next
/// shorter prefix is tried. Leading and trailing dots are ignored; an empty
/// path returns the tree itself.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use uniconf::path::search_prefixes;
///
/// let tree = json!({"a.b": 1, "a": {"b": 2, "c": 3}});
/// assert_eq!(search_prefixes(&tree, "a.b"), Some(&json!(1)));
/// assert_eq!(search_prefixes(&tree, "a.c"), Some(&json!(3)));
/// assert_eq!(search_prefixes(&tree, "a.d"), None);
/// ```
pub fn search_prefixes<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim_matches('.');
    if path.is_empty() {
        return Some(tree);
    }
    let segments: Vec<&str> = path.split('.').collect();
    search_segments(tree, &segments)
}

/// Segment-level form of [`search_prefixes`].
pub fn search_segments<'a>(tree: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    if segments.is_empty() {
        return Some(tree);
    }
    let map = tree.as_object()?;

    for i in (1..=segments.len()).rev() {
        let prefix_key = segments[..i].join(".");
        let Some(next) = map.get(&prefix_key) else {
            continue;
        };
        if i == segments.len() {
            return Some(next);
        }
        // A scalar where a mapping is expected falls through to the next prefix
        if next.is_object() {
            match search_segments(next, &segments[i..]) {
                Some(found) if !found.is_null() => return Some(found),
                _ => {}
            }
        }
    }

    None
}

/// Mutable form of [`search_prefixes`], resolving the same literal keys.
pub fn search_prefixes_mut<'a>(tree: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let path = path.trim_matches('.');
    let segments: Vec<&str> = if path.is_empty() {
        Vec::new()
    } else {
        path.split('.').collect()
    };
    let keys = resolve_keys(tree, &segments)?;
    keys.iter()
        .try_fold(tree, |node, key| node.get_mut(key.as_str()))
}

/// The literal keys [`search_segments`] descends through.
fn resolve_keys(tree: &Value, segments: &[&str]) -> Option<Vec<String>> {
    if segments.is_empty() {
        return Some(Vec::new());
    }
    let map = tree.as_object()?;

    for i in (1..=segments.len()).rev() {
        let prefix_key = segments[..i].join(".");
        let Some(next) = map.get(&prefix_key) else {
            continue;
        };
        if i == segments.len() {
            return Some(vec![prefix_key]);
        }
        if !next.is_object() {
            continue;
        }
        if let Some(rest) = resolve_keys(next, &segments[i..]) {
            let found = rest.iter().try_fold(next, |node, key| node.get(key.as_str()));
            if found.is_some_and(|value| !value.is_null()) {
                let mut keys = vec![prefix_key];
                keys.extend(rest);
                return Some(keys);
            }
        }
    }

    None
}

/// Project a tree onto dotted key paths.
///
/// Mappings are descended into; sequences and scalars are leaves stored under
/// their full path. Empty mappings contribute nothing.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use uniconf::path::flatten;
///
/// let flat = flatten(&json!({"params": {"timeout": 120, "steps": ["a"]}, "empty": {}}));
/// assert_eq!(flat.len(), 2);
/// assert_eq!(flat["params.timeout"], json!(120));
/// assert_eq!(flat["params.steps"], json!(["a"]));
/// ```
pub fn flatten(tree: &Value) -> FlatConfig {
    let mut flat = BTreeMap::new();
    flatten_into(tree, "", &mut flat);
    flat
}

fn flatten_into(value: &Value, prefix: &str, flat: &mut FlatConfig) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = join_key(prefix, key);
                flatten_into(child, &path, flat);
            }
        }
        leaf => {
            if !prefix.is_empty() {
                flat.insert(prefix.to_string(), leaf.clone());
            }
        }
    }
}

/// Join a dotted prefix and a key.
pub fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// Expand a hierarchical identifier into its progressively longer prefixes.
///
/// Empty segments are dropped, so `a//b/` expands like `a/b`.
///
/// # Examples
///
/// ```
/// use uniconf::path::expand_hierarchy;
///
/// assert_eq!(expand_hierarchy("helm/blocks/ci", '/'), vec!["helm", "helm/blocks", "helm/blocks/ci"]);
/// assert_eq!(expand_hierarchy("UNICONF_TEST", '_'), vec!["UNICONF", "UNICONF_TEST"]);
/// ```
pub fn expand_hierarchy(id: &str, separator: char) -> Vec<String> {
    let mut ids = Vec::new();
    let mut current = String::new();
    for segment in id.split(separator).filter(|s| !s.is_empty()) {
        if !current.is_empty() {
            current.push(separator);
        }
        current.push_str(segment);
        ids.push(current.clone());
    }
    ids
}

/// Encode a source name into a single filesystem-safe path component
///
/// Used to derive the deterministic checkout directory of git and remote
/// sources.
pub fn encode_path_component(name: &str) -> String {
    let encoded: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect();
    match encoded.as_str() {
        "" | "." | ".." => format!("_{}", encoded),
        _ => encoded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_empty_path_returns_tree() {
        let tree = json!({"a": 1});
        assert_eq!(search_prefixes(&tree, ""), Some(&tree));
        assert_eq!(search_prefixes(&tree, "."), Some(&tree));
    }

    #[test]
    fn test_search_literal_key_wins_over_nested() {
        let tree = json!({"a.b": 1, "a": {"b": 2}});
        assert_eq!(search_prefixes(&tree, "a.b"), Some(&json!(1)));
    }

    #[test]
    fn test_search_nested_path() {
        let tree = json!({"jobs": {"prod": {"params": {"branch": "master"}}}});
        assert_eq!(
            search_prefixes(&tree, "jobs.prod.params.branch"),
            Some(&json!("master"))
        );
    }

    #[test]
    fn test_search_trims_dots() {
        let tree = json!({"jobs": {"prod": 1}});
        assert_eq!(search_prefixes(&tree, ".jobs.prod."), Some(&json!(1)));
    }

    #[test]
    fn test_search_falls_back_to_shorter_prefix() {
        // "a.b" matches but has no "c" below it; "a" -> "b.c" resolves
        let tree = json!({"a.b": {"x": 1}, "a": {"b.c": 2}});
        assert_eq!(search_prefixes(&tree, "a.b.c"), Some(&json!(2)));
    }

    #[test]
    fn test_search_scalar_in_the_way() {
        let tree = json!({"a": "scalar"});
        assert_eq!(search_prefixes(&tree, "a.b"), None);
    }

    #[test]
    fn test_search_mixed_literal_and_nested() {
        let tree = json!({"scenarios": {"helm/blocks.ci": {"params": {"x": 1}}}});
        assert_eq!(
            search_prefixes(&tree, "scenarios.helm/blocks.ci.params.x"),
            Some(&json!(1))
        );
    }

    #[test]
    fn test_search_missing_returns_none() {
        let tree = json!({"a": {"b": 1}});
        assert_eq!(search_prefixes(&tree, "x"), None);
        assert_eq!(search_prefixes(&tree, "a.c"), None);
    }

    #[test]
    fn test_search_non_map_tree() {
        assert_eq!(search_prefixes(&json!([1, 2]), "0"), None);
    }

    #[test]
    fn test_search_mut_follows_literal_keys() {
        let mut tree = json!({"a.b": {"c": 1}, "a": {"b": {"c": 2}}, "x": {"y": null}});
        *search_prefixes_mut(&mut tree, "a.b.c").unwrap() = json!(10);
        assert_eq!(tree["a.b"]["c"], json!(10));
        assert_eq!(tree["a"]["b"]["c"], json!(2));

        assert!(search_prefixes_mut(&mut tree, "a.nope").is_none());
        assert!(search_prefixes_mut(&mut tree, "").unwrap().is_object());
    }

    #[test]
    fn test_flatten_nested() {
        let flat = flatten(&json!({
            "log_level": "INFO",
            "params": {"actions": {"timeout": 120}, "branches": ["master", "develop"]}
        }));
        assert_eq!(flat.len(), 3);
        assert_eq!(flat["log_level"], json!("INFO"));
        assert_eq!(flat["params.actions.timeout"], json!(120));
        assert_eq!(flat["params.branches"], json!(["master", "develop"]));
    }

    #[test]
    fn test_flatten_empty_map_has_no_entries() {
        assert!(flatten(&json!({})).is_empty());
        assert!(flatten(&json!({"a": {}})).is_empty());
    }

    #[test]
    fn test_flatten_keeps_null_leaves() {
        let flat = flatten(&json!({"a": null}));
        assert_eq!(flat["a"], Value::Null);
    }

    #[test]
    fn test_expand_hierarchy_single_segment() {
        assert_eq!(expand_hierarchy("root", '/'), vec!["root"]);
    }

    #[test]
    fn test_expand_hierarchy_skips_empty_segments() {
        assert_eq!(expand_hierarchy("a//b/", '/'), vec!["a", "a/b"]);
        assert!(expand_hierarchy("", '/').is_empty());
    }

    #[test]
    fn test_encode_path_component() {
        assert_eq!(encode_path_component("drupipe"), "drupipe");
        assert_eq!(encode_path_component("org/repo:main"), "org-repo_main");
        assert_eq!(encode_path_component(".."), "_..");
    }
}
