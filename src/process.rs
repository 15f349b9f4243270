//! # Key-level `from` processing
//!
//! Include resolution only looks at the top-level `from` of each document.
//! Nested mappings may carry their own `from` as well, pointing at parameter
//! blocks elsewhere in the merged tree rather than at documents:
//!
//! ```yaml
//! params:
//!   processors:
//!     from:
//!       mode: config
//!   jobs:
//!     folder:
//!       params: {type: folder}
//!       prod:
//!         params: {branch: master}
//! jobs:
//!   prod:
//!     from: .params.jobs.folder.prod
//! ```
//!
//! For every such entry, [`FromProcessor`] collects `processors` along the
//! referenced path and reads `from.mode`. When the mode is non-empty and the
//! current phase name starts with it, the `params` blocks along the path are
//! collected and merged into the mapping holding the entry, the entry is
//! removed from `from`, and a label is appended to `from_processed`. Entries
//! whose mode does not match stay where they are for a later phase.
//!
//! A merged block may bring new `from` entries with it; they are processed in
//! the same pass. Entries already listed in `from_processed` are never
//! processed twice.

use std::collections::HashMap;

use log::{debug, trace};

use crate::collect::collect_params;
use crate::config::{FROM_KEY, FROM_PROCESSED_KEY};
use crate::error::Result;
use crate::interpolate::Interpolator;
use crate::merge::merge_maps;
use crate::path::{search_prefixes, FlatConfig};
use crate::value::{Map, Value};

/// Block collected along a `from` path to decide whether it applies.
pub const PROCESSORS_KEY: &str = "processors";
/// Block collected along a `from` path and merged into the referencing mapping.
pub const PARAMS_KEY: &str = "params";
/// Path of the mode inside the collected processors block.
pub const FROM_MODE_PATH: &str = "from.mode";
/// Phase used when none is given.
pub const DEFAULT_PHASE: &str = "config";

/// Collected parameters per `(phase, target)`, reused across passes.
pub type FromCache = HashMap<(String, String), Map<String, Value>>;

/// One pass of key-level `from` processing over a subtree.
pub struct FromProcessor<'a> {
    /// The tree `from` paths are resolved against, as it was before the pass.
    lookup: &'a Value,
    flat: &'a FlatConfig,
    interpolator: &'a Interpolator,
    phase: &'a str,
    cache: &'a mut FromCache,
    processed: usize,
}

impl<'a> FromProcessor<'a> {
    pub fn new(
        lookup: &'a Value,
        flat: &'a FlatConfig,
        interpolator: &'a Interpolator,
        phase: &'a str,
        cache: &'a mut FromCache,
    ) -> Self {
        Self {
            lookup,
            flat,
            interpolator,
            phase,
            cache,
            processed: 0,
        }
    }

    /// Process every mapping in `value`. Returns the number of entries merged.
    pub fn process(&mut self, value: &mut Value) -> Result<usize> {
        self.process_value(value)?;
        Ok(self.processed)
    }

    fn process_value(&mut self, value: &mut Value) -> Result<()> {
        match value {
            Value::Object(map) => self.process_map(map),
            Value::Array(items) => {
                for item in items {
                    self.process_value(item)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn process_map(&mut self, map: &mut Map<String, Value>) -> Result<()> {
        let mut deferred: Vec<String> = Vec::new();
        while let Some(entry) = next_pending(map, &deferred) {
            match self.resolve(&entry)? {
                Some((target, params)) => {
                    trace!("Merging '{}' into its parent mapping", target);
                    merge_maps(map, &params);
                    remove_entry(map, &entry);
                    record_processed(map, processed_label(&entry, &target));
                    self.processed += 1;
                }
                None => deferred.push(entry),
            }
        }

        for (key, child) in map.iter_mut() {
            if key != FROM_PROCESSED_KEY {
                self.process_value(child)?;
            }
        }
        Ok(())
    }

    /// The interpolated target and its parameters, or `None` if the mode does not apply.
    fn resolve(&mut self, entry: &str) -> Result<Option<(String, Map<String, Value>)>> {
        let target = if entry.contains("${") {
            self.interpolator.interpolate(entry, self.flat)?
        } else {
            entry.to_string()
        };

        let cache_key = (self.phase.to_string(), target.clone());
        if let Some(params) = self.cache.get(&cache_key) {
            return Ok(Some((target, params.clone())));
        }

        let processors = Value::Object(collect_params(self.lookup, &target, PROCESSORS_KEY));
        let mode = search_prefixes(&processors, FROM_MODE_PATH)
            .and_then(Value::as_str)
            .unwrap_or_default();
        if mode.is_empty() || !self.phase.starts_with(mode) {
            debug!(
                "Leaving '{}' for a later phase (mode '{}', phase '{}')",
                target, mode, self.phase
            );
            return Ok(None);
        }

        let params = collect_params(self.lookup, &target, PARAMS_KEY);
        self.cache.insert(cache_key, params.clone());
        Ok(Some((target, params)))
    }
}

/// The first string entry of `map[from]` that is neither processed nor deferred.
fn next_pending(map: &Map<String, Value>, deferred: &[String]) -> Option<String> {
    let entries: Vec<&str> = match map.get(FROM_KEY)? {
        Value::String(entry) => vec![entry.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => return None,
    };
    let processed: Vec<&str> = match map.get(FROM_PROCESSED_KEY) {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };

    entries
        .into_iter()
        .find(|entry| {
            !deferred.iter().any(|d| d == entry)
                && !processed.iter().any(|label| is_label_of(label, entry))
        })
        .map(str::to_string)
}

fn processed_label(entry: &str, target: &str) -> String {
    if entry == target {
        entry.to_string()
    } else {
        format!("{} ({})", entry, target)
    }
}

fn is_label_of(label: &str, entry: &str) -> bool {
    label == entry
        || label
            .strip_prefix(entry)
            .is_some_and(|rest| rest.starts_with(" (") && rest.ends_with(')'))
}

fn remove_entry(map: &mut Map<String, Value>, entry: &str) {
    let now_empty = match map.get_mut(FROM_KEY) {
        Some(Value::String(_)) => true,
        Some(Value::Array(items)) => {
            items.retain(|item| item.as_str() != Some(entry));
            items.is_empty()
        }
        _ => false,
    };
    if now_empty {
        map.shift_remove(FROM_KEY);
    }
}

fn record_processed(map: &mut Map<String, Value>, label: String) {
    let slot = map
        .entry(FROM_PROCESSED_KEY)
        .or_insert_with(|| Value::Array(Vec::new()));
    match slot {
        Value::Array(items) => items.push(Value::String(label)),
        other => *other = Value::Array(vec![Value::String(label)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::flatten;
    use serde_json::json;

    fn tree(mode: &str) -> Value {
        json!({
            "params": {
                "processors": {"from": {"mode": mode}},
                "jobs": {
                    "folder": {
                        "params": {"type": "folder"},
                        "prod": {"params": {"branch": "master", "context": {"environment": "prod"}}}
                    },
                    "common": {
                        "install": {"params": {"pipeline": {"name": "default"}}}
                    }
                }
            },
            "env": "prod",
            "jobs": {
                "prod": {
                    "from": [".params.jobs.folder.prod"],
                    "jobs": {
                        "install": {"from": ".params.jobs.common.install", "timeout": 5}
                    }
                }
            }
        })
    }

    fn run(tree: &mut Value, phase: &str) -> usize {
        let lookup = tree.clone();
        let flat = flatten(&lookup);
        let interpolator = Interpolator::default();
        let mut cache = FromCache::new();
        FromProcessor::new(&lookup, &flat, &interpolator, phase, &mut cache)
            .process(tree)
            .unwrap()
    }

    #[test]
    fn test_from_entries_merge_collected_params() {
        let mut config = tree("config");
        let jobs = config.get_mut("jobs").unwrap();
        let lookup = tree("config");
        let flat = flatten(&lookup);
        let interpolator = Interpolator::default();
        let mut cache = FromCache::new();
        let count = FromProcessor::new(&lookup, &flat, &interpolator, "config.process", &mut cache)
            .process(jobs)
            .unwrap();
        assert_eq!(count, 2);

        let prod = &config["jobs"]["prod"];
        assert_eq!(prod["type"], json!("folder"));
        assert_eq!(prod["branch"], json!("master"));
        assert_eq!(prod["context"]["environment"], json!("prod"));
        assert!(prod.get("from").is_none());
        assert_eq!(prod["from_processed"], json!([".params.jobs.folder.prod"]));

        let install = &prod["jobs"]["install"];
        assert_eq!(install["pipeline"]["name"], json!("default"));
        assert_eq!(install["timeout"], json!(5));
        assert_eq!(install["from_processed"], json!([".params.jobs.common.install"]));
    }

    #[test]
    fn test_mode_must_prefix_phase() {
        let mut config = tree("execute");
        assert_eq!(run(&mut config, "config"), 0);
        assert_eq!(config["jobs"]["prod"]["from"], json!([".params.jobs.folder.prod"]));
        assert!(config["jobs"]["prod"].get("from_processed").is_none());

        assert_eq!(run(&mut config, "execute.job"), 2);
        assert_eq!(config["jobs"]["prod"]["branch"], json!("master"));
    }

    #[test]
    fn test_missing_mode_leaves_entry() {
        let mut config = json!({
            "params": {"x": {"params": {"a": 1}}},
            "job": {"from": ".params.x"}
        });
        assert_eq!(run(&mut config, "config"), 0);
        assert_eq!(config["job"]["from"], json!(".params.x"));
    }

    #[test]
    fn test_interpolated_entry_is_labelled() {
        let mut config = tree("config");
        config["jobs"]["prod"]["from"] = json!([".params.jobs.folder.${env}"]);
        assert_eq!(run(&mut config, "config"), 2);
        assert_eq!(
            config["jobs"]["prod"]["from_processed"],
            json!([".params.jobs.folder.${env} (.params.jobs.folder.prod)"])
        );
    }

    #[test]
    fn test_merged_block_brings_new_entries() {
        let mut config = json!({
            "params": {
                "processors": {"from": {"mode": "config"}},
                "base": {"params": {"a": 1}},
                "derived": {"params": {"from": [".params.base"], "b": 2}}
            },
            "job": {"from": [".params.derived"]}
        });
        assert_eq!(run(&mut config, "config"), 2);
        assert_eq!(config["job"]["a"], json!(1));
        assert_eq!(config["job"]["b"], json!(2));
        assert_eq!(
            config["job"]["from_processed"],
            json!([".params.derived", ".params.base"])
        );
    }

    #[test]
    fn test_self_reference_terminates() {
        let mut config = json!({
            "params": {
                "processors": {"from": {"mode": "config"}},
                "loop": {"params": {"from": ".params.loop", "v": 1}}
            },
            "job": {"from": ".params.loop"}
        });
        assert_eq!(run(&mut config, "config"), 1);
        assert_eq!(config["job"]["v"], json!(1));
    }

    #[test]
    fn test_is_label_of() {
        assert!(is_label_of("a", "a"));
        assert!(is_label_of("a.${x} (a.b)", "a.${x}"));
        assert!(!is_label_of("ab", "a"));
    }
}
