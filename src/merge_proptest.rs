//! Property-based tests for merge and path search.
//!
//! These tests use proptest to generate random configuration trees and verify
//! that the merge and lookup invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::collect::collect_children;
    use crate::merge::{is_string_list, merge};
    use crate::path::{flatten, search_prefixes};
    use crate::value::{Map, Value};
    use proptest::prelude::*;
    use serde_json::json;

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-z]{0,6}".prop_map(Value::String),
        ]
    }

    fn tree() -> impl Strategy<Value = Value> {
        leaf().prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-c]{1,2}", inner, 0..4)
                    .prop_map(|map| Value::Object(map.into_iter().collect::<Map<_, _>>())),
            ]
        })
    }

    fn mapping() -> impl Strategy<Value = Value> {
        prop::collection::btree_map("[a-c]{1,2}", tree(), 0..5)
            .prop_map(|map| Value::Object(map.into_iter().collect::<Map<_, _>>()))
    }

    // ============================================================================
    // merge property tests
    // ============================================================================

    proptest! {
        /// Property: merging null leaves any tree unchanged
        #[test]
        fn merge_null_is_identity(dst in tree()) {
            let mut merged = dst.clone();
            merge(&mut merged, &Value::Null);
            prop_assert_eq!(merged, dst);
        }

        /// Property: merging an empty mapping leaves a mapping unchanged
        #[test]
        fn merge_empty_mapping_is_identity(dst in mapping()) {
            let mut merged = dst.clone();
            merge(&mut merged, &json!({}));
            prop_assert_eq!(merged, dst);
        }

        /// Property: scalars from the source always win
        #[test]
        fn merge_source_scalar_wins(dst in mapping(), key in "[a-c]{1,2}", value in any::<i64>()) {
            let mut merged = dst;
            let mut src = Map::new();
            src.insert(key.clone(), Value::from(value));
            merge(&mut merged, &Value::Object(src));
            prop_assert_eq!(&merged[&key], &Value::from(value));
        }

        /// Property: every key of either side survives a mapping merge
        #[test]
        fn merge_keeps_all_keys(dst in mapping(), src in mapping()) {
            let mut merged = dst.clone();
            merge(&mut merged, &src);
            let merged = merged.as_object().unwrap();
            for key in dst.as_object().unwrap().keys().chain(src.as_object().unwrap().keys()) {
                prop_assert!(merged.contains_key(key), "missing key {}", key);
            }
        }

        /// Property: non-string lists concatenate, dst items first
        #[test]
        fn merge_object_lists_concatenate(
            a in prop::collection::vec(mapping(), 0..4),
            b in prop::collection::vec(mapping(), 1..4),
        ) {
            prop_assume!(!is_string_list(&a) || !is_string_list(&b));
            let mut merged = json!({"k": a.clone()});
            merge(&mut merged, &json!({"k": b.clone()}));
            let items = merged["k"].as_array().unwrap();
            prop_assert_eq!(items.len(), a.len() + b.len());
            prop_assert_eq!(&items[..a.len()], &a[..]);
            prop_assert_eq!(&items[a.len()..], &b[..]);
        }

        /// Property: string lists merge to a duplicate-free union when dst is duplicate-free
        #[test]
        fn merge_string_lists_union(
            a in prop::collection::btree_set("[a-e]", 0..5),
            b in prop::collection::vec("[a-e]", 0..5),
        ) {
            let a: Vec<String> = a.into_iter().collect();
            let mut merged = json!({"k": a.clone()});
            merge(&mut merged, &json!({"k": b.clone()}));
            let items: Vec<String> = serde_json::from_value(merged["k"].clone()).unwrap();

            prop_assert_eq!(&items[..a.len()], &a[..]);
            for item in a.iter().chain(b.iter()) {
                prop_assert_eq!(items.iter().filter(|i| *i == item).count(), 1);
            }
        }

        /// Property: the merged tree never aliases the source
        #[test]
        fn merge_result_is_independent_of_source(dst in mapping(), src in mapping()) {
            let before = src.clone();
            let mut merged = dst;
            merge(&mut merged, &src);
            if let Value::Object(map) = &mut merged {
                map.insert("__mutated".to_string(), Value::Bool(true));
                for value in map.values_mut() {
                    if let Value::Object(inner) = value {
                        inner.clear();
                    }
                }
            }
            prop_assert_eq!(src, before);
        }
    }

    // ============================================================================
    // search_prefixes property tests
    // ============================================================================

    proptest! {
        /// Property: every flattened path resolves to its leaf
        #[test]
        fn search_finds_every_flattened_leaf(tree in mapping()) {
            for (path, value) in flatten(&tree) {
                // A nested null reads as absent
                if value.is_null() {
                    continue;
                }
                // Keys here contain no dots, so the lookup is unambiguous
                prop_assert_eq!(search_prefixes(&tree, &path), Some(&value));
            }
        }

        /// Property: search is deterministic
        #[test]
        fn search_is_deterministic(tree in mapping(), path in "[a-c.]{0,8}") {
            prop_assert_eq!(search_prefixes(&tree, &path), search_prefixes(&tree, &path));
        }

        /// Property: a literal dotted key shadows the nested path
        #[test]
        fn search_literal_key_wins(a in "[a-c]{1,2}", b in "[a-c]{1,2}", x in any::<i64>(), y in any::<i64>()) {
            let mut nested = Map::new();
            nested.insert(b.clone(), Value::from(y));
            let mut tree = Map::new();
            tree.insert(format!("{}.{}", a, b), Value::from(x));
            tree.insert(a.clone(), Value::Object(nested));
            let tree = Value::Object(tree);
            prop_assert_eq!(search_prefixes(&tree, &format!("{}.{}", a, b)), Some(&Value::from(x)));
        }

        /// Property: collecting children never mutates the tree
        #[test]
        fn collect_children_is_pure(tree in mapping(), path in "[a-c.]{0,6}") {
            let before = tree.clone();
            let _ = collect_children(&tree, &path, "a");
            prop_assert_eq!(tree, before);
        }
    }
}
