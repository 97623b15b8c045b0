use flowvault_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Strategy applied when both sides of a merge hold an array under the same key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayMergeOption {
    /// Merge elements that share an `id` field, append the rest.
    #[default]
    ById,
    /// Merge elements pairwise by position.
    ByIndex,
    /// Append patch elements to stored elements.
    Concat,
    /// Patch array replaces the stored array.
    Replace,
}

impl ArrayMergeOption {
    /// Returns the value understood by `jsonb_deep_merge_with_options`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ById => "by_id",
            Self::ByIndex => "by_index",
            Self::Concat => "concat",
            Self::Replace => "replace",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "by_id" => Ok(Self::ById),
            "by_index" => Ok(Self::ByIndex),
            "concat" => Ok(Self::Concat),
            "replace" => Ok(Self::Replace),
            _ => Err(AppError::Validation(format!(
                "unknown array merge option '{value}'"
            ))),
        }
    }
}

/// Deep-merges `patch` into `document`.
///
/// Mirrors the `jsonb_deep_merge_with_options` stored procedure: object keys
/// merge recursively, a `null` patch value removes its key, arrays follow
/// `option` at every depth, and any other type pairing takes the patch value.
/// A `null` patch leaves the document unchanged.
#[must_use]
pub fn deep_merge(document: &Value, patch: &Value, option: ArrayMergeOption) -> Value {
    if patch.is_null() {
        return document.clone();
    }

    merge_value(document, patch, option)
}

fn merge_value(target: &Value, patch: &Value, option: ArrayMergeOption) -> Value {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            Value::Object(merge_objects(target, patch, option))
        }
        (Value::Array(target), Value::Array(patch)) => {
            Value::Array(merge_arrays(target, patch, option))
        }
        _ => patch.clone(),
    }
}

fn merge_objects(
    target: &Map<String, Value>,
    patch: &Map<String, Value>,
    option: ArrayMergeOption,
) -> Map<String, Value> {
    let mut merged = target.clone();

    for (key, patch_value) in patch {
        if patch_value.is_null() {
            merged.remove(key);
            continue;
        }

        let value = match merged.get(key) {
            Some(existing) => merge_value(existing, patch_value, option),
            None => patch_value.clone(),
        };
        merged.insert(key.clone(), value);
    }

    merged
}

fn merge_arrays(target: &[Value], patch: &[Value], option: ArrayMergeOption) -> Vec<Value> {
    match option {
        ArrayMergeOption::Replace => patch.to_vec(),
        ArrayMergeOption::Concat => target.iter().chain(patch).cloned().collect(),
        ArrayMergeOption::ByIndex => {
            let length = target.len().max(patch.len());
            (0..length)
                .filter_map(|index| match (target.get(index), patch.get(index)) {
                    (Some(existing), Some(patch_value)) => {
                        Some(merge_value(existing, patch_value, option))
                    }
                    (Some(existing), None) => Some(existing.clone()),
                    (None, Some(patch_value)) => Some(patch_value.clone()),
                    (None, None) => None,
                })
                .collect()
        }
        ArrayMergeOption::ById => {
            let mut merged = target.to_vec();

            for patch_value in patch {
                let matched_index = element_id(patch_value).and_then(|patch_id| {
                    merged
                        .iter()
                        .position(|existing| {
                            element_id(existing)
                                .is_some_and(|existing_id| json_values_equal(existing_id, patch_id))
                        })
                });

                match matched_index {
                    Some(index) => {
                        merged[index] = merge_value(&merged[index], patch_value, option);
                    }
                    None => merged.push(patch_value.clone()),
                }
            }

            merged
        }
    }
}

fn element_id(value: &Value) -> Option<&Value> {
    value
        .as_object()
        .and_then(|object| object.get("id"))
        .filter(|id| !id.is_null())
}

/// JSON equality as jsonb `=` defines it: numbers compare by value, so `1`
/// equals `1.0`.
#[must_use]
pub fn json_values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => numbers_equal(left, right),
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .zip(right)
                    .all(|(left, right)| json_values_equal(left, right))
        }
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left.iter().all(|(key, value)| {
                    right
                        .get(key)
                        .is_some_and(|other| json_values_equal(value, other))
                })
        }
        _ => left == right,
    }
}

fn numbers_equal(left: &Number, right: &Number) -> bool {
    if let (Some(left), Some(right)) = (left.as_i64(), right.as_i64()) {
        return left == right;
    }
    if let (Some(left), Some(right)) = (left.as_u64(), right.as_u64()) {
        return left == right;
    }

    left.as_f64() == right.as_f64()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::{Value, json};

    use super::{ArrayMergeOption, deep_merge, json_values_equal};

    #[test]
    fn concat_appends_patch_elements() {
        let merged = deep_merge(
            &json!({"values": [1, 2]}),
            &json!({"values": [3]}),
            ArrayMergeOption::Concat,
        );

        assert_eq!(merged, json!({"values": [1, 2, 3]}));
    }

    #[test]
    fn by_id_merges_matching_elements_and_keeps_others() {
        let merged = deep_merge(
            &json!({"documents": [{"id": "a", "v": 1}, {"id": "b", "v": 2}]}),
            &json!({"documents": [{"id": "a", "v": 9}]}),
            ArrayMergeOption::ById,
        );

        assert_eq!(
            merged,
            json!({"documents": [{"id": "a", "v": 9}, {"id": "b", "v": 2}]})
        );
    }

    #[test]
    fn by_id_appends_unmatched_and_folds_duplicate_patch_ids() {
        let merged = deep_merge(
            &json!({"documents": [{"id": "a", "v": 1}]}),
            &json!({"documents": [
                {"id": "c", "v": 3},
                {"v": 4},
                {"id": "c", "w": 5},
                {"id": null, "v": 6}
            ]}),
            ArrayMergeOption::ById,
        );

        assert_eq!(
            merged,
            json!({"documents": [
                {"id": "a", "v": 1},
                {"id": "c", "v": 3, "w": 5},
                {"v": 4},
                {"id": null, "v": 6}
            ]})
        );
    }

    #[test]
    fn by_id_matches_numeric_ids_by_value() {
        let merged = deep_merge(
            &json!({"items": [{"id": 1, "v": 0}, {"id": 2, "v": 0}]}),
            &json!({"items": [{"id": 1.0, "v": 1}]}),
            ArrayMergeOption::ById,
        );

        assert_eq!(merged["items"].as_array().map(Vec::len), Some(2));
        assert_eq!(merged["items"][0]["v"], json!(1));
        assert_eq!(merged["items"][1], json!({"id": 2, "v": 0}));
    }

    #[test]
    fn value_equality_ignores_number_representation() {
        assert!(json_values_equal(&json!(1), &json!(1.0)));
        assert!(json_values_equal(
            &json!({"a": [1, {"b": 2.0}]}),
            &json!({"a": [1.0, {"b": 2}]})
        ));
        assert!(!json_values_equal(&json!(1), &json!(1.5)));
        assert!(!json_values_equal(&json!(1), &json!("1")));
        assert!(!json_values_equal(&json!([1]), &json!([1, 1])));
    }

    #[test]
    fn by_id_recurses_into_nested_arrays() {
        let merged = deep_merge(
            &json!({"documents": [{"id": "a", "pages": [{"id": "p1", "ocr": false}]}]}),
            &json!({"documents": [{"id": "a", "pages": [{"id": "p1", "ocr": true}, {"id": "p2"}]}]}),
            ArrayMergeOption::ById,
        );

        assert_eq!(
            merged,
            json!({"documents": [{"id": "a", "pages": [{"id": "p1", "ocr": true}, {"id": "p2"}]}]})
        );
    }

    #[test]
    fn by_index_merges_positions_and_keeps_longer_tail() {
        let merged = deep_merge(
            &json!({"steps": [{"a": 1}, {"b": 2}, {"c": 3}]}),
            &json!({"steps": [{"a": 10}, "replaced"]}),
            ArrayMergeOption::ByIndex,
        );

        assert_eq!(
            merged,
            json!({"steps": [{"a": 10}, "replaced", {"c": 3}]})
        );
    }

    #[test]
    fn replace_overwrites_arrays() {
        let merged = deep_merge(
            &json!({"values": [1, 2], "keep": true}),
            &json!({"values": [3]}),
            ArrayMergeOption::Replace,
        );

        assert_eq!(merged, json!({"values": [3], "keep": true}));
    }

    #[test]
    fn null_patch_value_removes_key_and_nested_objects_merge() {
        let merged = deep_merge(
            &json!({"entity": {"name": "Acme", "country": "DE"}, "flag": true}),
            &json!({"entity": {"country": null, "vat": "123"}, "flag": null}),
            ArrayMergeOption::ById,
        );

        assert_eq!(merged, json!({"entity": {"name": "Acme", "vat": "123"}}));
    }

    #[test]
    fn new_keys_are_inserted_verbatim() {
        let merged = deep_merge(
            &json!({}),
            &json!({"pluginsOutput": {"result": null}}),
            ArrayMergeOption::ById,
        );

        assert_eq!(merged, json!({"pluginsOutput": {"result": null}}));
    }

    #[test]
    fn type_mismatch_takes_patch_value() {
        let merged = deep_merge(
            &json!({"value": {"nested": 1}, "list": [1]}),
            &json!({"value": [1], "list": {"a": 1}}),
            ArrayMergeOption::Concat,
        );

        assert_eq!(merged, json!({"value": [1], "list": {"a": 1}}));
    }

    #[test]
    fn null_patch_keeps_document() {
        let document = json!({"a": 1});
        assert_eq!(
            deep_merge(&document, &Value::Null, ArrayMergeOption::Replace),
            document
        );
    }

    #[test]
    fn merge_option_parses_storage_values() {
        for option in [
            ArrayMergeOption::ById,
            ArrayMergeOption::ByIndex,
            ArrayMergeOption::Concat,
            ArrayMergeOption::Replace,
        ] {
            assert_eq!(ArrayMergeOption::parse(option.as_str()).ok(), Some(option));
        }
        assert!(ArrayMergeOption::parse("append").is_err());
    }

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<bool>().prop_map(Value::from),
            any::<i32>().prop_map(Value::from),
            "[a-z]{0,6}".prop_map(Value::from),
        ]
    }

    fn document() -> impl Strategy<Value = Value> {
        leaf().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-d]", inner, 0..4)
                    .prop_map(|map| Value::Object(map.into_iter().collect())),
            ]
        })
    }

    fn object_document() -> impl Strategy<Value = Value> {
        prop::collection::btree_map("[a-d]", document(), 0..4)
            .prop_map(|map| Value::Object(map.into_iter().collect()))
    }

    proptest! {
        #[test]
        fn replace_is_idempotent(stored in object_document(), patch in object_document()) {
            let once = deep_merge(&stored, &patch, ArrayMergeOption::Replace);
            let twice = deep_merge(&once, &patch, ArrayMergeOption::Replace);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn concat_accumulates_array_lengths(
            stored in prop::collection::vec(leaf(), 0..6),
            patch in prop::collection::vec(leaf(), 0..6),
        ) {
            let expected = stored.len() + patch.len();
            let merged = deep_merge(
                &json!({"items": stored}),
                &json!({"items": patch}),
                ArrayMergeOption::Concat,
            );
            prop_assert_eq!(merged["items"].as_array().map(Vec::len), Some(expected));
        }

        #[test]
        fn by_id_preserves_untouched_elements(count in 1usize..6, touched in 0usize..6) {
            let stored: Vec<Value> = (0..count).map(|index| json!({"id": index, "v": 0})).collect();
            let merged = deep_merge(
                &json!({"items": stored}),
                &json!({"items": [{"id": touched, "v": 1}]}),
                ArrayMergeOption::ById,
            );
            let items = merged["items"].as_array().cloned().unwrap_or_default();

            prop_assert_eq!(items.len(), if touched < count { count } else { count + 1 });
            for (index, item) in items.iter().enumerate().take(count) {
                let expected = if index == touched { 1 } else { 0 };
                prop_assert_eq!(&item["v"], &json!(expected));
            }
        }

        #[test]
        fn keys_absent_from_patch_survive(stored in object_document(), patch in object_document()) {
            let merged = deep_merge(&stored, &patch, ArrayMergeOption::ById);
            let stored_keys = stored.as_object().cloned().unwrap_or_default();
            let patch_keys = patch.as_object().cloned().unwrap_or_default();

            for (key, value) in stored_keys {
                if !patch_keys.contains_key(&key) {
                    prop_assert_eq!(merged.get(&key), Some(&value));
                }
            }
        }
    }
}
