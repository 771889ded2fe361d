//! Response-shaping pipeline (C2, spec §4.2).
//!
//! Input is arbitrary JSON (`serde_json::Value`); there is no bespoke sum
//! type here — design note §9 says to reuse the JSON library's, not model
//! a parallel one. Pipeline stages pattern-match on `Value` directly.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// A collection extractor: either a single field (joined with ", ") or a
/// list of fields (array kept, each element trimmed to those fields).
#[derive(Debug, Clone)]
pub enum Extractor {
    Single(String),
    Multi(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct ShapeConfig {
    pub max_flatten_depth: usize,
    pub preserved_fields: std::collections::HashSet<String>,
    pub collection_extractors: HashMap<String, Extractor>,
    pub fill_rate_threshold: f64,
    pub min_fill_rate_rows: usize,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            max_flatten_depth: 2,
            preserved_fields: Default::default(),
            collection_extractors: Default::default(),
            fill_rate_threshold: 0.10,
            min_fill_rate_rows: 5,
        }
    }
}

/// Shape a list response. Always returns `Value::Array`, even for an
/// empty or conceptually-absent input list (§8 boundary case: nil never
/// serializes to `null`).
pub fn shape_list(items: Vec<Value>, cfg: &ShapeConfig) -> Value {
    let mut shaped: Vec<Map<String, Value>> = items
        .into_iter()
        .map(|item| shape_item(item, cfg))
        .collect();

    if shaped.len() >= cfg.min_fill_rate_rows {
        drop_rare_keys(&mut shaped, cfg);
    }

    Value::Array(shaped.into_iter().map(Value::Object).collect())
}

/// Shape a single item through flatten -> strip-urls -> drop-zero ->
/// normalize-whitespace -> summarize-collections, in that order (§4.2).
/// The zero-value check runs on the pre-normalize, pre-summarize value, so
/// an all-whitespace string (not empty, so not zero) survives step 3 and
/// is only blanked by step 4's normalization, and a collection whose
/// single-field join happens to be empty is never zero-checked at all
/// (step 5 runs after).
fn shape_item(item: Value, cfg: &ShapeConfig) -> Map<String, Value> {
    let flattened = flatten(item, cfg.max_flatten_depth, "", &cfg.preserved_fields);
    let mut out = Map::new();
    for (key, value) in flattened {
        if is_stripped_url_key(&key) && !cfg.preserved_fields.contains(&key) {
            continue;
        }
        let preserved = cfg.preserved_fields.contains(&key);
        if !preserved && is_zero_value(&value) {
            continue;
        }
        let value = normalize_whitespace_deep(value);
        let value = summarize_if_collection(&key, value, cfg);
        out.insert(key, value);
    }
    out
}

/// Flatten nested objects up to `max_depth`, promoting primitive fields to
/// the parent using dot-notation. Arrays nested under a path keep their
/// dotted key. Objects beyond `max_depth` are dropped unless their full
/// dotted path is in `preserved`.
fn flatten(
    value: Value,
    max_depth: usize,
    prefix: &str,
    preserved: &std::collections::HashSet<String>,
) -> Vec<(String, Value)> {
    match value {
        Value::Object(map) => {
            let mut out = Vec::new();
            for (key, v) in map {
                let dotted = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                match v {
                    Value::Object(_) if max_depth == 0 => {
                        if preserved.contains(&dotted) {
                            out.push((dotted, v));
                        }
                        // else: dropped, per §4.2 step 1.
                    }
                    Value::Object(_) => {
                        out.extend(flatten(v, max_depth - 1, &dotted, preserved));
                    }
                    other => out.push((dotted, other)),
                }
            }
            out
        }
        other => vec![(prefix.to_string(), other)],
    }
}

fn is_stripped_url_key(key: &str) -> bool {
    let leaf = key.rsplit('.').next().unwrap_or(key);
    leaf == "url" || leaf.ends_with("_url")
}

fn is_zero_value(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// Collapse any run of whitespace in string values to a single space.
/// Applies recursively so it also reaches values kept inside a
/// multi-field extractor's trimmed array elements.
fn normalize_whitespace_deep(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(normalize_whitespace(&s)),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(normalize_whitespace_deep).collect())
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize_whitespace_deep(v)))
                .collect(),
        ),
        other => other,
    }
}

fn normalize_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

fn summarize_if_collection(key: &str, value: Value, cfg: &ShapeConfig) -> Value {
    let Value::Array(items) = value else {
        return value;
    };
    match cfg.collection_extractors.get(key) {
        None => Value::String(format!("[{} items]", items.len())),
        Some(Extractor::Single(field)) => {
            let joined = items
                .iter()
                .filter_map(|item| item.get(field))
                .map(value_to_display_string)
                .collect::<Vec<_>>()
                .join(", ");
            Value::String(joined)
        }
        Some(Extractor::Multi(fields)) => {
            let trimmed = items
                .into_iter()
                .map(|item| {
                    let mut obj = Map::new();
                    for field in fields {
                        if let Some(v) = item.get(field) {
                            obj.insert(field.clone(), v.clone());
                        }
                    }
                    Value::Object(obj)
                })
                .collect();
            Value::Array(trimmed)
        }
    }
}

fn value_to_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Across items, drop keys whose fill rate (fraction of rows where the
/// key is present, post zero-value-removal) is at or below the
/// threshold. Preserved keys and extractor keys are exempt.
fn drop_rare_keys(items: &mut [Map<String, Value>], cfg: &ShapeConfig) {
    let n = items.len() as f64;
    let mut counts: HashMap<String, usize> = HashMap::new();
    for item in items.iter() {
        for key in item.keys() {
            *counts.entry(key.clone()).or_insert(0) += 1;
        }
    }
    let rare: std::collections::HashSet<String> = counts
        .into_iter()
        .filter(|(key, count)| {
            if cfg.preserved_fields.contains(key) || cfg.collection_extractors.contains_key(key) {
                return false;
            }
            (*count as f64 / n) <= cfg.fill_rate_threshold
        })
        .map(|(key, _)| key)
        .collect();

    if rare.is_empty() {
        return;
    }
    for item in items.iter_mut() {
        for key in &rare {
            item.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cfg() -> ShapeConfig {
        ShapeConfig {
            preserved_fields: ["html_url".to_string()].into(),
            collection_extractors: HashMap::from([(
                "labels".to_string(),
                Extractor::Single("name".to_string()),
            )]),
            ..Default::default()
        }
    }

    fn issue(i: usize) -> Value {
        json!({
            "title": format!("issue {i}"),
            "url": "https://api.github.com/repos/o/r/issues/1",
            "html_url": "https://github.com/o/r/issues/1",
            "user": {"login": "alice", "avatar_url": "https://x/y.png"},
            "labels": [{"name": "bug", "color": "f00"}],
            "body": "foo\n\nbar",
            "closed_at": null,
            "comments": 0,
        })
    }

    #[test]
    fn shapes_issue_list_per_spec_scenario_6() {
        let items: Vec<Value> = (0..10).map(issue).collect();
        let shaped = shape_list(items, &cfg());
        let Value::Array(rows) = shaped else {
            panic!("expected array")
        };
        assert_eq!(rows.len(), 10);
        for row in &rows {
            let obj = row.as_object().unwrap();
            assert!(!obj.contains_key("url"));
            assert!(!obj.contains_key("user.avatar_url"));
            assert!(!obj.contains_key("closed_at"));
            assert!(!obj.contains_key("comments"));
            assert_eq!(obj["body"], json!("foo bar"));
            assert_eq!(obj["html_url"], json!("https://github.com/o/r/issues/1"));
            assert_eq!(obj["user.login"], json!("alice"));
            assert_eq!(obj["labels"], json!("bug"));
        }
    }

    #[test]
    fn idempotent() {
        let items: Vec<Value> = (0..6).map(issue).collect();
        let cfg = cfg();
        let once = shape_list(items, &cfg);
        let Value::Array(arr) = once.clone() else {
            panic!()
        };
        let twice = shape_list(arr, &cfg);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_list_is_array_not_null() {
        let shaped = shape_list(vec![], &ShapeConfig::default());
        assert_eq!(shaped, json!([]));
        assert!(shaped.is_array());
        assert_ne!(shaped, Value::Null);
    }

    #[test]
    fn flatten_depth_drops_beyond_limit_unless_preserved() {
        let value = json!({"a": {"b": {"c": 1}}});
        let cfg = ShapeConfig {
            max_flatten_depth: 1,
            ..Default::default()
        };
        let item = shape_item(value, &cfg);
        assert!(!item.contains_key("a.b.c"));
        assert!(!item.contains_key("a.b"));
    }

    #[test]
    fn flatten_depth_keeps_preserved_nested_path() {
        let value = json!({"a": {"b": {"c": 1}}});
        let cfg = ShapeConfig {
            max_flatten_depth: 1,
            preserved_fields: ["a.b".to_string()].into(),
            ..Default::default()
        };
        let item = shape_item(value, &cfg);
        assert_eq!(item.get("a.b"), Some(&json!({"c": 1})));
    }

    #[test]
    fn fill_rate_drops_rare_keys_above_min_rows() {
        let mut items = vec![json!({"title": "a", "rare": "x"})];
        for i in 1..10 {
            items.push(json!({"title": format!("t{i}")}));
        }
        let shaped = shape_list(items, &ShapeConfig::default());
        let Value::Array(rows) = shaped else { panic!() };
        assert!(!rows[0].as_object().unwrap().contains_key("rare"));
    }

    #[test]
    fn fill_rate_exempts_preserved_and_extractor_keys() {
        let mut items = vec![json!({"title": "a", "html_url": "https://x"})];
        for i in 1..10 {
            items.push(json!({"title": format!("t{i}")}));
        }
        let shaped = shape_list(items, &cfg());
        let Value::Array(rows) = shaped else { panic!() };
        assert!(rows[0].as_object().unwrap().contains_key("html_url"));
    }

    #[test]
    fn all_whitespace_string_survives_drop_zero_then_blanks_on_normalize() {
        // §4.2 pipeline order: drop-zero (3) sees the raw, non-empty
        // whitespace string and keeps it; normalize-whitespace (4) then
        // collapses it to "", which is retained (not re-checked for zero).
        let value = json!({"note": "  \n "});
        let item = shape_item(value, &ShapeConfig::default());
        assert_eq!(item.get("note"), Some(&json!("")));
    }

    #[test]
    fn single_extractor_empty_join_is_retained() {
        let cfg = ShapeConfig {
            collection_extractors: HashMap::from([(
                "labels".to_string(),
                Extractor::Single("missing_field".to_string()),
            )]),
            ..Default::default()
        };
        let value = json!({"labels": [{"name": "bug"}]});
        let item = shape_item(value, &cfg);
        // The join over a field none of the elements have is "", but since
        // drop-zero (3) ran before summarize-collections (5), the array
        // itself was never zero and the resulting "" survives.
        assert_eq!(item.get("labels"), Some(&json!("")));
    }

    #[test]
    fn multi_field_extractor_keeps_array_trimmed() {
        let cfg = ShapeConfig {
            collection_extractors: HashMap::from([(
                "labels".to_string(),
                Extractor::Multi(vec!["name".to_string()]),
            )]),
            ..Default::default()
        };
        let value = json!({"labels": [{"name": "bug", "color": "f00"}]});
        let item = shape_item(value, &cfg);
        assert_eq!(item["labels"], json!([{"name": "bug"}]));
    }
}
