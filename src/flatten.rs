use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RailyardError;

pub const MAX_FLATTEN_DEPTH: usize = 64;

/// One `dotted.path = value` row of a flattened manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRow {
    pub key: String,
    pub value: String,
}

impl FieldRow {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Flattens a JSON value into rows, depth first in key order. Arrays are kept
/// whole as one JSON-encoded row.
pub fn flatten(value: &Value, prefix: &str) -> Result<Vec<FieldRow>, RailyardError> {
    let mut rows = Vec::new();
    flatten_into(value, prefix, 0, &mut rows)?;
    Ok(rows)
}

fn flatten_into(
    value: &Value,
    prefix: &str,
    depth: usize,
    rows: &mut Vec<FieldRow>,
) -> Result<(), RailyardError> {
    if depth > MAX_FLATTEN_DEPTH {
        return Err(RailyardError::FlattenDepth(MAX_FLATTEN_DEPTH));
    }

    let Value::Object(map) = value else {
        let key = if prefix.is_empty() { "value" } else { prefix };
        rows.push(FieldRow::new(key, display_value(value)));
        return Ok(());
    };

    for (key, child) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match child {
            Value::Object(_) => flatten_into(child, &path, depth + 1, rows)?,
            _ => rows.push(FieldRow::new(path, display_value(child))),
        }
    }
    Ok(())
}

/// String form used in field rows: strings unquoted, everything else as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn nested_objects_use_dotted_paths_in_key_order() {
        let manifest = json!({
            "name": "Alpha City",
            "meta": { "zoom": 12, "center": { "lat": 1.5, "lng": null } },
            "tags": ["us", "coastal"],
            "after": true
        });

        let rows = flatten(&manifest, "").unwrap();
        let keys = rows.iter().map(|row| row.key.as_str()).collect::<Vec<_>>();
        assert_eq!(
            keys,
            [
                "name",
                "meta.zoom",
                "meta.center.lat",
                "meta.center.lng",
                "tags",
                "after"
            ]
        );
        assert_eq!(rows[3].value, "null");
        assert_eq!(rows[4].value, r#"["us","coastal"]"#);
        assert_eq!(rows[5].value, "true");
    }

    #[test]
    fn scalars_produce_a_single_row() {
        let rows = flatten(&json!("plain text"), "").unwrap();
        assert_eq!(rows, vec![FieldRow::new("value", "plain text")]);

        let again = flatten(&Value::String(rows[0].value.clone()), "").unwrap();
        assert_eq!(again, rows);

        let prefixed = flatten(&json!(42), "population").unwrap();
        assert_eq!(prefixed, vec![FieldRow::new("population", "42")]);
    }

    #[test]
    fn empty_nested_objects_contribute_nothing() {
        let rows = flatten(&json!({ "a": {}, "b": 1 }), "").unwrap();
        assert_eq!(rows, vec![FieldRow::new("b", "1")]);
    }

    #[test]
    fn pathological_depth_is_an_error() {
        let mut value = json!("leaf");
        for _ in 0..(MAX_FLATTEN_DEPTH + 2) {
            value = json!({ "n": value });
        }
        let err = flatten(&value, "").unwrap_err();
        assert!(matches!(err, RailyardError::FlattenDepth(_)));
    }
}
