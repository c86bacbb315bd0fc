//! Merge policy for free-form provider metadata.

use serde_json::{Map, Value};

/// Merge an incoming metadata map into an existing one, first-key-wins.
///
/// Keys already present in `existing` are never overwritten; incoming keys
/// only fill gaps. This is the in-process mirror of the JSONB expression
/// `EXCLUDED.metadata || <table>.metadata` used by the SQL upserts (the
/// right-hand operand of `||` wins on key conflict).
#[must_use]
pub fn merge_metadata(existing: &Map<String, Value>, incoming: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = existing.clone();
    for (key, value) in incoming {
        merged.entry(key.clone()).or_insert_with(|| value.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: serde_json::Value) -> Map<String, Value> {
        value.as_object().cloned().expect("expected a JSON object")
    }

    #[test]
    fn incoming_fills_missing_keys() {
        let existing = map(json!({"a": 1}));
        let incoming = map(json!({"b": 2}));
        let merged = merge_metadata(&existing, &incoming);
        assert_eq!(merged.get("a"), Some(&json!(1)));
        assert_eq!(merged.get("b"), Some(&json!(2)));
    }

    #[test]
    fn existing_keys_win_over_incoming() {
        let existing = map(json!({"caption": "original"}));
        let incoming = map(json!({"caption": "later sighting"}));
        let merged = merge_metadata(&existing, &incoming);
        assert_eq!(merged.get("caption"), Some(&json!("original")));
    }

    #[test]
    fn existing_null_value_still_wins() {
        // A key explicitly set to null counts as present.
        let existing = map(json!({"alt_text": null}));
        let incoming = map(json!({"alt_text": "a shoe"}));
        let merged = merge_metadata(&existing, &incoming);
        assert_eq!(merged.get("alt_text"), Some(&Value::Null));
    }

    #[test]
    fn empty_incoming_is_identity() {
        let existing = map(json!({"a": 1, "b": [1, 2]}));
        let merged = merge_metadata(&existing, &Map::new());
        assert_eq!(Value::Object(merged), json!({"a": 1, "b": [1, 2]}));
    }

    #[test]
    fn empty_existing_takes_all_incoming() {
        let incoming = map(json!({"a": 1}));
        let merged = merge_metadata(&Map::new(), &incoming);
        assert_eq!(Value::Object(merged), json!({"a": 1}));
    }
}
