//! Best-effort recovery of a JSON object from free-form model output.

use serde_json::{Map, Value};

/// Parses `text` as a JSON object. If the whole text is not valid JSON, the
/// span between the first `{` and the last `}` is tried instead. Anything
/// that is not an object yields `None`.
pub fn salvage_object(text: &str) -> Option<Map<String, Value>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return match value {
            Value::Object(map) => Some(map),
            _ => None,
        };
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Like [`salvage_object`], but keeps unparseable text under a `raw` key.
pub fn salvage_or_raw(text: &str) -> Map<String, Value> {
    salvage_object(text).unwrap_or_else(|| {
        let mut map = Map::new();
        map.insert("raw".to_string(), Value::String(text.trim().to_string()));
        map
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_object() {
        let map = salvage_object(r#"{"fit_score": 70}"#).unwrap();
        assert_eq!(map["fit_score"], json!(70));
    }

    #[test]
    fn fenced_object_is_recovered() {
        let text = "Here you go:\n```json\n{\"a\": [1, 2], \"b\": \"ü\"}\n```\nThanks";
        let map = salvage_object(text).unwrap();
        assert_eq!(map["a"], json!([1, 2]));
        assert_eq!(map["b"], json!("ü"));
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(salvage_object("[1, 2, 3]").is_none());
        assert!(salvage_object("42").is_none());
    }

    #[test]
    fn garbage_falls_back_to_raw() {
        let map = salvage_or_raw("  no braces here ");
        assert_eq!(map.len(), 1);
        assert_eq!(map["raw"], json!("no braces here"));

        let map = salvage_or_raw("} backwards {");
        assert_eq!(map["raw"], json!("} backwards {"));
    }
}
