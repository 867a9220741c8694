//! Value extraction from JSON response bodies
//!
//! Paths are accepted either in dotted form (`data.items.0.id`) or as
//! `$`-rooted JSONPath expressions. Dotted paths are translated to JSONPath
//! before querying.

use jsonpath_rust::JsonPathQuery;
use serde_json::Value as JsonValue;

/// Translate a dotted path into a JSONPath expression.
///
/// Numeric segments become array indexes; keys that are not plain
/// identifiers are quoted.
pub fn to_json_path(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('$') {
        return path.to_string();
    }

    let mut json_path = String::from("$");
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        if segment.chars().all(|c| c.is_ascii_digit()) {
            json_path.push_str(&format!("[{}]", segment));
        } else if is_identifier(segment) {
            json_path.push('.');
            json_path.push_str(segment);
        } else {
            json_path.push_str(&format!("['{}']", segment.replace('\'', "\\'")));
        }
    }
    json_path
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Query `json` with `path`, unwrapping single-element result sets.
pub fn query(json: &JsonValue, path: &str) -> Option<JsonValue> {
    let json_path = to_json_path(path);
    match json.clone().path(&json_path) {
        Ok(JsonValue::Array(mut found)) => match found.len() {
            0 => None,
            1 => found.pop(),
            _ => Some(JsonValue::Array(found)),
        },
        Ok(JsonValue::Null) => None,
        Ok(value) => Some(value),
        Err(e) => {
            log::debug!("JSONPath query '{}' failed: {}", json_path, e);
            None
        }
    }
}

/// Extract the value at `path` from a JSON body as text.
///
/// Strings come back raw, numbers/booleans/objects/arrays as JSON text,
/// and a missing value, a null or an unparsable body as the empty string.
pub fn extract_text(body: &str, path: &str) -> String {
    let json: JsonValue = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(e) => {
            log::debug!("Response body is not JSON, nothing to extract: {}", e);
            return String::new();
        }
    };

    match query(&json, path) {
        Some(JsonValue::String(s)) => s,
        Some(JsonValue::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_json_path() {
        assert_eq!(to_json_path("data.id"), "$.data.id");
        assert_eq!(to_json_path("items.0.name"), "$.items[0].name");
        assert_eq!(to_json_path("$.data.id"), "$.data.id");
        assert_eq!(to_json_path("data.x-y"), "$.data['x-y']");
        assert_eq!(to_json_path("data.first name"), "$.data['first name']");
    }

    #[test]
    fn test_extract_text_variants() {
        let body = json!({
            "data": {
                "id": "abc",
                "count": 3,
                "active": true,
                "missing": null,
                "items": [{"name": "first"}, {"name": "second"}]
            }
        })
        .to_string();

        assert_eq!(extract_text(&body, "data.id"), "abc");
        assert_eq!(extract_text(&body, "data.count"), "3");
        assert_eq!(extract_text(&body, "data.active"), "true");
        assert_eq!(extract_text(&body, "data.missing"), "");
        assert_eq!(extract_text(&body, "data.unknown"), "");
        assert_eq!(extract_text(&body, "data.items.1.name"), "second");
    }

    #[test]
    fn test_extract_text_from_non_json_body() {
        assert_eq!(extract_text("<html></html>", "data.id"), "");
    }
}
