//! SOAP/XML to JSON normalization
//!
//! Responses of `soap` scenarios are converted to JSON text before field
//! extraction, so the same paths work for both kinds of service:
//!
//! - an element with only text becomes a string,
//! - attributes become `-name` keys,
//! - text next to attributes or child elements becomes `#content`,
//! - repeated sibling elements become an array.

use roxmltree::Document;
use serde_json::{Map, Value as JsonValue};

/// Convert an XML document to its JSON text form.
pub fn xml_to_json(xml: &str) -> Result<String, String> {
    let doc = Document::parse(xml).map_err(|e| format!("Failed to parse XML: {}", e))?;

    let root = doc.root_element();
    let mut document = Map::new();
    document.insert(root.tag_name().name().to_string(), element_to_value(root));

    serde_json::to_string(&JsonValue::Object(document))
        .map_err(|e| format!("Failed to serialize converted XML: {}", e))
}

fn element_to_value(node: roxmltree::Node) -> JsonValue {
    let mut map = Map::new();

    for attribute in node.attributes() {
        map.insert(
            format!("-{}", attribute.name()),
            JsonValue::String(attribute.value().to_string()),
        );
    }

    let mut text = String::new();
    for child in node.children() {
        if child.is_element() {
            let name = child.tag_name().name().to_string();
            let value = element_to_value(child);
            match map.get_mut(&name) {
                Some(JsonValue::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = JsonValue::Array(vec![first, value]);
                }
                None => {
                    map.insert(name, value);
                }
            }
        } else if child.is_text() {
            text.push_str(child.text().unwrap_or(""));
        }
    }

    let text = text.trim();
    if map.is_empty() {
        return JsonValue::String(text.to_string());
    }
    if !text.is_empty() {
        map.insert("#content".to_string(), JsonValue::String(text.to_string()));
    }
    JsonValue::Object(map)
}
