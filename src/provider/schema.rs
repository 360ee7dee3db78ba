use serde_json::{Map, Value};

/// JSON-Schema keywords the Gemini function-declaration validator rejects.
const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "$schema",
    "additionalProperties",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "propertyNames",
];

/// Strip unsupported keywords from a tool parameter schema.
///
/// Recurses through `properties`, `items` and the `allOf`/`anyOf`/`oneOf`
/// combinators. Anything that is not an object is returned untouched.
#[must_use]
pub fn sanitize_for_gemini(mut schema: Value) -> Value {
    if let Value::Object(obj) = &mut schema {
        sanitize_object(obj);
    }
    schema
}

fn sanitize_object(obj: &mut Map<String, Value>) {
    for keyword in UNSUPPORTED_KEYWORDS {
        obj.remove(*keyword);
    }

    if let Some(Value::Object(properties)) = obj.get_mut("properties") {
        for property in properties.values_mut() {
            if let Value::Object(inner) = property {
                sanitize_object(inner);
            }
        }
    }
    if let Some(Value::Object(items)) = obj.get_mut("items") {
        sanitize_object(items);
    }
    for combinator in ["allOf", "anyOf", "oneOf"] {
        if let Some(Value::Array(variants)) = obj.get_mut(combinator) {
            for variant in variants {
                if let Value::Object(inner) = variant {
                    sanitize_object(inner);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strips_nested_keywords() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "path": {"type": "string", "propertyNames": {"pattern": "x"}},
                "limit": {"type": "number", "exclusiveMinimum": 0, "exclusiveMaximum": 10},
                "tags": {"type": "array", "items": {"type": "object", "additionalProperties": true}},
                "mode": {"anyOf": [{"type": "string", "additionalProperties": false}, {"type": "null"}]}
            },
            "required": ["path"]
        });
        assert_eq!(
            sanitize_for_gemini(schema),
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string"},
                    "limit": {"type": "number"},
                    "tags": {"type": "array", "items": {"type": "object"}},
                    "mode": {"anyOf": [{"type": "string"}, {"type": "null"}]}
                },
                "required": ["path"]
            })
        );
    }

    #[test]
    fn test_property_named_like_a_keyword_survives() {
        // Keys under `properties` are user field names, not keywords.
        let schema = json!({"type": "object", "properties": {"additionalProperties": {"type": "string"}}});
        assert_eq!(sanitize_for_gemini(schema.clone()), schema);
    }

    #[test]
    fn test_non_object_passes_through() {
        assert_eq!(sanitize_for_gemini(json!(true)), json!(true));
    }
}
