//! Validate tool call arguments against a strict JSON Schema before decoding.

use serde_json::Value;

/// Validate tool arguments against a JSON Schema.
///
/// Walks nested objects and arrays: schema type check (including nullable
/// `["T", "null"]` unions), enum membership, required field presence and,
/// where `additionalProperties` is `false`, unknown fields. Returns
/// `Err(message)` describing the first violation found.
pub fn validate_arguments(args: &Value, schema: &Value) -> Result<(), String> {
    validate_at("", args, schema)
}

fn validate_at(path: &str, value: &Value, schema: &Value) -> Result<(), String> {
    if let Some(any_of) = schema.get("anyOf").and_then(|v| v.as_array()) {
        return if any_of.iter().any(|s| validate_at(path, value, s).is_ok()) {
            Ok(())
        } else {
            Err(format!("{} matches none of the allowed shapes", describe(path)))
        };
    }

    if let Some(expected) = schema.get("type") {
        if !type_matches(value, expected) {
            return Err(format!(
                "{} expected type '{}', got {}",
                describe(path),
                type_label(expected),
                json_type_name(value)
            ));
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(|v| v.as_array()) {
        if !allowed.contains(value) {
            return Err(format!("{} is not one of the allowed values", describe(path)));
        }
    }

    match value {
        Value::Object(obj) => {
            if let Some(required) = schema.get("required").and_then(|v| v.as_array()) {
                for name in required.iter().filter_map(|f| f.as_str()) {
                    if !obj.contains_key(name) {
                        return Err(format!("missing required field '{}'", join(path, name)));
                    }
                }
            }

            let properties = schema.get("properties").and_then(|v| v.as_object());
            let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));
            for (key, field) in obj {
                match properties.and_then(|p| p.get(key)) {
                    Some(field_schema) => validate_at(&join(path, key), field, field_schema)?,
                    None if closed => {
                        return Err(format!("unknown field '{}'", join(path, key)));
                    }
                    None => {}
                }
            }
        }
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for (i, item) in items.iter().enumerate() {
                    validate_at(&format!("{path}[{i}]"), item, item_schema)?;
                }
            }
        }
        _ => {}
    }

    Ok(())
}

fn type_matches(value: &Value, expected: &Value) -> bool {
    match expected {
        Value::String(t) => value_matches_type(value, t),
        Value::Array(types) => types
            .iter()
            .filter_map(|t| t.as_str())
            .any(|t| value_matches_type(value, t)),
        _ => true,
    }
}

fn value_matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_label(expected: &Value) -> String {
    match expected {
        Value::String(t) => t.clone(),
        Value::Array(types) => types
            .iter()
            .filter_map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join("|"),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn describe(path: &str) -> String {
    if path.is_empty() {
        "arguments".to_string()
    } else {
        format!("field '{path}'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "country": { "type": "string" },
                "limit": { "type": ["integer", "null"] },
                "unit": { "type": "string", "enum": ["km", "mi"] },
                "tags": { "type": "array", "items": { "type": "string" } },
                "origin": {
                    "type": "object",
                    "properties": { "lat": { "type": "number" } },
                    "required": ["lat"],
                    "additionalProperties": false
                }
            },
            "required": ["country", "limit", "unit", "tags", "origin"],
            "additionalProperties": false
        })
    }

    fn valid() -> Value {
        json!({
            "country": "France",
            "limit": null,
            "unit": "km",
            "tags": ["a"],
            "origin": { "lat": 1.5 }
        })
    }

    #[test]
    fn accepts_valid_args() {
        assert_eq!(validate_arguments(&valid(), &schema()), Ok(()));
    }

    #[test]
    fn rejects_non_object_args_when_schema_expects_object() {
        let err = validate_arguments(&json!("not an object"), &schema()).unwrap_err();
        assert!(err.contains("expected type 'object'"));
    }

    #[test]
    fn rejects_missing_required_field() {
        let mut args = valid();
        args.as_object_mut().unwrap().remove("country");

        let err = validate_arguments(&args, &schema()).unwrap_err();
        assert!(err.contains("missing required field 'country'"));
    }

    #[test]
    fn rejects_unknown_field_in_closed_object() {
        let mut args = valid();
        args["origin"]["lon"] = json!(2.0);

        let err = validate_arguments(&args, &schema()).unwrap_err();
        assert!(err.contains("unknown field 'origin.lon'"));
    }

    #[test]
    fn rejects_field_with_wrong_type() {
        let mut args = valid();
        args["limit"] = json!("ten");

        let err = validate_arguments(&args, &schema()).unwrap_err();
        assert!(err.contains("field 'limit'"));
        assert!(err.contains("expected type 'integer|null'"));
    }

    #[test]
    fn rejects_value_outside_enum_and_bad_array_item() {
        let mut args = valid();
        args["unit"] = json!("yards");
        assert!(validate_arguments(&args, &schema()).is_err());

        let mut args = valid();
        args["tags"] = json!(["a", 1]);
        let err = validate_arguments(&args, &schema()).unwrap_err();
        assert!(err.contains("tags[1]"));
    }

    #[test]
    fn open_objects_accept_extra_fields() {
        let schema = json!({
            "type": "object",
            "properties": { "path": { "type": "string" } },
            "required": ["path"],
        });
        let args = json!({ "path": "test.txt", "extra": true });

        assert!(validate_arguments(&args, &schema).is_ok());
    }
}
