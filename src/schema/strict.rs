//! Strict-mode normalization of generated JSON Schemas.

use serde_json::{Map, Value};

use crate::error::AskflowError;

/// Keywords that carry no constraint strict mode understands.
const DROPPED_KEYWORDS: &[&str] = &["$schema", "$defs", "definitions", "default", "examples"];

/// Normalize `schema` for strict structured output.
///
/// `$ref`s are inlined, `oneOf` becomes `anyOf`, every object gets
/// `additionalProperties: false` and a `required` list naming all of its
/// properties. The root must be an object. Maps, untyped values, tuples and
/// recursive shapes are rejected.
pub fn to_strict(schema: Value) -> Result<Value, AskflowError> {
    let defs = schema
        .get("$defs")
        .or_else(|| schema.get("definitions"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let mut stack = vec!["#".to_string()];
    let strict = normalize(&schema, &defs, &mut stack)?;

    if !is_object_schema(&strict) {
        return Err(AskflowError::Schema(
            "the top-level output shape must be an object".into(),
        ));
    }
    Ok(strict)
}

fn normalize(
    schema: &Value,
    defs: &Map<String, Value>,
    stack: &mut Vec<String>,
) -> Result<Value, AskflowError> {
    let obj = match schema {
        Value::Object(obj) => obj,
        Value::Bool(_) => {
            return Err(AskflowError::Schema(
                "untyped values cannot be constrained".into(),
            ))
        }
        other => {
            return Err(AskflowError::Schema(format!(
                "unexpected schema node: {other}"
            )))
        }
    };

    if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
        return resolve_ref(reference, obj, defs, stack);
    }

    if let Some(all_of) = obj.get("allOf").and_then(Value::as_array) {
        if all_of.len() != 1 {
            return Err(AskflowError::Schema("allOf compositions are not supported".into()));
        }
        let mut merged = obj.clone();
        merged.remove("allOf");
        if let Value::Object(inner) = &all_of[0] {
            for (key, value) in inner {
                merged.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        return normalize(&Value::Object(merged), defs, stack);
    }

    if obj.contains_key("prefixItems") {
        return Err(AskflowError::Schema("tuples are not supported".into()));
    }

    let mut out = Map::new();
    for (key, value) in obj {
        match key.as_str() {
            k if DROPPED_KEYWORDS.contains(&k) => {}
            "format" if is_numeric_format(value) => {}
            "properties" => {
                let props = value.as_object().ok_or_else(|| {
                    AskflowError::Schema("properties must be an object".into())
                })?;
                let mut normalized = Map::new();
                for (name, prop) in props {
                    normalized.insert(name.clone(), normalize(prop, defs, stack)?);
                }
                out.insert(key.clone(), Value::Object(normalized));
            }
            "items" => {
                out.insert(key.clone(), normalize(value, defs, stack)?);
            }
            "anyOf" | "oneOf" => {
                let variants = value.as_array().ok_or_else(|| {
                    AskflowError::Schema(format!("{key} must be an array"))
                })?;
                let normalized = variants
                    .iter()
                    .map(|v| normalize(v, defs, stack))
                    .collect::<Result<Vec<_>, _>>()?;
                out.insert("anyOf".into(), Value::Array(normalized));
            }
            "additionalProperties" => {
                if value != &Value::Bool(false) {
                    return Err(AskflowError::Schema(
                        "maps with free-form keys are not supported".into(),
                    ));
                }
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }

    if is_object_schema(schema) {
        let required: Vec<Value> = out
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().cloned().map(Value::String).collect())
            .unwrap_or_default();
        out.entry("properties").or_insert_with(|| Value::Object(Map::new()));
        out.insert("required".into(), Value::Array(required));
        out.insert("additionalProperties".into(), Value::Bool(false));
    }

    Ok(Value::Object(out))
}

fn resolve_ref(
    reference: &str,
    node: &Map<String, Value>,
    defs: &Map<String, Value>,
    stack: &mut Vec<String>,
) -> Result<Value, AskflowError> {
    let name = reference.rsplit('/').next().unwrap_or(reference).to_string();
    if reference == "#" || stack.contains(&name) {
        return Err(AskflowError::Schema(format!(
            "recursive shape through '{name}' is not supported"
        )));
    }
    let target = defs
        .get(&name)
        .ok_or_else(|| AskflowError::Schema(format!("unresolved reference '{reference}'")))?;

    stack.push(name);
    let resolved = normalize(target, defs, stack);
    stack.pop();

    let mut resolved = resolved?;
    if let (Some(description), Value::Object(out)) = (node.get("description"), &mut resolved) {
        out.insert("description".into(), description.clone());
    }
    Ok(resolved)
}

fn is_object_schema(value: &Value) -> bool {
    match value.get("type") {
        Some(Value::String(t)) => t == "object",
        Some(Value::Array(types)) => types.iter().any(|t| t == "object"),
        _ => value.get("properties").is_some(),
    }
}

fn is_numeric_format(value: &Value) -> bool {
    value.as_str().is_some_and(|f| {
        f.starts_with("int") || f.starts_with("uint") || f == "float" || f == "double"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inlines_references_and_closes_objects() {
        let schema = json!({
            "type": "object",
            "properties": {
                "inner": { "$ref": "#/$defs/Inner", "description": "nested" }
            },
            "$defs": {
                "Inner": { "type": "object", "properties": { "x": { "type": "number" } } }
            }
        });

        let strict = to_strict(schema).unwrap();

        assert_eq!(strict["required"], json!(["inner"]));
        assert_eq!(strict["properties"]["inner"]["required"], json!(["x"]));
        assert_eq!(strict["properties"]["inner"]["additionalProperties"], false);
        assert_eq!(strict["properties"]["inner"]["description"], "nested");
    }

    #[test]
    fn one_of_becomes_any_of() {
        let schema = json!({
            "type": "object",
            "properties": {
                "v": { "oneOf": [{ "type": "string" }, { "type": "null" }] }
            }
        });

        let strict = to_strict(schema).unwrap();

        assert!(strict["properties"]["v"].get("oneOf").is_none());
        assert_eq!(strict["properties"]["v"]["anyOf"][1]["type"], "null");
    }

    #[test]
    fn rejects_untyped_property() {
        let schema = json!({ "type": "object", "properties": { "blob": true } });
        assert!(matches!(to_strict(schema), Err(AskflowError::Schema(_))));
    }

    #[test]
    fn keeps_explicit_closed_objects() {
        let schema = json!({
            "type": "object",
            "properties": { "a": { "type": "string" } },
            "additionalProperties": false
        });
        assert!(to_strict(schema).is_ok());
    }
}
