//! Output-shape inference: turn a declared shape into a strict JSON Schema.
//!
//! Two ways to declare a shape:
//!
//! - derive [`schemars::JsonSchema`] on the output type and call
//!   [`OutputSchema::for_type`];
//! - describe it by hand with [`Shape`] and call [`OutputSchema::from_shape`].
//!
//! Either way the result is in strict mode: every object forbids undeclared
//! properties and lists every property under `required` (optional fields are
//! expressed as nullable types). Shapes strict mode cannot express, such as
//! free-form maps or untyped values, fail here, before any request is sent.

mod shape;
mod strict;

pub use shape::{Field, Shape};
pub use strict::to_strict;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::AskflowError;

/// Name the response-format constraint is registered under.
pub const DEFAULT_SCHEMA_NAME: &str = "json_schema_response";

/// A strict-mode schema ready to be attached as a response format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

impl OutputSchema {
    /// Infer the schema of a type deriving `JsonSchema`.
    pub fn for_type<T: JsonSchema>() -> Result<Self, AskflowError> {
        Ok(Self {
            name: DEFAULT_SCHEMA_NAME.to_string(),
            schema: infer_schema::<T>()?,
        })
    }

    /// Build the schema of a hand-declared shape.
    pub fn from_shape(shape: &Shape) -> Result<Self, AskflowError> {
        Ok(Self {
            name: DEFAULT_SCHEMA_NAME.to_string(),
            schema: to_strict(shape.to_json_schema())?,
        })
    }

    /// Override the registered schema name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Strict-mode JSON Schema for `T`.
pub fn infer_schema<T: JsonSchema>() -> Result<serde_json::Value, AskflowError> {
    let generated = schemars::schema_for!(T).to_value();
    to_strict(generated).map_err(|e| match e {
        AskflowError::Schema(message) => {
            AskflowError::Schema(format!("{}: {message}", T::schema_name()))
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Where a city is.
    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct Location {
        /// Country name.
        country: String,
        region: Option<String>,
    }

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct CityFacts {
        capital: String,
        population: u64,
        location: Location,
        landmarks: Vec<String>,
        neighbours: Vec<Location>,
    }

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct Tagged {
        tags: std::collections::HashMap<String, String>,
    }

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct Node {
        value: String,
        children: Vec<Node>,
    }

    #[test]
    fn infers_strict_object_with_nested_shapes() {
        let schema = infer_schema::<CityFacts>().unwrap();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(
            schema["required"],
            json!(["capital", "population", "location", "landmarks", "neighbours"])
        );
        assert_eq!(schema["properties"]["landmarks"]["items"]["type"], "string");

        let location = &schema["properties"]["location"];
        assert_eq!(location["type"], "object");
        assert_eq!(location["additionalProperties"], false);
        assert_eq!(location["required"], json!(["country", "region"]));
        assert_eq!(location["properties"]["country"]["description"], "Country name.");

        let neighbour = &schema["properties"]["neighbours"]["items"];
        assert_eq!(neighbour["additionalProperties"], false);
        assert!(schema.get("$defs").is_none());
    }

    #[test]
    fn drops_integer_format_annotations() {
        let schema = infer_schema::<CityFacts>().unwrap();
        assert!(schema["properties"]["population"].get("format").is_none());
    }

    #[test]
    fn map_fields_are_rejected_at_construction() {
        let err = infer_schema::<Tagged>().unwrap_err();
        assert!(matches!(err, AskflowError::Schema(ref m) if m.starts_with("Tagged")));
    }

    #[test]
    fn recursive_shapes_are_rejected() {
        let err = infer_schema::<Node>().unwrap_err();
        assert!(matches!(err, AskflowError::Schema(ref m) if m.contains("recursive")));
    }

    #[test]
    fn non_object_roots_are_rejected() {
        assert!(infer_schema::<Vec<String>>().is_err());
        assert!(infer_schema::<String>().is_err());
    }

    #[test]
    fn output_schema_uses_default_name() {
        let schema = OutputSchema::for_type::<Location>().unwrap();
        assert_eq!(schema.name, DEFAULT_SCHEMA_NAME);
        assert_eq!(schema.named("city").name, "city");
    }
}
