//! Hand-declared output shapes.

use serde_json::{json, Map, Value};

/// A declared output shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    String,
    Number,
    Integer,
    Boolean,
    /// One of a fixed set of strings.
    Enum(Vec<String>),
    List(Box<Shape>),
    Object(Vec<Field>),
}

/// A named field of an object shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub shape: Shape,
    pub description: Option<String>,
    pub required: bool,
}

impl Field {
    /// A required field.
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
            description: None,
            required: true,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Allow the model to answer `null` for this field.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

impl Shape {
    /// An empty object shape; add fields with [`Shape::field`].
    pub fn object() -> Self {
        Shape::Object(Vec::new())
    }

    pub fn list(item: Shape) -> Self {
        Shape::List(Box::new(item))
    }

    pub fn one_of(values: &[&str]) -> Self {
        Shape::Enum(values.iter().map(|v| v.to_string()).collect())
    }

    /// Builder: append a field to an object shape. No-op on other shapes.
    pub fn field(mut self, field: Field) -> Self {
        if let Shape::Object(fields) = &mut self {
            fields.push(field);
        }
        self
    }

    /// Plain JSON Schema for this shape, before strict normalization.
    pub fn to_json_schema(&self) -> Value {
        match self {
            Shape::String => json!({ "type": "string" }),
            Shape::Number => json!({ "type": "number" }),
            Shape::Integer => json!({ "type": "integer" }),
            Shape::Boolean => json!({ "type": "boolean" }),
            Shape::Enum(values) => json!({ "type": "string", "enum": values }),
            Shape::List(item) => json!({ "type": "array", "items": item.to_json_schema() }),
            Shape::Object(fields) => {
                let mut properties = Map::new();
                let mut required = Vec::new();
                for field in fields {
                    let mut schema = field.shape.to_json_schema();
                    if !field.required {
                        make_nullable(&mut schema);
                    }
                    if let (Some(description), Value::Object(obj)) =
                        (&field.description, &mut schema)
                    {
                        obj.insert("description".into(), Value::String(description.clone()));
                    }
                    properties.insert(field.name.clone(), schema);
                    required.push(field.name.clone());
                }
                json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                })
            }
        }
    }
}

fn make_nullable(schema: &mut Value) {
    if let Some(Value::String(kind)) = schema.get("type").cloned() {
        schema["type"] = json!([kind, "null"]);
    }
    if let Some(Value::Array(values)) = schema.get_mut("enum") {
        values.push(Value::Null);
    }
}
