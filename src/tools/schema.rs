//! JSON Schema helpers for tool parameters.

use serde_json::{json, Map, Value};

/// Types that can describe their own parameters as a JSON Schema object.
///
/// Implement this by hand (usually with [`ParameterBuilder`]) for argument
/// structs you want to expose as tools.
pub trait ToolParameters {
    fn parameters_schema() -> Value;
}

/// The empty-but-valid object schema used when a tool takes no parameters.
pub fn empty_schema() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "required": [],
    })
}

/// Coerce an arbitrary value into something backends accept as a parameter schema.
///
/// Objects are kept, gaining `"type": "object"` when they carry `properties`
/// without a type. An object that still has no type, and anything else (null,
/// strings, arrays), becomes [`empty_schema`].
pub fn normalize_schema(schema: Value) -> Value {
    match schema {
        Value::Object(mut obj) => {
            if obj.is_empty() {
                return empty_schema();
            }
            if !obj.contains_key("type") && obj.contains_key("properties") {
                obj.insert("type".into(), Value::String("object".into()));
            }
            if !obj.contains_key("type") {
                tracing::debug!(schema = ?obj, "parameter schema has no type, using empty object schema");
                return empty_schema();
            }
            Value::Object(obj)
        }
        other => {
            tracing::debug!(schema = %other, "replacing unusable parameter schema with empty object schema");
            empty_schema()
        }
    }
}

/// Builder for object-shaped parameter schemas.
///
/// ```
/// use parley::tools::ParameterBuilder;
///
/// let schema = ParameterBuilder::object()
///     .string("city", "City name", true)
///     .string_enum("unit", "Temperature unit", &["c", "f"], false)
///     .build();
/// assert_eq!(schema["required"][0], "city");
/// ```
#[derive(Debug, Default)]
pub struct ParameterBuilder {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ParameterBuilder {
    /// Start an object schema with no properties.
    pub fn object() -> Self {
        Self::default()
    }

    pub fn string(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.property(name, json!({"type": "string", "description": description.into()}), required)
    }

    pub fn number(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.property(name, json!({"type": "number", "description": description.into()}), required)
    }

    pub fn integer(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.property(name, json!({"type": "integer", "description": description.into()}), required)
    }

    pub fn boolean(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.property(name, json!({"type": "boolean", "description": description.into()}), required)
    }

    /// Add a string property restricted to `values`.
    pub fn string_enum(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        values: &[&str],
        required: bool,
    ) -> Self {
        self.property(
            name,
            json!({"type": "string", "description": description.into(), "enum": values}),
            required,
        )
    }

    /// Add a property with a caller-supplied schema (arrays, nested objects).
    pub fn property(mut self, name: impl Into<String>, schema: Value, required: bool) -> Self {
        let name = name.into();
        if required && !self.required.contains(&name) {
            self.required.push(name.clone());
        }
        self.properties.insert(name, schema);
        self
    }

    pub fn build(self) -> Value {
        json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }
}
