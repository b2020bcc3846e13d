//! Tool definitions handed to a backend alongside a request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema::{normalize_schema, ToolParameters};

/// Portable description of a function tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// JSON Schema object for the arguments.
    pub parameters: Value,
    /// Ask the backend for strict schema adherence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

impl FunctionDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: normalize_schema(parameters),
            strict: None,
        }
    }

    /// Build a definition whose schema comes from `P`.
    pub fn for_parameters<P: ToolParameters>(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(name, description, P::parameters_schema())
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    /// Recover a definition from any JSON tool shape we know about.
    ///
    /// Accepts the OpenAI envelope (`{"type":"function","function":{..}}`), a bare
    /// function object, or an Anthropic tool (`input_schema` instead of
    /// `parameters`). Returns `None` when no name can be found.
    fn from_json(value: &Value) -> Option<Self> {
        let body = value
            .get("function")
            .filter(|f| f.is_object())
            .unwrap_or(value);
        let name = body.get("name")?.as_str()?.trim();
        if name.is_empty() {
            return None;
        }
        let description = body
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let parameters = body
            .get("parameters")
            .or_else(|| body.get("input_schema"))
            .cloned()
            .unwrap_or(Value::Null);
        Some(Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: normalize_schema(parameters),
            strict: body.get("strict").and_then(Value::as_bool),
        })
    }
}

/// A tool the model may call.
///
/// A backend's own native shape is passed to that backend unchanged. Every
/// other shape goes through [`FunctionDefinition`], re-encoding via JSON when
/// needed, so a definition written for one backend still works on the other.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolDefinition {
    Function(FunctionDefinition),
    #[cfg(feature = "openai")]
    OpenAi(crate::provider::openai::ChatTool),
    #[cfg(feature = "anthropic")]
    Anthropic(crate::provider::anthropic::ToolParam),
    /// Arbitrary JSON, interpreted on a best-effort basis.
    Json(Value),
}

impl ToolDefinition {
    /// Shorthand for a portable function tool.
    pub fn function(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self::Function(FunctionDefinition::new(name, description, parameters))
    }

    /// Portable view of this definition, or `None` when it has no usable name.
    pub fn to_portable(&self) -> Option<FunctionDefinition> {
        let portable = match self {
            Self::Function(def) => Some(def.clone()).filter(|d| !d.name.trim().is_empty()),
            Self::Json(value) => FunctionDefinition::from_json(value),
            #[cfg(feature = "openai")]
            Self::OpenAi(tool) => Self::reencode(tool),
            #[cfg(feature = "anthropic")]
            Self::Anthropic(tool) => Self::reencode(tool),
        };
        if portable.is_none() {
            tracing::debug!("skipping tool definition without a name");
        }
        portable
    }

    #[cfg(any(feature = "openai", feature = "anthropic"))]
    fn reencode<T: Serialize>(native: &T) -> Option<FunctionDefinition> {
        match serde_json::to_value(native) {
            Ok(value) => FunctionDefinition::from_json(&value),
            Err(e) => {
                tracing::debug!(error = %e, "tool definition did not serialize");
                None
            }
        }
    }
}

impl From<FunctionDefinition> for ToolDefinition {
    fn from(def: FunctionDefinition) -> Self {
        Self::Function(def)
    }
}
