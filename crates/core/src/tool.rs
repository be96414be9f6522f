//! Tool types: capability descriptors, calls, and results.
//!
//! The catalog of capabilities is fixed at compile time (see `quill-tools`);
//! this module only defines the shapes that flow between the model, the
//! dispatcher, and each capability.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::provider::ToolDefinition;

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

/// One declared parameter of a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolParameter {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: &'static str,
    pub required: bool,
}

/// Immutable descriptor of a capability, defined once per tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// Declared parameters, in declaration order
    pub parameters: &'static [ToolParameter],
}

impl ToolSpec {
    /// JSON Schema object for the parameter list.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in self.parameters {
            properties.insert(
                param.name.to_string(),
                serde_json::json!({
                    "type": param.param_type.as_str(),
                    "description": param.description,
                }),
            );
            if param.required {
                required.push(Value::from(param.name));
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Convert this spec into the declaration sent to the model.
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A fully-formed request to execute a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Parsed arguments; empty when the raw text did not parse as an object
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    /// Build a call from the raw argument text accumulated off the stream.
    ///
    /// Malformed JSON (or JSON that is not an object) yields an empty
    /// argument set instead of an error.
    pub fn from_raw(id: impl Into<String>, name: impl Into<String>, raw_arguments: &str) -> Self {
        let name = name.into();
        let arguments = if raw_arguments.trim().is_empty() {
            Map::new()
        } else {
            match serde_json::from_str::<Value>(raw_arguments) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    warn!(tool = %name, kind = %json_kind(&other), "Tool arguments are not an object, using empty set");
                    Map::new()
                }
                Err(e) => {
                    warn!(tool = %name, error = %e, "Malformed tool arguments, using empty set");
                    Map::new()
                }
            }
        };
        Self {
            id: id.into(),
            name,
            arguments,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The result of a tool execution.
///
/// When `success` is false no key of `data` may be assumed present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub success: bool,

    /// Tool-specific payload
    pub data: Map<String, Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(data: Map<String, Value>) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn failure(data: Map<String, Value>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data,
            error: Some(error.into()),
        }
    }

    /// A non-empty string output such as `stdout`, only for successful results.
    pub fn output(&self, key: &str) -> Option<&str> {
        if !self.success {
            return None;
        }
        self.data
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Serialize into the content of a tool-result turn.
    ///
    /// Failed results carry their error message alongside the data so the
    /// model can see what went wrong.
    pub fn to_content(&self) -> String {
        let mut payload = self.data.clone();
        if !self.success
            && let Some(error) = &self.error
        {
            payload.insert("error".into(), Value::String(error.clone()));
        }
        Value::Object(payload).to_string()
    }
}

/// Build a JSON object from `key => value` pairs.
#[macro_export]
macro_rules! data {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = ::serde_json::Map::new();
        $( map.insert(::std::string::String::from($key), ::serde_json::json!($value)); )*
        map
    }};
}
