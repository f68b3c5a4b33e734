//! Tool System
//!
//! Descriptors for the tools providers expose, the request/result pair that
//! flows through dispatch, and schema validation of call arguments.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentError, Result};

/// Structured call arguments
pub type Arguments = serde_json::Map<String, Value>;

/// Separator between provider namespace and tool name
pub const NAMESPACE_SEPARATOR: char = '.';

/// Build the catalog key for a provider's tool
pub fn qualified_name(provider_id: &str, tool_name: &str) -> String {
    format!("{provider_id}{NAMESPACE_SEPARATOR}{tool_name}")
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, integer, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Default value if not provided
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Enum of allowed values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl ParameterSchema {
    pub fn required(name: impl Into<String>, param_type: &str, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
            default: None,
            enum_values: None,
        }
    }

    pub fn optional(name: impl Into<String>, param_type: &str, description: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn accepts(&self, value: &Value) -> bool {
        match self.param_type.as_str() {
            "string" => value.is_string(),
            "number" => value.is_number(),
            "integer" => value.is_i64() || value.is_u64(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            _ => true,
        }
    }
}

/// A tool as advertised by its provider, before namespacing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name, unique within the provider
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    #[serde(default)]
    pub parameters: Vec<ParameterSchema>,

    /// Arguments substituted when the model's proposal cannot be parsed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_arguments: Option<Arguments>,

    /// Example argument objects, rendered into the model prompt
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Value>,
}

/// A catalog entry: a provider's tool under its namespaced name
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// `provider_id.tool_name`
    pub name: String,

    /// Name the provider knows the tool by
    pub tool_name: String,

    /// Owning provider
    pub provider_id: String,

    pub description: String,

    pub parameters: Vec<ParameterSchema>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_arguments: Option<Arguments>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Value>,
}

impl ToolDescriptor {
    /// Namespace a provider's tool spec
    pub fn from_spec(provider_id: &str, spec: ToolSpec) -> Self {
        Self {
            name: qualified_name(provider_id, &spec.name),
            tool_name: spec.name,
            provider_id: provider_id.to_string(),
            description: spec.description,
            parameters: spec.parameters,
            default_arguments: spec.default_arguments,
            examples: spec.examples,
        }
    }

    /// Names of required parameters
    pub fn required_parameters(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
    }

    /// Check arguments against the parameter schema.
    ///
    /// Required keys must be present; supplied keys must match their declared
    /// JSON type and allowed values. Unknown keys pass through.
    pub fn validate(&self, arguments: &Arguments) -> Result<()> {
        for param in &self.parameters {
            let Some(value) = arguments.get(&param.name) else {
                if param.required {
                    return Err(self.invalid(format!("missing required parameter '{}'", param.name)));
                }
                continue;
            };

            if value.is_null() && !param.required {
                continue;
            }

            if !param.accepts(value) {
                return Err(self.invalid(format!(
                    "parameter '{}' must be of type {}",
                    param.name, param.param_type
                )));
            }

            if let Some(allowed) = &param.enum_values {
                if !allowed.contains(value) {
                    return Err(self.invalid(format!(
                        "parameter '{}' must be one of {}",
                        param.name,
                        Value::Array(allowed.clone())
                    )));
                }
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: String) -> AgentError {
        AgentError::ArgumentValidation {
            tool: self.name.clone(),
            reason,
        }
    }
}

/// A validated call ready for dispatch
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Call ID for tracking
    pub id: String,

    /// Tool identifier
    pub name: String,

    /// Structured arguments
    pub arguments: Arguments,

    /// Sequence number of the assistant message that proposed the call
    pub origin: u64,
}

impl ToolCallRequest {
    pub fn new(name: impl Into<String>, arguments: Arguments, origin: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            arguments,
            origin,
        }
    }
}

/// Outcome status of a tool call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Success,
    Error,
}

/// One piece of tool output
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ContentPart {
    Text(String),
    Structured(Value),
}

/// Result from tool execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Call ID of the request this answers
    pub call_id: String,

    /// Tool that was called
    pub name: String,

    pub status: CallStatus,

    /// Ordered output parts
    pub content: Vec<ContentPart>,

    /// Provider payload as received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl ToolCallResult {
    pub fn success(call_id: impl Into<String>, name: impl Into<String>, content: Vec<ContentPart>) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            status: CallStatus::Success,
            content,
            raw: None,
        }
    }

    pub fn failure(call_id: impl Into<String>, name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            status: CallStatus::Error,
            content: vec![ContentPart::Text(error.into())],
            raw: None,
        }
    }

    /// Error result for a call that failed before or during dispatch
    pub fn from_error(call_id: impl Into<String>, name: impl Into<String>, error: &AgentError) -> Self {
        Self::failure(call_id, name, format!("Error: {error}"))
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = Some(raw);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == CallStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn read_sheet() -> ToolDescriptor {
        ToolDescriptor::from_spec(
            "sheets",
            ToolSpec {
                name: "update_cell".into(),
                description: "Update a specific cell".into(),
                parameters: vec![
                    ParameterSchema::required("range_", "string", "A1 notation"),
                    ParameterSchema::required("value", "string", "New value"),
                    ParameterSchema {
                        enum_values: Some(vec![json!("RAW"), json!("USER_ENTERED")]),
                        ..ParameterSchema::optional("mode", "string", "Input option")
                    },
                ],
                default_arguments: None,
                examples: Vec::new(),
            },
        )
    }

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_namespacing() {
        let tool = read_sheet();
        assert_eq!(tool.name, "sheets.update_cell");
        assert_eq!(tool.tool_name, "update_cell");
        assert_eq!(tool.provider_id, "sheets");
        assert_eq!(tool.required_parameters().collect::<Vec<_>>(), vec!["range_", "value"]);
    }

    #[test]
    fn test_validate_accepts_complete_arguments() {
        let tool = read_sheet();
        assert!(tool.validate(&args(json!({"range_": "Sheet1!C2", "value": "Senior"}))).is_ok());
        assert!(tool.validate(&args(json!({"range_": "Sheet1!C2", "value": "x", "mode": null}))).is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_and_mismatched() {
        let tool = read_sheet();

        let err = tool.validate(&args(json!({"range_": "Sheet1!C2"}))).unwrap_err();
        assert!(matches!(err, AgentError::ArgumentValidation { ref reason, .. } if reason.contains("'value'")));

        let err = tool.validate(&args(json!({"range_": 42, "value": "x"}))).unwrap_err();
        assert!(matches!(err, AgentError::ArgumentValidation { .. }));

        let err = tool
            .validate(&args(json!({"range_": "A1", "value": "x", "mode": "FORMULA"})))
            .unwrap_err();
        assert!(err.to_string().contains("must be one of"));
    }

    #[test]
    fn test_content_part_wire_format() {
        let part = ContentPart::Structured(json!([{"id": 1}]));
        assert_eq!(serde_json::to_value(&part).unwrap(), json!({"type": "structured", "value": [{"id": 1}]}));

        let part: ContentPart = serde_json::from_value(json!({"type": "text", "value": "ok"})).unwrap();
        assert_eq!(part, ContentPart::Text("ok".into()));
    }
}
