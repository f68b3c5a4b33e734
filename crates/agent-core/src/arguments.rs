//! Argument Synthesis
//!
//! Turns the free-text argument proposal a model writes into a structured
//! argument object for a tool:
//!
//! 1. strip surrounding code fences (```` ```json ... ``` ````)
//! 2. parse as a JSON object; empty text is an empty object
//! 3. failing that, parse the first balanced `{...}` found in the text
//! 4. on parse failure, substitute the tool's documented default arguments
//!    and log the fallback
//! 5. check required keys against the tool schema

use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::tool::{Arguments, ToolDescriptor};

/// Where the synthesized arguments came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgumentSource {
    /// Parsed from the model's text
    Parsed,
    /// Model text was unusable; documented defaults were substituted
    Fallback { reason: String },
}

/// Structured arguments plus their provenance
#[derive(Clone, Debug, PartialEq)]
pub struct SynthesizedArguments {
    pub arguments: Arguments,
    pub source: ArgumentSource,
}

impl SynthesizedArguments {
    pub const fn is_fallback(&self) -> bool {
        matches!(self.source, ArgumentSource::Fallback { .. })
    }
}

/// Remove a surrounding code fence and its optional language tag
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix("```") {
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
            .unwrap_or(rest.len());
        body = &rest[tag_len..];
    }

    let trimmed = body.trim_end();
    if let Some(rest) = trimmed.strip_suffix("```") {
        body = rest;
    }

    body.trim()
}

/// Parse free text into an argument object, if it is one
pub fn parse_arguments(text: &str) -> std::result::Result<Arguments, String> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return Ok(Arguments::new());
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {}", json_kind(&other))),
        Err(e) => match first_object(text).map(serde_json::from_str::<Value>) {
            Some(Ok(Value::Object(map))) => Ok(map),
            _ => Err(e.to_string()),
        },
    }
}

/// The first balanced `{...}` in `text`, braces inside strings ignored
fn first_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Build validated arguments for `tool` from the model's proposal
pub fn synthesize(tool: &ToolDescriptor, text: &str) -> Result<SynthesizedArguments> {
    let synthesized = match parse_arguments(text) {
        Ok(arguments) => SynthesizedArguments {
            arguments,
            source: ArgumentSource::Parsed,
        },
        Err(reason) => {
            tracing::warn!(
                tool = %tool.name,
                error = %reason,
                has_default = tool.default_arguments.is_some(),
                "Failed to parse tool arguments, substituting defaults"
            );
            SynthesizedArguments {
                arguments: tool.default_arguments.clone().unwrap_or_default(),
                source: ArgumentSource::Fallback { reason },
            }
        }
    };

    if let Some(missing) = tool
        .required_parameters()
        .find(|name| !synthesized.arguments.contains_key(*name))
    {
        return Err(AgentError::ArgumentValidation {
            tool: tool.name.clone(),
            reason: format!("missing required parameter '{missing}'"),
        });
    }

    Ok(synthesized)
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
