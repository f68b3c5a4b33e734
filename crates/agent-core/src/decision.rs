//! Decision Engine
//!
//! Given the conversation and the tool catalog, decide whether the turn is
//! finished or which tools to call next. The production engine prompts a
//! language model with the catalog and reads tool calls out of its reply.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::Result;
use crate::message::{Conversation, Message, Role};
use crate::model::{GenerationOptions, LlmProvider};
use crate::registry::render_catalog;
use crate::tool::ToolDescriptor;

/// A tool call as proposed by the model, arguments still free text
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposedCall {
    pub name: String,
    pub arguments: String,
}

impl ProposedCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// What the model decided for this step of the turn
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Final answer for the user
    Terminal(String),
    /// Tool calls to run before asking again
    ToolCalls(Vec<ProposedCall>),
}

/// Chooses between answering and calling tools
#[async_trait]
pub trait DecisionEngine: Send + Sync {
    async fn decide(&self, conversation: &Conversation, catalog: &[ToolDescriptor]) -> Result<Decision>;
}

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful assistant with access to a company database, a spreadsheet and a file store.

When you need to use a tool, respond with a JSON block in this exact format:
```tool
{"tool": "provider.tool_name", "arguments": {"arg1": "value1"}}
```
You may emit several tool blocks in one reply when the calls are independent.

After receiving tool results, synthesize them into a clear and helpful response.
If a tool reports an error, correct the call or explain the problem.
If you can answer directly without tools, do so.
Be concise and accurate."#;

/// Decision engine backed by an [`LlmProvider`]
pub struct LlmDecisionEngine {
    provider: Arc<dyn LlmProvider>,
    options: GenerationOptions,
    system_prompt: String,
}

impl LlmDecisionEngine {
    pub fn new(provider: Arc<dyn LlmProvider>, options: GenerationOptions) -> Self {
        Self {
            provider,
            options,
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
        }
    }

    /// Build the message list sent to the model
    pub fn build_messages(&self, conversation: &Conversation, catalog: &[ToolDescriptor]) -> Vec<Message> {
        let mut system = self.system_prompt.clone();
        if !catalog.is_empty() {
            system.push_str("\n\n");
            system.push_str(&render_catalog(catalog));
        }

        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(Message::system(system));

        for msg in conversation.messages() {
            if msg.role == Role::Assistant && msg.content.trim().is_empty() && !msg.tool_calls.is_empty() {
                // Show the model the calls it made even if it wrote no prose
                let rendered: Vec<String> = msg
                    .tool_calls
                    .iter()
                    .map(|c| {
                        let block = json!({"tool": c.name, "arguments": echoed_arguments(&c.arguments)});
                        format!("```tool\n{block}\n```")
                    })
                    .collect();
                let mut copy = msg.clone();
                copy.content = rendered.join("\n");
                messages.push(copy);
            } else {
                messages.push(msg.clone());
            }
        }

        messages
    }
}

/// Arguments as the model wrote them, in a form that re-parses as a tool block
fn echoed_arguments(text: &str) -> Value {
    let text = text.trim();
    if text.is_empty() {
        return Value::Object(serde_json::Map::new());
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[async_trait]
impl DecisionEngine for LlmDecisionEngine {
    async fn decide(&self, conversation: &Conversation, catalog: &[ToolDescriptor]) -> Result<Decision> {
        let messages = self.build_messages(conversation, catalog);
        let completion = self.provider.complete(&messages, &self.options).await?;
        Ok(parse_decision(&completion.content))
    }
}

#[derive(Deserialize)]
struct RawCall {
    tool: String,
    #[serde(default, alias = "tool_input", alias = "args", alias = "parameters")]
    arguments: Value,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCalls {
    One(RawCall),
    Many(Vec<RawCall>),
}

/// Read tool calls out of model text; anything without one is a final answer
pub fn parse_decision(content: &str) -> Decision {
    let mut calls = Vec::new();

    for block in fenced_blocks(content, "tool") {
        collect_calls(block, &mut calls);
    }

    if calls.is_empty() {
        for block in fenced_blocks(content, "json") {
            collect_calls(block, &mut calls);
        }
    }

    if calls.is_empty() && content.contains(r#""tool""#) {
        if let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) {
            if start < end {
                collect_calls(&content[start..=end], &mut calls);
            }
        }
    }

    if calls.is_empty() {
        Decision::Terminal(content.trim().to_string())
    } else {
        Decision::ToolCalls(calls)
    }
}

fn collect_calls(json: &str, calls: &mut Vec<ProposedCall>) {
    let raw = match serde_json::from_str::<RawCalls>(json.trim()) {
        Ok(RawCalls::One(call)) => vec![call],
        Ok(RawCalls::Many(many)) => many,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed tool block");
            return;
        }
    };

    calls.extend(raw.into_iter().filter(|c| !c.tool.trim().is_empty()).map(|c| {
        let arguments = match c.arguments {
            Value::Null => String::new(),
            Value::String(text) => text,
            other => other.to_string(),
        };
        ProposedCall::new(c.tool.trim(), arguments)
    }));
}

/// Bodies of ```` ```<tag> ... ``` ```` blocks
fn fenced_blocks<'a>(content: &'a str, tag: &str) -> Vec<&'a str> {
    let marker = format!("```{tag}");
    let mut blocks = Vec::new();
    let mut rest = content;

    while let Some(start) = rest.find(&marker) {
        let after = &rest[start + marker.len()..];
        let Some(end) = after.find("```") else { break };
        blocks.push(&after[..end]);
        rest = &after[end + 3..];
    }

    blocks
}
