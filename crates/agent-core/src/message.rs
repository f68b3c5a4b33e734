//! Conversation Messages
//!
//! Standard message format used across the agent system, and the
//! per-session conversation state the orchestration loop mutates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions (only ever sent to the model, never stored)
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result (injected as context)
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// Tool-call metadata carried by an assistant message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRef {
    /// Call ID, echoed back by the matching tool message
    pub call_id: String,

    /// Tool name as proposed by the model
    pub name: String,

    /// Argument text as proposed by the model
    pub arguments: String,
}

/// A single message in a conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text content
    pub content: String,

    /// Position in the conversation (assigned on append)
    #[serde(default)]
    pub sequence: u64,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Tool calls proposed by this (assistant) message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRef>,

    /// Call this (tool) message answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Tool name (for tool messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// Create a new message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            sequence: 0,
            timestamp: Utc::now(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a tool result message
    pub fn tool(
        content: impl Into<String>,
        name: impl Into<String>,
        tool_call_id: impl Into<String>,
    ) -> Self {
        let mut msg = Self::new(Role::Tool, content);
        msg.name = Some(name.into());
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }
}

/// Conversation state for one session.
///
/// Messages are append-only. While a dispatch round is open the IDs of the
/// calls proposed by the last assistant message sit in the pending set, and
/// only results for those IDs may be appended.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,

    #[serde(default)]
    pending: Vec<String>,

    #[serde(default)]
    terminal: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    fn append(&mut self, mut message: Message) -> u64 {
        let sequence = self.messages.len() as u64;
        message.sequence = sequence;
        self.messages.push(message);
        sequence
    }

    /// Append a user query, opening a new turn
    pub fn push_user(&mut self, content: impl Into<String>) -> u64 {
        self.terminal = false;
        self.pending.clear();
        self.append(Message::user(content))
    }

    /// Append the final assistant answer of a turn
    pub fn push_answer(&mut self, content: impl Into<String>) -> u64 {
        self.terminal = true;
        self.append(Message::assistant(content))
    }

    /// Append an assistant message that proposes tool calls.
    ///
    /// Returns the sequence number, which becomes the originating message ID
    /// of every request built from these calls.
    pub fn propose_calls(&mut self, content: impl Into<String>, calls: Vec<ToolCallRef>) -> u64 {
        self.pending = calls.iter().map(|c| c.call_id.clone()).collect();
        let mut msg = Message::assistant(content);
        msg.tool_calls = calls;
        self.append(msg)
    }

    /// Append the result of a pending call
    pub fn record_result(
        &mut self,
        call_id: &str,
        name: &str,
        content: impl Into<String>,
    ) -> Result<u64> {
        let pos = self
            .pending
            .iter()
            .position(|id| id == call_id)
            .ok_or_else(|| AgentError::OrphanResult(call_id.to_string()))?;
        self.pending.remove(pos);
        Ok(self.append(Message::tool(content, name, call_id)))
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages of the turn in progress (everything after the last user message)
    pub fn current_turn(&self) -> &[Message] {
        let start = self
            .messages
            .iter()
            .rposition(|m| m.role == Role::User)
            .map_or(0, |pos| pos + 1);
        &self.messages[start..]
    }

    /// Call IDs still awaiting a result
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// Whether the last turn ended with a final answer
    pub const fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Drop all history
    pub fn reset(&mut self) {
        self.messages.clear();
        self.pending.clear();
        self.terminal = false;
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
