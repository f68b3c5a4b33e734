//! Provider Connections
//!
//! The contract every tool provider implements, and the long-lived
//! connection handle the registry keeps per provider.
//!
//! ```text
//! request:  {tool_name, arguments}
//! response: {status: success|error, content: [{type: text|structured, value}, ...]}
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use crate::error::{AgentError, Result};
use crate::tool::{Arguments, CallStatus, ContentPart, ToolSpec};

/// Provider reply to a tool call
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub status: CallStatus,

    #[serde(default)]
    pub content: Vec<ContentPart>,
}

impl ProviderResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            status: CallStatus::Success,
            content: vec![ContentPart::Text(text.into())],
        }
    }

    pub fn structured(value: serde_json::Value) -> Self {
        Self {
            status: CallStatus::Success,
            content: vec![ContentPart::Structured(value)],
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: CallStatus::Error,
            content: vec![ContentPart::Text(message.into())],
        }
    }
}

/// Transport to one tool provider (Strategy pattern)
///
/// Implement this for each way of reaching a provider: HTTP, in-process, ...
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    /// Handshake performed once when the connection is opened
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Fetch the provider's tool catalog
    async fn list_tools(&self) -> Result<Vec<ToolSpec>>;

    /// Invoke a tool by its provider-local name
    async fn call_tool(&self, tool_name: &str, arguments: &Arguments) -> Result<ProviderResponse>;

    /// Whether concurrent calls may share this transport
    fn supports_multiplexing(&self) -> bool {
        false
    }

    /// Release transport resources
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Bootstrap input: a resolved provider the core should connect to
#[derive(Clone)]
pub struct ProviderDescriptor {
    /// Namespace prefix for the provider's tools
    pub id: String,

    pub transport: Arc<dyn ProviderTransport>,
}

impl ProviderDescriptor {
    pub fn new(id: impl Into<String>, transport: Arc<dyn ProviderTransport>) -> Self {
        Self {
            id: id.into(),
            transport,
        }
    }
}

impl std::fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderDescriptor").field("id", &self.id).finish_non_exhaustive()
    }
}

/// An open connection to a provider.
///
/// Calls are serialized through an async gate unless the transport
/// multiplexes.
pub struct ProviderConnection {
    id: String,
    transport: Arc<dyn ProviderTransport>,
    alive: AtomicBool,
    gate: Mutex<()>,
}

impl ProviderConnection {
    /// Handshake with the provider and fetch its catalog
    pub async fn open(descriptor: ProviderDescriptor) -> Result<(Self, Vec<ToolSpec>)> {
        let ProviderDescriptor { id, transport } = descriptor;
        let unavailable = |e: AgentError| AgentError::ProviderUnavailable {
            provider: id.clone(),
            reason: e.to_string(),
        };

        transport.initialize().await.map_err(unavailable)?;
        let tools = match transport.list_tools().await {
            Ok(tools) => tools,
            Err(e) => {
                // The handshake succeeded, so the transport holds resources
                if let Err(close_err) = transport.close().await {
                    tracing::debug!(provider = %id, error = %close_err, "Error closing half-open provider");
                }
                return Err(unavailable(e));
            }
        };

        let connection = Self {
            id,
            transport,
            alive: AtomicBool::new(true),
            gate: Mutex::new(()),
        };
        Ok((connection, tools))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Wait for a turn on this provider.
    ///
    /// Non-multiplexing providers hand out one permit at a time; the permit
    /// releases the provider when dropped.
    pub async fn acquire(&self) -> Result<CallPermit<'_>> {
        if !self.is_alive() {
            return Err(self.closed_error());
        }

        let guard = if self.transport.supports_multiplexing() {
            None
        } else {
            Some(self.gate.lock().await)
        };

        // Closed while queued
        if !self.is_alive() {
            return Err(self.closed_error());
        }

        Ok(CallPermit {
            transport: self.transport.as_ref(),
            _guard: guard,
        })
    }

    /// Invoke a tool on this provider
    pub async fn call(&self, tool_name: &str, arguments: &Arguments) -> Result<ProviderResponse> {
        self.acquire().await?.call(tool_name, arguments).await
    }

    fn closed_error(&self) -> AgentError {
        AgentError::Transport {
            provider: self.id.clone(),
            reason: "connection closed".into(),
        }
    }

    /// Close the connection (idempotent)
    pub async fn close(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            if let Err(e) = self.transport.close().await {
                tracing::warn!(provider = %self.id, error = %e, "Error closing provider connection");
            } else {
                tracing::debug!(provider = %self.id, "Provider connection closed");
            }
        }
    }
}

/// Exclusive (or shared, for multiplexing transports) use of a provider
pub struct CallPermit<'a> {
    transport: &'a dyn ProviderTransport,
    _guard: Option<MutexGuard<'a, ()>>,
}

impl CallPermit<'_> {
    pub async fn call(&self, tool_name: &str, arguments: &Arguments) -> Result<ProviderResponse> {
        self.transport.call_tool(tool_name, arguments).await
    }
}

impl std::fmt::Debug for ProviderConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConnection")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}
