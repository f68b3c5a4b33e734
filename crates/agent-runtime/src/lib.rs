//! # agent-runtime
//!
//! Concrete backends for the agent core.
//!
//! ## Model providers
//!
//! - **Ollama** (default): Local LLM inference via Ollama
//! - **OpenAI**: any OpenAI-compatible chat-completions endpoint
//!
//! ## Tool transports
//!
//! - **HTTP**: remote tool providers speaking the JSON call protocol
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::{HttpTransport, OllamaProvider};
//!
//! let engine = LlmDecisionEngine::new(Arc::new(OllamaProvider::localhost()), GenerationOptions::default());
//! let agent = AgentBuilder::new()
//!     .engine(Arc::new(engine))
//!     .provider(ProviderDescriptor::new("sheets", Arc::new(HttpTransport::new(url, timeout)?)))
//!     .build()
//!     .await?;
//! ```

pub mod http;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use http::HttpTransport;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

#[cfg(feature = "openai")]
pub use openai::{OpenAiConfig, OpenAiProvider};

// Re-export core types for convenience
pub use agent_core::{
    Agent, AgentBuilder, AgentError, LlmProvider, Message, ProviderDescriptor, ProviderTransport, Result, Role,
    ToolRegistry,
};
