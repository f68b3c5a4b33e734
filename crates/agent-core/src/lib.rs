//! # agent-core
//!
//! Tool-augmented agent logic: a registry of tools contributed by external
//! providers, concurrent dispatch, and a model-driven loop that alternates
//! between deciding and calling tools until it can answer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                              Agent                               │
//! │  ┌─────────────┐   ┌──────────────┐   ┌───────────────────────┐  │
//! │  │  Reasoning  │──▶│   Decision   │──▶│  LlmProvider          │  │
//! │  │    Loop     │   │    Engine    │   │  (Strategy)           │  │
//! │  └──────┬──────┘   └──────────────┘   └───────────────────────┘  │
//! │         │                                                        │
//! │  ┌──────▼──────┐   ┌──────────────┐   ┌───────────────────────┐  │
//! │  │  Argument   │──▶│  Dispatcher  │──▶│  ToolRegistry         │  │
//! │  │ Synthesizer │   │              │   │  ─ ProviderConnection │  │
//! │  └─────────────┘   └──────┬───────┘   └───────────────────────┘  │
//! │                    ┌──────▼───────┐                              │
//! │                    │  Aggregator  │                              │
//! │                    └──────────────┘                              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Providers plug in through [`ProviderTransport`]; models through
//! [`LlmProvider`]. Neither is concrete here.

pub mod aggregator;
pub mod arguments;
pub mod connection;
pub mod decision;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod model;
pub mod reasoning;
pub mod registry;
pub mod session;
pub mod tool;

#[cfg(test)]
mod testing;

pub use aggregator::{AggregatorConfig, ResultAggregator};
pub use arguments::{ArgumentSource, SynthesizedArguments, synthesize};
pub use connection::{CallPermit, ProviderConnection, ProviderDescriptor, ProviderResponse, ProviderTransport};
pub use decision::{Decision, DecisionEngine, LlmDecisionEngine, ProposedCall};
pub use dispatch::Dispatcher;
pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role, ToolCallRef};
pub use model::{Completion, GenerationOptions, LlmProvider, ModelInfo, ProviderInfo};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, LoopState, TurnOutcome};
pub use registry::{RegistrationReport, ToolRegistry};
pub use session::{Session, SessionId};
pub use tool::{
    Arguments, CallStatus, ContentPart, ParameterSchema, ToolCallRequest, ToolCallResult, ToolDescriptor, ToolSpec,
};
