//! Error Types

use std::time::Duration;

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Tool provider could not be reached during registration or connect
    #[error("Provider unavailable: {provider}: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    /// Bootstrap found no reachable tool provider
    #[error("No tool providers available ({attempted} attempted)")]
    NoProvidersAvailable { attempted: usize },

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Arguments missing or not matching the tool schema
    #[error("Invalid arguments for '{tool}': {reason}")]
    ArgumentValidation { tool: String, reason: String },

    /// A single tool call exceeded its wait budget
    #[error("Tool '{tool}' timed out after {}ms", .after.as_millis())]
    ToolInvocationTimeout { tool: String, after: Duration },

    /// Provider transport failed while carrying a request
    #[error("Transport error ({provider}): {reason}")]
    Transport { provider: String, reason: String },

    /// Language model call failed
    #[error("Model invocation failed: {0}")]
    ModelInvocation(String),

    /// Language model call exceeded its wait budget
    #[error("Model call timed out after {}s", .0.as_secs())]
    ModelTimeout(Duration),

    /// Maximum dispatch rounds reached in a turn
    #[error("Maximum iterations ({0}) reached")]
    MaxIterations(usize),

    /// A tool result arrived for a call that is not pending
    #[error("Result for unknown tool call: {0}")]
    OrphanResult(String),

    /// Session was cancelled while a turn was in flight
    #[error("Session cancelled")]
    Cancelled,

    /// Rate limited by the model backend
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication with the model backend failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ModelInvocation(_)
                | Self::ModelTimeout(_)
                | Self::RateLimited(_)
                | Self::Transport { .. }
                | Self::Io(_)
        )
    }

    /// Whether the error ends the session rather than a single tool call
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoProvidersAvailable { .. }
                | Self::ModelInvocation(_)
                | Self::ModelTimeout(_)
                | Self::Auth(_)
                | Self::Cancelled
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::ProviderUnavailable { provider, .. } => {
                format!("The '{provider}' service is currently unavailable.")
            }
            Self::NoProvidersAvailable { .. } => {
                "None of the configured tool services could be reached.".into()
            }
            Self::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            Self::ArgumentValidation { reason, .. } => format!("Invalid tool input: {reason}"),
            Self::ToolInvocationTimeout { tool, .. } => {
                format!("The tool '{tool}' did not respond in time.")
            }
            Self::ModelInvocation(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ModelTimeout(_) => "The AI service did not respond in time. Please try again.".into(),
            Self::MaxIterations(_) => {
                "The request took too many steps to process. Please try a simpler query.".into()
            }
            Self::Cancelled => "The request was cancelled.".into(),
            Self::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            Self::Auth(_) => "Authentication failed. Please check your credentials.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}
