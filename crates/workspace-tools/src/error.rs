//! Error Types for Workspace Tools

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkspaceError>;

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
