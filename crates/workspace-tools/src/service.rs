//! Service Adapter
//!
//! Each reference provider implements [`WorkspaceService`]; [`ServiceTransport`]
//! exposes it to the agent as a [`ProviderTransport`], turning service errors
//! into error results the model can read.

use std::sync::Arc;

use agent_core::{
    ProviderDescriptor,
    connection::{ProviderResponse, ProviderTransport},
    error::Result as CoreResult,
    tool::{Arguments, ToolSpec},
};
use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, WorkspaceError};

/// An in-process tool provider
#[async_trait]
pub trait WorkspaceService: Send + Sync {
    /// Tools this service offers
    fn tools(&self) -> Vec<ToolSpec>;

    /// Run one tool
    async fn call(&self, tool: &str, arguments: &Arguments) -> Result<ProviderResponse>;

    /// Read-only services can take concurrent calls
    fn concurrent(&self) -> bool {
        false
    }
}

/// Adapts a [`WorkspaceService`] to the provider transport contract
pub struct ServiceTransport<S> {
    service: Arc<S>,
}

impl<S: WorkspaceService + 'static> ServiceTransport<S> {
    pub const fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    /// Provider descriptor for bootstrap
    pub fn descriptor(id: &str, service: Arc<S>) -> ProviderDescriptor {
        ProviderDescriptor::new(id, Arc::new(Self::new(service)))
    }
}

#[async_trait]
impl<S: WorkspaceService + 'static> ProviderTransport for ServiceTransport<S> {
    async fn list_tools(&self) -> CoreResult<Vec<ToolSpec>> {
        Ok(self.service.tools())
    }

    async fn call_tool(&self, tool_name: &str, arguments: &Arguments) -> CoreResult<ProviderResponse> {
        match self.service.call(tool_name, arguments).await {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::debug!(tool = tool_name, error = %e, "Workspace tool failed");
                Ok(ProviderResponse::error(e.to_string()))
            }
        }
    }

    fn supports_multiplexing(&self) -> bool {
        self.service.concurrent()
    }
}

/// Required string argument
pub fn require_str<'a>(arguments: &'a Arguments, name: &str) -> Result<&'a str> {
    match arguments.get(name) {
        None | Some(Value::Null) => Err(WorkspaceError::MissingArgument(name.into())),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(invalid(name, "expected a string")),
    }
}

/// Optional string argument; empty strings count as absent
pub fn optional_str<'a>(arguments: &'a Arguments, name: &str) -> Result<Option<&'a str>> {
    match arguments.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(invalid(name, "expected a string")),
    }
}

/// Optional non-negative integer argument, also accepted as a numeric string
pub fn optional_usize(arguments: &Arguments, name: &str) -> Result<Option<usize>> {
    let parsed = match arguments.get(name) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    };

    parsed
        .and_then(|n| usize::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| invalid(name, "expected a non-negative integer"))
}

/// Required list of cell values; scalars are stringified
pub fn require_values(arguments: &Arguments, name: &str) -> Result<Vec<String>> {
    let Some(value) = arguments.get(name) else {
        return Err(WorkspaceError::MissingArgument(name.into()));
    };
    let Value::Array(items) = value else {
        return Err(invalid(name, "expected an array"));
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            Value::Null => Ok(String::new()),
            Value::Number(_) | Value::Bool(_) => Ok(item.to_string()),
            _ => Err(invalid(name, "cells must be scalar values")),
        })
        .collect()
}

fn invalid(name: &str, reason: &str) -> WorkspaceError {
    WorkspaceError::InvalidArgument {
        name: name.into(),
        reason: reason.into(),
    }
}
