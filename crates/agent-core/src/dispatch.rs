//! Tool Dispatch
//!
//! Validates requests against the catalog and carries them to the owning
//! provider connection, each under its own deadline.

use std::time::Duration;

use futures::future::join_all;

use crate::error::{AgentError, Result};
use crate::registry::ToolRegistry;
use crate::tool::{ToolCallRequest, ToolCallResult};

/// Default wait budget for one tool call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Invokes tools through the registry's provider connections
#[derive(Clone, Debug)]
pub struct Dispatcher {
    call_timeout: Duration,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_CALL_TIMEOUT)
    }
}

impl Dispatcher {
    pub const fn new(call_timeout: Duration) -> Self {
        Self { call_timeout }
    }

    pub const fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Invoke a single tool.
    ///
    /// Unknown tools and invalid arguments fail before the provider is
    /// contacted. Timeouts and transport failures come back as error-status
    /// results.
    pub async fn invoke(&self, registry: &ToolRegistry, request: &ToolCallRequest) -> Result<ToolCallResult> {
        let tool = registry.resolve(&request.name)?;
        tool.validate(&request.arguments)?;

        let Some(connection) = registry.connection(&tool.provider_id) else {
            let err = AgentError::Transport {
                provider: tool.provider_id.clone(),
                reason: "no open connection".into(),
            };
            return Ok(ToolCallResult::from_error(&request.id, &tool.name, &err));
        };

        tracing::debug!(tool = %tool.name, call_id = %request.id, "Dispatching tool call");

        // The deadline starts once the provider is ours, not while queued behind siblings
        let permit = match connection.acquire().await {
            Ok(permit) => permit,
            Err(e) => return Ok(ToolCallResult::from_error(&request.id, &tool.name, &e)),
        };

        let call = permit.call(&tool.tool_name, &request.arguments);
        let result = match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(response)) => {
                let raw = serde_json::to_value(&response).ok();
                let mut result = ToolCallResult {
                    call_id: request.id.clone(),
                    name: tool.name.clone(),
                    status: response.status,
                    content: response.content,
                    raw: None,
                };
                if let Some(raw) = raw {
                    result = result.with_raw(raw);
                }
                result
            }
            Ok(Err(e)) => {
                tracing::warn!(tool = %tool.name, error = %e, "Tool call failed");
                ToolCallResult::from_error(&request.id, &tool.name, &e)
            }
            Err(_) => {
                let err = AgentError::ToolInvocationTimeout {
                    tool: tool.name.clone(),
                    after: self.call_timeout,
                };
                tracing::warn!(tool = %tool.name, call_id = %request.id, "{err}");
                ToolCallResult::from_error(&request.id, &tool.name, &err)
            }
        };

        Ok(result)
    }

    /// Invoke a tool, folding every failure into an error result
    pub async fn execute(&self, registry: &ToolRegistry, request: &ToolCallRequest) -> ToolCallResult {
        match self.invoke(registry, request).await {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(tool = %request.name, error = %e, "Tool call rejected");
                ToolCallResult::from_error(&request.id, &request.name, &e)
            }
        }
    }

    /// Run a batch concurrently; results come back in request order
    pub async fn dispatch_all(&self, registry: &ToolRegistry, requests: &[ToolCallRequest]) -> Vec<ToolCallResult> {
        join_all(requests.iter().map(|r| self.execute(registry, r))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ProviderDescriptor, ProviderResponse};
    use crate::testing::FakeTransport;
    use crate::tool::{Arguments, CallStatus, ContentPart};
    use serde_json::json;
    use std::sync::Arc;

    fn args(value: serde_json::Value) -> Arguments {
        value.as_object().cloned().unwrap()
    }

    async fn registry_with(id: &str, transport: Arc<FakeTransport>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(ProviderDescriptor::new(id, transport)).await.unwrap();
        registry
    }

    #[tokio::test]
    async fn test_invoke_success_keeps_raw_payload() {
        let transport = Arc::new(
            FakeTransport::new()
                .with_tool("get_users", &[])
                .with_response("get_users", ProviderResponse::structured(json!([{"id": 1, "email": "a@x.com"}]))),
        );
        let registry = registry_with("db", transport.clone()).await;

        let request = ToolCallRequest::new("db.get_users", Arguments::new(), 1);
        let result = Dispatcher::default().invoke(&registry, &request).await.unwrap();

        assert!(result.is_success());
        assert_eq!(result.call_id, request.id);
        assert_eq!(result.content, vec![ContentPart::Structured(json!([{"id": 1, "email": "a@x.com"}]))]);
        assert_eq!(result.raw.unwrap()["status"], "success");
        assert_eq!(transport.call_log()[0].0, "get_users");
    }

    #[tokio::test]
    async fn test_missing_required_field_never_reaches_transport() {
        let transport = Arc::new(FakeTransport::new().with_tool("update_cell", &["range_", "value"]));
        let registry = registry_with("sheets", transport.clone()).await;

        let request = ToolCallRequest::new("sheets.update_cell", args(json!({"range_": "Sheet1!C2"})), 1);
        let err = Dispatcher::default().invoke(&registry, &request).await.unwrap_err();

        assert!(matches!(err, AgentError::ArgumentValidation { .. }));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_error_result() {
        let transport = Arc::new(FakeTransport::new().with_tool("get_users", &[]));
        let registry = registry_with("db", transport).await;

        let request = ToolCallRequest::new("db.drop_tables", Arguments::new(), 1);
        let result = Dispatcher::default().execute(&registry, &request).await;

        assert_eq!(result.status, CallStatus::Error);
        assert_eq!(result.call_id, request.id);
        assert!(matches!(&result.content[0], ContentPart::Text(t) if t.contains("Tool not found")));
    }

    #[tokio::test]
    async fn test_timeout_does_not_block_siblings() {
        let db = Arc::new(
            FakeTransport::new()
                .with_tool("get_users", &[])
                .with_delay("get_users", Duration::from_millis(500)),
        );
        let drive = Arc::new(FakeTransport::new().with_tool("list_files", &[]));
        let mut registry = ToolRegistry::new();
        registry.register(ProviderDescriptor::new("db", db)).await.unwrap();
        registry.register(ProviderDescriptor::new("drive", drive)).await.unwrap();

        let requests = vec![
            ToolCallRequest::new("db.get_users", Arguments::new(), 1),
            ToolCallRequest::new("drive.list_files", Arguments::new(), 1),
        ];
        let started = std::time::Instant::now();
        let results = Dispatcher::new(Duration::from_millis(30))
            .dispatch_all(&registry, &requests)
            .await;

        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(results[0].status, CallStatus::Error);
        assert!(matches!(&results[0].content[0], ContentPart::Text(t) if t.contains("timed out")));
        assert!(results[1].is_success());
    }

    #[tokio::test]
    async fn test_queued_calls_get_their_own_budget() {
        let sheets = Arc::new(
            FakeTransport::new()
                .with_tool("read_sheet", &[])
                .with_delay("read_sheet", Duration::from_millis(150)),
        );
        let registry = registry_with("sheets", sheets.clone()).await;

        let requests = vec![
            ToolCallRequest::new("sheets.read_sheet", Arguments::new(), 1),
            ToolCallRequest::new("sheets.read_sheet", Arguments::new(), 1),
        ];
        let results = Dispatcher::new(Duration::from_millis(200))
            .dispatch_all(&registry, &requests)
            .await;

        let statuses: Vec<CallStatus> = results.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![CallStatus::Success, CallStatus::Success]);
        assert_eq!(sheets.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_results_follow_request_order() {
        let slow = Arc::new(
            FakeTransport::new()
                .with_tool("read_sheet", &[])
                .with_delay("read_sheet", Duration::from_millis(60)),
        );
        let fast = Arc::new(FakeTransport::new().with_tool("list_files", &[]).multiplexed());
        let mut registry = ToolRegistry::new();
        registry.register(ProviderDescriptor::new("sheets", slow)).await.unwrap();
        registry.register(ProviderDescriptor::new("drive", fast)).await.unwrap();

        let requests = vec![
            ToolCallRequest::new("sheets.read_sheet", Arguments::new(), 3),
            ToolCallRequest::new("drive.list_files", Arguments::new(), 3),
            ToolCallRequest::new("drive.list_files", Arguments::new(), 3),
        ];
        let results = Dispatcher::default().dispatch_all(&registry, &requests).await;

        let ids: Vec<&str> = results.iter().map(|r| r.call_id.as_str()).collect();
        let expected: Vec<&str> = requests.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, expected);
    }
}
