//! Tool Registry
//!
//! Discovers provider catalogs, keeps them under `provider_id.tool_name`
//! keys, and owns the provider connections for the session.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::connection::{ProviderConnection, ProviderDescriptor};
use crate::error::{AgentError, Result};
use crate::tool::{NAMESPACE_SEPARATOR, ToolDescriptor, ToolSpec};

/// Outcome of registering a batch of providers
#[derive(Clone, Debug, Default)]
pub struct RegistrationReport {
    /// Provider IDs with the number of tools each contributed
    pub registered: Vec<(String, usize)>,

    /// Provider IDs that were excluded, with the reason
    pub unavailable: Vec<(String, String)>,
}

impl RegistrationReport {
    /// Some providers were excluded
    pub fn is_degraded(&self) -> bool {
        !self.unavailable.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.registered.len() + self.unavailable.len()
    }
}

/// Registry for available tools
pub struct ToolRegistry {
    tools: HashMap<String, ToolDescriptor>,
    connections: HashMap<String, Arc<ProviderConnection>>,
    connect_timeout: Duration,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            connections: HashMap::new(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Bound the handshake + catalog fetch of each provider
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Connect to a provider and merge its catalog.
    ///
    /// Registering an ID that is already present reconnects: the old
    /// connection is closed and its catalog entries are replaced.
    pub async fn register(&mut self, provider: ProviderDescriptor) -> Result<usize> {
        check_provider_id(&provider.id)?;
        let (connection, tools) = self.open(provider).await?;
        Ok(self.install(connection, tools).await)
    }

    /// Register several providers concurrently, excluding unreachable ones
    pub async fn register_all(&mut self, providers: Vec<ProviderDescriptor>) -> RegistrationReport {
        let mut report = RegistrationReport::default();

        let mut pending = Vec::with_capacity(providers.len());
        for provider in providers {
            match check_provider_id(&provider.id) {
                Ok(()) => pending.push(provider),
                Err(e) => report.unavailable.push((provider.id.clone(), e.to_string())),
            }
        }

        let ids: Vec<String> = pending.iter().map(|p| p.id.clone()).collect();
        let opened = join_all(pending.into_iter().map(|p| self.open(p))).await;

        for (id, outcome) in ids.into_iter().zip(opened) {
            match outcome {
                Ok((connection, tools)) => {
                    let count = self.install(connection, tools).await;
                    report.registered.push((id, count));
                }
                Err(e) => {
                    tracing::warn!(provider = %id, error = %e, "Provider excluded from catalog");
                    report.unavailable.push((id, e.to_string()));
                }
            }
        }

        tracing::info!(
            providers = report.registered.len(),
            excluded = report.unavailable.len(),
            tools = self.tools.len(),
            "Tool catalog ready"
        );
        report
    }

    async fn open(&self, provider: ProviderDescriptor) -> Result<(ProviderConnection, Vec<ToolSpec>)> {
        let id = provider.id.clone();
        let transport = provider.transport.clone();
        match tokio::time::timeout(self.connect_timeout, ProviderConnection::open(provider)).await {
            Ok(result) => result,
            Err(_) => {
                // The handshake may have completed before the deadline hit
                if let Err(e) = transport.close().await {
                    tracing::debug!(provider = %id, error = %e, "Error closing timed-out provider");
                }
                Err(AgentError::ProviderUnavailable {
                    provider: id,
                    reason: format!("no response within {}s", self.connect_timeout.as_secs_f32()),
                })
            }
        }
    }

    async fn install(&mut self, connection: ProviderConnection, tools: Vec<ToolSpec>) -> usize {
        let provider_id = connection.id().to_string();

        if let Some(previous) = self.connections.remove(&provider_id) {
            tracing::debug!(provider = %provider_id, "Replacing existing provider connection");
            previous.close().await;
        }
        self.tools.retain(|_, t| t.provider_id != provider_id);

        let mut count = 0;
        for spec in tools {
            let descriptor = ToolDescriptor::from_spec(&provider_id, spec);
            if self.tools.insert(descriptor.name.clone(), descriptor).is_some() {
                tracing::warn!(provider = %provider_id, "Provider advertised a tool name twice");
            } else {
                count += 1;
            }
        }

        self.connections.insert(provider_id, Arc::new(connection));
        count
    }

    /// Get a tool by its qualified name
    pub fn lookup(&self, name: &str) -> Result<&ToolDescriptor> {
        self.tools
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))
    }

    /// Lookup that also accepts a bare tool name when exactly one provider offers it
    pub fn resolve(&self, name: &str) -> Result<&ToolDescriptor> {
        let name = name.trim();
        if let Some(tool) = self.tools.get(name) {
            return Ok(tool);
        }

        let mut matches = self.tools.values().filter(|t| t.tool_name == name);
        match (matches.next(), matches.next()) {
            (Some(tool), None) => Ok(tool),
            (Some(_), Some(_)) => {
                let mut candidates: Vec<&str> = self
                    .tools
                    .values()
                    .filter(|t| t.tool_name == name)
                    .map(|t| t.name.as_str())
                    .collect();
                candidates.sort_unstable();
                Err(AgentError::ToolNotFound(format!(
                    "{name} (ambiguous, use one of: {})",
                    candidates.join(", ")
                )))
            }
            _ => Err(AgentError::ToolNotFound(name.to_string())),
        }
    }

    /// Snapshot of the catalog, sorted by name
    pub fn list(&self) -> Vec<ToolDescriptor> {
        let mut tools: Vec<ToolDescriptor> = self.tools.values().cloned().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Connection owning a provider's tools
    pub fn connection(&self, provider_id: &str) -> Option<Arc<ProviderConnection>> {
        self.connections.get(provider_id).cloned()
    }

    /// Registered provider IDs
    pub fn providers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.connections.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Close every provider connection and forget the catalog
    pub async fn shutdown(&mut self) {
        for (_, connection) in self.connections.drain() {
            connection.close().await;
        }
        self.tools.clear();
    }

    /// Generate the prompt section describing available tools
    pub fn prompt_section(&self) -> String {
        render_catalog(&self.list())
    }
}

/// Render a catalog snapshot as a markdown prompt section
pub fn render_catalog(tools: &[ToolDescriptor]) -> String {
    let mut prompt = String::from("## Available Tools\n\n");

    for tool in tools {
        let _ = writeln!(prompt, "### {}", tool.name);
        let _ = writeln!(prompt, "{}", tool.description);

        if !tool.parameters.is_empty() {
            prompt.push_str("**Parameters:**\n");
            for param in &tool.parameters {
                let required = if param.required { " (required)" } else { "" };
                let _ = writeln!(
                    prompt,
                    "- `{}` ({}){}: {}",
                    param.name, param.param_type, required, param.description
                );
            }
        }

        if !tool.examples.is_empty() {
            prompt.push_str("**Example arguments:**\n");
            for example in &tool.examples {
                let _ = writeln!(prompt, "- `{example}`");
            }
        }
        prompt.push('\n');
    }

    prompt
}

fn check_provider_id(id: &str) -> Result<()> {
    if id.is_empty() || id.contains(NAMESPACE_SEPARATOR) {
        return Err(AgentError::Config(format!(
            "invalid provider id '{id}': must be non-empty and contain no '{NAMESPACE_SEPARATOR}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;
    use crate::tool::{ParameterSchema, ToolSpec};

    fn db() -> ProviderDescriptor {
        ProviderDescriptor::new(
            "db",
            Arc::new(
                FakeTransport::new()
                    .with_tool("get_users", &[])
                    .with_tool("get_candidate_info", &[]),
            ),
        )
    }

    fn sheets() -> ProviderDescriptor {
        ProviderDescriptor::new(
            "sheets",
            Arc::new(FakeTransport::new().with_spec(ToolSpec {
                name: "read_sheet".into(),
                description: "Read a range of values".into(),
                parameters: vec![ParameterSchema::optional("range_", "string", "A1 notation range")],
                default_arguments: None,
                examples: vec![serde_json::json!({"range_": "Sheet1!A1:D10"})],
            })),
        )
    }

    #[tokio::test]
    async fn test_lookup_after_register() {
        let mut registry = ToolRegistry::new();
        assert_eq!(registry.register(db()).await.unwrap(), 2);
        registry.register(sheets()).await.unwrap();

        let tool = registry.lookup("sheets.read_sheet").unwrap();
        assert_eq!(tool.provider_id, "sheets");
        assert_eq!(tool.tool_name, "read_sheet");
        assert_eq!(tool.parameters[0].name, "range_");

        let err = registry.lookup("sheets.delete_sheet").unwrap_err();
        assert!(matches!(err, AgentError::ToolNotFound(name) if name == "sheets.delete_sheet"));
        // Bare names are not catalog keys
        assert!(registry.lookup("get_users").is_err());
    }

    #[tokio::test]
    async fn test_reregister_does_not_duplicate() {
        let first = Arc::new(FakeTransport::new().with_tool("get_users", &[]));
        let mut registry = ToolRegistry::new();
        registry.register(ProviderDescriptor::new("db", first.clone())).await.unwrap();
        registry.register(db()).await.unwrap();

        assert_eq!(registry.names(), vec!["db.get_candidate_info", "db.get_users"]);
        assert_eq!(registry.providers(), vec!["db"]);
        // The replaced connection is closed
        assert_eq!(first.closed(), 1);
    }

    #[tokio::test]
    async fn test_partial_catalog_when_provider_unreachable() {
        let mut registry = ToolRegistry::new();
        let report = registry
            .register_all(vec![
                db(),
                ProviderDescriptor::new("gdrive", Arc::new(FakeTransport::unreachable())),
                sheets(),
            ])
            .await;

        assert!(report.is_degraded());
        assert_eq!(report.attempted(), 3);
        assert_eq!(report.unavailable.len(), 1);
        assert_eq!(report.unavailable[0].0, "gdrive");
        assert_eq!(registry.len(), 3);
        assert!(registry.names().iter().all(|n| !n.starts_with("gdrive.")));
    }

    #[tokio::test]
    async fn test_slow_provider_is_closed_after_connect_timeout() {
        let slow = Arc::new(
            FakeTransport::new()
                .with_tool("list_files", &[])
                .with_catalog_delay(Duration::from_millis(500)),
        );
        let mut registry = ToolRegistry::new().with_connect_timeout(Duration::from_millis(30));
        let report = registry
            .register_all(vec![db(), ProviderDescriptor::new("drive", slow.clone())])
            .await;

        assert_eq!(report.unavailable.len(), 1);
        assert!(report.unavailable[0].1.contains("no response"));
        assert_eq!(slow.initialized(), 1);
        assert_eq!(slow.closed(), 1);
        assert_eq!(registry.providers(), vec!["db"]);
    }

    #[tokio::test]
    async fn test_invalid_provider_id_rejected() {
        let mut registry = ToolRegistry::new();
        let err = registry
            .register(ProviderDescriptor::new("my.db", Arc::new(FakeTransport::new())))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[tokio::test]
    async fn test_resolve_bare_names() {
        let mut registry = ToolRegistry::new();
        registry
            .register_all(vec![
                db(),
                ProviderDescriptor::new("warehouse", Arc::new(FakeTransport::new().with_tool("get_users", &[]))),
                sheets(),
            ])
            .await;

        assert_eq!(registry.resolve("read_sheet").unwrap().name, "sheets.read_sheet");
        assert_eq!(registry.resolve(" db.get_users ").unwrap().name, "db.get_users");

        let err = registry.resolve("get_users").unwrap_err();
        assert!(err.to_string().contains("ambiguous"));
        assert!(registry.resolve("send_email").is_err());
    }

    #[tokio::test]
    async fn test_prompt_section_lists_catalog() {
        let mut registry = ToolRegistry::new();
        registry.register(sheets()).await.unwrap();

        let section = registry.prompt_section();
        assert!(section.contains("### sheets.read_sheet"));
        assert!(section.contains("`range_` (string)"));
        assert!(section.contains("Sheet1!A1:D10"));
    }

    #[tokio::test]
    async fn test_shutdown_closes_connections() {
        let transport = Arc::new(FakeTransport::new().with_tool("get_users", &[]));
        let mut registry = ToolRegistry::new();
        registry.register(ProviderDescriptor::new("db", transport.clone())).await.unwrap();

        registry.shutdown().await;
        assert_eq!(transport.closed(), 1);
        assert!(registry.is_empty());
    }
}
