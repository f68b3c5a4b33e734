//! HTTP Tool Transport
//!
//! Reaches a remote tool provider over plain HTTP:
//!
//! ```text
//! POST {base}/initialize
//! GET  {base}/tools                          -> [ToolSpec]
//! POST {base}/call {tool_name, arguments}    -> {status, content}
//! ```

use std::time::Duration;

use agent_core::{
    connection::{ProviderResponse, ProviderTransport},
    error::{AgentError, Result},
    tool::{Arguments, ToolSpec},
};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct CallRequest<'a> {
    tool_name: &'a str,
    arguments: &'a Arguments,
}

/// Provider transport over HTTP
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(AgentError::Config(format!("provider URL must be http(s): {base_url}")));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{route}", self.base_url)
    }

    fn transport_error(&self, reason: impl std::fmt::Display) -> AgentError {
        AgentError::Transport {
            provider: self.base_url.clone(),
            reason: reason.to_string(),
        }
    }

    async fn check(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(self.transport_error(format!("HTTP {status}: {body}")))
    }
}

#[async_trait]
impl ProviderTransport for HttpTransport {
    async fn initialize(&self) -> Result<()> {
        let response = self
            .client
            .post(self.url("initialize"))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.check(response).await?;

        tracing::debug!(url = %self.base_url, "HTTP provider initialized");
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ToolSpec>> {
        let response = self
            .client
            .get(self.url("tools"))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.check(response)
            .await?
            .json()
            .await
            .map_err(|e| self.transport_error(format!("invalid tool list: {e}")))
    }

    async fn call_tool(&self, tool_name: &str, arguments: &Arguments) -> Result<ProviderResponse> {
        let response = self
            .client
            .post(self.url("call"))
            .json(&CallRequest { tool_name, arguments })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.check(response)
            .await?
            .json()
            .await
            .map_err(|e| self.transport_error(format!("invalid tool response: {e}")))
    }

    /// Each request is independent
    fn supports_multiplexing(&self) -> bool {
        true
    }
}
