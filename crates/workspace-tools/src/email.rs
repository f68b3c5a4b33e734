//! Email Outbox
//!
//! Accepts messages and records them instead of relaying over SMTP.

use agent_core::{
    connection::ProviderResponse,
    tool::{Arguments, ParameterSchema, ToolSpec},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{Result, WorkspaceError};
use crate::service::{WorkspaceService, optional_str, require_str};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentEmail {
    pub id: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub html_body: Option<String>,
    pub sent_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct Mailer {
    outbox: Mutex<Vec<SentEmail>>,
}

impl Mailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message; returns its id
    pub async fn send(&self, to: &str, subject: &str, body: &str, html_body: Option<&str>) -> Result<String> {
        if !is_valid_address(to) {
            return Err(WorkspaceError::InvalidAddress(to.into()));
        }

        let email = SentEmail {
            id: Uuid::new_v4().to_string(),
            to: to.trim().into(),
            subject: subject.into(),
            body: body.into(),
            html_body: html_body.map(Into::into),
            sent_at: Utc::now(),
        };
        let id = email.id.clone();

        tracing::info!(to = %email.to, subject = %email.subject, "Email queued");
        self.outbox.lock().await.push(email);
        Ok(id)
    }

    pub async fn outbox(&self) -> Vec<SentEmail> {
        self.outbox.lock().await.clone()
    }
}

fn is_valid_address(address: &str) -> bool {
    let address = address.trim();
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !address.contains(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

#[async_trait]
impl WorkspaceService for Mailer {
    fn tools(&self) -> Vec<ToolSpec> {
        vec![ToolSpec {
            name: "send_email".into(),
            description: "Send an email to a single recipient.".into(),
            parameters: vec![
                ParameterSchema::required("to_email", "string", "Recipient address"),
                ParameterSchema::required("subject", "string", "Subject line"),
                ParameterSchema::required("body", "string", "Plain-text body"),
                ParameterSchema::optional("html_body", "string", "Optional HTML body"),
            ],
            default_arguments: None,
            examples: vec![json!({
                "to_email": "jane@example.com",
                "subject": "Interview invitation",
                "body": "Hi Jane, we'd like to schedule an interview."
            })],
        }]
    }

    async fn call(&self, tool: &str, arguments: &Arguments) -> Result<ProviderResponse> {
        if tool != "send_email" {
            return Err(WorkspaceError::UnknownTool(tool.into()));
        }

        let to = require_str(arguments, "to_email")?;
        self.send(
            to,
            require_str(arguments, "subject")?,
            require_str(arguments, "body")?,
            optional_str(arguments, "html_body")?,
        )
        .await?;

        Ok(ProviderResponse::text(format!("Email sent successfully to {}", to.trim())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::tool::{CallStatus, ContentPart};

    #[test]
    fn test_address_validation() {
        assert!(is_valid_address("jane@example.com"));
        assert!(is_valid_address(" jane.doe@mail.example.org "));
        for bad in [
            "",
            "jane",
            "@example.com",
            "jane@",
            "jane@example",
            "jane@@example.com",
            "ja ne@example.com",
            "jane@example..com",
        ] {
            assert!(!is_valid_address(bad), "{bad} should be rejected");
        }
    }

    #[tokio::test]
    async fn test_send_records_outbox() {
        let mailer = Mailer::new();
        let arguments = json!({
            "to_email": "jane@example.com",
            "subject": "Interview",
            "body": "Tuesday at 10?",
            "html_body": null
        })
        .as_object()
        .cloned()
        .unwrap();

        let response = mailer.call("send_email", &arguments).await.unwrap();
        assert_eq!(response.status, CallStatus::Success);
        assert_eq!(response.content[0], ContentPart::Text("Email sent successfully to jane@example.com".into()));

        let outbox = mailer.outbox().await;
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].subject, "Interview");
        assert_eq!(outbox[0].html_body, None);
    }

    #[tokio::test]
    async fn test_invalid_recipient() {
        let mailer = Mailer::new();
        let err = mailer.send("not-an-address", "s", "b", None).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email address: not-an-address");
        assert!(mailer.outbox().await.is_empty());
    }
}
