//! Hiring Database
//!
//! Users and candidates, queried read-only.

use agent_core::{
    connection::ProviderResponse,
    tool::{Arguments, ToolSpec},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Result, WorkspaceError};
use crate::service::WorkspaceService;

/// Rows returned per query
const PAGE_SIZE: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub email: String,
    pub technical_skills: Vec<String>,
}

pub struct Database {
    users: Vec<User>,
    candidates: Vec<Candidate>,
}

impl Database {
    pub const fn new(users: Vec<User>, candidates: Vec<Candidate>) -> Self {
        Self { users, candidates }
    }

    /// Demo data set
    pub fn seeded() -> Self {
        let users = [
            "alice@hireln.dev",
            "bob@hireln.dev",
            "carol@hireln.dev",
            "dave@hireln.dev",
            "erin@hireln.dev",
            "frank@hireln.dev",
        ]
        .iter()
        .zip(1..)
        .map(|(email, id)| User { id, email: (*email).into() })
        .collect();

        let candidate = |name: &str, email: &str, skills: &[&str]| Candidate {
            name: name.into(),
            email: email.into(),
            technical_skills: skills.iter().map(|s| (*s).to_string()).collect(),
        };
        let candidates = vec![
            candidate("Priya Natarajan", "priya.n@example.com", &["Rust", "PostgreSQL", "Kubernetes"]),
            candidate("Marco Rossi", "marco.rossi@example.com", &["Python", "Django", "AWS"]),
            candidate("Lena Fischer", "lena.f@example.com", &["TypeScript", "React", "GraphQL"]),
            candidate("Kwame Mensah", "kwame.m@example.com", &["Go", "gRPC", "Terraform"]),
            candidate("Sofia Alvarez", "sofia.a@example.com", &["Rust", "WebAssembly", "C++"]),
            candidate("Tom Becker", "tom.b@example.com", &["Java", "Spring"]),
        ];

        Self::new(users, candidates)
    }

    pub fn users(&self) -> &[User] {
        &self.users[..self.users.len().min(PAGE_SIZE)]
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates[..self.candidates.len().min(PAGE_SIZE)]
    }
}

#[async_trait]
impl WorkspaceService for Database {
    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "get_users".into(),
                description: "Get the first 5 users (id and email).".into(),
                parameters: Vec::new(),
                default_arguments: None,
                examples: vec![json!({})],
            },
            ToolSpec {
                name: "get_candidate_info".into(),
                description: "Fetch candidate information (name, email, and technical skills).".into(),
                parameters: Vec::new(),
                default_arguments: None,
                examples: vec![json!({})],
            },
        ]
    }

    async fn call(&self, tool: &str, _arguments: &Arguments) -> Result<ProviderResponse> {
        match tool {
            "get_users" => Ok(ProviderResponse::structured(serde_json::to_value(self.users())?)),
            "get_candidate_info" => {
                let lines: Vec<String> = self
                    .candidates()
                    .iter()
                    .map(|c| {
                        format!(
                            "Name: {}, Email: {}, Skills: {}",
                            c.name,
                            c.email,
                            c.technical_skills.join(", ")
                        )
                    })
                    .collect();
                Ok(ProviderResponse::text(lines.join("\n")))
            }
            other => Err(WorkspaceError::UnknownTool(other.into())),
        }
    }

    fn concurrent(&self) -> bool {
        true
    }
}
