//! File Store
//!
//! A read-only drive of files grouped in folders.

use agent_core::{
    connection::ProviderResponse,
    tool::{Arguments, ParameterSchema, ToolSpec},
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Result, WorkspaceError};
use crate::service::{WorkspaceService, optional_str, optional_usize, require_str};

pub const ROOT_FOLDER: &str = "root";
const DEFAULT_LIMIT: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: Option<u64>,
    pub parents: Vec<String>,
    pub owner: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl DriveFile {
    fn summary(&self) -> String {
        format!(
            "{} ({}) - {} - modified {}",
            self.name,
            self.id,
            self.mime_type,
            self.modified.to_rfc3339()
        )
    }

    fn in_folder(&self, folder_id: Option<&str>) -> bool {
        folder_id.is_none_or(|folder| self.parents.iter().any(|p| p == folder))
    }
}

pub struct Drive {
    files: Vec<DriveFile>,
}

impl Drive {
    pub const fn new(files: Vec<DriveFile>) -> Self {
        Self { files }
    }

    /// Demo drive: a resumes folder and a few loose documents
    pub fn seeded() -> Self {
        let at = |day: u32| Utc.with_ymd_and_hms(2025, 3, day, 9, 30, 0).single().unwrap_or_default();
        let file = |id: &str, name: &str, mime: &str, size: Option<u64>, parent: &str, day: u32| DriveFile {
            id: id.into(),
            name: name.into(),
            mime_type: mime.into(),
            size,
            parents: vec![parent.into()],
            owner: "recruiting@hireln.dev".into(),
            created: at(day),
            modified: at(day + 1),
        };

        Self::new(vec![
            file("resumes", "Applicants", "application/vnd.google-apps.folder", None, ROOT_FOLDER, 1),
            file("f-1001", "priya_natarajan_resume.pdf", "application/pdf", Some(182_340), "resumes", 3),
            file("f-1002", "marco_rossi_resume.pdf", "application/pdf", Some(204_811), "resumes", 4),
            file(
                "f-1003",
                "sofia_alvarez_resume.docx",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                Some(58_112),
                "resumes",
                6,
            ),
            file("f-2001", "interview_rubric.md", "text/markdown", Some(4_210), ROOT_FOLDER, 2),
            file("f-2002", "Hiring Plan 2025", "application/vnd.google-apps.document", None, ROOT_FOLDER, 5),
        ])
    }

    pub fn list(&self, folder_id: Option<&str>, limit: usize) -> Vec<&DriveFile> {
        self.files.iter().filter(|f| f.in_folder(folder_id)).take(limit).collect()
    }

    /// Case-insensitive name match
    pub fn search(&self, query: &str, folder_id: Option<&str>) -> Vec<&DriveFile> {
        let needle = query.to_lowercase();
        self.files
            .iter()
            .filter(|f| f.in_folder(folder_id) && f.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn get(&self, file_id: &str) -> Result<&DriveFile> {
        self.files
            .iter()
            .find(|f| f.id == file_id)
            .ok_or_else(|| WorkspaceError::FileNotFound(file_id.into()))
    }
}

fn render(files: &[&DriveFile]) -> String {
    files.iter().map(|f| f.summary()).collect::<Vec<_>>().join("\n")
}

#[async_trait]
impl WorkspaceService for Drive {
    fn tools(&self) -> Vec<ToolSpec> {
        let folder = || ParameterSchema::optional("folder_id", "string", "Folder to look in; omit for the whole drive");

        vec![
            ToolSpec {
                name: "list_files".into(),
                description: "List files from the drive.".into(),
                parameters: vec![
                    folder(),
                    ParameterSchema::optional("limit", "integer", "Number of files to return")
                        .with_default(json!(DEFAULT_LIMIT)),
                ],
                default_arguments: json!({"folder_id": ROOT_FOLDER}).as_object().cloned(),
                examples: vec![json!({"folder_id": "resumes", "limit": 5})],
            },
            ToolSpec {
                name: "search_files".into(),
                description: "Search files in the drive by name.".into(),
                parameters: vec![
                    ParameterSchema::required("query", "string", "Text to search in file names"),
                    folder(),
                ],
                default_arguments: json!({"folder_id": ROOT_FOLDER}).as_object().cloned(),
                examples: vec![json!({"folder_id": "resumes", "query": "resume"})],
            },
            ToolSpec {
                name: "get_file_metadata".into(),
                description: "Fetch metadata for a specific file.".into(),
                parameters: vec![ParameterSchema::required("file_id", "string", "ID of the file")],
                default_arguments: json!({"folder_id": ROOT_FOLDER}).as_object().cloned(),
                examples: vec![json!({"file_id": "f-1001"})],
            },
        ]
    }

    async fn call(&self, tool: &str, arguments: &Arguments) -> Result<ProviderResponse> {
        match tool {
            "list_files" => {
                let folder_id = optional_str(arguments, "folder_id")?;
                let limit = optional_usize(arguments, "limit")?.unwrap_or(DEFAULT_LIMIT);
                let files = self.list(folder_id, limit);
                if files.is_empty() {
                    return Ok(ProviderResponse::text("No files found."));
                }
                Ok(ProviderResponse::text(render(&files)))
            }
            "search_files" => {
                let query = require_str(arguments, "query")?;
                let files = self.search(query, optional_str(arguments, "folder_id")?);
                if files.is_empty() {
                    return Ok(ProviderResponse::text(format!("No files found for query '{query}'.")));
                }
                Ok(ProviderResponse::text(render(&files)))
            }
            "get_file_metadata" => {
                let file = self.get(require_str(arguments, "file_id")?)?;
                Ok(ProviderResponse::structured(json!({
                    "id": file.id,
                    "name": file.name,
                    "type": file.mime_type,
                    "size": file.size.map_or_else(|| "unknown".to_string(), |s| s.to_string()),
                    "created": file.created.to_rfc3339(),
                    "modified": file.modified.to_rfc3339(),
                    "owner": file.owner,
                })))
            }
            other => Err(WorkspaceError::UnknownTool(other.into())),
        }
    }

    fn concurrent(&self) -> bool {
        true
    }
}
