//! # workspace-tools
//!
//! In-process reference tool providers for a hiring workspace:
//!
//! | Provider | Tools                                            |
//! |----------|--------------------------------------------------|
//! | `db`     | `get_users`, `get_candidate_info`                |
//! | `sheets` | `read_sheet`, `append_row`, `update_cell`        |
//! | `drive`  | `list_files`, `search_files`, `get_file_metadata`|
//! | `email`  | `send_email`                                     |
//!
//! Each one is a [`WorkspaceService`] exposed through [`ServiceTransport`],
//! so the agent reaches them exactly like remote providers.

pub mod database;
pub mod drive;
pub mod email;
pub mod error;
pub mod service;
pub mod sheets;

use std::sync::Arc;

use agent_core::ProviderDescriptor;

pub use database::Database;
pub use drive::Drive;
pub use email::Mailer;
pub use error::{Result, WorkspaceError};
pub use service::{ServiceTransport, WorkspaceService};
pub use sheets::Spreadsheet;

/// Handles to every reference provider
#[derive(Clone)]
pub struct Workspace {
    pub database: Arc<Database>,
    pub sheets: Arc<Spreadsheet>,
    pub drive: Arc<Drive>,
    pub mailer: Arc<Mailer>,
}

impl Workspace {
    /// All providers loaded with demo data
    pub fn seeded() -> Self {
        Self {
            database: Arc::new(Database::seeded()),
            sheets: Arc::new(Spreadsheet::seeded()),
            drive: Arc::new(Drive::seeded()),
            mailer: Arc::new(Mailer::new()),
        }
    }

    /// Provider descriptors for agent bootstrap
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        vec![
            ServiceTransport::descriptor("db", self.database.clone()),
            ServiceTransport::descriptor("sheets", self.sheets.clone()),
            ServiceTransport::descriptor("drive", self.drive.clone()),
            ServiceTransport::descriptor("email", self.mailer.clone()),
        ]
    }
}

/// Seeded reference providers, ready to register
pub fn builtin_providers() -> Vec<ProviderDescriptor> {
    Workspace::seeded().descriptors()
}
