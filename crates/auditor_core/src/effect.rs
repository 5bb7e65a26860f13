use std::path::PathBuf;

use crate::{BrokenLinkRecord, CreateTaskRequest, SessionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open the progress stream for a freshly started session.
    OpenStream {
        session_id: SessionId,
        target_url: String,
    },
    /// Release the stream of a session. Idempotent on the engine side.
    CloseStream { session_id: SessionId },
    /// Write the given records as `broken_links.csv`.
    ExportCsv { records: Vec<BrokenLinkRecord> },
    FetchProjects,
    FetchEmployees,
    CreateTask { request: CreateTaskRequest },
    UploadAttachment { task_id: String, path: PathBuf },
}
