use std::path::PathBuf;

use crate::{EmployeeOption, ProgressEvent, ProjectOption, SessionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User edited the target URL input.
    UrlInputChanged(String),
    /// User submitted the current target URL for checking.
    CheckSubmitted,
    /// One decoded message from the progress stream.
    StreamEvent {
        session_id: SessionId,
        event: ProgressEvent,
    },
    /// Transport failure or undecodable payload on the progress stream.
    StreamFailed {
        session_id: SessionId,
        message: String,
    },
    /// The server ended the stream.
    StreamClosed { session_id: SessionId },
    /// User asked for a CSV export of the current results.
    ExportClicked,
    ExportSucceeded { path: String },
    ExportFailed { message: String },
    /// User closed the notification banner.
    NotificationDismissed,
    /// Clock tick driving notification timers.
    Tick { elapsed_ms: u64 },
    /// The task form became visible; pick lists should be loaded.
    TaskFormOpened,
    /// Only one pick list is needed.
    TaskListRequested(TaskList),
    TaskFieldChanged(TaskField),
    TaskSubmitted,
    ProjectsLoaded(Vec<ProjectOption>),
    EmployeesLoaded(Vec<EmployeeOption>),
    ListLoadFailed { list: TaskList, message: String },
    TaskCreated { task_id: String },
    TaskCreateFailed { message: String },
    AttachmentUploaded { file_url: String },
    AttachmentUploadFailed { message: String },
    /// Fallback for placeholder wiring.
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskField {
    Name(String),
    Description(String),
    DueDate(String),
    Assignee(Option<String>),
    Project(Option<String>),
    Attachment(Option<PathBuf>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskList {
    Projects,
    Employees,
}
