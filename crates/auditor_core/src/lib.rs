//! Auditor core: pure state machine and view-model helpers.
mod effect;
mod msg;
mod notification;
mod session;
mod state;
mod task_form;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::{Msg, TaskField, TaskList};
pub use notification::{Notification, DEFAULT_NOTIFICATION_MS};
pub use session::{
    BrokenLinkRecord, CheckSession, ProgressEvent, SessionId, SessionStatus, StatusCode,
};
pub use state::AppState;
pub use task_form::{CreateTaskRequest, EmployeeOption, ProjectOption, TaskForm};
pub use update::update;
pub use view_model::{
    AppViewModel, BrokenLinkRow, NotificationView, SessionView, TaskFormView, LINK_TEXT_PLACEHOLDER,
};
