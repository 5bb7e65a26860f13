use crate::{
    CheckSession, EmployeeOption, Notification, ProjectOption, SessionId, SessionStatus, TaskForm,
};

/// Shown in place of a missing or empty link text.
pub const LINK_TEXT_PLACEHOLDER: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub url_input: String,
    pub submit_label: &'static str,
    pub submit_enabled: bool,
    pub session: SessionView,
    pub rows: Vec<BrokenLinkRow>,
    pub can_export: bool,
    pub notification: Option<NotificationView>,
    pub notice: Option<String>,
    pub task_form: TaskFormView,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionView {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub target_url: String,
    pub processed: u64,
    pub total: u64,
    pub fraction: f64,
    /// `fraction * 100`, rounded for display.
    pub percent: u32,
    /// Present once the page total is known.
    pub progress_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenLinkRow {
    /// 1-based position in the result table.
    pub index: usize,
    pub link: String,
    pub link_text: String,
    pub page_url: String,
    pub status: String,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationView {
    pub message: String,
    pub remaining_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskFormView {
    pub task_name: String,
    pub due_date: String,
    pub assignee: Option<String>,
    pub project: Option<String>,
    pub has_attachment: bool,
    pub busy: bool,
    pub projects: Vec<ProjectOption>,
    pub employees: Vec<EmployeeOption>,
    pub last_task_id: Option<String>,
    pub last_file_url: Option<String>,
}

pub(crate) fn build(
    url_input: &str,
    session: &CheckSession,
    notification: &Notification,
    task_form: &TaskForm,
    notice: Option<&str>,
    dirty: bool,
) -> AppViewModel {
    let running = session.is_running();
    let rows: Vec<BrokenLinkRow> = session
        .broken_links()
        .iter()
        .enumerate()
        .map(|(i, record)| BrokenLinkRow {
            index: i + 1,
            link: record.link.clone(),
            link_text: record
                .link_text
                .as_deref()
                .filter(|text| !text.is_empty())
                .unwrap_or(LINK_TEXT_PLACEHOLDER)
                .to_string(),
            page_url: record.page_url.clone(),
            status: record.status_code.to_string(),
            success: record.success,
        })
        .collect();

    AppViewModel {
        url_input: url_input.to_string(),
        submit_label: if running { "Checking..." } else { "Check Links" },
        submit_enabled: !running,
        session: session_view(session),
        can_export: !rows.is_empty(),
        rows,
        notification: notification.message().map(|message| NotificationView {
            message: message.to_string(),
            remaining_percent: notification.progress_percent(),
        }),
        notice: notice.map(ToOwned::to_owned),
        task_form: TaskFormView {
            task_name: task_form.task_name.clone(),
            due_date: task_form.due_date.clone(),
            assignee: task_form.assignee.clone(),
            project: task_form.project.clone(),
            has_attachment: task_form.attachment.is_some(),
            busy: task_form.is_busy(),
            projects: task_form.projects.clone(),
            employees: task_form.employees.clone(),
            last_task_id: task_form.last_task_id.clone(),
            last_file_url: task_form.last_file_url.clone(),
        },
        dirty,
    }
}

fn session_view(session: &CheckSession) -> SessionView {
    let fraction = session.progress_fraction();
    let total = session.total_count();
    SessionView {
        session_id: session.id(),
        status: session.status(),
        target_url: session.target_url().to_string(),
        processed: session.processed_count(),
        total,
        fraction,
        percent: (fraction * 100.0).round() as u32,
        progress_label: (total > 0).then(|| {
            format!(
                "Processed {} out of {} web pages",
                session.processed_count(),
                total
            )
        }),
    }
}
