use auditor_core::{
    AppViewModel, BrokenLinkRow, EmployeeOption, NotificationView, ProjectOption, SessionStatus,
    SessionView,
};
use owo_colors::OwoColorize;

const BAR_WIDTH: usize = 30;
/// Notification countdown granularity in percent.
const COUNTDOWN_STEP: f64 = 25.0;
const TABLE_HEADER: [&str; 5] = ["#", "Broken Link", "Link Text", "Page Found", "Status"];

/// Text rendition of one view model, split into independently refreshed parts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub status: Option<String>,
    pub progress: Option<String>,
    pub table: Vec<String>,
    pub notification: Option<String>,
    pub notice: Option<String>,
}

impl Frame {
    /// Lines of `self` that differ from `previous`, in display order.
    pub fn changed_lines(&self, previous: &Frame) -> Vec<String> {
        let mut lines = Vec::new();
        if self.status != previous.status {
            lines.extend(self.status.clone());
        }
        if self.progress != previous.progress {
            lines.extend(self.progress.clone());
        }
        if self.table != previous.table {
            lines.extend(self.table.iter().cloned());
        }
        if self.notification != previous.notification {
            lines.extend(self.notification.clone());
        }
        if self.notice != previous.notice {
            lines.extend(self.notice.clone());
        }
        lines
    }
}

pub fn render(view: &AppViewModel, color: bool) -> Frame {
    Frame {
        status: status_line(&view.session, view.submit_label),
        progress: progress_line(&view.session),
        table: if view.session.status == SessionStatus::Completed {
            table_lines(&view.rows, color)
        } else {
            Vec::new()
        },
        notification: view
            .notification
            .as_ref()
            .map(|notification| notification_line(notification, color)),
        notice: view.notice.clone(),
    }
}

fn status_line(session: &SessionView, submit_label: &str) -> Option<String> {
    match session.status {
        SessionStatus::Idle => None,
        SessionStatus::Running => Some(format!("{submit_label} {}", session.target_url)),
        SessionStatus::Completed => Some(format!("Check of {} completed", session.target_url)),
        SessionStatus::Errored => Some(format!("Check of {} failed", session.target_url)),
    }
}

fn progress_line(session: &SessionView) -> Option<String> {
    let label = session.progress_label.as_ref()?;
    let filled = ((session.fraction * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    Some(format!(
        "[{}{}] {:>3}% {}",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        session.percent,
        label
    ))
}

fn table_lines(rows: &[BrokenLinkRow], color: bool) -> Vec<String> {
    if rows.is_empty() {
        return vec!["No broken links found.".to_string()];
    }
    let cells: Vec<[String; 5]> = rows
        .iter()
        .map(|row| {
            [
                row.index.to_string(),
                row.link.clone(),
                row.link_text.clone(),
                row.page_url.clone(),
                row.status.clone(),
            ]
        })
        .collect();

    let mut widths = TABLE_HEADER.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(join_cells(TABLE_HEADER.iter().copied(), &widths));
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for (row, cell) in rows.iter().zip(&cells) {
        let mut line = join_cells(cell[..4].iter().map(String::as_str), &widths[..4]);
        line.push_str("  ");
        line.push_str(&status_cell(&row.status, row.success, color));
        lines.push(line);
    }
    lines
}

fn join_cells<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Red for failed links, green otherwise.
fn status_cell(status: &str, success: bool, color: bool) -> String {
    if !color {
        return status.to_string();
    }
    if success {
        status.green().to_string()
    } else {
        status.red().to_string()
    }
}

fn notification_line(notification: &NotificationView, color: bool) -> String {
    let remaining =
        ((notification.remaining_percent / COUNTDOWN_STEP).ceil() * COUNTDOWN_STEP) as u32;
    if color {
        format!("{} ({remaining}%)", notification.message.red().bold())
    } else {
        format!("! {} ({remaining}%)", notification.message)
    }
}

pub fn project_lines(projects: &[ProjectOption]) -> Vec<String> {
    projects
        .iter()
        .map(|project| format!("{}\t{}", project.id, project.name))
        .collect()
}

pub fn employee_lines(employees: &[EmployeeOption]) -> Vec<String> {
    employees
        .iter()
        .map(|employee| format!("{}\t{}", employee.id, employee.display_name()))
        .collect()
}
