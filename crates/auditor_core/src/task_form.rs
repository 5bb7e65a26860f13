use std::path::PathBuf;

use chrono::NaiveDate;

const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectOption {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeOption {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}

impl EmployeeOption {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Body of a create-task call, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    pub task_name: String,
    pub description: String,
    pub due_date: String,
    pub user_id: Option<String>,
    pub project_id: Option<String>,
    pub collaborators: Vec<String>,
}

/// Component-local state of the task creation form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskForm {
    pub(crate) task_name: String,
    pub(crate) description: String,
    pub(crate) due_date: String,
    pub(crate) assignee: Option<String>,
    pub(crate) project: Option<String>,
    pub(crate) attachment: Option<PathBuf>,
    pub(crate) projects: Vec<ProjectOption>,
    pub(crate) employees: Vec<EmployeeOption>,
    pub(crate) submitting: bool,
    pub(crate) uploading: bool,
    pub(crate) last_task_id: Option<String>,
    pub(crate) last_file_url: Option<String>,
}

impl TaskForm {
    pub fn attachment(&self) -> Option<&PathBuf> {
        self.attachment.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.submitting || self.uploading
    }

    /// Clears the user-entered fields. Loaded pick lists survive.
    pub(crate) fn reset_fields(&mut self) {
        self.task_name.clear();
        self.description.clear();
        self.assignee = None;
        self.project = None;
        self.attachment = None;
        self.submitting = false;
        self.uploading = false;
    }

    /// Builds the request body, or a user-facing reason why the form is incomplete.
    pub(crate) fn build_request(&self) -> Result<CreateTaskRequest, String> {
        let task_name = self.task_name.trim();
        if task_name.is_empty() {
            return Err("Task name is required".to_string());
        }
        let due_date = self.due_date.trim();
        if NaiveDate::parse_from_str(due_date, DUE_DATE_FORMAT).is_err() {
            return Err(format!("Due date must be YYYY-MM-DD, got '{due_date}'"));
        }
        let assignee = non_empty(self.assignee.as_deref());
        Ok(CreateTaskRequest {
            task_name: task_name.to_string(),
            description: self.description.trim().to_string(),
            due_date: due_date.to_string(),
            user_id: assignee.clone(),
            project_id: non_empty(self.project.as_deref()),
            collaborators: assignee.into_iter().collect(),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> TaskForm {
        TaskForm {
            task_name: "  Fix footer links ".to_string(),
            description: "404s on /about".to_string(),
            due_date: "2024-11-23".to_string(),
            assignee: Some("emp-7".to_string()),
            project: Some(" ".to_string()),
            ..TaskForm::default()
        }
    }

    #[test]
    fn request_uses_assignee_as_collaborator() {
        let request = filled().build_request().unwrap();
        assert_eq!(request.task_name, "Fix footer links");
        assert_eq!(request.user_id.as_deref(), Some("emp-7"));
        assert_eq!(request.collaborators, vec!["emp-7".to_string()]);
        assert_eq!(request.project_id, None);
    }

    #[test]
    fn rejects_bad_due_date() {
        let form = TaskForm {
            due_date: "23/11/2024".to_string(),
            ..filled()
        };
        let err = form.build_request().unwrap_err();
        assert!(err.contains("YYYY-MM-DD"));
    }

    #[test]
    fn reset_keeps_pick_lists() {
        let mut form = TaskForm {
            projects: vec![ProjectOption {
                id: "p1".to_string(),
                name: "Site".to_string(),
            }],
            ..filled()
        };
        form.reset_fields();
        assert!(form.task_name.is_empty());
        assert_eq!(form.assignee, None);
        assert_eq!(form.projects.len(), 1);
        assert_eq!(form.due_date, "2024-11-23");
    }
}
