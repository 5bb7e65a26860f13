use auditor_logging::{auditor_debug, auditor_info, auditor_warn};

use crate::session::Transition;
use crate::{AppState, Effect, Msg, SessionId, TaskField, TaskList};

const STREAM_LOST_MESSAGE: &str = "Connection to the link checker closed before the check completed";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::UrlInputChanged(input) => {
            state.set_url_input(input);
            Vec::new()
        }
        Msg::CheckSubmitted => {
            let target_url = state.url_input().trim().to_string();
            if target_url.is_empty() {
                return (state, Vec::new());
            }

            // Only one connection may be open: drop the previous one first.
            let mut effects = Vec::with_capacity(2);
            if state.session().is_running() {
                effects.push(Effect::CloseStream {
                    session_id: state.session().id(),
                });
            }
            let session_id = state.start_session(target_url.clone());
            auditor_info!("session {} checking {}", session_id, target_url);
            effects.push(Effect::OpenStream {
                session_id,
                target_url,
            });
            effects
        }
        Msg::StreamEvent { session_id, event } => {
            let transition = state.apply_stream_event(session_id, event);
            close_on_terminal(session_id, &transition)
        }
        Msg::StreamFailed {
            session_id,
            message,
        } => {
            let transition = state.fail_session(session_id, message);
            close_on_terminal(session_id, &transition)
        }
        Msg::StreamClosed { session_id } => {
            let transition = state.fail_session(session_id, STREAM_LOST_MESSAGE.to_string());
            close_on_terminal(session_id, &transition)
        }
        Msg::ExportClicked => {
            let records = state.session().broken_links().to_vec();
            if records.is_empty() {
                Vec::new()
            } else {
                vec![Effect::ExportCsv { records }]
            }
        }
        Msg::ExportSucceeded { path } => {
            state.set_notice(format!("Saved {path}"));
            Vec::new()
        }
        Msg::ExportFailed { message } => {
            state.show_notification(format!("Export failed: {message}"));
            Vec::new()
        }
        Msg::NotificationDismissed => {
            state.dismiss_notification();
            Vec::new()
        }
        Msg::Tick { elapsed_ms } => {
            state.advance_notification(elapsed_ms);
            Vec::new()
        }
        Msg::TaskFormOpened => vec![Effect::FetchProjects, Effect::FetchEmployees],
        Msg::TaskListRequested(list) => match list {
            TaskList::Projects => vec![Effect::FetchProjects],
            TaskList::Employees => vec![Effect::FetchEmployees],
        },
        Msg::TaskFieldChanged(field) => {
            apply_task_field(&mut state, field);
            Vec::new()
        }
        Msg::TaskSubmitted => {
            if state.task_form.is_busy() {
                return (state, Vec::new());
            }
            match state.task_form.build_request() {
                Ok(request) => {
                    state.task_form.submitting = true;
                    state.mark_dirty();
                    vec![Effect::CreateTask { request }]
                }
                Err(reason) => {
                    state.show_notification(reason);
                    Vec::new()
                }
            }
        }
        Msg::ProjectsLoaded(projects) => {
            state.task_form.projects = projects;
            state.mark_dirty();
            Vec::new()
        }
        Msg::EmployeesLoaded(employees) => {
            state.task_form.employees = employees;
            state.mark_dirty();
            Vec::new()
        }
        Msg::ListLoadFailed { list, message } => {
            let name = match list {
                TaskList::Projects => "projects",
                TaskList::Employees => "employees",
            };
            auditor_warn!("Failed to fetch {}: {}", name, message);
            Vec::new()
        }
        Msg::TaskCreated { task_id } => {
            let form = &mut state.task_form;
            form.submitting = false;
            form.last_task_id = Some(task_id.clone());
            let effects = match form.attachment.clone() {
                Some(path) => {
                    form.uploading = true;
                    vec![Effect::UploadAttachment { task_id, path }]
                }
                None => {
                    form.reset_fields();
                    Vec::new()
                }
            };
            state.set_notice("Task added successfully!");
            effects
        }
        Msg::TaskCreateFailed { message } => {
            state.task_form.submitting = false;
            state.show_notification(format!("Failed to add task: {message}"));
            Vec::new()
        }
        Msg::AttachmentUploaded { file_url } => {
            auditor_info!("Attachment uploaded successfully: {}", file_url);
            state.task_form.last_file_url = Some(file_url);
            state.task_form.reset_fields();
            state.mark_dirty();
            Vec::new()
        }
        Msg::AttachmentUploadFailed { message } => {
            auditor_warn!("Attachment upload failed: {}", message);
            // The task exists already; only the file is missing.
            state.task_form.reset_fields();
            state.show_notification("Failed to upload attachment".to_string());
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn close_on_terminal(session_id: SessionId, transition: &Transition) -> Vec<Effect> {
    match transition {
        Transition::Completed | Transition::Errored { .. } => {
            auditor_debug!("session {} reached a terminal state", session_id);
            vec![Effect::CloseStream { session_id }]
        }
        Transition::Ignored | Transition::Updated => Vec::new(),
    }
}

fn apply_task_field(state: &mut AppState, field: TaskField) {
    let form = &mut state.task_form;
    match field {
        TaskField::Name(value) => form.task_name = value,
        TaskField::Description(value) => form.description = value,
        TaskField::DueDate(value) => form.due_date = value,
        TaskField::Assignee(value) => form.assignee = value,
        TaskField::Project(value) => form.project = value,
        TaskField::Attachment(value) => form.attachment = value,
    }
    state.mark_dirty();
}
