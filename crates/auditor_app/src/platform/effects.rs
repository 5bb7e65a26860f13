use std::path::PathBuf;
use std::time::Duration;

use auditor_core::{
    BrokenLinkRecord, CreateTaskRequest, Effect, EmployeeOption, Msg, ProgressEvent,
    ProjectOption, StatusCode, TaskList,
};
use auditor_engine::{
    export_broken_links, BrokenLink, Employee, EngineEvent, EngineHandle, NewTask, Project,
    StreamEnd, WireEvent, WireStatusCode,
};
use auditor_logging::{auditor_debug, auditor_info, auditor_warn};

const UNKNOWN_STATUS: &str = "unknown";

/// Turns core effects into engine commands and engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
    output_dir: PathBuf,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, output_dir: PathBuf) -> Self {
        Self { engine, output_dir }
    }

    /// Runs `effects`. Work that completes synchronously (the CSV export)
    /// reports back through the returned messages.
    pub fn run(&self, effects: Vec<Effect>) -> Vec<Msg> {
        let mut follow_ups = Vec::new();
        for effect in effects {
            match effect {
                Effect::OpenStream {
                    session_id,
                    target_url,
                } => {
                    auditor_info!("OpenStream session_id={} url={}", session_id, target_url);
                    self.engine.open_stream(session_id, target_url);
                }
                Effect::CloseStream { session_id } => self.engine.close_stream(session_id),
                Effect::ExportCsv { records } => follow_ups.push(self.export(&records)),
                Effect::FetchProjects => self.engine.fetch_projects(),
                Effect::FetchEmployees => self.engine.fetch_employees(),
                Effect::CreateTask { request } => self.engine.create_task(map_request(request)),
                Effect::UploadAttachment { task_id, path } => {
                    self.engine.upload_attachment(task_id, path)
                }
            }
        }
        follow_ups
    }

    /// Waits up to `timeout` for the next engine event and maps it to a message.
    pub fn poll(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(map_event)
    }

    fn export(&self, records: &[BrokenLinkRecord]) -> Msg {
        let links: Vec<BrokenLink> = records.iter().map(to_wire_link).collect();
        match export_broken_links(&self.output_dir, &links) {
            Ok(path) => Msg::ExportSucceeded {
                path: path.display().to_string(),
            },
            Err(err) => {
                auditor_warn!("Export to {:?} failed: {}", self.output_dir, err);
                Msg::ExportFailed {
                    message: err.to_string(),
                }
            }
        }
    }
}

pub(crate) fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Stream { session_id, event } => Msg::StreamEvent {
            session_id,
            event: map_wire_event(event),
        },
        EngineEvent::StreamEnded { session_id, result } => match result {
            Ok(end @ (StreamEnd::Terminal | StreamEnd::Cancelled)) => {
                auditor_debug!("session {} stream finished: {:?}", session_id, end);
                Msg::NoOp
            }
            Ok(StreamEnd::Closed) => Msg::StreamClosed { session_id },
            Err(err) => {
                auditor_warn!("session {} stream failed: {}", session_id, err);
                Msg::StreamFailed {
                    session_id,
                    message: err.to_string(),
                }
            }
        },
        EngineEvent::ProjectsLoaded(Ok(projects)) => {
            Msg::ProjectsLoaded(projects.into_iter().map(map_project).collect())
        }
        EngineEvent::ProjectsLoaded(Err(err)) => Msg::ListLoadFailed {
            list: TaskList::Projects,
            message: err.to_string(),
        },
        EngineEvent::EmployeesLoaded(Ok(employees)) => {
            Msg::EmployeesLoaded(employees.into_iter().map(map_employee).collect())
        }
        EngineEvent::EmployeesLoaded(Err(err)) => Msg::ListLoadFailed {
            list: TaskList::Employees,
            message: err.to_string(),
        },
        EngineEvent::TaskCreated(Ok(task_id)) => Msg::TaskCreated { task_id },
        EngineEvent::TaskCreated(Err(err)) => Msg::TaskCreateFailed {
            message: err.to_string(),
        },
        EngineEvent::AttachmentUploaded { task_id, result } => match result {
            Ok(file_url) => Msg::AttachmentUploaded { file_url },
            Err(err) => {
                auditor_warn!("Upload for task {} failed: {}", task_id, err);
                Msg::AttachmentUploadFailed {
                    message: err.to_string(),
                }
            }
        },
    }
}

fn map_wire_event(event: WireEvent) -> ProgressEvent {
    match event {
        WireEvent::Init { total_pages } => ProgressEvent::Init { total_pages },
        WireEvent::Checked {} => ProgressEvent::Checked,
        WireEvent::Completed { broken_links } => ProgressEvent::Completed {
            broken_links: broken_links.into_iter().map(to_record).collect(),
        },
        WireEvent::Error { message } => ProgressEvent::Error { message },
    }
}

fn to_record(link: BrokenLink) -> BrokenLinkRecord {
    BrokenLinkRecord {
        link: link.link,
        link_text: link.link_text,
        page_url: link.page_url,
        status_code: match link.status_code {
            Some(WireStatusCode::Numeric(code)) => StatusCode::Numeric(code),
            Some(WireStatusCode::Text(text)) => StatusCode::Text(text),
            None => StatusCode::Text(UNKNOWN_STATUS.to_string()),
        },
        success: link.success,
    }
}

fn to_wire_link(record: &BrokenLinkRecord) -> BrokenLink {
    BrokenLink {
        link: record.link.clone(),
        link_text: record.link_text.clone(),
        page_url: record.page_url.clone(),
        status_code: Some(match &record.status_code {
            StatusCode::Numeric(code) => WireStatusCode::Numeric(*code),
            StatusCode::Text(text) => WireStatusCode::Text(text.clone()),
        }),
        success: record.success,
    }
}

fn map_request(request: CreateTaskRequest) -> NewTask {
    NewTask {
        task_name: request.task_name,
        description: request.description,
        due_date: request.due_date,
        user_id: request.user_id.unwrap_or_default(),
        project_id: request.project_id.unwrap_or_default(),
        collaborators: request.collaborators,
    }
}

fn map_project(project: Project) -> ProjectOption {
    ProjectOption {
        id: project.id,
        name: project.name,
    }
}

fn map_employee(employee: Employee) -> EmployeeOption {
    EmployeeOption {
        id: employee.id,
        first_name: employee.first_name,
        last_name: employee.last_name,
    }
}

#[cfg(test)]
mod tests {
    use auditor_engine::{ApiError, FailureKind, StreamError};

    use super::*;

    #[test]
    fn completed_event_maps_records() {
        let msg = map_event(EngineEvent::Stream {
            session_id: 3,
            event: WireEvent::Completed {
                broken_links: vec![BrokenLink {
                    link: "https://a.test/x".to_string(),
                    link_text: None,
                    page_url: "https://a.test/".to_string(),
                    status_code: None,
                    success: false,
                }],
            },
        });
        let Msg::StreamEvent {
            session_id,
            event: ProgressEvent::Completed { broken_links },
        } = msg
        else {
            panic!("unexpected message {msg:?}");
        };
        assert_eq!(session_id, 3);
        assert_eq!(
            broken_links[0].status_code,
            StatusCode::Text(UNKNOWN_STATUS.to_string())
        );
    }

    #[test]
    fn stream_endings_map_to_messages() {
        let closed = map_event(EngineEvent::StreamEnded {
            session_id: 1,
            result: Ok(StreamEnd::Closed),
        });
        assert_eq!(closed, Msg::StreamClosed { session_id: 1 });

        let cancelled = map_event(EngineEvent::StreamEnded {
            session_id: 1,
            result: Ok(StreamEnd::Cancelled),
        });
        assert_eq!(cancelled, Msg::NoOp);

        let failed = map_event(EngineEvent::StreamEnded {
            session_id: 2,
            result: Err(StreamError {
                kind: FailureKind::MalformedEvent,
                message: "event data is not JSON".to_string(),
            }),
        });
        assert_eq!(
            failed,
            Msg::StreamFailed {
                session_id: 2,
                message: "malformed progress event: event data is not JSON".to_string(),
            }
        );
    }

    #[test]
    fn api_failures_map_to_form_messages() {
        let msg = map_event(EngineEvent::EmployeesLoaded(Err(ApiError::Timeout)));
        assert_eq!(
            msg,
            Msg::ListLoadFailed {
                list: TaskList::Employees,
                message: "request timed out".to_string(),
            }
        );

        let msg = map_event(EngineEvent::AttachmentUploaded {
            task_id: "t1".to_string(),
            result: Err(ApiError::HttpStatus { status: 413 }),
        });
        assert!(matches!(msg, Msg::AttachmentUploadFailed { .. }));
    }

    #[test]
    fn request_without_assignee_sends_empty_ids() {
        let task = map_request(CreateTaskRequest {
            task_name: "Fix".to_string(),
            description: String::new(),
            due_date: "2024-11-23".to_string(),
            user_id: None,
            project_id: Some("p1".to_string()),
            collaborators: Vec::new(),
        });
        assert_eq!(task.user_id, "");
        assert_eq!(task.project_id, "p1");
    }
}
