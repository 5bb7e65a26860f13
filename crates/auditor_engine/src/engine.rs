use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use auditor_logging::{auditor_debug, auditor_warn};
use tokio_util::sync::CancellationToken;

use crate::stream::{ChannelStreamSink, StreamClient};
use crate::task_api::{NewTask, TaskApi};
use crate::{EngineEvent, SessionId};

enum EngineCommand {
    OpenStream {
        session_id: SessionId,
        target_url: String,
    },
    CloseStream {
        session_id: SessionId,
    },
    FetchProjects,
    FetchEmployees,
    CreateTask(NewTask),
    UploadAttachment {
        task_id: String,
        path: PathBuf,
    },
}

/// Owns the IO runtime. Commands go in, [`EngineEvent`]s come out.
///
/// At most one progress stream is open at a time; opening a new one cancels
/// the previous connection.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(stream: Arc<dyn StreamClient>, api: Arc<dyn TaskApi>) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;

        thread::Builder::new()
            .name("auditor-engine".to_string())
            .spawn(move || {
                let mut active: Option<(SessionId, CancellationToken)> = None;
                while let Ok(command) = cmd_rx.recv() {
                    match command {
                        EngineCommand::OpenStream {
                            session_id,
                            target_url,
                        } => {
                            if let Some((previous, token)) = active.take() {
                                auditor_debug!("closing stream of session {}", previous);
                                token.cancel();
                            }
                            let token = CancellationToken::new();
                            active = Some((session_id, token.clone()));
                            let stream = stream.clone();
                            let event_tx = event_tx.clone();
                            runtime.spawn(async move {
                                let sink = ChannelStreamSink::new(event_tx.clone());
                                let result = stream.run(session_id, &target_url, &sink, token).await;
                                let _ = event_tx.send(EngineEvent::StreamEnded { session_id, result });
                            });
                        }
                        EngineCommand::CloseStream { session_id } => match active.take() {
                            Some((current, token)) if current == session_id => token.cancel(),
                            other => active = other,
                        },
                        command => {
                            let api = api.clone();
                            let event_tx = event_tx.clone();
                            runtime.spawn(async move {
                                let event = run_api_command(api.as_ref(), command).await;
                                if let Some(event) = event {
                                    let _ = event_tx.send(event);
                                }
                            });
                        }
                    }
                }
                if let Some((_, token)) = active {
                    token.cancel();
                }
            })?;

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn open_stream(&self, session_id: SessionId, target_url: impl Into<String>) {
        self.send(EngineCommand::OpenStream {
            session_id,
            target_url: target_url.into(),
        });
    }

    pub fn close_stream(&self, session_id: SessionId) {
        self.send(EngineCommand::CloseStream { session_id });
    }

    pub fn fetch_projects(&self) {
        self.send(EngineCommand::FetchProjects);
    }

    pub fn fetch_employees(&self) {
        self.send(EngineCommand::FetchEmployees);
    }

    pub fn create_task(&self, task: NewTask) {
        self.send(EngineCommand::CreateTask(task));
    }

    pub fn upload_attachment(&self, task_id: impl Into<String>, path: PathBuf) {
        self.send(EngineCommand::UploadAttachment {
            task_id: task_id.into(),
            path,
        });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            auditor_warn!("engine thread is gone; command dropped");
        }
    }
}

async fn run_api_command(api: &dyn TaskApi, command: EngineCommand) -> Option<EngineEvent> {
    let event = match command {
        EngineCommand::FetchProjects => EngineEvent::ProjectsLoaded(api.list_projects().await),
        EngineCommand::FetchEmployees => EngineEvent::EmployeesLoaded(api.list_employees().await),
        EngineCommand::CreateTask(task) => EngineEvent::TaskCreated(api.create_task(&task).await),
        EngineCommand::UploadAttachment { task_id, path } => {
            let result = api.upload_attachment(&task_id, &path).await;
            EngineEvent::AttachmentUploaded { task_id, result }
        }
        EngineCommand::OpenStream { .. } | EngineCommand::CloseStream { .. } => return None,
    };
    Some(event)
}
