use std::io::{self, BufRead, IsTerminal};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, ensure, Context};
use auditor_core::{update, AppState, Msg, SessionStatus, TaskField, TaskList};
use auditor_logging::{auditor_debug, auditor_info};

use crate::cli::{Command, CreateTaskArgs, TaskCommand};
use super::config::AuditorConfig;
use super::effects::EffectRunner;
use super::ui::render::{self, Frame};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Owns the state and drives `update` with user input, engine events and ticks.
pub struct App {
    state: AppState,
    runner: EffectRunner,
    frame: Frame,
    color: bool,
    last_tick: Instant,
}

impl App {
    pub fn new(runner: EffectRunner) -> Self {
        Self {
            state: AppState::new(),
            runner,
            frame: Frame::default(),
            color: io::stdout().is_terminal(),
            last_tick: Instant::now(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Applies `msg` and returns the follow-ups produced by synchronous effects,
    /// after they have been dispatched too.
    pub fn dispatch(&mut self, msg: Msg) -> Vec<Msg> {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        let follow_ups = self.runner.run(effects);
        for follow_up in &follow_ups {
            self.dispatch(follow_up.clone());
        }
        self.render_if_dirty();
        follow_ups
    }

    /// Handles at most one engine event, then advances the clock.
    ///
    /// Returns a copy of the engine message that was dispatched, if any.
    pub fn pump(&mut self) -> Option<Msg> {
        let received = self.runner.poll(POLL_INTERVAL);
        if let Some(msg) = &received {
            self.dispatch(msg.clone());
        }
        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.last_tick).as_millis() as u64;
        if elapsed_ms > 0 {
            self.last_tick = now;
            self.dispatch(Msg::Tick { elapsed_ms });
        }
        received
    }

    pub fn run_until<F>(&mut self, done: F)
    where
        F: Fn(&AppState) -> bool,
    {
        while !done(&self.state) {
            self.pump();
        }
    }

    /// Pumps until `select` accepts an engine message and returns its output.
    pub fn wait_for<T, F>(&mut self, select: F) -> T
    where
        F: Fn(Msg) -> Option<T>,
    {
        loop {
            if let Some(value) = self.pump().and_then(&select) {
                return value;
            }
        }
    }

    fn render_if_dirty(&mut self) {
        if !self.state.consume_dirty() {
            return;
        }
        let frame = render::render(&self.state.view(), self.color);
        for line in frame.changed_lines(&self.frame) {
            println!("{line}");
        }
        self.frame = frame;
    }
}

pub fn run(command: Command, config: &AuditorConfig, runner: EffectRunner) -> anyhow::Result<()> {
    let mut app = App::new(runner);
    match command {
        Command::Check { url, export } => run_check(&mut app, url, export),
        Command::Interactive => run_interactive(&mut app),
        Command::Task {
            command: TaskCommand::Projects,
        } => {
            require_company(config)?;
            run_list(&mut app, TaskList::Projects)
        }
        Command::Task {
            command: TaskCommand::Employees,
        } => {
            require_company(config)?;
            run_list(&mut app, TaskList::Employees)
        }
        Command::Task {
            command: TaskCommand::Create(args),
        } => {
            ensure!(
                !config.user_id.is_empty(),
                "user id is not configured (AUDITOR_USER_ID)"
            );
            run_create(&mut app, args)
        }
    }
}

fn require_company(config: &AuditorConfig) -> anyhow::Result<()> {
    ensure!(
        !config.company_id.is_empty(),
        "company id is not configured (AUDITOR_COMPANY_ID)"
    );
    Ok(())
}

fn run_check(app: &mut App, url: String, export: bool) -> anyhow::Result<()> {
    app.dispatch(Msg::UrlInputChanged(url));
    app.dispatch(Msg::CheckSubmitted);
    ensure!(app.state().session().is_running(), "no URL to check");

    app.run_until(|state| !state.session().is_running());

    let session = app.state().session();
    if session.status() == SessionStatus::Errored {
        let reason = app
            .state()
            .notification()
            .message()
            .unwrap_or("unknown error")
            .to_string();
        bail!("link check of {} failed: {}", session.target_url(), reason);
    }
    if !export {
        return Ok(());
    }
    if !app.state().view().can_export {
        println!("No broken links to export.");
        return Ok(());
    }
    for outcome in app.dispatch(Msg::ExportClicked) {
        if let Msg::ExportFailed { message } = outcome {
            bail!("export failed: {message}");
        }
    }
    Ok(())
}

fn run_list(app: &mut App, list: TaskList) -> anyhow::Result<()> {
    app.dispatch(Msg::TaskListRequested(list));
    let loaded = app.wait_for(|msg| match (list, msg) {
        (TaskList::Projects, Msg::ProjectsLoaded(_))
        | (TaskList::Employees, Msg::EmployeesLoaded(_)) => Some(Ok(())),
        (_, Msg::ListLoadFailed { list: failed, message }) if failed == list => Some(Err(message)),
        _ => None,
    });
    if let Err(message) = loaded {
        bail!("could not load {list:?}: {message}");
    }

    let form = app.state().view().task_form;
    let lines = match list {
        TaskList::Projects => render::project_lines(&form.projects),
        TaskList::Employees => render::employee_lines(&form.employees),
    };
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

fn run_create(app: &mut App, args: CreateTaskArgs) -> anyhow::Result<()> {
    let due = args
        .due
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
    let has_attachment = args.attachment.is_some();
    for field in [
        TaskField::Name(args.name),
        TaskField::Description(args.description),
        TaskField::DueDate(due),
        TaskField::Assignee(args.assignee),
        TaskField::Project(args.project),
        TaskField::Attachment(args.attachment),
    ] {
        app.dispatch(Msg::TaskFieldChanged(field));
    }
    app.dispatch(Msg::TaskSubmitted);
    if !app.state().task_form().is_busy() {
        let reason = app.state().notification().message().unwrap_or("invalid task");
        bail!("{reason}");
    }

    let task_id = app
        .wait_for(|msg| match msg {
            Msg::TaskCreated { task_id } => Some(Ok(task_id)),
            Msg::TaskCreateFailed { message } => Some(Err(message)),
            _ => None,
        })
        .map_err(|message| anyhow!("failed to add task: {message}"))?;
    println!("task {task_id}");

    if has_attachment {
        let file_url = app
            .wait_for(|msg| match msg {
                Msg::AttachmentUploaded { file_url } => Some(Ok(file_url)),
                Msg::AttachmentUploadFailed { message } => Some(Err(message)),
                _ => None,
            })
            .map_err(|message| {
                anyhow!("task {task_id} created but the attachment failed: {message}")
            })?;
        println!("attachment {file_url}");
    }
    Ok(())
}

enum Input {
    Line(String),
    Eof,
}

fn run_interactive(app: &mut App) -> anyhow::Result<()> {
    let (input_tx, input_rx) = mpsc::channel();
    thread::Builder::new()
        .name("auditor-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if input_tx.send(Input::Line(line)).is_err() {
                    return;
                }
            }
            let _ = input_tx.send(Input::Eof);
        })
        .context("spawning stdin reader")?;

    println!("Enter a URL to check. Commands: :export, :dismiss, :quit");
    let mut eof = false;
    loop {
        while let Ok(input) = input_rx.try_recv() {
            match input {
                Input::Eof => eof = true,
                Input::Line(line) => {
                    if !handle_line(app, line.trim()) {
                        return Ok(());
                    }
                }
            }
        }
        if eof && !app.state().session().is_running() {
            auditor_debug!("stdin closed and no check is running");
            return Ok(());
        }
        app.pump();
    }
}

/// Returns false when the user asked to quit.
fn handle_line(app: &mut App, line: &str) -> bool {
    match line {
        "" => {}
        ":quit" => return false,
        ":dismiss" => {
            app.dispatch(Msg::NotificationDismissed);
        }
        ":export" => {
            if app.state().view().can_export {
                app.dispatch(Msg::ExportClicked);
            } else {
                println!("Nothing to export.");
            }
        }
        url => {
            auditor_info!("interactive submit {}", url);
            app.dispatch(Msg::UrlInputChanged(url.to_string()));
            app.dispatch(Msg::CheckSubmitted);
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use auditor_engine::{
        ApiError, BrokenLink, Employee, EngineEvent, EngineHandle, NewTask, Project, SessionId,
        StreamClient, StreamEnd, StreamError, StreamSink, TaskApi, WireEvent, WireStatusCode,
    };
    use tokio_util::sync::CancellationToken;

    use super::*;

    /// Reports one page with one broken link, then completes.
    struct CompletingStream;

    #[async_trait::async_trait]
    impl StreamClient for CompletingStream {
        async fn run(
            &self,
            session_id: SessionId,
            target_url: &str,
            sink: &dyn StreamSink,
            _cancel: CancellationToken,
        ) -> Result<StreamEnd, StreamError> {
            let broken = BrokenLink {
                link: format!("{target_url}/missing"),
                link_text: Some("Missing page".to_string()),
                page_url: target_url.to_string(),
                status_code: Some(WireStatusCode::Numeric(404)),
                success: false,
            };
            for event in [
                WireEvent::Init { total_pages: 1 },
                WireEvent::Checked {},
                WireEvent::Completed {
                    broken_links: vec![broken],
                },
            ] {
                sink.emit(EngineEvent::Stream { session_id, event });
            }
            Ok(StreamEnd::Terminal)
        }
    }

    #[derive(Default)]
    struct FakeApi {
        employee_calls: AtomicUsize,
        uploads: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl TaskApi for FakeApi {
        async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
            Ok(vec![Project {
                id: "p1".to_string(),
                name: "Website".to_string(),
            }])
        }

        async fn list_employees(&self) -> Result<Vec<Employee>, ApiError> {
            self.employee_calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::HttpStatus { status: 500 })
        }

        async fn create_task(&self, task: &NewTask) -> Result<String, ApiError> {
            assert_eq!(task.collaborators, vec![task.user_id.clone()]);
            Ok("42".to_string())
        }

        async fn upload_attachment(&self, task_id: &str, path: &Path) -> Result<String, ApiError> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            let name = path.file_name().unwrap().to_string_lossy();
            Ok(format!("https://files.test/{task_id}/{name}"))
        }
    }

    fn app_with(api: Arc<FakeApi>, output_dir: PathBuf) -> App {
        let engine = EngineHandle::new(Arc::new(CompletingStream), api).unwrap();
        App::new(EffectRunner::new(engine, output_dir))
    }

    #[test]
    fn check_with_export_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(Arc::default(), dir.path().to_path_buf());

        run_check(&mut app, "https://site.test".to_string(), true).unwrap();

        let view = app.state().view();
        assert_eq!(view.session.status, SessionStatus::Completed);
        assert_eq!(view.rows.len(), 1);
        assert!(view.notice.unwrap().starts_with("Saved "));
        let csv = fs::read_to_string(dir.path().join("broken_links.csv")).unwrap();
        assert!(csv.starts_with("#,Broken Link,Link Text,Page Found,Status\n"));
        assert!(csv.contains("\"https://site.test/missing\",\"Missing page\""));
    }

    #[test]
    fn failed_export_fails_the_check_command() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("report");
        fs::write(&not_a_dir, "occupied").unwrap();
        let mut app = app_with(Arc::default(), not_a_dir);

        let err = run_check(&mut app, "https://site.test".to_string(), true).unwrap_err();

        assert!(err.to_string().starts_with("export failed:"), "{err}");
        let notification = app.state().notification().message().unwrap();
        assert!(notification.starts_with("Export failed:"));
    }

    #[test]
    fn check_without_export_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(Arc::default(), dir.path().to_path_buf());

        run_check(&mut app, "https://site.test".to_string(), false).unwrap();

        assert!(!dir.path().join("broken_links.csv").exists());
        assert_eq!(app.state().view().notice, None);
    }

    #[test]
    fn create_task_uploads_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let attachment = dir.path().join("broken_links.csv");
        fs::write(&attachment, "#,Broken Link").unwrap();
        let api = Arc::new(FakeApi::default());
        let mut app = app_with(api.clone(), dir.path().to_path_buf());

        let args = CreateTaskArgs {
            name: "Fix footer links".to_string(),
            description: String::new(),
            due: Some("2024-11-23".to_string()),
            assignee: Some("emp-1".to_string()),
            project: Some("p1".to_string()),
            attachment: Some(attachment),
        };
        run_create(&mut app, args).unwrap();

        assert_eq!(api.uploads.load(Ordering::SeqCst), 1);
        let form = app.state().view().task_form;
        assert_eq!(form.last_task_id.as_deref(), Some("42"));
        assert_eq!(
            form.last_file_url.as_deref(),
            Some("https://files.test/42/broken_links.csv")
        );
        assert!(!form.busy);
        assert_eq!(form.task_name, "");
    }

    #[test]
    fn invalid_task_is_rejected_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(Arc::default(), dir.path().to_path_buf());

        let args = CreateTaskArgs {
            name: "  ".to_string(),
            description: String::new(),
            due: Some("2024-11-23".to_string()),
            assignee: None,
            project: None,
            attachment: None,
        };
        let err = run_create(&mut app, args).unwrap_err();
        assert_eq!(err.to_string(), "Task name is required");
    }

    #[test]
    fn project_listing_does_not_touch_employees() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(FakeApi::default());
        let mut app = app_with(api.clone(), dir.path().to_path_buf());

        run_list(&mut app, TaskList::Projects).unwrap();

        assert_eq!(app.state().view().task_form.projects.len(), 1);
        assert_eq!(api.employee_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn employee_listing_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(Arc::default(), dir.path().to_path_buf());

        let err = run_list(&mut app, TaskList::Employees).unwrap_err();
        assert!(err.to_string().contains("http status 500"), "{err}");
    }
}
