use crate::session::Transition;
use crate::view_model::{self, AppViewModel};
use crate::{CheckSession, Notification, ProgressEvent, SessionId, TaskForm, DEFAULT_NOTIFICATION_MS};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    url_input: String,
    session: CheckSession,
    last_session_id: SessionId,
    notification: Notification,
    pub(crate) task_form: TaskForm,
    notice: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        view_model::build(
            &self.url_input,
            &self.session,
            &self.notification,
            &self.task_form,
            self.notice.as_deref(),
            self.dirty,
        )
    }

    pub fn session(&self) -> &CheckSession {
        &self.session
    }

    pub fn notification(&self) -> &Notification {
        &self.notification
    }

    pub fn task_form(&self) -> &TaskForm {
        &self.task_form
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn url_input(&self) -> &str {
        &self.url_input
    }

    pub(crate) fn set_url_input(&mut self, input: String) {
        if self.url_input != input {
            self.url_input = input;
            self.mark_dirty();
        }
    }

    /// Replaces the current session with a fresh running one and returns its id.
    pub(crate) fn start_session(&mut self, target_url: String) -> SessionId {
        self.last_session_id += 1;
        self.session = CheckSession::start(self.last_session_id, target_url);
        self.notice = None;
        self.mark_dirty();
        self.last_session_id
    }

    /// Routes a stream event to the session it belongs to. Events for an older
    /// session are stale and dropped.
    pub(crate) fn apply_stream_event(
        &mut self,
        session_id: SessionId,
        event: ProgressEvent,
    ) -> Transition {
        if session_id != self.session.id() {
            return Transition::Ignored;
        }
        let transition = self.session.apply(event);
        self.after_transition(&transition);
        transition
    }

    pub(crate) fn fail_session(&mut self, session_id: SessionId, message: String) -> Transition {
        if session_id != self.session.id() {
            return Transition::Ignored;
        }
        let transition = self.session.fail(message);
        self.after_transition(&transition);
        transition
    }

    fn after_transition(&mut self, transition: &Transition) {
        match transition {
            Transition::Ignored => {}
            Transition::Updated | Transition::Completed => self.mark_dirty(),
            Transition::Errored { message } => {
                self.show_notification(message.clone());
            }
        }
    }

    pub(crate) fn show_notification(&mut self, message: String) {
        self.notification.show(message, DEFAULT_NOTIFICATION_MS);
        self.mark_dirty();
    }

    pub(crate) fn advance_notification(&mut self, elapsed_ms: u64) {
        if self.notification.advance(elapsed_ms) {
            self.mark_dirty();
        }
    }

    pub(crate) fn dismiss_notification(&mut self) {
        if self.notification.dismiss() {
            self.mark_dirty();
        }
    }

    pub(crate) fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
        self.mark_dirty();
    }
}
