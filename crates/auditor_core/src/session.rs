use std::fmt;

use auditor_logging::auditor_debug;

pub type SessionId = u64;

/// Shown when a failure arrives without a usable reason.
pub(crate) const CHECK_FAILED_MESSAGE: &str = "The link check failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Errored,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Errored)
    }
}

/// Status reported by the checker for a link: an HTTP code or a textual reason
/// such as a DNS failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCode {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Numeric(code) => write!(f, "{code}"),
            StatusCode::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenLinkRecord {
    pub link: String,
    pub link_text: Option<String>,
    pub page_url: String,
    pub status_code: StatusCode,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Init { total_pages: u64 },
    Checked,
    Completed { broken_links: Vec<BrokenLinkRecord> },
    Error { message: String },
}

/// Result of feeding one event into a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Transition {
    Ignored,
    Updated,
    Completed,
    Errored { message: String },
}

/// One link-check run, from submission to its terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CheckSession {
    id: SessionId,
    target_url: String,
    processed_count: u64,
    total_count: u64,
    status: SessionStatus,
    broken_links: Vec<BrokenLinkRecord>,
}

impl CheckSession {
    pub(crate) fn start(id: SessionId, target_url: String) -> Self {
        Self {
            id,
            target_url,
            status: SessionStatus::Running,
            ..Self::default()
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    pub fn processed_count(&self) -> u64 {
        self.processed_count
    }

    /// Zero until the stream announced the page total.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn broken_links(&self) -> &[BrokenLinkRecord] {
        &self.broken_links
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    /// `processed / total` clamped to `[0, 1]`; zero while the total is unknown.
    pub fn progress_fraction(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        (self.processed_count as f64 / self.total_count as f64).min(1.0)
    }

    pub(crate) fn apply(&mut self, event: ProgressEvent) -> Transition {
        if !self.is_running() {
            return Transition::Ignored;
        }
        match event {
            ProgressEvent::Init { total_pages } => {
                if self.total_count != 0 || total_pages == 0 {
                    auditor_debug!(
                        "session {} ignoring init total={} (current total={})",
                        self.id,
                        total_pages,
                        self.total_count
                    );
                    return Transition::Ignored;
                }
                self.total_count = total_pages;
                Transition::Updated
            }
            ProgressEvent::Checked => {
                // Counting starts once the total is known and stops at it.
                if self.total_count == 0 || self.processed_count >= self.total_count {
                    auditor_debug!(
                        "session {} ignoring checked at {}/{}",
                        self.id,
                        self.processed_count,
                        self.total_count
                    );
                    return Transition::Ignored;
                }
                self.processed_count += 1;
                Transition::Updated
            }
            ProgressEvent::Completed { broken_links } => {
                self.broken_links = broken_links;
                self.status = SessionStatus::Completed;
                Transition::Completed
            }
            ProgressEvent::Error { message } => self.fail(message),
        }
    }

    pub(crate) fn fail(&mut self, message: String) -> Transition {
        if !self.is_running() {
            return Transition::Ignored;
        }
        self.status = SessionStatus::Errored;
        let message = if message.trim().is_empty() {
            CHECK_FAILED_MESSAGE.to_string()
        } else {
            message
        };
        Transition::Errored { message }
    }
}
