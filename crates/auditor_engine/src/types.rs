use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::task_api::{Employee, Project};

pub type SessionId = u64;

/// Status value the checker reported for a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireStatusCode {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for WireStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireStatusCode::Numeric(code) => write!(f, "{code}"),
            WireStatusCode::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokenLink {
    pub link: String,
    #[serde(default)]
    pub link_text: Option<String>,
    pub page_url: String,
    #[serde(default)]
    pub status_code: Option<WireStatusCode>,
    #[serde(default)]
    pub success: bool,
}

/// One message of the `check-links-stream` protocol, keyed by its `status` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WireEvent {
    Init {
        #[serde(rename = "totalPages")]
        total_pages: u64,
    },
    Checked {},
    Completed {
        #[serde(rename = "brokenLinks", default)]
        broken_links: Vec<BrokenLink>,
    },
    Error {
        #[serde(default)]
        message: String,
    },
}

impl WireEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WireEvent::Completed { .. } | WireEvent::Error { .. })
    }
}

const KNOWN_STATUSES: [&str; 4] = ["init", "checked", "completed", "error"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventParseError {
    #[error("event data is not JSON: {0}")]
    NotJson(String),
    #[error("event has no status field")]
    MissingStatus,
    #[error("'{status}' event has an invalid shape: {message}")]
    InvalidShape { status: String, message: String },
}

/// Parses one event payload.
///
/// Returns `Ok(None)` for a well-formed message whose `status` is unknown.
pub fn parse_wire_event(data: &str) -> Result<Option<WireEvent>, EventParseError> {
    let value: Value =
        serde_json::from_str(data).map_err(|err| EventParseError::NotJson(err.to_string()))?;
    let status = value
        .get("status")
        .and_then(Value::as_str)
        .ok_or(EventParseError::MissingStatus)?
        .to_string();
    if !KNOWN_STATUSES.contains(&status.as_str()) {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|err| EventParseError::InvalidShape {
            status,
            message: err.to_string(),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// A `completed` or `error` event arrived.
    Terminal,
    /// The server closed the connection first.
    Closed,
    /// The stream was closed from this side.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct StreamError {
    pub kind: FailureKind,
    pub message: String,
}

impl StreamError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    UnexpectedContentType { content_type: String },
    Timeout,
    MalformedEvent,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::UnexpectedContentType { content_type } => {
                write!(f, "unexpected content type {content_type}")
            }
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::MalformedEvent => write!(f, "malformed progress event"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
    #[error("http status {status}")]
    HttpStatus { status: u16 },
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("could not read attachment {path}: {message}")]
    Attachment { path: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Stream {
        session_id: SessionId,
        event: WireEvent,
    },
    StreamEnded {
        session_id: SessionId,
        result: Result<StreamEnd, StreamError>,
    },
    ProjectsLoaded(Result<Vec<Project>, ApiError>),
    EmployeesLoaded(Result<Vec<Employee>, ApiError>),
    TaskCreated(Result<String, ApiError>),
    AttachmentUploaded {
        task_id: String,
        result: Result<String, ApiError>,
    },
}
