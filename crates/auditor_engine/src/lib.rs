//! Auditor engine: progress stream, task API and export IO.
mod engine;
mod export;
mod persist;
mod sse;
mod stream;
mod task_api;
mod types;

pub use engine::EngineHandle;
pub use export::{broken_links_csv, export_broken_links, ExportError, CSV_FILENAME, CSV_MIME};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use sse::{SseDecoder, SseFrame};
pub use stream::{
    stream_url, ChannelStreamSink, ReqwestStreamClient, StreamClient, StreamSettings, StreamSink,
};
pub use task_api::{ApiSettings, Employee, NewTask, Project, ReqwestTaskApi, TaskApi};
pub use types::{
    parse_wire_event, ApiError, BrokenLink, EngineEvent, EventParseError, FailureKind, SessionId,
    StreamEnd, StreamError, WireEvent, WireStatusCode,
};
