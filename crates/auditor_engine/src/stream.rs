use std::time::Duration;

use auditor_logging::{auditor_debug, auditor_info, auditor_trace, auditor_warn};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::sse::SseDecoder;
use crate::{
    parse_wire_event, EngineEvent, FailureKind, SessionId, StreamEnd, StreamError,
};

const STREAM_PATH: &str = "check-links-stream";
const EVENT_STREAM_MIME: &str = "text/event-stream";

#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Base URL of the link-checking server, e.g. `http://localhost:5200/`.
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Longest silence between two chunks before the stream is declared dead.
    /// `None` waits as long as the server keeps the connection open, since a
    /// single page with many slow links can take minutes.
    pub idle_timeout: Option<Duration>,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5200/".to_string(),
            connect_timeout: Duration::from_secs(10),
            idle_timeout: None,
        }
    }
}

/// Builds `{base}/check-links-stream?url=<target>` with the target URL-encoded.
pub fn stream_url(base_url: &str, target_url: &str) -> Result<Url, StreamError> {
    let mut base = base_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    let mut url = Url::parse(&base)
        .and_then(|base| base.join(STREAM_PATH))
        .map_err(|err| StreamError::new(FailureKind::InvalidUrl, err.to_string()))?;
    url.query_pairs_mut().append_pair("url", target_url);
    Ok(url)
}

pub trait StreamSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelStreamSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelStreamSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl StreamSink for ChannelStreamSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

#[async_trait::async_trait]
pub trait StreamClient: Send + Sync {
    /// Consumes the progress stream for `target_url` until a terminal event,
    /// the end of the stream, or cancellation.
    async fn run(
        &self,
        session_id: SessionId,
        target_url: &str,
        sink: &dyn StreamSink,
        cancel: CancellationToken,
    ) -> Result<StreamEnd, StreamError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestStreamClient {
    settings: StreamSettings,
}

impl ReqwestStreamClient {
    pub fn new(settings: StreamSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, StreamError> {
        // No total timeout: the response body is open-ended by nature.
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .build()
            .map_err(|err| StreamError::new(FailureKind::Network, err.to_string()))
    }
}

#[async_trait::async_trait]
impl StreamClient for ReqwestStreamClient {
    async fn run(
        &self,
        session_id: SessionId,
        target_url: &str,
        sink: &dyn StreamSink,
        cancel: CancellationToken,
    ) -> Result<StreamEnd, StreamError> {
        let url = stream_url(&self.settings.base_url, target_url)?;
        let client = self.build_client()?;
        auditor_info!("session {} opening stream {}", session_id, url);

        let request = client
            .get(url)
            .header(ACCEPT, EVENT_STREAM_MIME)
            .header(CACHE_CONTROL, "no-cache")
            .send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Ok(StreamEnd::Cancelled),
            response = request => response.map_err(map_reqwest_error)?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
        {
            let essence = content_type.split(';').next().unwrap_or(content_type).trim();
            if !essence.eq_ignore_ascii_case(EVENT_STREAM_MIME) {
                return Err(StreamError::new(
                    FailureKind::UnexpectedContentType {
                        content_type: content_type.to_string(),
                    },
                    "server did not answer with an event stream",
                ));
            }
        }

        let mut body = Box::pin(response.bytes_stream());
        let mut decoder = SseDecoder::new();
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(StreamEnd::Cancelled),
                chunk = next_chunk(&mut body, self.settings.idle_timeout) => chunk?,
            };
            let Some(chunk) = chunk else {
                auditor_debug!("session {} stream closed by server", session_id);
                return Ok(StreamEnd::Closed);
            };

            for frame in decoder.push(&chunk) {
                auditor_trace!("session {} frame {:?}", session_id, frame);
                if !frame.is_default_event() {
                    auditor_debug!(
                        "session {} skipping '{}' event",
                        session_id,
                        frame.event
                    );
                    continue;
                }
                let event = match parse_wire_event(&frame.data) {
                    Ok(Some(event)) => event,
                    Ok(None) => {
                        auditor_warn!(
                            "session {} skipping unknown event {}",
                            session_id,
                            frame.data
                        );
                        continue;
                    }
                    Err(err) => {
                        return Err(StreamError::new(FailureKind::MalformedEvent, err.to_string()))
                    }
                };
                let terminal = event.is_terminal();
                sink.emit(EngineEvent::Stream { session_id, event });
                if terminal {
                    return Ok(StreamEnd::Terminal);
                }
            }
        }
    }
}

async fn next_chunk<S>(body: &mut S, idle_timeout: Option<Duration>) -> Result<Option<Bytes>, StreamError>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    let next = match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, body.next())
            .await
            .map_err(|_| StreamError::new(FailureKind::Timeout, "no data from link checker"))?,
        None => body.next().await,
    };
    next.transpose().map_err(map_reqwest_error)
}

fn map_reqwest_error(err: reqwest::Error) -> StreamError {
    if err.is_timeout() {
        return StreamError::new(FailureKind::Timeout, err.to_string());
    }
    StreamError::new(FailureKind::Network, err.to_string())
}
