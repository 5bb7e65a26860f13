//! Incremental `text/event-stream` framing.
//!
//! Chunks may split lines, fields or even CRLF pairs anywhere; the decoder
//! keeps the partial tail until the next chunk arrives. An event that was not
//! terminated by a blank line before the stream ended is never dispatched.

const DEFAULT_EVENT: &str = "message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Event type; `message` unless the server named it.
    pub event: String,
    pub data: String,
    pub id: Option<String>,
}

impl SseFrame {
    pub fn is_default_event(&self) -> bool {
        self.event == DEFAULT_EVENT
    }
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: String,
    event: Option<String>,
    last_event_id: Option<String>,
    started: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every event completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        if !self.started {
            if self.buffer.len() < 3 && b"\xEF\xBB\xBF".starts_with(&self.buffer) {
                return Vec::new();
            }
            if self.buffer.starts_with(b"\xEF\xBB\xBF") {
                self.buffer.drain(..3);
            }
            self.started = true;
        }

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..]
            .iter()
            .position(|b| *b == b'\n' || *b == b'\r')
        {
            let end = start + offset;
            let next = if self.buffer[end] == b'\r' {
                match self.buffer.get(end + 1) {
                    Some(b'\n') => end + 2,
                    Some(_) => end + 1,
                    // A lone CR at the end may be the first half of CRLF.
                    None => break,
                }
            } else {
                end + 1
            };
            let line = String::from_utf8_lossy(&self.buffer[start..end]).into_owned();
            start = next;
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        self.buffer.drain(..start);
        frames
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            "event" => self.event = Some(value.to_string()),
            "id" if !value.contains('\0') => self.last_event_id = Some(value.to_string()),
            // `retry` only tunes reconnection, which this client never does.
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let mut data = std::mem::take(&mut self.data);
        data.pop();
        Some(SseFrame {
            event: event
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT.to_string()),
            data,
            id: self.last_event_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_simple_event() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: {\"status\":\"checked\"}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "{\"status\":\"checked\"}");
        assert!(frames[0].is_default_event());
    }

    #[test]
    fn joins_multiline_data() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: a\ndata:b\n\n");
        assert_eq!(frames[0].data, "a\nb");
    }

    #[test]
    fn survives_arbitrary_chunk_boundaries() {
        let raw = b"id: 7\r\nevent: tick\r\ndata: one\r\n\r\n: keepalive\r\ndata: two\r\n\r\n";
        for split in 1..raw.len() {
            let mut decoder = SseDecoder::new();
            let mut frames = decoder.push(&raw[..split]);
            frames.extend(decoder.push(&raw[split..]));
            assert_eq!(frames.len(), 2, "split at {split}");
            assert_eq!(frames[0].event, "tick");
            assert_eq!(frames[0].data, "one");
            assert_eq!(frames[1].event, "message");
            assert_eq!(frames[1].data, "two");
            assert_eq!(frames[1].id.as_deref(), Some("7"));
        }
    }

    #[test]
    fn bare_cr_terminates_lines() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: x\r\rdata: y\r\r");
        let data: Vec<_> = frames.into_iter().map(|f| f.data).collect();
        assert_eq!(data, vec!["x".to_string()]);
        // The final CR may still be half of a CRLF.
        let frames = decoder.push(b"\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "y");
    }

    #[test]
    fn strips_leading_bom_and_ignores_empty_events() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"\xEF\xBB\xBFevent: noop\n\ndata: z\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "message");
        assert_eq!(frames[0].data, "z");
    }

    #[test]
    fn unterminated_event_is_not_dispatched() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: partial\n").is_empty());
    }
}
