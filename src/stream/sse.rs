//! SSE (Server-Sent Events) reading and writing.
//!
//! The reader parses provider byte streams that may split lines, events and
//! even UTF-8 sequences at arbitrary boundaries. The writer produces the named
//! event framing the client expects.
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use memchr::memchr_iter;
use smallvec::SmallVec;

/// One parsed SSE event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

impl SseEvent {
    /// `OpenAI`-style end-of-stream sentinel.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

struct PendingEvents {
    events: SmallVec<[SseEvent; 8]>,
    head: usize,
}

impl PendingEvents {
    #[inline]
    fn new() -> Self {
        Self {
            events: SmallVec::new(),
            head: 0,
        }
    }

    #[inline]
    fn pop_front(&mut self) -> Option<SseEvent> {
        if self.head >= self.events.len() {
            return None;
        }
        let event = std::mem::take(&mut self.events[self.head]);
        self.head += 1;
        if self.head == self.events.len() {
            self.events.clear();
            self.head = 0;
        }
        Some(event)
    }

    #[inline]
    fn extend_from_vec(&mut self, parsed: &mut Vec<SseEvent>) {
        self.events.extend(parsed.drain(..));
    }
}

// ---------------------------------------------------------------------------
// SseParser: incremental SSE line parser
// ---------------------------------------------------------------------------

/// Incremental SSE line parser.
///
/// Feed it text chunks in any split and it yields fully-assembled events:
/// - `event:` sets the type of the next event
/// - `data:` lines append to the payload, joined with `\n`
/// - a blank line dispatches the event
/// - `:` comments and unknown fields are ignored
/// - `\r\n` line endings are accepted
pub struct SseParser {
    buffer: String,
    read_offset: usize,
    event_type: Option<String>,
    data_buffer: String,
    has_data: bool,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            read_offset: 0,
            event_type: None,
            data_buffer: String::new(),
            has_data: false,
        }
    }

    /// Feed raw text and return any complete events parsed.
    pub fn feed(&mut self, chunk: &str) -> Vec<SseEvent> {
        let mut out = Vec::new();
        self.feed_into(chunk, &mut out);
        out
    }

    /// Feed raw text and append complete events into a caller-provided buffer.
    pub fn feed_into(&mut self, chunk: &str, out: &mut Vec<SseEvent>) {
        self.buffer.push_str(chunk);
        let mut processed_up_to = self.read_offset;
        let bytes = self.buffer.as_bytes();
        let scan_start = processed_up_to;
        for rel_pos in memchr_iter(b'\n', &bytes[scan_start..]) {
            let line_end = scan_start + rel_pos;
            let line = &self.buffer[processed_up_to..line_end];
            Self::process_line(
                line.strip_suffix('\r').unwrap_or(line),
                &mut self.event_type,
                &mut self.data_buffer,
                &mut self.has_data,
                out,
            );
            processed_up_to = line_end + 1;
        }

        self.read_offset = processed_up_to;
        if self.read_offset == self.buffer.len() {
            self.buffer.clear();
            self.read_offset = 0;
            return;
        }
        let should_compact = self.read_offset > 0
            && (self.read_offset >= self.buffer.len() / 2 || self.read_offset >= 8 * 1024);
        if should_compact {
            self.buffer.drain(..self.read_offset);
            self.read_offset = 0;
        }
    }

    /// Flush state at end of input.
    ///
    /// A trailing line without a newline is processed, and an event whose
    /// terminating blank line never arrived is still dispatched.
    pub fn finish_into(&mut self, out: &mut Vec<SseEvent>) {
        if self.read_offset < self.buffer.len() {
            let line = &self.buffer[self.read_offset..];
            Self::process_line(
                line.strip_suffix('\r').unwrap_or(line),
                &mut self.event_type,
                &mut self.data_buffer,
                &mut self.has_data,
                out,
            );
        }
        self.buffer.clear();
        self.read_offset = 0;
        Self::process_line(
            "",
            &mut self.event_type,
            &mut self.data_buffer,
            &mut self.has_data,
            out,
        );
    }

    fn process_line(
        line: &str,
        event_type: &mut Option<String>,
        data_buffer: &mut String,
        has_data: &mut bool,
        out: &mut Vec<SseEvent>,
    ) {
        if line.is_empty() {
            // Blank line dispatches the pending event
            if *has_data {
                out.push(SseEvent {
                    event: event_type.take(),
                    data: std::mem::take(data_buffer),
                });
                *has_data = false;
            } else {
                *event_type = None;
            }
            return;
        }
        if line.starts_with(':') {
            return;
        }

        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            if *has_data {
                data_buffer.push('\n');
            } else {
                *has_data = true;
            }
            data_buffer.push_str(value);
        } else if let Some(value) = line.strip_prefix("event:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            *event_type = Some(value.to_string());
        }
    }
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Feed `bytes` to `parser`, carrying incomplete UTF-8 sequences in `remainder`.
///
/// Invalid sequences are replaced with U+FFFD rather than stalling the stream.
fn feed_utf8(
    parser: &mut SseParser,
    remainder: &mut Vec<u8>,
    bytes: &[u8],
    out: &mut Vec<SseEvent>,
) {
    if remainder.is_empty() {
        if let Ok(text) = std::str::from_utf8(bytes) {
            parser.feed_into(text, out);
            return;
        }
    }
    remainder.extend_from_slice(bytes);
    loop {
        match std::str::from_utf8(remainder) {
            Ok(text) => {
                parser.feed_into(text, out);
                remainder.clear();
                return;
            }
            Err(err) => {
                let valid_up_to = err.valid_up_to();
                if let Ok(text) = std::str::from_utf8(&remainder[..valid_up_to]) {
                    parser.feed_into(text, out);
                }
                match err.error_len() {
                    Some(bad_len) => {
                        parser.feed_into("\u{fffd}", out);
                        remainder.drain(..valid_up_to + bad_len);
                    }
                    None => {
                        remainder.drain(..valid_up_to);
                        return;
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Stream adapter
// ---------------------------------------------------------------------------

/// Split a provider byte stream into SSE events.
///
/// A read error is yielded once as `Err` and ends the stream; a clean end of
/// input flushes any event left without its terminating blank line.
pub fn sse_event_stream<S, E>(byte_stream: S) -> impl Stream<Item = Result<SseEvent, E>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Send + 'static,
{
    futures_util::stream::unfold(
        (
            Box::pin(byte_stream),
            SseParser::new(),
            Vec::<u8>::new(),
            Vec::<SseEvent>::with_capacity(8),
            PendingEvents::new(),
            false,
        ),
        |(mut stream, mut parser, mut remainder, mut parsed, mut pending, mut done)| async move {
            loop {
                if let Some(event) = pending.pop_front() {
                    return Some((
                        Ok(event),
                        (stream, parser, remainder, parsed, pending, done),
                    ));
                }
                if done {
                    return None;
                }

                match stream.as_mut().next().await {
                    Some(Ok(bytes)) => {
                        feed_utf8(&mut parser, &mut remainder, &bytes, &mut parsed);
                    }
                    Some(Err(err)) => {
                        done = true;
                        return Some((
                            Err(err),
                            (stream, parser, remainder, parsed, pending, done),
                        ));
                    }
                    None => {
                        if !remainder.is_empty() {
                            let tail = String::from_utf8_lossy(&remainder).into_owned();
                            parser.feed_into(&tail, &mut parsed);
                            remainder.clear();
                        }
                        parser.finish_into(&mut parsed);
                        done = true;
                    }
                }
                pending.extend_from_vec(&mut parsed);
            }
        },
    )
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Format a named SSE frame: `event: {event}\ndata: {json}\n\n`.
#[must_use]
pub fn anthropic_sse_frame(event_type: &str, json: &str) -> String {
    let mut out = String::with_capacity(18 + event_type.len() + json.len());
    out.push_str("event: ");
    out.push_str(event_type);
    out.push('\n');
    out.push_str("data: ");
    out.push_str(json);
    out.push_str("\n\n");
    out
}
