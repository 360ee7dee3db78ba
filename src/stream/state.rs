use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::protocol::anthropic::{
    ContentBlock, DeltaUsage, MessageDeltaBody, MessagesResponse, StopReason, StreamEvent, Usage,
};
use crate::util::{new_message_id, new_tool_use_id, push_json_string_escaped, push_usize_decimal};

use super::sse::anthropic_sse_frame;

/// One client-format SSE event: its name and JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientEvent {
    pub event: &'static str,
    pub data: String,
}

impl ClientEvent {
    fn from_event(event: &StreamEvent) -> Self {
        Self {
            event: event.name(),
            data: serde_json::to_string(event).unwrap_or_default(),
        }
    }

    /// Render as an SSE frame ready to write to the client.
    #[must_use]
    pub fn to_frame(&self) -> String {
        anthropic_sse_frame(self.event, &self.data)
    }
}

/// Ordered events produced by one transcoding step.
pub type ClientEvents = SmallVec<[ClientEvent; 4]>;

/// Per-call state for a provider tool call, keyed by the provider's call index.
#[derive(Debug, Clone, Default)]
pub struct ToolCallState {
    pub id: String,
    pub name: String,
    /// Every argument fragment received so far, concatenated.
    pub arguments: String,
    /// Client block index, assigned when the block starts.
    pub index: Option<usize>,
    pub closed: bool,
}

impl ToolCallState {
    #[must_use]
    pub fn started(&self) -> bool {
        self.index.is_some()
    }
}

/// State for one streaming response, owned by the task serving it.
///
/// Block indices come from a single counter and are handed out when a block
/// starts, so they are unique and increase in emission order. Once
/// `finished` is set no further content events are produced.
#[derive(Debug)]
pub struct StreamState {
    pub message_id: String,
    pub model: String,
    /// Next unassigned block index.
    pub content_index: usize,
    pub started: bool,
    pub text_started: bool,
    pub text_index: usize,
    pub finished: bool,
    pub tool_calls: FxHashMap<usize, ToolCallState>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl StreamState {
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            message_id: new_message_id(),
            model: model.into(),
            content_index: 0,
            started: false,
            text_started: false,
            text_index: 0,
            finished: false,
            tool_calls: FxHashMap::default(),
            input_tokens: 0,
            output_tokens: 0,
        }
    }

    #[inline]
    fn next_index(&mut self) -> usize {
        let index = self.content_index;
        self.content_index += 1;
        index
    }

    /// Update token counters; zero values never overwrite known counts.
    pub fn record_usage(&mut self, input_tokens: u64, output_tokens: u64) {
        if input_tokens > 0 {
            self.input_tokens = input_tokens;
        }
        if output_tokens > 0 {
            self.output_tokens = output_tokens;
        }
    }

    /// Emit `message_start` unless it has already been sent.
    pub fn ensure_started(&mut self, out: &mut ClientEvents) {
        if self.started {
            return;
        }
        self.started = true;
        let mut message = MessagesResponse::new(self.message_id.clone(), self.model.clone());
        message.usage = Usage {
            input_tokens: self.input_tokens,
            output_tokens: 0,
        };
        out.push(ClientEvent::from_event(&StreamEvent::MessageStart { message }));
    }

    /// Append a text fragment, opening a text block first if none is open.
    pub fn push_text(&mut self, text: &str, out: &mut ClientEvents) {
        if self.finished || text.is_empty() {
            return;
        }
        if !self.text_started {
            self.text_started = true;
            self.text_index = self.next_index();
            out.push(ClientEvent::from_event(&StreamEvent::ContentBlockStart {
                index: self.text_index,
                content_block: ContentBlock::Text {
                    text: String::new(),
                },
            }));
        }
        out.push(text_delta_event(self.text_index, text));
    }

    /// Close the open text block, if any.
    pub fn close_text(&mut self, out: &mut ClientEvents) {
        if self.text_started {
            self.text_started = false;
            out.push(block_stop_event(self.text_index));
        }
    }

    /// Merge an incremental tool-call delta for provider call `key`.
    ///
    /// The block starts once a name is known; fragments received before
    /// that are replayed as the first `input_json_delta`.
    pub fn push_tool_call_delta(
        &mut self,
        key: usize,
        id: Option<&str>,
        name: Option<&str>,
        arguments: Option<&str>,
        out: &mut ClientEvents,
    ) {
        if self.finished {
            return;
        }
        let call = self.tool_calls.entry(key).or_default();
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            if call.id.is_empty() {
                call.id = id.to_string();
            }
        }
        if let Some(name) = name.filter(|name| !name.is_empty()) {
            if call.name.is_empty() {
                call.name = name.to_string();
            }
        }
        let fragment = arguments.unwrap_or_default();
        call.arguments.push_str(fragment);

        if let Some(index) = call.index {
            if !fragment.is_empty() && !call.closed {
                out.push(input_json_delta_event(index, fragment));
            }
            return;
        }
        if call.name.is_empty() {
            return;
        }

        self.close_text(out);
        let index = self.next_index();
        let Some(call) = self.tool_calls.get_mut(&key) else {
            return;
        };
        call.index = Some(index);
        if call.id.is_empty() {
            call.id = new_tool_use_id();
        }
        out.push(tool_use_start_event(index, &call.id, &call.name));
        if !call.arguments.is_empty() {
            out.push(input_json_delta_event(index, &call.arguments));
        }
    }

    /// Emit a tool call whose arguments arrived whole: start, one delta, stop.
    pub fn push_complete_tool_call(&mut self, name: &str, arguments: &str, out: &mut ClientEvents) {
        if self.finished {
            return;
        }
        self.close_text(out);
        let index = self.next_index();
        let id = new_tool_use_id();
        out.push(tool_use_start_event(index, &id, name));
        out.push(input_json_delta_event(index, arguments));
        out.push(block_stop_event(index));
        let key = self.tool_calls.len();
        self.tool_calls.insert(
            key,
            ToolCallState {
                id,
                name: name.to_string(),
                arguments: arguments.to_string(),
                index: Some(index),
                closed: true,
            },
        );
    }

    /// Close every open block in index order, then emit `message_delta` and
    /// `message_stop`. Does nothing once the stream has finished.
    pub fn finish(&mut self, stop_reason: StopReason, out: &mut ClientEvents) {
        if self.finished {
            return;
        }
        self.ensure_started(out);

        let mut open: SmallVec<[usize; 4]> = SmallVec::new();
        if self.text_started {
            self.text_started = false;
            open.push(self.text_index);
        }
        for call in self.tool_calls.values_mut() {
            match call.index {
                Some(index) if !call.closed => {
                    call.closed = true;
                    open.push(index);
                }
                Some(_) => {}
                None => {
                    tracing::warn!(
                        "dropping streamed tool call without a name (id='{}', {} argument bytes)",
                        call.id,
                        call.arguments.len()
                    );
                }
            }
        }
        open.sort_unstable();
        for index in open {
            out.push(block_stop_event(index));
        }

        out.push(ClientEvent::from_event(&StreamEvent::MessageDelta {
            delta: MessageDeltaBody {
                stop_reason: Some(stop_reason),
                stop_sequence: None,
            },
            usage: DeltaUsage {
                output_tokens: self.output_tokens,
            },
        }));
        out.push(message_stop_event());
        self.finished = true;
    }
}

// ---------------------------------------------------------------------------
// Hot-path encoders
// ---------------------------------------------------------------------------

fn text_delta_event(index: usize, text: &str) -> ClientEvent {
    let mut json = String::with_capacity(80 + text.len());
    json.push_str("{\"type\":\"content_block_delta\",\"index\":");
    push_usize_decimal(&mut json, index);
    json.push_str(",\"delta\":{\"type\":\"text_delta\",\"text\":");
    push_json_string_escaped(&mut json, text);
    json.push_str("}}");
    ClientEvent {
        event: "content_block_delta",
        data: json,
    }
}

fn input_json_delta_event(index: usize, partial_json: &str) -> ClientEvent {
    let mut json = String::with_capacity(96 + partial_json.len());
    json.push_str("{\"type\":\"content_block_delta\",\"index\":");
    push_usize_decimal(&mut json, index);
    json.push_str(",\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":");
    push_json_string_escaped(&mut json, partial_json);
    json.push_str("}}");
    ClientEvent {
        event: "content_block_delta",
        data: json,
    }
}

fn block_stop_event(index: usize) -> ClientEvent {
    let mut json = String::with_capacity(48);
    json.push_str("{\"type\":\"content_block_stop\",\"index\":");
    push_usize_decimal(&mut json, index);
    json.push('}');
    ClientEvent {
        event: "content_block_stop",
        data: json,
    }
}

fn message_stop_event() -> ClientEvent {
    ClientEvent {
        event: "message_stop",
        data: "{\"type\":\"message_stop\"}".to_string(),
    }
}

fn tool_use_start_event(index: usize, id: &str, name: &str) -> ClientEvent {
    ClientEvent::from_event(&StreamEvent::ContentBlockStart {
        index,
        content_block: ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input: serde_json::Value::Object(serde_json::Map::new()),
        },
    })
}
