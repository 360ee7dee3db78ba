//! Streaming plumbing shared by every provider: the SSE reader/writer and the
//! per-response state machine that keeps client block indices consistent.
pub mod sse;
pub mod state;

pub use sse::{anthropic_sse_frame, sse_event_stream, SseEvent, SseParser};
pub use state::{ClientEvent, ClientEvents, StreamState, ToolCallState};
