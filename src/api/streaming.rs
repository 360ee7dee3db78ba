use std::convert::Infallible;
use std::pin::Pin;
use std::time::Instant;

use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use crate::observability::log_request_complete;
use crate::protocol::anthropic::{StopReason, Usage};
use crate::provider::Provider;
use crate::stream::{sse_event_stream, ClientEvents, SseEvent, StreamState};

type ProviderEvents = Pin<Box<dyn Stream<Item = Result<SseEvent, reqwest::Error>> + Send>>;

/// Completion bookkeeping for one stream. Dropping it before the stream
/// completes means the client went away.
struct StreamLog {
    provider: &'static str,
    model: String,
    start: Instant,
    completed: bool,
}

impl StreamLog {
    fn complete(&mut self, usage: Usage) {
        if self.completed {
            return;
        }
        self.completed = true;
        log_request_complete(self.provider, &self.model, usage, self.start);
    }
}

impl Drop for StreamLog {
    fn drop(&mut self) {
        if !self.completed {
            tracing::debug!(
                provider = self.provider,
                model = %self.model,
                elapsed_ms = self.start.elapsed().as_millis(),
                "client disconnected before stream completed"
            );
        }
    }
}

struct StreamContext {
    provider: Box<dyn Provider>,
    events: ProviderEvents,
    state: StreamState,
    log: StreamLog,
    done: bool,
}

impl StreamContext {
    /// Read provider events until one yields client output, returning the
    /// encoded frames. `None` ends the client stream.
    async fn next_frames(&mut self) -> Option<Bytes> {
        loop {
            if self.done {
                return None;
            }
            let mut out = ClientEvents::new();
            match self.events.next().await {
                Some(Ok(event)) if event.is_done() => self.close(&mut out),
                Some(Ok(event)) => {
                    if event.data.trim().is_empty() {
                        continue;
                    }
                    match self
                        .provider
                        .transform_stream_chunk(event.data.as_bytes(), &mut self.state)
                    {
                        Ok(events) => out = events,
                        Err(err) => {
                            tracing::warn!(
                                provider = self.provider.name(),
                                error = %err,
                                "skipping malformed provider chunk"
                            );
                            continue;
                        }
                    }
                }
                Some(Err(err)) => {
                    tracing::warn!(
                        provider = self.provider.name(),
                        error = %err,
                        "provider stream read failed; closing client stream"
                    );
                    self.close(&mut out);
                }
                None => self.close(&mut out),
            }
            if !out.is_empty() {
                return Some(encode_frames(&out));
            }
        }
    }

    /// End of provider input: close whatever is still open (a no-op after a
    /// normal finish) and log completion.
    fn close(&mut self, out: &mut ClientEvents) {
        self.state.finish(StopReason::EndTurn, out);
        self.done = true;
        self.log.complete(Usage {
            input_tokens: self.state.input_tokens,
            output_tokens: self.state.output_tokens,
        });
    }
}

fn encode_frames(events: &ClientEvents) -> Bytes {
    let capacity = events.iter().map(|e| e.data.len() + e.event.len() + 18).sum();
    let mut buf = String::with_capacity(capacity);
    for event in events {
        buf.push_str(&event.to_frame());
    }
    Bytes::from(buf)
}

/// Stream a successful provider response to the client as Anthropic SSE.
///
/// Provider chunks are read, transcoded and written one at a time; dropping
/// the returned body (client disconnect) drops the provider connection too.
pub(crate) fn stream_response(
    provider: Box<dyn Provider>,
    upstream: reqwest::Response,
    model: String,
    start: Instant,
) -> Response {
    let events: ProviderEvents = Box::pin(sse_event_stream(upstream.bytes_stream()));
    let ctx = StreamContext {
        log: StreamLog {
            provider: provider.name(),
            model: model.clone(),
            start,
            completed: false,
        },
        provider,
        events,
        state: StreamState::new(model),
        done: false,
    };
    let body = futures_util::stream::unfold(ctx, |mut ctx| async move {
        let frames = ctx.next_frames().await?;
        Some((frames, ctx))
    });
    sse_ok_response(Body::from_stream(body.map(Ok::<Bytes, Infallible>)))
}

#[inline]
fn sse_ok_response(body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = http::StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(
        http::header::CACHE_CONTROL,
        http::HeaderValue::from_static("no-cache"),
    );
    headers.insert(
        http::header::CONNECTION,
        http::HeaderValue::from_static("keep-alive"),
    );
    headers.insert(
        "x-accel-buffering",
        http::HeaderValue::from_static("no"),
    );
    response
}
