use criterion::{black_box, criterion_group, criterion_main, Criterion};
use llm_router::protocol::anthropic::MessagesRequest;
use llm_router::provider::{gemini, openai};
use llm_router::stream::{ClientEvents, SseParser, StreamState};

fn sample_request() -> MessagesRequest {
    let body = serde_json::json!({
        "model": "gpt-4o",
        "max_tokens": 1024,
        "system": "You are a helpful assistant",
        "messages": [
            {"role": "user", "content": "What is the weather in SF?"},
            {"role": "assistant", "content": [
                {"type": "tool_use", "id": "call_1", "name": "get_weather", "input": {"city": "SF"}}
            ]},
            {"role": "user", "content": [
                {"type": "tool_result", "tool_use_id": "call_1", "content": "Sunny, 18C"}
            ]}
        ],
        "tools": [{
            "name": "get_weather",
            "description": "Get weather",
            "input_schema": {
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"]
            }
        }]
    });
    MessagesRequest::from_slice(&serde_json::to_vec(&body).expect("serialize sample"))
        .expect("sample request")
}

fn large_request(messages: usize, text_len: usize) -> MessagesRequest {
    let text = "x".repeat(text_len);
    let messages: Vec<_> = (0..messages)
        .map(|i| {
            let role = if i % 2 == 0 { "user" } else { "assistant" };
            serde_json::json!({"role": role, "content": text})
        })
        .collect();
    let body = serde_json::json!({"model": "gpt-4o", "messages": messages});
    MessagesRequest::from_slice(&serde_json::to_vec(&body).expect("serialize sample"))
        .expect("sample request")
}

const OPENAI_TEXT_CHUNK: &str =
    r#"{"id":"c1","choices":[{"index":0,"delta":{"content":"Hello there, how can I help?"}}]}"#;
const OPENAI_TOOL_CHUNK: &str = r#"{"id":"c1","choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"city\":\"SF\"}"}}]}}]}"#;
const GEMINI_TEXT_CHUNK: &str = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello there, how can I help?"}]}}],"usageMetadata":{"promptTokenCount":12,"candidatesTokenCount":7}}"#;

fn started_state() -> StreamState {
    let mut state = StreamState::new("gpt-4o");
    let mut sink = ClientEvents::new();
    state.ensure_started(&mut sink);
    state
}

fn bench_request_transform(c: &mut Criterion) {
    let request = sample_request();
    c.bench_function("request_openai_chat", |b| {
        b.iter(|| black_box(openai::build_chat_request(black_box(&request), "gpt-4o")));
    });
    c.bench_function("request_gemini", |b| {
        b.iter(|| {
            black_box(gemini::build_generate_request(
                black_box(&request),
                "gemini-2.5-flash",
            ))
        });
    });

    let large = large_request(50, 2_000);
    c.bench_function("request_openai_chat_large_50msg_100k", |b| {
        b.iter(|| black_box(openai::build_chat_request(black_box(&large), "gpt-4o")));
    });
}

fn bench_stream_transcode(c: &mut Criterion) {
    let mut state = started_state();
    c.bench_function("stream_openai_text_delta", |b| {
        b.iter(|| black_box(openai::transcode_chunk(black_box(OPENAI_TEXT_CHUNK.as_bytes()), &mut state)));
    });

    let mut state = started_state();
    let mut sink = ClientEvents::new();
    state.push_tool_call_delta(0, Some("call_1"), Some("get_weather"), None, &mut sink);
    c.bench_function("stream_openai_tool_delta", |b| {
        b.iter(|| black_box(openai::transcode_chunk(black_box(OPENAI_TOOL_CHUNK.as_bytes()), &mut state)));
    });

    let mut state = started_state();
    c.bench_function("stream_gemini_text_delta", |b| {
        b.iter(|| black_box(gemini::transcode_chunk(black_box(GEMINI_TEXT_CHUNK.as_bytes()), &mut state)));
    });
}

fn bench_sse_parse(c: &mut Criterion) {
    let mut body = String::new();
    for _ in 0..64 {
        body.push_str("data: ");
        body.push_str(OPENAI_TEXT_CHUNK);
        body.push_str("\n\n");
    }
    c.bench_function("sse_parse_64_events", |b| {
        b.iter(|| {
            let mut parser = SseParser::new();
            black_box(parser.feed(black_box(&body)))
        });
    });
}

criterion_group!(
    benches,
    bench_request_transform,
    bench_stream_transcode,
    bench_sse_parse
);
criterion_main!(benches);
