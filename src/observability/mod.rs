pub mod token_counter;

use std::time::Instant;

use tracing_subscriber::EnvFilter;

use crate::protocol::anthropic::Usage;

/// Initialize the tracing subscriber with the configured log level and format.
///
/// Maps config log levels to tracing levels:
/// - "DISABLED" -> no subscriber installed
/// - "WARNING" -> WARN
/// - "CRITICAL" -> ERROR
/// - Others map directly (DEBUG, INFO, ERROR)
///
/// `log_format` selects `json` lines or the default human-readable `text`.
pub fn init_tracing(log_level: &str, log_format: &str) {
    let level = log_level.to_uppercase();

    if level == "DISABLED" {
        return;
    }

    let tracing_level = match level.as_str() {
        "WARNING" => "WARN",
        "CRITICAL" => "ERROR",
        other => other,
    };

    let filter = EnvFilter::try_new(tracing_level).unwrap_or_else(|_| EnvFilter::new("INFO"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);
    if log_format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Log an accepted request before it is forwarded.
pub fn log_request_start(provider: &str, model: &str, stream: bool, message_count: usize) {
    tracing::info!(
        provider = provider,
        model = model,
        stream = stream,
        messages = message_count,
        "forwarding request"
    );
}

/// Log token usage for a completed request, computing duration from start time.
pub fn log_request_complete(provider: &str, model: &str, usage: Usage, start_time: Instant) {
    token_counter::log_request_usage(provider, model, usage, start_time.elapsed());
}
