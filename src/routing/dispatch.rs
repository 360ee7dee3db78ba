use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::api::{count_tokens_handler, health_handler, messages_handler};
use crate::error::GatewayError;
use crate::state::AppState;

const DEFAULT_BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, PartialEq, Eq)]
enum RouteMatch<'a> {
    Health,
    Messages { provider: Option<&'a str> },
    CountTokens { provider: Option<&'a str> },
    TelemetrySink,
    MethodNotAllowed,
    NotFound,
}

/// Dispatch a raw HTTP request to the matching handler.
///
/// # Errors
///
/// This function currently never returns `Err` and uses `Infallible`.
pub async fn dispatch_request(
    state: Arc<AppState>,
    base_path: Arc<str>,
    request: Request<Body>,
) -> Result<Response, Infallible> {
    let (parts, body) = request.into_parts();
    let route = match_route(&parts.method, parts.uri.path(), base_path.as_ref());

    let response = match route {
        RouteMatch::Health => health_handler(&state).into_response(),
        RouteMatch::Messages { provider } => {
            let body_bytes = match read_request_body(body).await {
                Ok(bytes) => bytes,
                Err(response) => return Ok(response),
            };
            messages_handler(state, provider, body_bytes).await
        }
        RouteMatch::CountTokens { provider } => {
            let body_bytes = match read_request_body(body).await {
                Ok(bytes) => bytes,
                Err(response) => return Ok(response),
            };
            count_tokens_handler(&state, provider, &body_bytes)
        }
        // Client telemetry is accepted and discarded.
        RouteMatch::TelemetrySink => StatusCode::OK.into_response(),
        RouteMatch::MethodNotAllowed => GatewayError::MethodNotAllowed.into_response(),
        RouteMatch::NotFound => {
            GatewayError::NotFound(format!("No route for {}", parts.uri.path())).into_response()
        }
    };

    Ok(response)
}

#[must_use]
pub fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim();
    if trimmed.is_empty() || trimmed == "/" {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.trim_end_matches('/').to_string()
    } else {
        format!("/{}", trimmed.trim_end_matches('/'))
    }
}

async fn read_request_body(body: Body) -> Result<bytes::Bytes, Response> {
    body::to_bytes(body, DEFAULT_BODY_LIMIT_BYTES)
        .await
        .map_err(|_| {
            (
                StatusCode::PAYLOAD_TOO_LARGE,
                axum::Json(crate::error::error_payload(
                    crate::error::ErrorKind::InvalidRequest,
                    "Request body too large (max 2MiB)",
                )),
            )
                .into_response()
        })
}

#[inline]
fn post_only<'a>(method: &Method, route: RouteMatch<'a>) -> RouteMatch<'a> {
    if method == Method::POST {
        route
    } else {
        RouteMatch::MethodNotAllowed
    }
}

fn match_route<'a>(method: &Method, path: &'a str, base_path: &str) -> RouteMatch<'a> {
    let Some(path) = strip_base_path(path, base_path) else {
        return RouteMatch::NotFound;
    };

    match path {
        "/" | "/health" => {
            if method == Method::GET {
                RouteMatch::Health
            } else {
                RouteMatch::MethodNotAllowed
            }
        }
        "/v1/messages" => post_only(method, RouteMatch::Messages { provider: None }),
        "/v1/messages/count_tokens" => {
            post_only(method, RouteMatch::CountTokens { provider: None })
        }
        "/api" => RouteMatch::TelemetrySink,
        _ if path.starts_with("/api/") => RouteMatch::TelemetrySink,
        _ => match_provider_route(method, path),
    }
}

/// `/{provider}/v1/messages` and `/{provider}/v1/messages/count_tokens`.
fn match_provider_route<'a>(method: &Method, path: &'a str) -> RouteMatch<'a> {
    let Some(rest) = path.strip_prefix('/') else {
        return RouteMatch::NotFound;
    };
    let Some((provider, tail)) = rest.split_once('/') else {
        return RouteMatch::NotFound;
    };
    if provider.is_empty() {
        return RouteMatch::NotFound;
    }
    match tail {
        "v1/messages" => post_only(
            method,
            RouteMatch::Messages {
                provider: Some(provider),
            },
        ),
        "v1/messages/count_tokens" => post_only(
            method,
            RouteMatch::CountTokens {
                provider: Some(provider),
            },
        ),
        _ => RouteMatch::NotFound,
    }
}

fn strip_base_path<'a>(path: &'a str, base_path: &str) -> Option<&'a str> {
    if base_path.is_empty() {
        return Some(path);
    }

    let remainder = path.strip_prefix(base_path)?;
    if remainder.is_empty() {
        Some("/")
    } else if remainder.starts_with('/') {
        Some(remainder)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_default_routes() {
        assert_eq!(match_route(&Method::GET, "/health", ""), RouteMatch::Health);
        assert_eq!(
            match_route(&Method::POST, "/v1/messages", ""),
            RouteMatch::Messages { provider: None }
        );
        assert_eq!(
            match_route(&Method::POST, "/v1/messages/count_tokens", ""),
            RouteMatch::CountTokens { provider: None }
        );
        assert_eq!(
            match_route(&Method::GET, "/v1/messages", ""),
            RouteMatch::MethodNotAllowed
        );
    }

    #[test]
    fn test_match_provider_routes() {
        assert_eq!(
            match_route(&Method::POST, "/gemini/v1/messages", ""),
            RouteMatch::Messages {
                provider: Some("gemini")
            }
        );
        assert_eq!(
            match_route(&Method::POST, "/glm/v1/messages/count_tokens", ""),
            RouteMatch::CountTokens {
                provider: Some("glm")
            }
        );
        assert_eq!(
            match_route(&Method::POST, "//v1/messages", ""),
            RouteMatch::NotFound
        );
        assert_eq!(
            match_route(&Method::POST, "/gemini/v1/other", ""),
            RouteMatch::NotFound
        );
    }

    #[test]
    fn test_telemetry_paths_accept_any_method() {
        assert_eq!(
            match_route(&Method::POST, "/api/event_logging/batch", ""),
            RouteMatch::TelemetrySink
        );
        assert_eq!(match_route(&Method::PUT, "/api", ""), RouteMatch::TelemetrySink);
        assert_eq!(match_route(&Method::GET, "/apiary", ""), RouteMatch::NotFound);
    }

    #[test]
    fn test_base_path_is_stripped() {
        assert_eq!(
            match_route(&Method::POST, "/router/v1/messages", "/router"),
            RouteMatch::Messages { provider: None }
        );
        assert_eq!(match_route(&Method::GET, "/router", "/router"), RouteMatch::Health);
        assert_eq!(
            match_route(&Method::POST, "/routerx/v1/messages", "/router"),
            RouteMatch::NotFound
        );
    }

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path(""), "");
        assert_eq!(normalize_base_path("/"), "");
        assert_eq!(normalize_base_path("router/"), "/router");
        assert_eq!(normalize_base_path(" /router "), "/router");
    }
}
