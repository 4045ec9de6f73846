use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter for simple API protection.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    success: bool,
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is
/// used. Otherwise a new UUIDv4 is generated. The ID is inserted into
/// request extensions as [`RequestId`] and echoed on the response as the
/// `x-request-id` header.
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Axum middleware enforcing the fixed-window rate limit.
pub async fn enforce_rate_limit(
    State(limiter): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    {
        let mut window = limiter.state.lock().await;
        if window.started_at.elapsed() >= limiter.window {
            window.started_at = Instant::now();
            window.count = 0;
        }
        window.count += 1;
        if window.count > limiter.max_requests {
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(MiddlewareErrorBody {
                    success: false,
                    error: MiddlewareError {
                        code: "rate_limited",
                        message: "too many requests; retry later",
                    },
                }),
            )
                .into_response();
        }
    }

    next.run(request).await
}
