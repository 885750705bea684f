use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use smsgate_core::CoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent `{"error": ...}`
/// JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The modem (or another dependency) cannot take traffic right now.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, .. } => {
                    (StatusCode::NOT_FOUND, format!("{entity} not found"))
                }
                CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
                // 429 carries the rate-limit headers even on denial.
                CoreError::RateLimited { limit, reset } => {
                    let mut response = (
                        StatusCode::TOO_MANY_REQUESTS,
                        axum::Json(json!({ "error": "Rate limit exceeded" })),
                    )
                        .into_response();
                    insert_rate_limit_headers(&mut response, *limit, 0, *reset);
                    return response;
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
                CoreError::InvalidTransition { .. } => (StatusCode::CONFLICT, core.to_string()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal_pair()
                }
            },
            AppError::Database(err) => {
                tracing::error!(error = %err, "Database error");
                internal_pair()
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
        };

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

/// Attach the `X-RateLimit-*` headers to a response.
///
/// Header names are registered lowercase; the wire is case-insensitive.
pub fn insert_rate_limit_headers(response: &mut Response, limit: u32, remaining: u32, reset: i64) {
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", header_num(limit as i64));
    headers.insert("x-ratelimit-remaining", header_num(remaining as i64));
    headers.insert("x-ratelimit-reset", header_num(reset));
}

fn header_num(value: i64) -> HeaderValue {
    // Decimal integers are always valid header values.
    HeaderValue::from_str(&value.to_string()).expect("numeric header value")
}

fn internal_pair() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "An internal error occurred".to_string(),
    )
}
