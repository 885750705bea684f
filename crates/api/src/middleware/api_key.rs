//! API-key authentication and per-key rate limiting.
//!
//! Runs as a `from_fn` layer (not just an extractor) because the
//! rate-limit headers must land on every authenticated response, success
//! or failure, which requires wrapping the downstream call.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use uuid::Uuid;

use smsgate_core::api_keys::{lookup_prefix, verify_secret};
use smsgate_core::CoreError;
use smsgate_db::repositories::ApiKeyRepo;

use crate::error::{insert_rate_limit_headers, AppError};
use crate::state::AppState;

/// Header carrying the bearer credential.
const API_KEY_HEADER: &str = "x-api-key";

/// The authenticated API key, inserted into request extensions by
/// [`require_api_key`].
///
/// Use as an extractor parameter in handlers behind the middleware:
///
/// ```ignore
/// async fn my_handler(key: AuthedKey) -> AppResult<Json<()>> {
///     tracing::info!(api_key_id = %key.id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthedKey {
    pub id: Uuid,
    pub name: String,
    /// Effective hourly quota (per-key override or configured default).
    pub rate_limit: u32,
}

impl FromRequestParts<AppState> for AuthedKey {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthedKey>().cloned().ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Missing API key".into()))
        })
    }
}

/// Authenticate the request and enforce the caller's hourly quota.
///
/// The authentication failure message never reveals whether the prefix,
/// the secret, or the key's active flag was at fault.
pub async fn require_api_key(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = authenticate(&state, request.headers()).await?;

    let decision = state
        .counters
        .check_and_increment(key.id, key.rate_limit, Utc::now().timestamp())
        .map_err(|e| {
            tracing::warn!(api_key_id = %key.id, limit = key.rate_limit, "Rate limit exceeded");
            AppError::Core(e)
        })?;

    // Best-effort usage timestamp; dropped silently when the updater
    // cannot keep up.
    let _ = state.last_used_tx.try_send(key.id);

    request.extensions_mut().insert(key);
    let mut response = next.run(request).await;
    insert_rate_limit_headers(
        &mut response,
        decision.limit,
        decision.remaining,
        decision.reset,
    );
    Ok(response)
}

/// Resolve and verify the presented credential.
async fn authenticate(state: &AppState, request: &Request) -> Result<AuthedKey, AppError> {
    let mut values = request.headers().get_all(API_KEY_HEADER).iter();
    let raw = values
        .next()
        .ok_or_else(|| unauthorized("Missing API key"))?;
    if values.next().is_some() {
        return Err(unauthorized("Invalid API key"));
    }

    let secret = raw
        .to_str()
        .map_err(|_| unauthorized("Invalid API key"))?
        .to_owned();
    let prefix = lookup_prefix(&secret);

    let key = ApiKeyRepo::find_active_by_prefix(&state.pool, prefix)
        .await?
        .ok_or_else(|| unauthorized("Invalid API key"))?;

    let verified = verify_secret(&secret, &key.key_hash).map_err(|e| {
        tracing::error!(api_key_id = %key.id, error = %e, "Stored key hash is unreadable");
        AppError::Core(CoreError::Internal("credential verification failed".into()))
    })?;
    if !verified {
        return Err(unauthorized("Invalid API key"));
    }

    let rate_limit = key
        .rate_limit
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(state.config.default_rate_limit);

    Ok(AuthedKey {
        id: key.id,
        name: key.name,
        rate_limit,
    })
}

fn unauthorized(message: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(message.into()))
}
