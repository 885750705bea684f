//! Operator handlers for API key management.
//!
//! All endpoints require the static admin bearer token via
//! [`RequireAdmin`]. The plaintext secret is returned **only** on
//! creation; subsequent queries expose the `key_prefix` alone.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use smsgate_core::api_keys::generate_api_key;
use smsgate_core::CoreError;
use smsgate_db::models::api_key::{ApiKeyCreatedResponse, CreateApiKey};
use smsgate_db::repositories::ApiKeyRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::admin::RequireAdmin;
use crate::state::AppState;

/// POST /api/v1/admin/api-keys
///
/// Generate a new API key. The plaintext secret is returned exactly once.
pub async fn create_api_key(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateApiKey>,
) -> AppResult<impl IntoResponse> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    if let Some(limit) = input.rate_limit {
        if limit <= 0 {
            return Err(AppError::BadRequest("rate_limit must be positive".into()));
        }
    }

    let generated = generate_api_key().map_err(|e| {
        tracing::error!(error = %e, "API key generation failed");
        AppError::Core(CoreError::Internal("key generation failed".into()))
    })?;

    let key = ApiKeyRepo::create(
        &state.pool,
        input.name.trim(),
        &generated.hash,
        &generated.prefix,
        input.rate_limit,
    )
    .await?;

    tracing::info!(
        api_key_id = %key.id,
        key_prefix = %key.key_prefix,
        "API key created"
    );

    let response = ApiKeyCreatedResponse {
        id: key.id,
        name: key.name,
        key_prefix: key.key_prefix,
        secret: generated.secret,
        rate_limit: key.rate_limit,
        inserted_at: key.inserted_at,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/admin/api-keys
///
/// List all keys. Shows prefixes only, never secrets or hashes.
pub async fn list_api_keys(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let keys = ApiKeyRepo::list(&state.pool).await?;
    Ok(Json(keys))
}

/// Query parameters for key removal.
#[derive(Debug, Deserialize)]
pub struct RemoveApiKeyParams {
    /// `true` destroys the row outright instead of deactivating it.
    /// Message history survives either way (the FK nullifies on delete).
    #[serde(default)]
    pub permanent: bool,
}

/// DELETE /api/v1/admin/api-keys/{id}
///
/// Deactivate a key (soft, default) or destroy it with `?permanent=true`.
pub async fn remove_api_key(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<RemoveApiKeyParams>,
) -> AppResult<impl IntoResponse> {
    if params.permanent {
        let deleted = ApiKeyRepo::delete(&state.pool, id).await?;
        if !deleted {
            return Err(AppError::Core(CoreError::NotFound {
                entity: "ApiKey",
                id,
            }));
        }
        tracing::info!(api_key_id = %id, "API key destroyed");
        return Ok(StatusCode::NO_CONTENT);
    }

    let key = ApiKeyRepo::deactivate(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ApiKey",
            id,
        }))?;

    tracing::info!(api_key_id = %key.id, key_prefix = %key.key_prefix, "API key deactivated");
    Ok(StatusCode::NO_CONTENT)
}
