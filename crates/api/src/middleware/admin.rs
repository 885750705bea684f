//! Static-token guard for the operator key-management endpoints.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use smsgate_core::CoreError;

use crate::error::AppError;
use crate::state::AppState;

/// Requires `Authorization: Bearer <ADMIN_TOKEN>`.
///
/// When no `ADMIN_TOKEN` is configured the admin surface is disabled and
/// every request is rejected.
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.admin_token.as_deref() else {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Admin interface is disabled".into(),
            )));
        };

        let presented = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Missing admin token".into()))
            })?;

        if presented != expected {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid admin token".into(),
            )));
        }
        Ok(RequireAdmin)
    }
}
