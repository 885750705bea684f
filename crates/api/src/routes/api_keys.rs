use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::api_keys;
use crate::state::AppState;

/// Mount the operator key-management routes (admin token enforced by the
/// handlers' `RequireAdmin` extractor).
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api-keys",
            get(api_keys::list_api_keys).post(api_keys::create_api_key),
        )
        .route("/api-keys/{id}", delete(api_keys::remove_api_key))
}
