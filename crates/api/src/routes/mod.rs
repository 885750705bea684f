pub mod api_keys;
pub mod health;
pub mod messages;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /messages                      submit, list (API key required)
/// /messages/{id}                 fetch one (API key required)
///
/// /admin/api-keys                create, list (admin token)
/// /admin/api-keys/{id}           deactivate (admin token)
/// ```
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(messages::router(state))
        .nest("/admin", api_keys::router())
}
