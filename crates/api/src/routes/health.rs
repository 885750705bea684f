use axum::routing::get;
use axum::Router;

use crate::handlers::health;
use crate::state::AppState;

/// Mount the public health route (root-level, not under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/api/health", get(health::health))
}
