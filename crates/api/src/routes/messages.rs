use axum::extract::{Request, State};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::messages;
use crate::middleware::api_key::require_api_key;
use crate::state::AppState;

/// Mount the `/messages` routes behind the API-key middleware.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/messages", post(messages::create_message).get(messages::list_messages))
        .route("/messages/{id}", get(messages::get_message))
        .layer(from_fn_with_state::<_, AppState, (State<AppState>, Request)>(
            state,
            require_api_key,
        ))
}
