//! Handlers for the `/messages` resource.
//!
//! All endpoints sit behind the API-key middleware; outgoing messages are
//! scoped to the calling key.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use smsgate_core::message::{validate_content, validate_phone, Direction, MessageStatus};
use smsgate_core::types::Timestamp;
use smsgate_core::CoreError;
use smsgate_db::models::message::{Message, MessageListQuery};
use smsgate_db::repositories::MessageRepo;
use smsgate_modem::CircuitState;

use crate::error::{AppError, AppResult};
use crate::middleware::api_key::AuthedKey;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body for `POST /api/v1/messages`.
#[derive(Debug, Deserialize)]
pub struct CreateMessage {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub content: String,
}

/// Public JSON shape of a message. Timestamps are ISO 8601 UTC; absent
/// optionals are omitted entirely.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: Uuid,
    pub direction: String,
    pub phone: String,
    pub content: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modem_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_at: Option<Timestamp>,
    pub inserted_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            direction: m.direction,
            phone: m.phone_number,
            content: m.content,
            status: m.status,
            modem_message_id: m.modem_message_id,
            error_message: m.error_message,
            sent_at: m.sent_at,
            delivered_at: m.delivered_at,
            received_at: m.received_at,
            inserted_at: m.inserted_at,
            updated_at: m.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/messages
///
/// Validate, persist as `pending`, and enqueue the delivery job. Returns
/// 201 with the stored message; delivery progress is observed by polling.
pub async fn create_message(
    key: AuthedKey,
    State(state): State<AppState>,
    Json(input): Json<CreateMessage>,
) -> AppResult<impl IntoResponse> {
    validate_phone(&input.phone)?;
    validate_content(&input.content)?;

    // A known-dead modem refuses new submissions outright rather than
    // letting the queue grow against hardware that cannot drain it.
    if state.modem.circuit_state() == CircuitState::Open {
        return Err(AppError::ServiceUnavailable("Modem unavailable".into()));
    }

    let message =
        MessageRepo::create_outgoing_queued(&state.pool, &input.phone, &input.content, key.id)
            .await?;

    tracing::info!(
        message_id = %message.id,
        api_key_id = %key.id,
        phone = %message.phone_number,
        "Message accepted"
    );

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::from(message)),
    ))
}

/// GET /api/v1/messages
///
/// List messages visible to the caller, newest first. Supports
/// `direction`, `status`, `phone`, `limit`, and `offset` filters.
pub async fn list_messages(
    key: AuthedKey,
    State(state): State<AppState>,
    Query(params): Query<MessageListQuery>,
) -> AppResult<Json<Vec<MessageResponse>>> {
    if let Some(direction) = params.direction.as_deref() {
        if Direction::parse(direction).is_none() {
            return Err(AppError::BadRequest(format!(
                "unknown direction: {direction:?}"
            )));
        }
    }
    if let Some(status) = params.status.as_deref() {
        if MessageStatus::parse(status).is_none() {
            return Err(AppError::BadRequest(format!("unknown status: {status:?}")));
        }
    }

    let messages = MessageRepo::list_for_api_key(&state.pool, key.id, &params).await?;
    Ok(Json(messages.into_iter().map(MessageResponse::from).collect()))
}

/// GET /api/v1/messages/{id}
///
/// 404 for messages that do not exist *or* belong to another key; the
/// two cases are indistinguishable to the caller.
pub async fn get_message(
    key: AuthedKey,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let message = MessageRepo::find_for_api_key(&state.pool, id, key.id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Message",
            id,
        }))?;
    Ok(Json(MessageResponse::from(message)))
}
