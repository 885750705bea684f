//! Message entity model and listing DTOs.

use serde::Deserialize;
use sqlx::FromRow;
use uuid::Uuid;

use smsgate_core::types::Timestamp;

/// A row from the `messages` table.
///
/// `direction` and `status` are stored as strings; parse through
/// `smsgate_core::message` when typed handling is needed.
#[derive(Debug, Clone, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub direction: String,
    pub phone_number: String,
    pub content: String,
    pub status: String,
    pub modem_message_id: Option<String>,
    pub error_message: Option<String>,
    pub api_key_id: Option<Uuid>,
    pub sent_at: Option<Timestamp>,
    pub delivered_at: Option<Timestamp>,
    pub received_at: Option<Timestamp>,
    pub metadata: serde_json::Value,
    pub inserted_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Query parameters for `GET /api/v1/messages`.
#[derive(Debug, Default, Deserialize)]
pub struct MessageListQuery {
    /// Filter by direction (`outgoing` / `incoming`).
    pub direction: Option<String>,
    /// Filter by status (`pending`, `sent`, ...).
    pub status: Option<String>,
    /// Filter by exact phone number.
    pub phone: Option<String>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
