//! API key model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use smsgate_core::types::Timestamp;

/// A row from the `api_keys` table.
///
/// **Note:** `key_hash` is never serialized to responses; `key_prefix` is
/// the human-readable identifier.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ApiKey {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub key_prefix: String,
    pub is_active: bool,
    /// Hourly quota; `None` falls back to the configured default.
    pub rate_limit: Option<i32>,
    pub last_used_at: Option<Timestamp>,
    pub metadata: serde_json::Value,
    pub inserted_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Lightweight view of an API key for list responses. Omits the hash.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ApiKeyListItem {
    pub id: Uuid,
    pub name: String,
    pub key_prefix: String,
    pub is_active: bool,
    pub rate_limit: Option<i32>,
    pub last_used_at: Option<Timestamp>,
    pub inserted_at: Timestamp,
}

/// DTO for creating a new API key.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateApiKey {
    pub name: String,
    /// Optional per-key hourly quota.
    pub rate_limit: Option<i32>,
}

/// Response returned when a new API key is created.
/// Includes the plaintext secret (shown exactly once).
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyCreatedResponse {
    pub id: Uuid,
    pub name: String,
    pub key_prefix: String,
    /// The full plaintext secret. Shown **once** and never stored.
    pub secret: String,
    pub rate_limit: Option<i32>,
    pub inserted_at: Timestamp,
}
