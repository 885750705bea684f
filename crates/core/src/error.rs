use crate::message::MessageStatus;
use crate::types::EntityId;

/// Domain-level errors shared across the gateway crates.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: EntityId },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    /// The caller exhausted its hourly quota. Carries what the HTTP layer
    /// needs for the `X-RateLimit-*` headers.
    #[error("Rate limit exceeded")]
    RateLimited { limit: u32, reset: i64 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid message transition: {from} -> {to}")]
    InvalidTransition {
        from: MessageStatus,
        to: MessageStatus,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}
