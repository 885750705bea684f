//! Message domain model: direction, status state machine, input validation.
//!
//! Pure logic, no database access. The repository layer enforces the same
//! transitions with SQL preconditions; this module is the single source of
//! truth for what those preconditions are.

use std::fmt;

use crate::error::CoreError;

/// Maximum content length in characters (single-segment SMS only).
pub const MAX_CONTENT_CHARS: usize = 160;

/// Maximum phone number length in characters, including a leading `+`.
pub const MAX_PHONE_CHARS: usize = 20;

/// Minimum number of digits a phone number must carry.
const MIN_PHONE_DIGITS: usize = 6;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Whether a message was submitted by a client or received from the modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Outgoing => "outgoing",
            Direction::Incoming => "incoming",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "outgoing" => Some(Direction::Outgoing),
            "incoming" => Some(Direction::Incoming),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle state of a message.
///
/// Outgoing messages move `pending -> queued -> sending -> sent ->
/// {delivered | failed}`, with `failed` also reachable directly from
/// `queued` and `sending` on non-retryable errors. Incoming messages are
/// created directly in `received`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Queued,
    Sending,
    Sent,
    Delivered,
    Failed,
    Received,
}

impl MessageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Queued => "queued",
            MessageStatus::Sending => "sending",
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Failed => "failed",
            MessageStatus::Received => "received",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(MessageStatus::Pending),
            "queued" => Some(MessageStatus::Queued),
            "sending" => Some(MessageStatus::Sending),
            "sent" => Some(MessageStatus::Sent),
            "delivered" => Some(MessageStatus::Delivered),
            "failed" => Some(MessageStatus::Failed),
            "received" => Some(MessageStatus::Received),
            _ => None,
        }
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MessageStatus::Delivered | MessageStatus::Failed | MessageStatus::Received
        )
    }

    /// Whether a delivery worker may (re-)attempt a send from this state,
    /// i.e. whether moving to `Sending` is legal.
    ///
    /// `Sending` itself qualifies so a retried job can re-enter the
    /// in-progress state after a transient failure; single-executor
    /// semantics are guaranteed by the queue's atomic claim, not by this
    /// check.
    pub fn is_sendable(self) -> bool {
        can_transition(self, MessageStatus::Sending)
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `from -> to` is a legal status transition for an outgoing message.
pub fn can_transition(from: MessageStatus, to: MessageStatus) -> bool {
    use MessageStatus::*;
    matches!(
        (from, to),
        (Pending, Queued)
            | (Pending, Sending)
            | (Queued, Sending)
            | (Sending, Sending)
            | (Sending, Sent)
            | (Sent, Delivered)
            | (Queued, Failed)
            | (Sending, Failed)
            | (Sent, Failed)
    )
}

/// Validate a status transition, mirroring [`can_transition`] as a `Result`
/// whose error names both states.
pub fn ensure_transition(from: MessageStatus, to: MessageStatus) -> Result<(), CoreError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition { from, to })
    }
}

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

/// Validate an outbound phone number: optional leading `+`, then digits,
/// at most [`MAX_PHONE_CHARS`] characters total.
pub fn validate_phone(phone: &str) -> Result<(), CoreError> {
    if phone.is_empty() {
        return Err(CoreError::Validation("phone is required".into()));
    }
    if phone.len() > MAX_PHONE_CHARS {
        return Err(CoreError::Validation(format!(
            "phone must be at most {MAX_PHONE_CHARS} characters"
        )));
    }
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if digits.len() < MIN_PHONE_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::Validation("phone format is invalid".into()));
    }
    Ok(())
}

/// Validate message content: 1 to [`MAX_CONTENT_CHARS`] characters.
/// Longer content is a validation error; segmentation is not supported.
pub fn validate_content(content: &str) -> Result<(), CoreError> {
    if content.is_empty() {
        return Err(CoreError::Validation("content is required".into()));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(CoreError::Validation(format!(
            "content must be at most {MAX_CONTENT_CHARS} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
