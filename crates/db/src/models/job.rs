//! Send-queue job model.

use sqlx::FromRow;
use uuid::Uuid;

use smsgate_core::types::Timestamp;

/// Queue name for outbound SMS delivery jobs.
pub const QUEUE_SEND: &str = "sms_send";

/// Default number of executions before a job is discarded.
pub const MAX_ATTEMPTS: i32 = 3;

/// A row from the `send_jobs` table.
///
/// `attempt` counts completed executions; a job in `available` or
/// `scheduled` state with `scheduled_at <= now` is eligible for claim.
#[derive(Debug, Clone, FromRow)]
pub struct SendJob {
    pub id: i64,
    pub queue: String,
    pub message_id: Uuid,
    pub state: String,
    pub attempt: i32,
    pub max_attempts: i32,
    pub scheduled_at: Timestamp,
    pub last_error: Option<String>,
    pub inserted_at: Timestamp,
    pub updated_at: Timestamp,
}
