//! Repository for the `poll_cursors` table.
//!
//! The inbox poller's `last_seen_index` lives here rather than in process
//! memory, so a restart resumes where the previous run stopped instead of
//! re-reading the whole inbox.

use sqlx::PgPool;

/// Cursor name used by the inbound SMS poller.
pub const CURSOR_INBOX: &str = "inbox";

/// Provides access to named monotonic cursors.
pub struct PollCursorRepo;

impl PollCursorRepo {
    /// Read a cursor, defaulting to 0 when it has never been written.
    pub async fn get(pool: &PgPool, name: &str) -> Result<i64, sqlx::Error> {
        let value: Option<i64> = sqlx::query_scalar(
            "SELECT last_seen_index FROM poll_cursors WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(pool)
        .await?;
        Ok(value.unwrap_or(0))
    }

    /// Advance a cursor. The stored value never decreases, so concurrent
    /// or out-of-order advances are safe.
    pub async fn advance(pool: &PgPool, name: &str, index: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO poll_cursors (name, last_seen_index) \
             VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE \
             SET last_seen_index = GREATEST(poll_cursors.last_seen_index, EXCLUDED.last_seen_index), \
                 updated_at = NOW()",
        )
        .bind(name)
        .bind(index)
        .execute(pool)
        .await?;
        Ok(())
    }
}
