//! Repository for the `send_jobs` queue table.
//!
//! Workers claim jobs with `FOR UPDATE SKIP LOCKED`, so multiple
//! dispatcher tasks never double-claim. Retry scheduling distinguishes
//! `retry` (attempt counted, exponential backoff) from `snooze`
//! (attempt **not** counted, the circuit-open case).

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::job::{SendJob, MAX_ATTEMPTS, QUEUE_SEND};

const COLUMNS: &str = "\
    id, queue, message_id, state, attempt, max_attempts, scheduled_at, \
    last_error, inserted_at, updated_at";

/// Base delay before the second execution of a job.
const RETRY_BASE_SECS: i64 = 15;

/// Delay before re-scheduling a job whose send hit an open circuit.
pub const SNOOZE_SECS: i64 = 60;

/// Backoff before execution number `attempt + 1`: 15 s doubling per
/// completed attempt (15 s, 30 s, 60 s, ...).
pub fn retry_delay_secs(attempt: i32) -> i64 {
    RETRY_BASE_SECS << (attempt.max(1) - 1).min(12)
}

/// Provides queue operations for outbound delivery jobs.
pub struct JobRepo;

impl JobRepo {
    /// Enqueue a delivery job for a message on the `sms_send` queue.
    ///
    /// Takes any executor so callers can enqueue inside the transaction
    /// that creates the message.
    pub async fn enqueue_send<'e, E>(executor: E, message_id: Uuid) -> Result<SendJob, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO send_jobs (queue, message_id, max_attempts) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SendJob>(&query)
            .bind(QUEUE_SEND)
            .bind(message_id)
            .bind(MAX_ATTEMPTS)
            .fetch_one(executor)
            .await
    }

    /// Atomically claim the next due job on a queue.
    ///
    /// Eligible jobs are `available` or `scheduled` with `scheduled_at` in
    /// the past. The claimed job moves to `executing`.
    pub async fn claim_next(pool: &PgPool, queue: &str) -> Result<Option<SendJob>, sqlx::Error> {
        let query = format!(
            "UPDATE send_jobs \
             SET state = 'executing', updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM send_jobs \
                 WHERE queue = $1 \
                   AND state IN ('available', 'scheduled') \
                   AND scheduled_at <= NOW() \
                 ORDER BY scheduled_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SendJob>(&query)
            .bind(queue)
            .fetch_optional(pool)
            .await
    }

    /// Mark a job as successfully completed.
    pub async fn complete(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE send_jobs SET state = 'completed', updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Cancel a job that turned out not to be actionable (message missing
    /// or already final).
    pub async fn cancel(pool: &PgPool, id: i64, reason: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE send_jobs \
             SET state = 'cancelled', last_error = $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(reason)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Discard a job whose retry budget is exhausted or whose error is
    /// non-retryable.
    pub async fn discard(pool: &PgPool, id: i64, reason: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE send_jobs \
             SET state = 'discarded', last_error = $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(reason)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Re-schedule a failed execution after `delay_secs`.
    /// Increments the attempt counter; callers compute the delay with
    /// [`retry_delay_secs`].
    pub async fn retry(
        pool: &PgPool,
        id: i64,
        error: &str,
        delay_secs: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE send_jobs \
             SET state = 'scheduled', \
                 attempt = attempt + 1, \
                 scheduled_at = NOW() + make_interval(secs => $2), \
                 last_error = $3, \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(delay_secs as f64)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Defer a job without counting an attempt (circuit-open case).
    pub async fn snooze(pool: &PgPool, id: i64, reason: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE send_jobs \
             SET state = 'scheduled', \
                 scheduled_at = NOW() + make_interval(secs => $2), \
                 last_error = $3, \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(SNOOZE_SECS as f64)
        .bind(reason)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Return `executing` jobs to `available` on a queue.
    ///
    /// Called once at dispatcher startup: jobs stranded mid-execution by a
    /// crash become claimable again (at-least-once delivery; the message
    /// status transitions deduplicate).
    pub async fn release_orphaned(pool: &PgPool, queue: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE send_jobs \
             SET state = 'available', updated_at = NOW() \
             WHERE queue = $1 AND state = 'executing'",
        )
        .bind(queue)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Count jobs still owed work on a queue (for health reporting).
    pub async fn pending_count(pool: &PgPool, queue: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM send_jobs \
             WHERE queue = $1 AND state IN ('available', 'scheduled', 'executing')",
        )
        .bind(queue)
        .fetch_one(pool)
        .await
    }

    /// Find a job by id.
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<SendJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM send_jobs WHERE id = $1");
        sqlx::query_as::<_, SendJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
