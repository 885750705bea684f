//! Integration tests for the send-job queue and message transition guards.

use sqlx::PgPool;
use uuid::Uuid;

use smsgate_db::models::job::QUEUE_SEND;
use smsgate_db::repositories::{JobRepo, MessageRepo};

/// Create a queued outgoing message (with its job) for tests.
async fn seed_message(pool: &PgPool) -> Uuid {
    // Messages created by the gateway always carry an API key; queue
    // semantics do not depend on it, so tests insert a bare key row.
    let key_id: Uuid = sqlx::query_scalar(
        "INSERT INTO api_keys (name, key_hash, key_prefix) \
         VALUES ('test', 'hash', 'sk_live_test00000000') \
         RETURNING id",
    )
    .fetch_one(pool)
    .await
    .expect("seed key");

    let message = MessageRepo::create_outgoing_queued(pool, "+33612345678", "hi", key_id)
        .await
        .expect("seed message");
    message.id
}

// ---------------------------------------------------------------------------
// Enqueue + claim
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn creating_a_message_enqueues_exactly_one_job(pool: PgPool) {
    let message_id = seed_message(&pool).await;

    let message = MessageRepo::find_by_id(&pool, message_id)
        .await
        .expect("lookup")
        .expect("exists");
    assert_eq!(message.status, "queued");

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM send_jobs WHERE message_id = $1")
            .bind(message_id)
            .fetch_one(&pool)
            .await
            .expect("count");
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn claim_moves_job_to_executing_and_is_exclusive(pool: PgPool) {
    let message_id = seed_message(&pool).await;

    let job = JobRepo::claim_next(&pool, QUEUE_SEND)
        .await
        .expect("claim")
        .expect("job available");
    assert_eq!(job.message_id, message_id);
    assert_eq!(job.state, "executing");
    assert_eq!(job.attempt, 0);

    // The same job must not be claimable twice.
    let second = JobRepo::claim_next(&pool, QUEUE_SEND).await.expect("claim");
    assert!(second.is_none());
}

// ---------------------------------------------------------------------------
// Retry vs snooze
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn retry_counts_an_attempt_and_defers_the_job(pool: PgPool) {
    seed_message(&pool).await;
    let job = JobRepo::claim_next(&pool, QUEUE_SEND)
        .await
        .expect("claim")
        .expect("job");

    JobRepo::retry(&pool, job.id, "modem timeout", 15)
        .await
        .expect("retry");

    let job = JobRepo::find_by_id(&pool, job.id)
        .await
        .expect("lookup")
        .expect("exists");
    assert_eq!(job.state, "scheduled");
    assert_eq!(job.attempt, 1);
    assert!(job.scheduled_at > job.inserted_at);
    assert_eq!(job.last_error.as_deref(), Some("modem timeout"));

    // Not yet due, so not claimable.
    let next = JobRepo::claim_next(&pool, QUEUE_SEND).await.expect("claim");
    assert!(next.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn snooze_does_not_count_an_attempt(pool: PgPool) {
    seed_message(&pool).await;
    let job = JobRepo::claim_next(&pool, QUEUE_SEND)
        .await
        .expect("claim")
        .expect("job");

    JobRepo::snooze(&pool, job.id, "circuit open").await.expect("snooze");

    let job = JobRepo::find_by_id(&pool, job.id)
        .await
        .expect("lookup")
        .expect("exists");
    assert_eq!(job.state, "scheduled");
    assert_eq!(job.attempt, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn release_orphaned_requeues_executing_jobs(pool: PgPool) {
    seed_message(&pool).await;
    let job = JobRepo::claim_next(&pool, QUEUE_SEND)
        .await
        .expect("claim")
        .expect("job");

    let released = JobRepo::release_orphaned(&pool, QUEUE_SEND)
        .await
        .expect("release");
    assert_eq!(released, 1);

    let reclaimed = JobRepo::claim_next(&pool, QUEUE_SEND)
        .await
        .expect("claim")
        .expect("job again");
    assert_eq!(reclaimed.id, job.id);
}

// ---------------------------------------------------------------------------
// Message transition guards
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn sent_messages_cannot_reenter_sending(pool: PgPool) {
    let message_id = seed_message(&pool).await;

    MessageRepo::mark_sending(&pool, message_id)
        .await
        .expect("mark sending")
        .expect("transition allowed");
    MessageRepo::mark_sent(&pool, message_id, "M-42")
        .await
        .expect("mark sent")
        .expect("transition allowed");

    // A stale worker must not be able to pull it back into `sending`.
    let denied = MessageRepo::mark_sending(&pool, message_id)
        .await
        .expect("mark sending");
    assert!(denied.is_none());

    let message = MessageRepo::find_by_id(&pool, message_id)
        .await
        .expect("lookup")
        .expect("exists");
    assert_eq!(message.status, "sent");
    assert_eq!(message.modem_message_id.as_deref(), Some("M-42"));
    assert!(message.sent_at.is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn delivered_requires_sent(pool: PgPool) {
    let message_id = seed_message(&pool).await;

    let denied = MessageRepo::mark_delivered(&pool, message_id)
        .await
        .expect("mark delivered");
    assert!(denied.is_none());

    MessageRepo::mark_sending(&pool, message_id).await.expect("sending");
    MessageRepo::mark_sent(&pool, message_id, "M-1").await.expect("sent");

    let delivered = MessageRepo::mark_delivered(&pool, message_id)
        .await
        .expect("mark delivered")
        .expect("transition allowed");
    assert_eq!(delivered.status, "delivered");
    assert!(delivered.delivered_at.is_some());
}

// ---------------------------------------------------------------------------
// Incoming dedup
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn incoming_messages_dedup_on_modem_index(pool: PgPool) {
    let first = MessageRepo::create_incoming(&pool, "+33611111111", "hello", 5, "0")
        .await
        .expect("insert");
    assert!(first.is_some());

    let duplicate = MessageRepo::create_incoming(&pool, "+33611111111", "hello", 5, "0")
        .await
        .expect("insert");
    assert!(duplicate.is_none());

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE direction = 'incoming'")
            .fetch_one(&pool)
            .await
            .expect("count");
    assert_eq!(count, 1);

    let row = first.expect("row");
    assert_eq!(row.status, "received");
    assert!(row.received_at.is_some());
    assert!(row.api_key_id.is_none());
    assert_eq!(row.metadata["modem_index"], 5);
}
