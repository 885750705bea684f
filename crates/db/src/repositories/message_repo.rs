//! Repository for the `messages` table.
//!
//! Every status transition is guarded by a SQL precondition matching the
//! state machine in `smsgate_core::message`; a transition whose
//! precondition fails returns `None` rather than clobbering concurrent
//! updates.

use sqlx::PgPool;
use uuid::Uuid;

use smsgate_core::message::MessageStatus;
use smsgate_core::types::Timestamp;

use crate::models::message::{Message, MessageListQuery};
use crate::repositories::JobRepo;

const COLUMNS: &str = "\
    id, direction, phone_number, content, status, modem_message_id, \
    error_message, api_key_id, sent_at, delivered_at, received_at, \
    metadata, inserted_at, updated_at";

/// Maximum page size for message listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for message listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides CRUD operations and guarded status transitions for messages.
pub struct MessageRepo;

impl MessageRepo {
    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Create an outgoing message and enqueue its delivery job atomically.
    ///
    /// The row is inserted as `pending`, a job lands on the `sms_send`
    /// queue, and the message moves to `queued`, all in one transaction:
    /// a submission either becomes deliverable work or does not exist.
    pub async fn create_outgoing_queued(
        pool: &PgPool,
        phone_number: &str,
        content: &str,
        api_key_id: Uuid,
    ) -> Result<Message, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let insert = format!(
            "INSERT INTO messages (direction, phone_number, content, status, api_key_id) \
             VALUES ('outgoing', $1, $2, 'pending', $3) \
             RETURNING {COLUMNS}"
        );
        let message: Message = sqlx::query_as(&insert)
            .bind(phone_number)
            .bind(content)
            .bind(api_key_id)
            .fetch_one(&mut *tx)
            .await?;

        JobRepo::enqueue_send(&mut *tx, message.id).await?;

        let queued = format!(
            "UPDATE messages SET status = 'queued', updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let message: Message = sqlx::query_as(&queued)
            .bind(message.id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    /// Insert an incoming message discovered by the inbox poller.
    ///
    /// Returns `None` when a row for the same modem inbox index already
    /// exists; the partial unique index makes re-polls after a restart
    /// idempotent.
    pub async fn create_incoming(
        pool: &PgPool,
        phone_number: &str,
        content: &str,
        modem_index: i64,
        modem_status: &str,
    ) -> Result<Option<Message>, sqlx::Error> {
        let query = format!(
            "INSERT INTO messages \
                 (direction, phone_number, content, status, received_at, metadata) \
             VALUES ('incoming', $1, $2, 'received', NOW(), \
                     jsonb_build_object('modem_index', $3::BIGINT, \
                                        'modem_status', $4::TEXT)) \
             ON CONFLICT DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(phone_number)
            .bind(content)
            .bind(modem_index)
            .bind(modem_status)
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Status transitions
    // -----------------------------------------------------------------------

    /// Mark a message as in-progress before talking to the modem.
    ///
    /// Succeeds from `pending`, `queued`, or `sending` (a retried job
    /// re-enters the in-progress state); returns `None` from any other
    /// state so a worker never re-sends an already-sent message.
    pub async fn mark_sending(pool: &PgPool, id: Uuid) -> Result<Option<Message>, sqlx::Error> {
        let query = format!(
            "UPDATE messages SET status = 'sending', updated_at = NOW() \
             WHERE id = $1 AND status IN ('pending', 'queued', 'sending') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Record a successful send: sets `sent_at` and the modem message id.
    /// Only valid from `sending`, so two workers cannot both mark `sent`.
    pub async fn mark_sent(
        pool: &PgPool,
        id: Uuid,
        modem_message_id: &str,
    ) -> Result<Option<Message>, sqlx::Error> {
        let query = format!(
            "UPDATE messages \
             SET status = 'sent', modem_message_id = $2, sent_at = NOW(), \
                 updated_at = NOW() \
             WHERE id = $1 AND status = 'sending' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .bind(modem_message_id)
            .fetch_optional(pool)
            .await
    }

    /// Record a delivery receipt. Only valid from `sent`.
    pub async fn mark_delivered(pool: &PgPool, id: Uuid) -> Result<Option<Message>, sqlx::Error> {
        let query = format!(
            "UPDATE messages \
             SET status = 'delivered', delivered_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = 'sent' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Mark a message as terminally failed with a diagnostic.
    /// Valid from `queued`, `sending`, or `sent`.
    pub async fn mark_failed(
        pool: &PgPool,
        id: Uuid,
        error_message: &str,
    ) -> Result<Option<Message>, sqlx::Error> {
        let query = format!(
            "UPDATE messages \
             SET status = 'failed', error_message = $2, updated_at = NOW() \
             WHERE id = $1 AND status IN ('queued', 'sending', 'sent') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .bind(error_message)
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Find a message by its id, unscoped (worker use).
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Message>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM messages WHERE id = $1");
        sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a message visible to the given API key: its own outgoing
    /// messages plus all incoming traffic.
    pub async fn find_for_api_key(
        pool: &PgPool,
        id: Uuid,
        api_key_id: Uuid,
    ) -> Result<Option<Message>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM messages \
             WHERE id = $1 AND (direction = 'incoming' OR api_key_id = $2)"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .bind(api_key_id)
            .fetch_optional(pool)
            .await
    }

    /// List messages visible to the given API key, newest first.
    ///
    /// Outgoing rows are scoped to the caller; incoming rows are shared.
    pub async fn list_for_api_key(
        pool: &PgPool,
        api_key_id: Uuid,
        params: &MessageListQuery,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);

        let mut conditions =
            vec!["(direction = 'incoming' OR api_key_id = $1)".to_string()];
        let mut bind_idx: u32 = 2;

        let direction = params.direction.as_ref().map(|d| {
            conditions.push(format!("direction = ${bind_idx}"));
            bind_idx += 1;
            d.as_str()
        });
        let status = params.status.as_ref().map(|s| {
            conditions.push(format!("status = ${bind_idx}"));
            bind_idx += 1;
            s.as_str()
        });
        let phone = params.phone.as_ref().map(|p| {
            conditions.push(format!("phone_number = ${bind_idx}"));
            bind_idx += 1;
            p.as_str()
        });

        let query = format!(
            "SELECT {COLUMNS} FROM messages \
             WHERE {} \
             ORDER BY inserted_at DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            conditions.join(" AND "),
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, Message>(&query).bind(api_key_id);
        if let Some(d) = direction {
            q = q.bind(d.to_string());
        }
        if let Some(s) = status {
            q = q.bind(s.to_string());
        }
        if let Some(p) = phone {
            q = q.bind(p.to_string());
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Messages awaiting a delivery receipt: `sent` with a modem message id,
    /// sent before `cutoff`. The reconciler sweeps these every cycle.
    pub async fn list_awaiting_delivery(
        pool: &PgPool,
        cutoff: Timestamp,
        limit: i64,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM messages \
             WHERE status = 'sent' \
               AND modem_message_id IS NOT NULL \
               AND sent_at < $1 \
             ORDER BY sent_at ASC \
             LIMIT $2"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(cutoff)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Parse the stored status through the domain enum.
    pub fn status_of(message: &Message) -> Option<MessageStatus> {
        MessageStatus::parse(&message.status)
    }
}
