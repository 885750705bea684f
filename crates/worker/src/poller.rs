//! Inbound SMS poller.
//!
//! Periodically lists the modem inbox and persists entries newer than the
//! durable `last_seen_index` cursor. The cursor only advances after the
//! whole batch is stored, and the unique index on the modem inbox slot
//! makes re-reads after a crash or restart idempotent.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use smsgate_db::repositories::{MessageRepo, PollCursorRepo, CURSOR_INBOX};
use smsgate_modem::{client::INBOX, ModemClient, ModemError};

/// Run the inbound poller until cancelled.
pub async fn run(
    pool: PgPool,
    modem: Arc<ModemClient>,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_ms = interval.as_millis() as u64, "Inbound poller started");
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Inbound poller stopped");
                break;
            }
            _ = ticker.tick() => {
                tick(&pool, &modem).await;
            }
        }
    }
}

/// One poll cycle. Failures are logged and the cursor is left untouched,
/// so the next cycle retries the same range.
pub async fn tick(pool: &PgPool, modem: &ModemClient) {
    let last_seen = match PollCursorRepo::get(pool, CURSOR_INBOX).await {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read inbox cursor");
            return;
        }
    };

    let inbox = match modem.list_inbox(INBOX).await {
        Ok(inbox) => inbox,
        Err(ModemError::CircuitOpen) => {
            tracing::debug!("Skipping inbox poll, modem circuit open");
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Inbox listing failed");
            return;
        }
    };

    let fresh: Vec<_> = inbox.into_iter().filter(|m| m.index > last_seen).collect();
    if fresh.is_empty() {
        return;
    }

    let mut max_index = last_seen;
    let mut inserted = 0usize;
    let mut deduped = 0usize;

    for entry in &fresh {
        match MessageRepo::create_incoming(
            pool,
            &entry.phone,
            &entry.content,
            entry.index,
            &entry.status,
        )
        .await
        {
            Ok(Some(_)) => inserted += 1,
            Ok(None) => deduped += 1,
            Err(e) => {
                // Do not advance past a failed insert; the slot will be
                // retried next cycle.
                tracing::error!(
                    modem_index = entry.index,
                    error = %e,
                    "Failed to store incoming message"
                );
                return;
            }
        }
        max_index = max_index.max(entry.index);
    }

    if let Err(e) = PollCursorRepo::advance(pool, CURSOR_INBOX, max_index).await {
        tracing::error!(error = %e, "Failed to advance inbox cursor");
        return;
    }

    tracing::info!(inserted, deduped, last_seen_index = max_index, "Inbox poll complete");
}
