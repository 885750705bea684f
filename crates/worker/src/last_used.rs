//! Best-effort updater for `api_keys.last_used_at`.
//!
//! The auth middleware pushes key ids into a bounded channel with
//! `try_send` and drops updates when the channel is full; losing a
//! usage timestamp under pressure beats spawning unbounded tasks on the
//! request path. A single consumer drains the channel.

use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use smsgate_db::repositories::ApiKeyRepo;

/// Channel capacity; beyond this, updates are silently dropped.
pub const CHANNEL_CAPACITY: usize = 256;

/// Create the submission side and its paired receiver.
pub fn channel() -> (mpsc::Sender<Uuid>, mpsc::Receiver<Uuid>) {
    mpsc::channel(CHANNEL_CAPACITY)
}

/// Drain `last_used_at` updates until cancelled.
pub async fn run(pool: PgPool, mut rx: mpsc::Receiver<Uuid>, cancel: CancellationToken) {
    tracing::debug!("API-key usage updater started");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("API-key usage updater stopped");
                break;
            }
            received = rx.recv() => {
                match received {
                    Some(key_id) => {
                        if let Err(e) = ApiKeyRepo::touch_last_used(&pool, key_id).await {
                            tracing::warn!(api_key_id = %key_id, error = %e, "Failed to update last_used_at");
                        }
                    }
                    // All senders dropped.
                    None => break,
                }
            }
        }
    }
}
