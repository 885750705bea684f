//! Delivery-status reconciler.
//!
//! Every cycle, messages that have been `sent` for longer than the grace
//! period are checked against the modem's delivery-status endpoint and
//! promoted to `delivered` or `failed`. Messages the modem still reports
//! as pending are left for the next cycle.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use smsgate_db::repositories::MessageRepo;
use smsgate_modem::{DeliveryStatus, ModemClient, ModemError};

/// How often the reconciler sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Minimum age in minutes of a `sent` message before its status is queried.
const SENT_GRACE_MINS: i64 = 5;

/// Maximum messages examined per sweep.
const SWEEP_LIMIT: i64 = 100;

/// Error message recorded when the modem reports a failed delivery.
const DELIVERY_FAILED: &str = "Delivery failed (modem reported)";

/// Run the reconciler until cancelled.
pub async fn run(pool: PgPool, modem: Arc<ModemClient>, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Delivery-status reconciler started"
    );
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Delivery-status reconciler stopped");
                break;
            }
            _ = ticker.tick() => {
                sweep(&pool, &modem).await;
            }
        }
    }
}

/// One reconciliation sweep.
pub async fn sweep(pool: &PgPool, modem: &ModemClient) {
    let cutoff = chrono::Utc::now() - chrono::Duration::minutes(SENT_GRACE_MINS);
    let messages = match MessageRepo::list_awaiting_delivery(pool, cutoff, SWEEP_LIMIT).await {
        Ok(messages) => messages,
        Err(e) => {
            tracing::error!(error = %e, "Failed to list messages awaiting delivery");
            return;
        }
    };

    if messages.is_empty() {
        return;
    }
    tracing::debug!(count = messages.len(), "Reconciling delivery statuses");

    for message in &messages {
        let Some(modem_message_id) = message.modem_message_id.as_deref() else {
            continue;
        };

        match modem.get_status(modem_message_id).await {
            Ok(DeliveryStatus::Delivered) => {
                tracing::info!(message_id = %message.id, "Message delivered");
                if let Err(e) = MessageRepo::mark_delivered(pool, message.id).await {
                    tracing::error!(message_id = %message.id, error = %e, "Failed to mark delivered");
                }
            }
            Ok(DeliveryStatus::Failed) => {
                tracing::warn!(message_id = %message.id, "Modem reported delivery failure");
                if let Err(e) = MessageRepo::mark_failed(pool, message.id, DELIVERY_FAILED).await {
                    tracing::error!(message_id = %message.id, error = %e, "Failed to mark failed");
                }
            }
            // Still in flight (or firmware says something we don't know):
            // the next sweep will ask again.
            Ok(DeliveryStatus::Pending | DeliveryStatus::Sent | DeliveryStatus::Unknown) => {}
            Err(ModemError::CircuitOpen) => {
                tracing::debug!("Abandoning reconciliation sweep, modem circuit open");
                return;
            }
            Err(e) => {
                tracing::warn!(message_id = %message.id, error = %e, "Delivery-status lookup failed");
            }
        }
    }
}
