//! Outbound dispatcher: consumes the `sms_send` queue.
//!
//! The claim loop respects, in order: the pause gate, the concurrency cap
//! (semaphore), and, once a job has actually been claimed, the hardware
//! send-rate limit (token bucket) — idle polls never spend send capacity.
//! Each claimed job runs in its own task; the per-job algorithm lives in
//! [`execute_job`] so tests can drive it directly.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use smsgate_core::message::{ensure_transition, MessageStatus};
use smsgate_db::models::job::{SendJob, QUEUE_SEND};
use smsgate_db::repositories::{retry_delay_secs, JobRepo, MessageRepo};
use smsgate_modem::{ModemClient, Retryability};

use crate::gate::QueueGate;
use crate::limiter::SendRateLimiter;

/// Dispatcher tuning, loaded from configuration by the binary.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum simultaneous sends (hardware tolerates 6).
    pub concurrency: usize,
    /// Maximum sends started per rolling window.
    pub rate_limit: usize,
    /// Length of the rolling rate window.
    pub rate_window: Duration,
    /// Idle sleep when the queue is empty.
    pub poll_interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            concurrency: 6,
            rate_limit: 6,
            rate_window: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Run the dispatcher until cancelled.
pub async fn run(
    pool: PgPool,
    modem: Arc<ModemClient>,
    gate: Arc<QueueGate>,
    config: DispatcherConfig,
    cancel: CancellationToken,
) {
    // Jobs stranded in `executing` by a previous crash become claimable
    // again; message status transitions keep redelivery safe.
    match JobRepo::release_orphaned(&pool, QUEUE_SEND).await {
        Ok(0) => {}
        Ok(released) => tracing::warn!(released, "Requeued orphaned send jobs"),
        Err(e) => tracing::error!(error = %e, "Failed to requeue orphaned jobs"),
    }

    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let limiter = Arc::new(SendRateLimiter::new(config.rate_limit, config.rate_window));

    tracing::info!(
        concurrency = config.concurrency,
        rate_limit = config.rate_limit,
        rate_window_secs = config.rate_window.as_secs(),
        "Outbound dispatcher started"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = gate.wait_until_running() => {}
        }

        let permit = tokio::select! {
            _ = cancel.cancelled() => break,
            permit = Arc::clone(&semaphore).acquire_owned() => {
                match permit {
                    Ok(permit) => permit,
                    // The semaphore is never closed.
                    Err(_) => break,
                }
            }
        };

        let job = match JobRepo::claim_next(&pool, QUEUE_SEND).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                drop(permit);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(config.poll_interval) => {}
                }
                continue;
            }
            Err(e) => {
                drop(permit);
                tracing::error!(error = %e, "Failed to claim send job");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(config.poll_interval) => {}
                }
                continue;
            }
        };

        // Only an actual dispatch consumes a send-rate token; an empty
        // poll must not. On shutdown mid-wait the claimed job stays
        // `executing` and is requeued by the orphan release on restart.
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = limiter.acquire() => {}
        }

        let pool = pool.clone();
        let modem = Arc::clone(&modem);
        tokio::spawn(async move {
            let _permit = permit;
            execute_job(&pool, &modem, &job).await;
        });
    }

    tracing::info!("Outbound dispatcher stopped");
}

/// Execute one claimed send job to its terminal queue state.
///
/// In-flight sends run to completion even when the gate pauses; the gate
/// is only consulted before a claim.
pub async fn execute_job(pool: &PgPool, modem: &ModemClient, job: &SendJob) {
    let message = match MessageRepo::find_by_id(pool, job.message_id).await {
        Ok(Some(message)) => message,
        Ok(None) => {
            tracing::warn!(job_id = job.id, message_id = %job.message_id, "Message not found, cancelling job");
            finish(JobRepo::cancel(pool, job.id, "message not found").await, job.id);
            return;
        }
        Err(e) => {
            tracing::error!(job_id = job.id, error = %e, "Failed to load message");
            return;
        }
    };

    // Refuse to re-send anything already past the point of no return.
    // `mark_sending` below re-checks atomically.
    match MessageRepo::status_of(&message) {
        Some(status) => {
            if let Err(e) = ensure_transition(status, MessageStatus::Sending) {
                tracing::info!(
                    job_id = job.id,
                    message_id = %message.id,
                    status = %message.status,
                    "Message not actionable, cancelling job"
                );
                finish(JobRepo::cancel(pool, job.id, &e.to_string()).await, job.id);
                return;
            }
        }
        None => {
            tracing::warn!(
                job_id = job.id,
                message_id = %message.id,
                status = %message.status,
                "Unknown message status, cancelling job"
            );
            finish(JobRepo::cancel(pool, job.id, "unknown message status").await, job.id);
            return;
        }
    }

    let message = match MessageRepo::mark_sending(pool, message.id).await {
        Ok(Some(message)) => message,
        Ok(None) => {
            finish(JobRepo::cancel(pool, job.id, "message not actionable").await, job.id);
            return;
        }
        Err(e) => {
            // A store failure while marking in-progress is not retried:
            // surface it on the message and discard the job.
            tracing::error!(job_id = job.id, message_id = %message.id, error = %e, "Failed to mark message sending");
            let reason = format!("store error before send: {e}");
            let _ = MessageRepo::mark_failed(pool, message.id, &reason).await;
            finish(JobRepo::discard(pool, job.id, &reason).await, job.id);
            return;
        }
    };

    let attempt = job.attempt + 1;
    tracing::debug!(
        job_id = job.id,
        message_id = %message.id,
        attempt,
        "Sending SMS"
    );

    match modem.send_sms(&message.phone_number, &message.content).await {
        Ok(modem_message_id) => {
            tracing::info!(
                job_id = job.id,
                message_id = %message.id,
                modem_message_id = %modem_message_id,
                attempt,
                "SMS sent"
            );
            if let Err(e) = MessageRepo::mark_sent(pool, message.id, &modem_message_id).await {
                tracing::error!(message_id = %message.id, error = %e, "Failed to mark message sent");
                return;
            }
            finish(JobRepo::complete(pool, job.id).await, job.id);
        }
        Err(e) => {
            handle_send_error(pool, job, message.id, attempt, e).await;
        }
    }
}

/// Apply the send-error classification: snooze on open circuit, discard on
/// fatal errors, back off on the rest, and materialise retry exhaustion as
/// a failed message.
async fn handle_send_error(
    pool: &PgPool,
    job: &SendJob,
    message_id: uuid::Uuid,
    attempt: i32,
    error: smsgate_modem::ModemError,
) {
    match error.retryability() {
        Retryability::Snooze => {
            tracing::info!(
                job_id = job.id,
                message_id = %message_id,
                "Circuit open, snoozing job"
            );
            finish(JobRepo::snooze(pool, job.id, &error.to_string()).await, job.id);
        }
        Retryability::Fatal => {
            tracing::warn!(
                job_id = job.id,
                message_id = %message_id,
                attempt,
                error = %error,
                "Non-retryable send failure"
            );
            let _ = MessageRepo::mark_failed(pool, message_id, &error.to_string()).await;
            finish(JobRepo::discard(pool, job.id, &error.to_string()).await, job.id);
        }
        Retryability::Retry => {
            if attempt >= job.max_attempts {
                tracing::warn!(
                    job_id = job.id,
                    message_id = %message_id,
                    attempt,
                    error = %error,
                    "Retry budget exhausted, failing message"
                );
                let reason = format!("{error} (after {attempt} attempts)");
                let _ = MessageRepo::mark_failed(pool, message_id, &reason).await;
                finish(JobRepo::discard(pool, job.id, &reason).await, job.id);
            } else {
                let delay = retry_delay_secs(attempt);
                tracing::info!(
                    job_id = job.id,
                    message_id = %message_id,
                    attempt,
                    delay_secs = delay,
                    error = %error,
                    "Retryable send failure, backing off"
                );
                finish(
                    JobRepo::retry(pool, job.id, &error.to_string(), delay).await,
                    job.id,
                );
            }
        }
    }
}

/// Log a queue bookkeeping failure; the job row will be rescued by the
/// orphan release on the next startup.
fn finish(result: Result<(), sqlx::Error>, job_id: i64) {
    if let Err(e) = result {
        tracing::error!(job_id, error = %e, "Failed to update job state");
    }
}
