//! Modem status monitor.
//!
//! Health-checks the modem on a fixed interval, keeps the last known
//! snapshot for the health endpoint, and gates the outbound queue: the
//! first failure after a healthy run pauses sends, the first success
//! after an unhealthy run resumes them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use smsgate_modem::{ModemClient, ModemHealth};

use crate::gate::QueueGate;

/// Signal strength below which a warning is logged.
const LOW_SIGNAL_THRESHOLD: u8 = 20;

/// Last known modem state, shared with the health endpoint.
#[derive(Debug)]
pub struct ModemStatus {
    last_health: RwLock<Option<ModemHealth>>,
    healthy: AtomicBool,
}

impl Default for ModemStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ModemStatus {
    /// Starts optimistic: the queue is not paused until a health check
    /// actually fails.
    pub fn new() -> Self {
        Self {
            last_health: RwLock::new(None),
            healthy: AtomicBool::new(true),
        }
    }

    /// Last successful health snapshot, if any.
    pub fn snapshot(&self) -> Option<ModemHealth> {
        self.last_health
            .read()
            .expect("modem status lock poisoned")
            .clone()
    }

    /// Whether the most recent health check succeeded.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    fn record_healthy(&self, health: ModemHealth) {
        *self
            .last_health
            .write()
            .expect("modem status lock poisoned") = Some(health);
        self.healthy.store(true, Ordering::Relaxed);
    }

    fn record_unhealthy(&self) {
        self.healthy.store(false, Ordering::Relaxed);
    }
}

/// Run the status monitor until cancelled.
pub async fn run(
    modem: Arc<ModemClient>,
    gate: Arc<QueueGate>,
    status: Arc<ModemStatus>,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        interval_ms = interval.as_millis() as u64,
        "Modem status monitor started"
    );
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Modem status monitor stopped");
                break;
            }
            _ = ticker.tick() => {
                tick(&modem, &gate, &status).await;
            }
        }
    }
}

/// One monitoring cycle.
pub async fn tick(modem: &ModemClient, gate: &QueueGate, status: &ModemStatus) {
    let was_healthy = status.is_healthy();

    match modem.health_check().await {
        Ok(health) => {
            tracing::debug!(
                signal_strength = health.signal_strength,
                network_type = %health.network_type,
                connection_status = %health.connection_status,
                "Modem health check ok"
            );
            if health.signal_strength < LOW_SIGNAL_THRESHOLD {
                tracing::warn!(
                    signal_strength = health.signal_strength,
                    "Modem signal is weak"
                );
            }
            status.record_healthy(health);
            if !was_healthy {
                tracing::info!("Modem recovered, resuming outbound queue");
                gate.resume();
            }
        }
        Err(e) => {
            status.record_unhealthy();
            if was_healthy {
                tracing::warn!(error = %e, "Modem unhealthy, pausing outbound queue");
                gate.pause();
            } else {
                tracing::debug!(error = %e, "Modem still unhealthy");
            }
        }
    }
}
