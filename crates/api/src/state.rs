use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use smsgate_core::rate_limit::HourlyCounters;
use smsgate_modem::ModemClient;
use smsgate_worker::{ModemStatus, QueueGate};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`. Cheaply cloneable; inner data sits behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: smsgate_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Shared modem client (session cache + circuit breaker inside).
    pub modem: Arc<ModemClient>,
    /// Per-key hourly rate-limit counters.
    pub counters: Arc<HourlyCounters>,
    /// Outbound queue pause gate (driven by the status monitor).
    pub gate: Arc<QueueGate>,
    /// Last known modem health, written by the status monitor.
    pub modem_status: Arc<ModemStatus>,
    /// Bounded channel feeding the `last_used_at` updater.
    pub last_used_tx: mpsc::Sender<Uuid>,
}
