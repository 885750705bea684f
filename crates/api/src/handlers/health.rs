//! Public health endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use smsgate_db::models::job::QUEUE_SEND;
use smsgate_db::repositories::JobRepo;
use smsgate_modem::{CircuitState, ModemHealth};

use crate::state::AppState;

/// Health report for `GET /api/health`.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`.
    pub status: &'static str,
    pub database: &'static str,
    pub modem: ModemReport,
    pub queue: QueueReport,
}

#[derive(Serialize)]
pub struct ModemReport {
    pub healthy: bool,
    pub circuit: CircuitState,
    /// Last known monitoring snapshot; absent until the first successful
    /// health check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_known: Option<ModemHealth>,
}

#[derive(Serialize)]
pub struct QueueReport {
    pub paused: bool,
    /// Jobs not yet in a terminal state.
    pub pending: i64,
}

/// GET /api/health (public, no API key required).
///
/// Returns 200 while the database and modem are both usable, 503 with the
/// same body shape otherwise.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = smsgate_db::health_check(&state.pool).await.is_ok();

    let modem_snapshot = state.modem_status.snapshot();
    let modem_healthy = state.modem_status.is_healthy() && modem_snapshot.is_some();

    let pending = JobRepo::pending_count(&state.pool, QUEUE_SEND)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to count pending jobs");
            -1
        });

    let healthy = db_healthy && modem_healthy;
    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" },
        database: if db_healthy { "ok" } else { "unreachable" },
        modem: ModemReport {
            healthy: modem_healthy,
            circuit: state.modem.circuit_state(),
            last_known: modem_snapshot,
        },
        queue: QueueReport {
            paused: state.gate.is_paused(),
            pending,
        },
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}
