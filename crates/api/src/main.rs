use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smsgate_api::config::ServerConfig;
use smsgate_api::router::build_app_router;
use smsgate_api::state::AppState;
use smsgate_core::rate_limit::HourlyCounters;
use smsgate_modem::ModemClient;
use smsgate_worker::dispatcher::DispatcherConfig;
use smsgate_worker::{dispatcher, last_used, monitor, poller, reconciler};
use smsgate_worker::{ModemStatus, QueueGate};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "smsgate_api=debug,smsgate_worker=debug,smsgate_modem=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = smsgate_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    smsgate_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    smsgate_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Modem client ---
    let modem = Arc::new(ModemClient::new(&config.modem_base_url));
    tracing::info!(modem_base_url = %config.modem_base_url, "Modem client ready");

    // --- Shared pipeline state ---
    let gate = Arc::new(QueueGate::new());
    let modem_status = Arc::new(ModemStatus::new());
    let counters = Arc::new(HourlyCounters::new());
    let (last_used_tx, last_used_rx) = last_used::channel();

    // --- Background loops ---
    let cancel = CancellationToken::new();

    let dispatcher_handle = tokio::spawn(dispatcher::run(
        pool.clone(),
        Arc::clone(&modem),
        Arc::clone(&gate),
        DispatcherConfig {
            concurrency: config.sms_send_concurrency,
            rate_limit: config.sms_send_rate_limit,
            ..DispatcherConfig::default()
        },
        cancel.clone(),
    ));
    let poller_handle = tokio::spawn(poller::run(
        pool.clone(),
        Arc::clone(&modem),
        config.modem_poll_interval,
        cancel.clone(),
    ));
    let reconciler_handle = tokio::spawn(reconciler::run(
        pool.clone(),
        Arc::clone(&modem),
        cancel.clone(),
    ));
    let monitor_handle = tokio::spawn(monitor::run(
        Arc::clone(&modem),
        Arc::clone(&gate),
        Arc::clone(&modem_status),
        config.modem_health_check_interval,
        cancel.clone(),
    ));
    let last_used_handle = tokio::spawn(last_used::run(
        pool.clone(),
        last_used_rx,
        cancel.clone(),
    ));
    tracing::info!("Delivery pipeline started (dispatcher, poller, reconciler, monitor)");

    // --- App state & router ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        modem,
        counters,
        gate,
        modem_status,
        last_used_tx,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, draining pipeline");
    cancel.cancel();
    for (name, handle) in [
        ("dispatcher", dispatcher_handle),
        ("poller", poller_handle),
        ("reconciler", reconciler_handle),
        ("monitor", monitor_handle),
        ("last_used", last_used_handle),
    ] {
        if tokio::time::timeout(Duration::from_secs(15), handle)
            .await
            .is_err()
        {
            tracing::warn!(task = name, "Pipeline task did not stop in time");
        }
    }
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server shuts
/// down cleanly whether stopped interactively or by a process manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
