// All functions in this module are shared test helpers. Not every test
// binary uses every helper, so dead_code warnings are suppressed here.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use smsgate_api::config::ServerConfig;
use smsgate_api::router::build_app_router;
use smsgate_api::state::AppState;
use smsgate_core::api_keys::generate_api_key;
use smsgate_core::rate_limit::HourlyCounters;
use smsgate_db::models::api_key::ApiKey;
use smsgate_db::repositories::ApiKeyRepo;
use smsgate_modem::ModemClient;
use smsgate_worker::{last_used, ModemStatus, QueueGate};

/// Admin token used by the test configuration.
pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        // Nothing listens here; submission only consults the circuit
        // state, so no test traffic ever reaches a modem.
        modem_base_url: "http://127.0.0.1:9".to_string(),
        modem_poll_interval: Duration::from_secs(30),
        modem_health_check_interval: Duration::from_secs(60),
        default_rate_limit: 100,
        sms_send_concurrency: 6,
        sms_send_rate_limit: 6,
        admin_token: Some(ADMIN_TOKEN.to_string()),
    }
}

/// Build the full application router with all middleware layers.
///
/// The background pipeline is *not* spawned; tests drive repositories
/// and workers directly where needed.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let (last_used_tx, _last_used_rx) = last_used::channel();

    let state = AppState {
        pool,
        modem: Arc::new(ModemClient::new(&config.modem_base_url)),
        counters: Arc::new(HourlyCounters::new()),
        gate: Arc::new(QueueGate::new()),
        modem_status: Arc::new(ModemStatus::new()),
        last_used_tx,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

/// Create an API key directly in the database. Returns the stored row and
/// the plaintext secret.
pub async fn create_test_key(
    pool: &PgPool,
    name: &str,
    rate_limit: Option<i32>,
) -> (ApiKey, String) {
    let generated = generate_api_key().expect("key generation should succeed");
    let key = ApiKeyRepo::create(pool, name, &generated.hash, &generated.prefix, rate_limit)
        .await
        .expect("key creation should succeed");
    (key, generated.secret)
}

// ---------------------------------------------------------------------------
// Shared HTTP test helpers
// ---------------------------------------------------------------------------

/// Collect the response body into a `serde_json::Value`.
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// GET from the given URI.
pub async fn get(app: Router, uri: &str) -> axum::response::Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

/// GET with an `X-API-Key` header.
pub async fn get_keyed(app: Router, uri: &str, secret: &str) -> axum::response::Response {
    let request = Request::builder()
        .uri(uri)
        .header("x-api-key", secret)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST JSON with an `X-API-Key` header.
pub async fn post_json_keyed(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    secret: &str,
) -> axum::response::Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-api-key", secret)
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a JSON request with an admin bearer token.
pub async fn send_json_admin(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> axum::response::Response {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"));
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&value).unwrap())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}
