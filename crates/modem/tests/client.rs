//! Integration tests for `ModemClient` against an in-process stub modem.
//!
//! The stub serves the same XML bodies as E303/E3372-class firmware, so
//! these tests exercise the real handshake, header, and parsing paths.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;

use smsgate_modem::breaker::CircuitBreaker;
use smsgate_modem::{DeliveryStatus, ModemClient, ModemError, Retryability};

const SESSION_XML: &str = "<response><SesInfo>SessionID=stub-session</SesInfo>\
                           <TokInfo>stub-token</TokInfo></response>";

#[derive(Clone, Default)]
struct StubCounters {
    handshakes: Arc<AtomicUsize>,
    sends: Arc<AtomicUsize>,
}

/// Serve `app` on an ephemeral port and return its base URL.
async fn spawn_stub(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub modem");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub modem serve");
    });
    format!("http://{addr}")
}

/// Stub modem whose send endpoint always returns `send_body`.
fn stub_modem(counters: StubCounters, send_body: &'static str) -> Router {
    Router::new()
        .route(
            "/api/webserver/SesTokInfo",
            get(|State(c): State<StubCounters>| async move {
                c.handshakes.fetch_add(1, Ordering::SeqCst);
                SESSION_XML
            }),
        )
        .route(
            "/api/sms/send-sms",
            post(move |State(c): State<StubCounters>| async move {
                c.sends.fetch_add(1, Ordering::SeqCst);
                send_body
            }),
        )
        .with_state(counters)
}

// ---------------------------------------------------------------------------
// Happy path + session caching
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_returns_modem_message_id() {
    let counters = StubCounters::default();
    let body = "<response><message_id>M-42</message_id></response>";
    let base = spawn_stub(stub_modem(counters.clone(), body)).await;

    let client = ModemClient::new(&base);
    let id = client.send_sms("+33612345678", "hi").await.expect("send");
    assert_eq!(id, "M-42");
}

#[tokio::test]
async fn session_handshake_is_cached_across_calls() {
    let counters = StubCounters::default();
    let body = "<response><message_id>M-1</message_id></response>";
    let base = spawn_stub(stub_modem(counters.clone(), body)).await;

    let client = ModemClient::new(&base);
    for _ in 0..3 {
        client.send_sms("+33612345678", "hi").await.expect("send");
    }

    assert_eq!(counters.sends.load(Ordering::SeqCst), 3);
    assert_eq!(
        counters.handshakes.load(Ordering::SeqCst),
        1,
        "handshake should be served from the five-minute cache"
    );
}

#[tokio::test]
async fn concurrent_first_calls_all_succeed() {
    let counters = StubCounters::default();
    let body = "<response><message_id>M-1</message_id></response>";
    let base = spawn_stub(stub_modem(counters.clone(), body)).await;

    let client = Arc::new(ModemClient::new(&base));
    let mut handles = Vec::new();
    for _ in 0..4 {
        let client = Arc::clone(&client);
        handles.push(tokio::spawn(async move {
            client.send_sms("+33612345678", "hi").await
        }));
    }
    for handle in handles {
        handle.await.expect("join").expect("send");
    }

    // Racing refreshes may over-fetch, but never more than once per caller.
    let handshakes = counters.handshakes.load(Ordering::SeqCst);
    assert!((1..=4).contains(&handshakes), "handshakes: {handshakes}");
}

// ---------------------------------------------------------------------------
// Application error codes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn firmware_error_code_is_parsed_and_fatal_for_117() {
    let counters = StubCounters::default();
    let body = "<error><code>117</code><message></message></error>";
    let base = spawn_stub(stub_modem(counters.clone(), body)).await;

    let client = ModemClient::new(&base);
    let err = client
        .send_sms("+33612345678", "hi")
        .await
        .expect_err("send should fail");

    assert!(matches!(err, ModemError::Code(117)));
    assert_eq!(err.retryability(), Retryability::Fatal);
    assert_eq!(err.to_string(), "Invalid phone number (117)");
}

#[tokio::test]
async fn busy_code_113_is_retryable() {
    let counters = StubCounters::default();
    let body = "<error><code>113</code></error>";
    let base = spawn_stub(stub_modem(counters.clone(), body)).await;

    let client = ModemClient::new(&base);
    let err = client
        .send_sms("+33612345678", "hi")
        .await
        .expect_err("send should fail");
    assert!(matches!(err, ModemError::Code(113)));
    assert_eq!(err.retryability(), Retryability::Retry);
}

// ---------------------------------------------------------------------------
// Circuit breaker
// ---------------------------------------------------------------------------

#[tokio::test]
async fn five_transport_failures_open_the_circuit() {
    let counters = StubCounters::default();
    let app = Router::new()
        .route(
            "/api/webserver/SesTokInfo",
            get(|State(c): State<StubCounters>| async move {
                c.handshakes.fetch_add(1, Ordering::SeqCst);
                SESSION_XML
            }),
        )
        .route(
            "/api/sms/send-sms",
            post(|State(c): State<StubCounters>| async move {
                c.sends.fetch_add(1, Ordering::SeqCst);
                (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom")
            }),
        )
        .with_state(counters.clone());
    let base = spawn_stub(app).await;

    let client = ModemClient::new(&base);
    for _ in 0..5 {
        let err = client
            .send_sms("+33612345678", "hi")
            .await
            .expect_err("stub returns 500");
        assert!(matches!(err, ModemError::Http(500)));
    }

    // Sixth call fails fast without touching the network.
    let before = counters.sends.load(Ordering::SeqCst);
    let err = client
        .send_sms("+33612345678", "hi")
        .await
        .expect_err("circuit should be open");
    assert!(matches!(err, ModemError::CircuitOpen));
    assert_eq!(counters.sends.load(Ordering::SeqCst), before);
}

#[tokio::test]
async fn elapsed_cooldown_allows_a_single_probe_to_recover() {
    let counters = StubCounters::default();
    let ok_after = Arc::new(AtomicUsize::new(0));
    let ok_after_handler = Arc::clone(&ok_after);

    let app = Router::new()
        .route(
            "/api/webserver/SesTokInfo",
            get(|State(c): State<StubCounters>| async move {
                c.handshakes.fetch_add(1, Ordering::SeqCst);
                SESSION_XML
            }),
        )
        .route(
            "/api/sms/send-sms",
            post(move |State(c): State<StubCounters>| {
                let recovered = Arc::clone(&ok_after_handler);
                async move {
                    c.sends.fetch_add(1, Ordering::SeqCst);
                    if recovered.load(Ordering::SeqCst) == 1 {
                        (
                            axum::http::StatusCode::OK,
                            "<response><message_id>M-99</message_id></response>",
                        )
                    } else {
                        (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom")
                    }
                }
            }),
        )
        .with_state(counters.clone());
    let base = spawn_stub(app).await;

    // Zero cooldown so the probe is allowed immediately after opening.
    let client =
        ModemClient::with_breaker(&base, CircuitBreaker::with_cooldown(Duration::ZERO));
    for _ in 0..5 {
        let _ = client.send_sms("+33612345678", "hi").await;
    }

    // Modem "recovers"; the probe succeeds and closes the circuit.
    ok_after.store(1, Ordering::SeqCst);
    let id = client.send_sms("+33612345678", "hi").await.expect("probe");
    assert_eq!(id, "M-99");
    let id = client.send_sms("+33612345678", "hi").await.expect("closed");
    assert_eq!(id, "M-99");
}

// ---------------------------------------------------------------------------
// Inbox + status + health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn inbox_status_and_health_round_trip() {
    let inbox_xml = "<response><messages>\
                     <message><index>5</index><phone>+33611111111</phone>\
                     <content>hello</content><date>2024-05-01 09:00:00</date>\
                     <status>1</status></message>\
                     <message><index>6</index><phone>+33622222222</phone>\
                     <content>world</content><date>2024-05-01 09:05:00</date>\
                     <status>1</status></message>\
                     </messages></response>";
    let status_xml = "<response><status>delivered</status></response>";
    let health_xml = "<response><signal_strength>65</signal_strength>\
                      <network_type>LTE</network_type>\
                      <network_name>StubNet</network_name>\
                      <battery_level>80</battery_level>\
                      <connection_status>Connected</connection_status></response>";

    let app = Router::new()
        .route("/api/webserver/SesTokInfo", get(|| async { SESSION_XML }))
        .route("/api/sms/sms-list", post(move || async move { inbox_xml }))
        .route(
            "/api/sms/delivery-status",
            get(move || async move { status_xml }),
        )
        .route(
            "/api/monitoring/status",
            get(move || async move { health_xml }),
        );
    let base = spawn_stub(app).await;

    let client = ModemClient::new(&base);

    let inbox = client.list_inbox(1).await.expect("inbox");
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[0].index, 5);
    assert_eq!(inbox[1].phone, "+33622222222");

    let status = client.get_status("M-42").await.expect("status");
    assert_eq!(status, DeliveryStatus::Delivered);

    let health = client.health_check().await.expect("health");
    assert_eq!(health.signal_strength, 65);
    assert_eq!(health.network_name, "StubNet");
}
