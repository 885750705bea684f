//! Integration tests for message submission, listing, and retrieval.

mod common;

use axum::http::StatusCode;
use common::{body_json, create_test_key, get_keyed, post_json_keyed};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use smsgate_db::repositories::MessageRepo;

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn valid_submission_returns_201_and_enqueues_a_job(pool: PgPool) {
    let (_key, secret) = create_test_key(&pool, "sender", None).await;
    let app = common::build_test_app(pool.clone());

    let response = post_json_keyed(
        app,
        "/api/v1/messages",
        json!({ "phone": "+33612345678", "content": "hi" }),
        &secret,
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["direction"], "outgoing");
    assert_eq!(body["phone"], "+33612345678");
    assert_eq!(body["content"], "hi");
    assert_eq!(body["status"], "queued");
    // Nulls are omitted, not serialized.
    assert!(body.get("modemMessageId").is_none());
    assert!(body.get("errorMessage").is_none());
    assert!(body["insertedAt"].is_string());

    let message_id: Uuid = body["id"].as_str().expect("id").parse().expect("uuid");
    let jobs: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM send_jobs WHERE message_id = $1 AND state = 'available'",
    )
    .bind(message_id)
    .fetch_one(&pool)
    .await
    .expect("count");
    assert_eq!(jobs, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn content_of_160_chars_is_accepted_and_161_rejected(pool: PgPool) {
    let (_key, secret) = create_test_key(&pool, "boundary", None).await;
    let app = common::build_test_app(pool);

    let ok = post_json_keyed(
        app.clone(),
        "/api/v1/messages",
        json!({ "phone": "+33612345678", "content": "a".repeat(160) }),
        &secret,
    )
    .await;
    assert_eq!(ok.status(), StatusCode::CREATED);

    let too_long = post_json_keyed(
        app,
        "/api/v1/messages",
        json!({ "phone": "+33612345678", "content": "a".repeat(161) }),
        &secret,
    )
    .await;
    assert_eq!(too_long.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn malformed_phone_is_rejected(pool: PgPool) {
    let (_key, secret) = create_test_key(&pool, "badphone", None).await;
    let app = common::build_test_app(pool);

    for phone in ["", "not-a-number", "+123456789012345678901"] {
        let response = post_json_keyed(
            app.clone(),
            "/api/v1/messages",
            json!({ "phone": phone, "content": "hi" }),
            &secret,
        )
        .await;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "phone {phone:?} should be rejected"
        );
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn missing_fields_are_rejected(pool: PgPool) {
    let (_key, secret) = create_test_key(&pool, "nofields", None).await;
    let app = common::build_test_app(pool);

    let response =
        post_json_keyed(app, "/api/v1/messages", json!({ "phone": "+33612345678" }), &secret)
            .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn third_request_over_a_limit_of_two_returns_429(pool: PgPool) {
    let (_key, secret) = create_test_key(&pool, "limited", Some(2)).await;
    let app = common::build_test_app(pool);

    for _ in 0..2 {
        let response = post_json_keyed(
            app.clone(),
            "/api/v1/messages",
            json!({ "phone": "+33612345678", "content": "hi" }),
            &secret,
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = post_json_keyed(
        app,
        "/api/v1/messages",
        json!({ "phone": "+33612345678", "content": "hi" }),
        &secret,
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    assert_eq!(response.headers()["x-ratelimit-limit"], "2");
    assert!(response.headers().contains_key("x-ratelimit-reset"));
}

// ---------------------------------------------------------------------------
// Listing and retrieval
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn listing_is_scoped_to_the_calling_key(pool: PgPool) {
    let (key_a, _secret_a) = create_test_key(&pool, "tenant-a", None).await;
    let (_key_b, secret_b) = create_test_key(&pool, "tenant-b", None).await;

    MessageRepo::create_outgoing_queued(&pool, "+33612345678", "a's message", key_a.id)
        .await
        .expect("seed");

    let app = common::build_test_app(pool);
    let response = get_keyed(app, "/api/v1/messages", &secret_b).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(
        json.as_array().expect("array").is_empty(),
        "another tenant's outgoing messages must not be visible"
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn incoming_messages_are_visible_to_any_key(pool: PgPool) {
    let (_key, secret) = create_test_key(&pool, "reader", None).await;
    MessageRepo::create_incoming(&pool, "+33699999999", "ping", 7, "0")
        .await
        .expect("seed")
        .expect("inserted");

    let app = common::build_test_app(pool);
    let response = get_keyed(app, "/api/v1/messages?direction=incoming", &secret).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let items = json.as_array().expect("array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["direction"], "incoming");
    assert_eq!(items[0]["status"], "received");
    assert!(items[0]["receivedAt"].is_string());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn status_filter_and_pagination_are_honoured(pool: PgPool) {
    let (key, secret) = create_test_key(&pool, "pager", None).await;
    for i in 0..3 {
        MessageRepo::create_outgoing_queued(&pool, "+33612345678", &format!("m{i}"), key.id)
            .await
            .expect("seed");
    }

    let app = common::build_test_app(pool);

    let response = get_keyed(
        app.clone(),
        "/api/v1/messages?status=queued&limit=2",
        &secret,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json.as_array().expect("array").len(), 2);

    let response = get_keyed(app.clone(), "/api/v1/messages?status=sent", &secret).await;
    let json = body_json(response).await;
    assert!(json.as_array().expect("array").is_empty());

    let response = get_keyed(app, "/api/v1/messages?status=nonsense", &secret).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn fetching_a_foreign_message_returns_404(pool: PgPool) {
    let (key_a, _secret_a) = create_test_key(&pool, "owner", None).await;
    let (_key_b, secret_b) = create_test_key(&pool, "other", None).await;

    let message = MessageRepo::create_outgoing_queued(&pool, "+33612345678", "mine", key_a.id)
        .await
        .expect("seed");

    let app = common::build_test_app(pool);
    let response = get_keyed(
        app.clone(),
        &format!("/api/v1/messages/{}", message.id),
        &secret_b,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get_keyed(app, &format!("/api/v1/messages/{}", Uuid::new_v4()), &secret_b).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn owner_fetches_their_message(pool: PgPool) {
    let (key, secret) = create_test_key(&pool, "owner", None).await;
    let message = MessageRepo::create_outgoing_queued(&pool, "+33612345678", "mine", key.id)
        .await
        .expect("seed");

    let app = common::build_test_app(pool);
    let response = get_keyed(app, &format!("/api/v1/messages/{}", message.id), &secret).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["id"], message.id.to_string());
    assert_eq!(json["content"], "mine");
}
