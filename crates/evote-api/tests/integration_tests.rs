//! # Integration Tests for evote-api
//!
//! Drive the full router through `oneshot`: registration and moderation,
//! election lifecycle, ballot casting, receipt verification and lookup,
//! admin authentication, health probes, metrics and the OpenAPI document.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use evote_api::auth::SecretString;
use evote_api::config::AppConfig;
use evote_api::state::AppState;
use evote_receipt::{MemoryReceiptStore, ReceiptSalt, ReceiptService, VERIFICATION_CODE_ALPHABET};

const ADMIN_TOKEN: &str = "integration-admin-token";

fn salt() -> ReceiptSalt {
    ReceiptSalt::new("integration-test-salt-0123456789").unwrap()
}

/// Helper: build the test app with admin auth disabled.
fn test_app() -> axum::Router {
    evote_api::app(AppState::new(salt()))
}

/// Helper: build the test app with admin auth enabled.
fn test_app_with_auth(token: &str) -> axum::Router {
    let config = AppConfig {
        auth_token: Some(SecretString::new(token)),
        ..AppConfig::default()
    };
    let receipts = ReceiptService::new(Arc::new(MemoryReceiptStore::new()), salt());
    evote_api::app(AppState::with_config(config, receipts, None))
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Helper: send a request and decode the JSON response.
async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        builder = builder.header("authorization", format!("Bearer {t}"));
    }
    let request = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let text = body_string(response).await;
    let value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    (status, value)
}

async fn post(app: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(body), Some(ADMIN_TOKEN)).await
}

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None, Some(ADMIN_TOKEN)).await
}

async fn transition(app: &axum::Router, election: &str, to: &str) {
    let (status, body) = post(
        app,
        &format!("/admin/elections/{election}/transition"),
        json!({ "to": to }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "transition to {to}: {body}");
}

/// Register and approve V001 and CD002 in C001, create election `current`
/// and open it for voting.
async fn seed(app: &axum::Router) {
    let (status, body) = post(
        app,
        "/voter/register",
        json!({ "voter_id": "V001", "full_name": "Asha Rao", "constituency": "C001" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "PENDING");

    let (status, _) = post(
        app,
        "/party/register",
        json!({ "party_id": "P001", "name": "Civic Party", "symbol": "lamp" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = post(
        app,
        "/candidate/register",
        json!({
            "candidate_id": "CD002",
            "full_name": "Ravi Menon",
            "constituency": "C001",
            "party_id": "P001"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    for uri in [
        "/admin/voters/V001/approve",
        "/admin/parties/P001/approve",
        "/admin/candidates/CD002/approve",
    ] {
        let (status, body) = post(app, uri, json!({})).await;
        assert_eq!(status, StatusCode::OK, "{uri}: {body}");
        assert_eq!(body["status"], "APPROVED");
    }

    let (status, body) = post(
        app,
        "/admin/elections",
        json!({ "election_id": "current", "name": "General Election" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "DRAFT");

    transition(app, "current", "SCHEDULED").await;
    transition(app, "current", "ACTIVE").await;
}

async fn vote(app: &axum::Router, voter: &str, candidate: &str) -> (StatusCode, Value) {
    post(
        app,
        "/voter/vote",
        json!({ "voter_id": voter, "election_id": "current", "candidate_id": candidate }),
    )
    .await
}

fn assert_receipt_id_format(id: &str) {
    let parts: Vec<&str> = id.split('-').collect();
    assert_eq!(parts.len(), 3, "receipt id {id}");
    assert_eq!(parts[0], "VR");
    assert!(!parts[1].is_empty() && parts[1].chars().all(|c| c.is_ascii_digit()));
    assert_eq!(parts[2].len(), 8);
    assert!(parts[2]
        .chars()
        .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/health/liveness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/health/readiness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

// -- Voting and receipts ------------------------------------------------------

#[tokio::test]
async fn test_vote_receipt_verify_end_to_end() {
    let app = test_app();
    seed(&app).await;

    let (status, body) = vote(&app, "V001", "CD002").await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["message"], "Vote cast successfully");

    let receipt_id = body["receipt_id"].as_str().unwrap().to_string();
    let code = body["verification_code"].as_str().unwrap().to_string();
    assert_receipt_id_format(&receipt_id);
    assert_eq!(code.len(), 6);
    assert!(code.bytes().all(|b| VERIFICATION_CODE_ALPHABET.contains(&b)));
    // Only the two receipt fields are handed back.
    assert_eq!(body.as_object().unwrap().len(), 3);

    // Lowercase with padding still verifies.
    let (status, body) = post(
        &app,
        "/voter/verify-receipt",
        json!({ "verification_code": format!("  {}  ", code.to_lowercase()) }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["message"], "Your vote has been recorded and verified");
    assert_eq!(body["receipt"]["constituency"], "C001");
    assert_eq!(body["receipt"]["receipt_id"], receipt_id.as_str());
    let vote_hash = body["receipt"]["vote_hash"].as_str().unwrap();
    assert_eq!(vote_hash.len(), 16 + 3);
    assert!(vote_hash.ends_with("..."));

    let (status, detail) = get(&app, &format!("/voter/receipt/{receipt_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["election_id"], "current");
    assert_eq!(detail["is_verified"], true);
    assert!(detail["verified_at"].is_string());
    assert_eq!(detail["vote_hash"], vote_hash);
    assert!(detail.get("verification_code").is_none());
    assert!(detail.get("voter_id_hash").is_none());
}

#[tokio::test]
async fn test_verify_twice_is_valid_both_times() {
    let app = test_app();
    seed(&app).await;
    let (_, body) = vote(&app, "V001", "CD002").await;
    let code = body["verification_code"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let (status, body) = post(
            &app,
            "/voter/verify-receipt",
            json!({ "verification_code": code }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
    }
}

#[tokio::test]
async fn test_unknown_code_is_invalid_not_an_error() {
    let app = test_app();
    let (status, body) = post(
        &app,
        "/voter/verify-receipt",
        json!({ "verification_code": "ZZZZZZ" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert_eq!(body["message"], "Invalid verification code");
    assert!(body.get("receipt").is_none());
}

#[tokio::test]
async fn test_malformed_code_is_invalid_not_an_error() {
    let app = test_app();
    for code in ["ABC10O", "TOOLONGCODE", "AB"] {
        let (status, body) = post(
            &app,
            "/voter/verify-receipt",
            json!({ "verification_code": code }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{code}");
        assert_eq!(body["valid"], false);
        assert_eq!(body["message"], "Invalid verification code");
    }
}

#[tokio::test]
async fn test_missing_code_is_validation_error() {
    let app = test_app();
    for payload in [json!({}), json!({ "verification_code": "   " })] {
        let (status, body) = post(&app, "/voter/verify-receipt", payload).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_unknown_receipt_id_is_404() {
    let app = test_app();
    let (status, body) = get(&app, "/voter/receipt/VR-1-DEADBEEF").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_second_vote_conflicts() {
    let app = test_app();
    seed(&app).await;
    let (status, _) = vote(&app, "V001", "CD002").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = vote(&app, "V001", "CD002").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_vote_rejected_when_election_not_active() {
    let app = test_app();
    seed(&app).await;
    transition(&app, "current", "COMPLETED").await;

    let (status, body) = vote(&app, "V001", "CD002").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("COMPLETED"));
}

#[tokio::test]
async fn test_unapproved_voter_is_forbidden() {
    let app = test_app();
    seed(&app).await;
    let (status, _) = post(
        &app,
        "/voter/register",
        json!({ "voter_id": "V002", "full_name": "Meera Iyer", "constituency": "C001" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = vote(&app, "V002", "CD002").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_malformed_vote_body_is_structured_error() {
    let app = test_app();
    let (status, body) = post(&app, "/voter/vote", json!({ "voter_id": "V001" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

// -- Elections ----------------------------------------------------------------

#[tokio::test]
async fn test_results_published_only_when_completed() {
    let app = test_app();
    seed(&app).await;
    vote(&app, "V001", "CD002").await;

    let (status, _) = get(&app, "/elections/current/results").await;
    assert_eq!(status, StatusCode::CONFLICT);

    transition(&app, "current", "COMPLETED").await;

    let (status, body) = get(&app, "/elections/current/results").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["total_votes"], 1);
    assert_eq!(body["candidates"][0]["candidate_id"], "CD002");
    assert_eq!(body["candidates"][0]["votes"], 1);
    assert_eq!(body["constituencies"][0]["constituency"], "C001");
    assert_eq!(body["constituencies"][0]["leader"], "CD002");
}

#[tokio::test]
async fn test_election_shows_transition_log() {
    let app = test_app();
    seed(&app).await;

    let (status, body) = get(&app, "/elections/current").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ACTIVE");
    assert_eq!(body["accepting_votes"], true);
    assert_eq!(body["transitions"].as_array().unwrap().len(), 2);

    let (status, _) = get(&app, "/elections/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_transition_conflicts() {
    let app = test_app();
    seed(&app).await;
    let (status, _) = post(
        &app,
        "/admin/elections/current/transition",
        json!({ "to": "DRAFT" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = post(
        &app,
        "/admin/elections/current/transition",
        json!({ "to": "PAUSED" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// -- Registration and moderation ---------------------------------------------

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = test_app();
    let payload = json!({ "voter_id": "V001", "full_name": "Asha Rao", "constituency": "C001" });
    let (status, _) = post(&app, "/voter/register", payload.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = post(&app, "/voter/register", payload).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_candidate_with_unknown_party_is_rejected() {
    let app = test_app();
    let (status, body) = post(
        &app,
        "/candidate/register",
        json!({
            "candidate_id": "CD001",
            "full_name": "Nobody",
            "constituency": "C001",
            "party_id": "P404"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_invalid_identifier_is_rejected() {
    let app = test_app();
    let (status, _) = post(
        &app,
        "/voter/register",
        json!({ "voter_id": "V 001", "full_name": "Asha Rao", "constituency": "C001" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_moderation_is_one_shot_and_listable() {
    let app = test_app();
    for id in ["V001", "V002"] {
        post(
            &app,
            "/voter/register",
            json!({ "voter_id": id, "full_name": "Voter", "constituency": "C001" }),
        )
        .await;
    }
    let (status, _) = post(&app, "/admin/voters/V001/reject", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post(&app, "/admin/voters/V001/approve", json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = get(&app, "/admin/voters?status=PENDING").await;
    assert_eq!(status, StatusCode::OK);
    let pending = body.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["voter_id"], "V002");

    let (status, body) = get(&app, "/admin/voters").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, _) = get(&app, "/admin/candidates?status=bogus").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// -- Admin authentication -----------------------------------------------------

#[tokio::test]
async fn test_admin_requires_token_when_configured() {
    let app = test_app_with_auth(ADMIN_TOKEN);
    let payload = json!({ "election_id": "current", "name": "General Election" });

    let (status, body) = send(&app, "POST", "/admin/elections", Some(payload.clone()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = send(
        &app,
        "POST",
        "/admin/elections",
        Some(payload.clone()),
        Some("wrong-token"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/admin/elections",
        Some(payload),
        Some(ADMIN_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_public_routes_need_no_token_when_auth_configured() {
    let app = test_app_with_auth(ADMIN_TOKEN);
    let (status, _) = send(
        &app,
        "POST",
        "/voter/register",
        Some(json!({ "voter_id": "V001", "full_name": "Asha Rao", "constituency": "C001" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

// -- Metrics & OpenAPI --------------------------------------------------------

#[tokio::test]
async fn test_metrics_exposes_voting_counters() {
    let app = test_app();
    seed(&app).await;
    vote(&app, "V001", "CD002").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_string(response).await;
    assert!(text.contains("evote_votes_cast_total 1"));
    assert!(text.contains("evote_receipts_created_total 1"));
    assert!(text.contains("evote_receipts_stored 1"));
    assert!(text.contains("evote_http_requests_total"));
    // Route templates, never concrete identifiers.
    assert!(!text.contains("V001"));
}

#[tokio::test]
async fn test_openapi_json_is_served() {
    let app = test_app();
    let (status, body) = get(&app, "/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "evote API");
    assert!(body["paths"]["/voter/vote"].is_object());
}
