//! # evote-api: Axum API Service for evote
//!
//! Registration, admin moderation, election lifecycle, ballot casting and
//! anonymous vote receipts over HTTP.
//!
//! ## API Surface
//!
//! | Prefix | Module | Auth |
//! |---|---|---|
//! | `/voter/*`, `/candidate/*`, `/party/*` | [`routes::registration`], [`routes::ballot`], [`routes::receipts`] | public |
//! | `/elections/*` | [`routes::elections`] | public |
//! | `/admin/*` | [`routes::admin`] | Bearer token |
//! | `/health/*`, `/metrics`, `/openapi.json` | here, [`openapi`] | public |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → BodyLimit → [AuthMiddleware, admin only] → Handler
//! ```

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod voting;

use std::collections::HashMap;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use evote_core::ApprovalStatus;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes and `/metrics` are mounted outside the metrics and auth
/// middleware. Only `/admin/*` requires a bearer token.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = state.metrics.clone();

    let admin = routes::admin::router()
        .layer(from_fn(auth::auth_middleware))
        .layer(Extension(auth_config));

    // Request bodies are small JSON documents; 64 KiB is generous.
    let api = Router::new()
        .merge(routes::registration::router())
        .merge(routes::ballot::router())
        .merge(routes::receipts::router())
        .merge(routes::elections::router())
        .merge(admin)
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(Extension(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let unauthenticated = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(prometheus_metrics))
        .with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics: Prometheus metrics scrape endpoint.
///
/// Refreshes the domain gauges from `AppState` on each scrape, then encodes
/// every registered metric in the Prometheus text format.
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let metrics = &state.metrics;

    let mut elections: HashMap<&'static str, usize> = HashMap::new();
    for e in state.elections.list() {
        *elections.entry(e.status.as_str()).or_default() += 1;
    }
    metrics.elections_total().reset();
    for (status, count) in &elections {
        metrics
            .elections_total()
            .with_label_values(&[*status])
            .set(*count as f64);
    }

    metrics.registrations_total().reset();
    let kinds: [(&str, Vec<ApprovalStatus>); 3] = [
        ("voter", state.voters.list().iter().map(|v| v.status).collect()),
        ("party", state.parties.list().iter().map(|p| p.status).collect()),
        (
            "candidate",
            state.candidates.list().iter().map(|c| c.status).collect(),
        ),
    ];
    for (kind, statuses) in &kinds {
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Approved,
            ApprovalStatus::Rejected,
        ] {
            let count = statuses.iter().filter(|s| **s == status).count();
            metrics
                .registrations_total()
                .with_label_values(&[*kind, status.as_str()])
                .set(count as f64);
        }
    }

    match state.receipts.store().count().await {
        Ok(n) => metrics.receipts_stored().set(n as f64),
        Err(e) => tracing::warn!(error = %e, "failed to count stored receipts"),
    }

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe.
///
/// Checks the database connection (when configured) and that the receipt
/// store answers. Returns 200 "ready" or 503 with a short diagnostic.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    if let Err(e) = state.receipts.store().count().await {
        tracing::warn!("receipt store health check failed: {e}");
        return (StatusCode::SERVICE_UNAVAILABLE, "receipt store unavailable").into_response();
    }

    (StatusCode::OK, "ready").into_response()
}
