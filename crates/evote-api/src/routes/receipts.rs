//! # Receipt Routes
//!
//! Verification by code and lookup by receipt id. Neither response carries
//! the full vote hash, the voter id hash or the verification code itself.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use evote_receipt::{ReceiptDetail, ReceiptView, VerificationOutcome};

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyReceiptRequest {
    /// Six-character code handed out when the vote was cast. Case and
    /// surrounding whitespace are ignored.
    #[serde(default)]
    pub verification_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReceiptViewResponse {
    pub receipt_id: String,
    pub timestamp: DateTime<Utc>,
    pub constituency: String,
    /// First 16 hex characters followed by `...`.
    pub vote_hash: String,
}

impl From<ReceiptView> for ReceiptViewResponse {
    fn from(v: ReceiptView) -> Self {
        Self {
            receipt_id: v.receipt_id,
            timestamp: v.timestamp,
            constituency: v.constituency,
            vote_hash: v.vote_hash,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyReceiptResponse {
    pub valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ReceiptViewResponse>,
}

impl From<VerificationOutcome> for VerifyReceiptResponse {
    fn from(o: VerificationOutcome) -> Self {
        Self {
            valid: o.valid,
            message: o.message,
            receipt: o.receipt.map(ReceiptViewResponse::from),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReceiptDetailResponse {
    pub receipt_id: String,
    pub election_id: String,
    pub constituency: String,
    pub timestamp: DateTime<Utc>,
    /// First 16 hex characters followed by `...`.
    pub vote_hash: String,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
}

impl From<ReceiptDetail> for ReceiptDetailResponse {
    fn from(d: ReceiptDetail) -> Self {
        Self {
            receipt_id: d.receipt_id,
            election_id: d.election_id,
            constituency: d.constituency,
            timestamp: d.timestamp,
            vote_hash: d.vote_hash,
            is_verified: d.is_verified,
            verified_at: d.verified_at,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/voter/verify-receipt", post(verify_receipt))
        .route("/voter/receipt/:receipt_id", get(get_receipt))
}

/// POST /voter/verify-receipt: Check a verification code.
///
/// An unknown code is a normal `200` with `valid: false`.
#[utoipa::path(
    post,
    path = "/voter/verify-receipt",
    request_body = VerifyReceiptRequest,
    responses(
        (status = 200, description = "Verification result", body = VerifyReceiptResponse),
        (status = 422, description = "Missing verification code", body = crate::error::ErrorBody),
    ),
    tag = "receipts"
)]
pub(crate) async fn verify_receipt(
    State(state): State<AppState>,
    body: Result<Json<VerifyReceiptRequest>, JsonRejection>,
) -> Result<Json<VerifyReceiptResponse>, AppError> {
    let req = extract_json(body)?;
    let code = req.verification_code.unwrap_or_default();

    let outcome = state.receipts.verify_receipt(&code).await?;
    state.metrics.record_verification(outcome.valid);
    tracing::debug!(valid = outcome.valid, "receipt verification");

    Ok(Json(VerifyReceiptResponse::from(outcome)))
}

/// GET /voter/receipt/:receipt_id: Look up a receipt by id.
#[utoipa::path(
    get,
    path = "/voter/receipt/{receipt_id}",
    params(("receipt_id" = String, Path, description = "Receipt identifier, e.g. VR-1700000000000-1A2B3C4D")),
    responses(
        (status = 200, description = "Receipt found", body = ReceiptDetailResponse),
        (status = 404, description = "Receipt not found", body = crate::error::ErrorBody),
    ),
    tag = "receipts"
)]
pub(crate) async fn get_receipt(
    State(state): State<AppState>,
    Path(receipt_id): Path<String>,
) -> Result<Json<ReceiptDetailResponse>, AppError> {
    let receipt = state
        .receipts
        .get_by_receipt_id(&receipt_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("receipt {receipt_id} not found")))?;
    Ok(Json(ReceiptDetailResponse::from(receipt.detail())))
}
