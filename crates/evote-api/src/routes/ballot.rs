//! # Ballot Route
//!
//! `POST /voter/vote`. The handler only parses; the workflow lives in
//! [`crate::voting`].

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use evote_core::{CandidateId, ElectionId, VoterId};

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;
use crate::voting::{cast_vote, Ballot};

pub const VOTE_CAST_MESSAGE: &str = "Vote cast successfully";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CastVoteRequest {
    pub voter_id: String,
    pub election_id: String,
    pub candidate_id: String,
}

/// Receipt fields are absent when the vote was recorded but no receipt could
/// be issued.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CastVoteResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/voter/vote", post(vote))
}

/// POST /voter/vote: Cast a ballot and receive a vote receipt.
#[utoipa::path(
    post,
    path = "/voter/vote",
    request_body = CastVoteRequest,
    responses(
        (status = 201, description = "Vote recorded", body = CastVoteResponse),
        (status = 403, description = "Voter not approved", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown voter, candidate or election", body = crate::error::ErrorBody),
        (status = 409, description = "Election not active or voter already voted", body = crate::error::ErrorBody),
        (status = 422, description = "Candidate not on the voter's ballot", body = crate::error::ErrorBody),
    ),
    tag = "voting"
)]
pub(crate) async fn vote(
    State(state): State<AppState>,
    body: Result<Json<CastVoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CastVoteResponse>), AppError> {
    let req = extract_json(body)?;
    let ballot = Ballot {
        voter_id: VoterId::new(req.voter_id)?,
        election_id: ElectionId::new(req.election_id)?,
        candidate_id: CandidateId::new(req.candidate_id)?,
    };

    let outcome = cast_vote(&state, &ballot).await?;
    let (receipt_id, verification_code) = match outcome.receipt {
        Some(r) => (Some(r.receipt_id), Some(r.verification_code)),
        None => (None, None),
    };

    Ok((
        StatusCode::CREATED,
        Json(CastVoteResponse {
            message: VOTE_CAST_MESSAGE.to_string(),
            receipt_id,
            verification_code,
        }),
    ))
}
