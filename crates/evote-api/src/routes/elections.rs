//! # Election Routes
//!
//! Public read access to elections and, once an election is `COMPLETED`,
//! its results.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use evote_core::{ApprovalStatus, Constituency};
use evote_state::{CandidateTally, Election, ElectionResults, TransitionRecord};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransitionResponse {
    pub from: String,
    pub to: String,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&TransitionRecord> for TransitionResponse {
    fn from(t: &TransitionRecord) -> Self {
        Self {
            from: t.from.as_str().to_string(),
            to: t.to.as_str().to_string(),
            at: t.at,
            reason: t.reason.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ElectionResponse {
    pub election_id: String,
    pub name: String,
    /// DRAFT, SCHEDULED, ACTIVE, COMPLETED or CANCELLED.
    pub status: String,
    pub accepting_votes: bool,
    pub transitions: Vec<TransitionResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Election> for ElectionResponse {
    fn from(e: &Election) -> Self {
        Self {
            election_id: e.election_id.to_string(),
            name: e.name.clone(),
            status: e.status.as_str().to_string(),
            accepting_votes: e.status.accepts_votes(),
            transitions: e.transition_log.iter().map(TransitionResponse::from).collect(),
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CandidateTallyResponse {
    pub candidate_id: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_id: Option<String>,
    pub constituency: String,
    pub votes: u64,
}

impl From<&CandidateTally> for CandidateTallyResponse {
    fn from(t: &CandidateTally) -> Self {
        Self {
            candidate_id: t.candidate_id.to_string(),
            full_name: t.full_name.clone(),
            party_id: t.party_id.as_ref().map(|p| p.to_string()),
            constituency: t.constituency.to_string(),
            votes: t.votes,
        }
    }
}

/// Leader of one constituency. `leader` is absent on a tie or when no votes
/// were cast there.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConstituencyResultResponse {
    pub constituency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ElectionResultsResponse {
    pub election_id: String,
    pub total_votes: u64,
    /// Votes descending, ties broken by candidate id.
    pub candidates: Vec<CandidateTallyResponse>,
    pub constituencies: Vec<ConstituencyResultResponse>,
}

impl From<&ElectionResults> for ElectionResultsResponse {
    fn from(r: &ElectionResults) -> Self {
        let mut seats: Vec<&Constituency> = r.candidates.iter().map(|c| &c.constituency).collect();
        seats.sort();
        seats.dedup();

        Self {
            election_id: r.election_id.to_string(),
            total_votes: r.total_votes,
            candidates: r.candidates.iter().map(CandidateTallyResponse::from).collect(),
            constituencies: seats
                .into_iter()
                .map(|seat| ConstituencyResultResponse {
                    constituency: seat.to_string(),
                    leader: r.leader_in(seat).map(|c| c.candidate_id.to_string()),
                })
                .collect(),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/elections/:election_id", get(get_election))
        .route("/elections/:election_id/results", get(get_results))
}

fn find_election(state: &AppState, election_id: &str) -> Result<Election, AppError> {
    state
        .elections
        .get(election_id)
        .ok_or_else(|| AppError::not_found(format!("election {election_id} not found")))
}

/// GET /elections/:election_id: Election and its lifecycle history.
#[utoipa::path(
    get,
    path = "/elections/{election_id}",
    params(("election_id" = String, Path, description = "Election identifier")),
    responses(
        (status = 200, description = "Election found", body = ElectionResponse),
        (status = 404, description = "Election not found", body = crate::error::ErrorBody),
    ),
    tag = "elections"
)]
pub(crate) async fn get_election(
    State(state): State<AppState>,
    Path(election_id): Path<String>,
) -> Result<Json<ElectionResponse>, AppError> {
    let election = find_election(&state, &election_id)?;
    Ok(Json(ElectionResponse::from(&election)))
}

/// GET /elections/:election_id/results: Published results.
///
/// Every approved candidate appears, including those with no votes.
#[utoipa::path(
    get,
    path = "/elections/{election_id}/results",
    params(("election_id" = String, Path, description = "Election identifier")),
    responses(
        (status = 200, description = "Election results", body = ElectionResultsResponse),
        (status = 404, description = "Election not found", body = crate::error::ErrorBody),
        (status = 409, description = "Election not completed", body = crate::error::ErrorBody),
    ),
    tag = "elections"
)]
pub(crate) async fn get_results(
    State(state): State<AppState>,
    Path(election_id): Path<String>,
) -> Result<Json<ElectionResultsResponse>, AppError> {
    let election = find_election(&state, &election_id)?;
    if !election.status.results_published() {
        return Err(AppError::Conflict(format!(
            "results for election {} are not published (status: {})",
            election.election_id, election.status
        )));
    }

    let candidates: Vec<_> = state
        .candidates
        .list()
        .into_iter()
        .filter(|c| c.status == ApprovalStatus::Approved)
        .collect();
    let results = state
        .ballots
        .lock()
        .await
        .results(&election.election_id, &candidates);

    Ok(Json(ElectionResultsResponse::from(&results)))
}
