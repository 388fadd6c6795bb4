//! # Admin Routes
//!
//! Election lifecycle management and registration moderation. Mounted
//! behind [`crate::auth::auth_middleware`].
//!
//! Every mutation writes to the database first (when configured) and only
//! then to the in-memory stores. Database updates are guarded on the
//! previous state so a stale request cannot overwrite a newer decision.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use evote_core::{validate_text, ApprovalStatus, Candidate, ElectionId, ModerationError, Party, Voter};
use evote_state::{Election, ElectionStatus};

use super::elections::ElectionResponse;
use super::registration::{CandidateResponse, PartyResponse, VoterResponse};
use crate::auth::CallerIdentity;
use crate::db::registrations::{self, is_duplicate, RegistrationKind};
use crate::error::AppError;
use crate::extractors::{check, extract_validated_json, Validate};
use crate::state::{AppState, Store};

const MAX_ELECTION_NAME_LEN: usize = 200;
const MAX_REASON_LEN: usize = 500;

// ── Request DTOs ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateElectionRequest {
    pub election_id: String,
    pub name: String,
}

impl Validate for CreateElectionRequest {
    fn validate(&self) -> Result<(), String> {
        check(validate_text("name", &self.name, MAX_ELECTION_NAME_LEN))
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionRequest {
    /// Target status: SCHEDULED, ACTIVE, COMPLETED or CANCELLED.
    pub to: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Validate for TransitionRequest {
    fn validate(&self) -> Result<(), String> {
        if ElectionStatus::parse(&self.to).is_none() {
            return Err(format!("unknown election status: {}", self.to));
        }
        if let Some(reason) = &self.reason {
            check(validate_text("reason", reason, MAX_REASON_LEN))?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusFilter {
    /// PENDING, APPROVED or REJECTED. Omit for all records.
    pub status: Option<String>,
}

impl StatusFilter {
    fn parse(&self) -> Result<Option<ApprovalStatus>, AppError> {
        self.status
            .as_deref()
            .map(|s| {
                ApprovalStatus::parse(s)
                    .ok_or_else(|| AppError::Validation(format!("unknown approval status: {s}")))
            })
            .transpose()
    }
}

// ── Router ───────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/elections", post(create_election))
        .route("/admin/elections/:election_id/transition", post(transition_election))
        .route("/admin/voters", get(list_voters))
        .route("/admin/voters/:voter_id/approve", post(approve_voter))
        .route("/admin/voters/:voter_id/reject", post(reject_voter))
        .route("/admin/candidates", get(list_candidates))
        .route("/admin/candidates/:candidate_id/approve", post(approve_candidate))
        .route("/admin/candidates/:candidate_id/reject", post(reject_candidate))
        .route("/admin/parties", get(list_parties))
        .route("/admin/parties/:party_id/approve", post(approve_party))
        .route("/admin/parties/:party_id/reject", post(reject_party))
}

// ── Elections ────────────────────────────────────────────────────────

/// POST /admin/elections: Create an election in DRAFT.
#[utoipa::path(
    post,
    path = "/admin/elections",
    request_body = CreateElectionRequest,
    responses(
        (status = 201, description = "Election created", body = ElectionResponse),
        (status = 401, description = "Missing or invalid admin token", body = crate::error::ErrorBody),
        (status = 409, description = "Election id already exists", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub(crate) async fn create_election(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateElectionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ElectionResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let election = Election::new(ElectionId::new(req.election_id)?, req.name.trim());
    let id = election.election_id.to_string();
    let exists = || AppError::Conflict(format!("election {id} already exists"));

    if state.elections.contains(&id) {
        return Err(exists());
    }
    if let Some(pool) = &state.db_pool {
        crate::db::elections::insert(pool, &election)
            .await
            .map_err(|e| if is_duplicate(&e) { exists() } else { e.into() })?;
    }
    if !state.elections.insert_new(id.clone(), election.clone()) {
        return Err(exists());
    }

    tracing::info!(election_id = %id, role = caller.role.as_str(), "election created");
    Ok((StatusCode::CREATED, Json(ElectionResponse::from(&election))))
}

/// POST /admin/elections/:election_id/transition: Move an election through
/// its lifecycle.
#[utoipa::path(
    post,
    path = "/admin/elections/{election_id}/transition",
    params(("election_id" = String, Path, description = "Election identifier")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Transition applied", body = ElectionResponse),
        (status = 401, description = "Missing or invalid admin token", body = crate::error::ErrorBody),
        (status = 404, description = "Election not found", body = crate::error::ErrorBody),
        (status = 409, description = "Transition not allowed from the current status", body = crate::error::ErrorBody),
        (status = 422, description = "Unknown target status", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub(crate) async fn transition_election(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(election_id): Path<String>,
    body: Result<Json<TransitionRequest>, JsonRejection>,
) -> Result<Json<ElectionResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let to = ElectionStatus::parse(&req.to)
        .ok_or_else(|| AppError::Validation(format!("unknown election status: {}", req.to)))?;

    // Held across the read-modify-write so that no ballot can commit against
    // a status that is about to change.
    let _ledger = state.ballots.lock().await;

    let mut election = state
        .elections
        .get(&election_id)
        .ok_or_else(|| AppError::not_found(format!("election {election_id} not found")))?;
    let previous = election.status;
    election.transition(to, req.reason.map(|r| r.trim().to_string()))?;

    if let Some(pool) = &state.db_pool {
        if !crate::db::elections::update_state(pool, &election, previous).await? {
            return Err(AppError::Conflict(format!(
                "election {election_id} changed concurrently; retry"
            )));
        }
    }
    state.elections.insert(election_id.clone(), election.clone());

    tracing::info!(
        election_id = %election_id,
        from = previous.as_str(),
        to = to.as_str(),
        role = caller.role.as_str(),
        "election transitioned"
    );
    Ok(Json(ElectionResponse::from(&election)))
}

// ── Moderation ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Decision {
    Approve,
    Reject,
}

/// A registration record that admins approve or reject.
trait Moderated: Clone + Send + Sync + 'static {
    const KIND: RegistrationKind;

    fn status(&self) -> ApprovalStatus;
    fn decide(&mut self, decision: Decision) -> Result<(), ModerationError>;
}

impl Moderated for Voter {
    const KIND: RegistrationKind = RegistrationKind::Voter;

    fn status(&self) -> ApprovalStatus {
        self.status
    }

    fn decide(&mut self, decision: Decision) -> Result<(), ModerationError> {
        match decision {
            Decision::Approve => self.approve(),
            Decision::Reject => self.reject(),
        }
    }
}

impl Moderated for Party {
    const KIND: RegistrationKind = RegistrationKind::Party;

    fn status(&self) -> ApprovalStatus {
        self.status
    }

    fn decide(&mut self, decision: Decision) -> Result<(), ModerationError> {
        match decision {
            Decision::Approve => self.approve(),
            Decision::Reject => self.reject(),
        }
    }
}

impl Moderated for Candidate {
    const KIND: RegistrationKind = RegistrationKind::Candidate;

    fn status(&self) -> ApprovalStatus {
        self.status
    }

    fn decide(&mut self, decision: Decision) -> Result<(), ModerationError> {
        match decision {
            Decision::Approve => self.approve(),
            Decision::Reject => self.reject(),
        }
    }
}

/// Apply a one-shot moderation decision, database first.
async fn moderate<T: Moderated>(
    state: &AppState,
    store: &Store<T>,
    id: &str,
    decision: Decision,
) -> Result<T, AppError> {
    let kind = T::KIND.as_str();
    let not_found = || AppError::not_found(format!("{kind} {id} not found"));

    let mut preview = store.get(id).ok_or_else(not_found)?;
    preview.decide(decision)?;

    if let Some(pool) = &state.db_pool {
        if !registrations::set_status(pool, T::KIND, id, preview.status()).await? {
            return Err(AppError::Conflict(format!(
                "{kind} {id} has already been moderated"
            )));
        }
    }

    let updated = store
        .try_update(id, |record| {
            record.decide(decision)?;
            Ok::<T, ModerationError>(record.clone())
        })
        .ok_or_else(not_found)??;

    tracing::info!(kind, status = %updated.status(), "registration moderated");
    Ok(updated)
}

fn list_by_status<T: Clone + Send + Sync>(
    store: &Store<T>,
    filter: Option<ApprovalStatus>,
    status: impl Fn(&T) -> ApprovalStatus,
    key: impl Fn(&T) -> String,
) -> Vec<T> {
    let mut records: Vec<T> = store
        .list()
        .into_iter()
        .filter(|r| filter.map_or(true, |f| status(r) == f))
        .collect();
    records.sort_by_key(|r| key(r));
    records
}

/// POST /admin/voters/:voter_id/approve
#[utoipa::path(
    post,
    path = "/admin/voters/{voter_id}/approve",
    params(("voter_id" = String, Path, description = "Voter identifier")),
    responses(
        (status = 200, description = "Voter approved", body = VoterResponse),
        (status = 404, description = "Voter not found", body = crate::error::ErrorBody),
        (status = 409, description = "Voter already moderated", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub(crate) async fn approve_voter(
    State(state): State<AppState>,
    Path(voter_id): Path<String>,
) -> Result<Json<VoterResponse>, AppError> {
    let voter = moderate(&state, &state.voters, &voter_id, Decision::Approve).await?;
    Ok(Json(VoterResponse::from(&voter)))
}

/// POST /admin/voters/:voter_id/reject
#[utoipa::path(
    post,
    path = "/admin/voters/{voter_id}/reject",
    params(("voter_id" = String, Path, description = "Voter identifier")),
    responses(
        (status = 200, description = "Voter rejected", body = VoterResponse),
        (status = 404, description = "Voter not found", body = crate::error::ErrorBody),
        (status = 409, description = "Voter already moderated", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub(crate) async fn reject_voter(
    State(state): State<AppState>,
    Path(voter_id): Path<String>,
) -> Result<Json<VoterResponse>, AppError> {
    let voter = moderate(&state, &state.voters, &voter_id, Decision::Reject).await?;
    Ok(Json(VoterResponse::from(&voter)))
}

/// POST /admin/candidates/:candidate_id/approve
#[utoipa::path(
    post,
    path = "/admin/candidates/{candidate_id}/approve",
    params(("candidate_id" = String, Path, description = "Candidate identifier")),
    responses(
        (status = 200, description = "Candidate approved", body = CandidateResponse),
        (status = 404, description = "Candidate not found", body = crate::error::ErrorBody),
        (status = 409, description = "Candidate already moderated", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub(crate) async fn approve_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
) -> Result<Json<CandidateResponse>, AppError> {
    let candidate =
        moderate(&state, &state.candidates, &candidate_id, Decision::Approve).await?;
    Ok(Json(CandidateResponse::from(&candidate)))
}

/// POST /admin/candidates/:candidate_id/reject
#[utoipa::path(
    post,
    path = "/admin/candidates/{candidate_id}/reject",
    params(("candidate_id" = String, Path, description = "Candidate identifier")),
    responses(
        (status = 200, description = "Candidate rejected", body = CandidateResponse),
        (status = 404, description = "Candidate not found", body = crate::error::ErrorBody),
        (status = 409, description = "Candidate already moderated", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub(crate) async fn reject_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
) -> Result<Json<CandidateResponse>, AppError> {
    let candidate = moderate(&state, &state.candidates, &candidate_id, Decision::Reject).await?;
    Ok(Json(CandidateResponse::from(&candidate)))
}

/// POST /admin/parties/:party_id/approve
#[utoipa::path(
    post,
    path = "/admin/parties/{party_id}/approve",
    params(("party_id" = String, Path, description = "Party identifier")),
    responses(
        (status = 200, description = "Party approved", body = PartyResponse),
        (status = 404, description = "Party not found", body = crate::error::ErrorBody),
        (status = 409, description = "Party already moderated", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub(crate) async fn approve_party(
    State(state): State<AppState>,
    Path(party_id): Path<String>,
) -> Result<Json<PartyResponse>, AppError> {
    let party = moderate(&state, &state.parties, &party_id, Decision::Approve).await?;
    Ok(Json(PartyResponse::from(&party)))
}

/// POST /admin/parties/:party_id/reject
#[utoipa::path(
    post,
    path = "/admin/parties/{party_id}/reject",
    params(("party_id" = String, Path, description = "Party identifier")),
    responses(
        (status = 200, description = "Party rejected", body = PartyResponse),
        (status = 404, description = "Party not found", body = crate::error::ErrorBody),
        (status = 409, description = "Party already moderated", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub(crate) async fn reject_party(
    State(state): State<AppState>,
    Path(party_id): Path<String>,
) -> Result<Json<PartyResponse>, AppError> {
    let party = moderate(&state, &state.parties, &party_id, Decision::Reject).await?;
    Ok(Json(PartyResponse::from(&party)))
}

// ── Listings ─────────────────────────────────────────────────────────

/// GET /admin/voters: Voters, optionally filtered by status.
#[utoipa::path(
    get,
    path = "/admin/voters",
    params(StatusFilter),
    responses(
        (status = 200, description = "Voters ordered by id", body = Vec<VoterResponse>),
        (status = 422, description = "Unknown status filter", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub(crate) async fn list_voters(
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<VoterResponse>>, AppError> {
    let voters = list_by_status(&state.voters, filter.parse()?, |v| v.status, |v| {
        v.voter_id.to_string()
    });
    Ok(Json(voters.iter().map(VoterResponse::from).collect()))
}

/// GET /admin/candidates: Candidates, optionally filtered by status.
#[utoipa::path(
    get,
    path = "/admin/candidates",
    params(StatusFilter),
    responses(
        (status = 200, description = "Candidates ordered by id", body = Vec<CandidateResponse>),
        (status = 422, description = "Unknown status filter", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub(crate) async fn list_candidates(
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<CandidateResponse>>, AppError> {
    let candidates = list_by_status(&state.candidates, filter.parse()?, |c| c.status, |c| {
        c.candidate_id.to_string()
    });
    Ok(Json(candidates.iter().map(CandidateResponse::from).collect()))
}

/// GET /admin/parties: Parties, optionally filtered by status.
#[utoipa::path(
    get,
    path = "/admin/parties",
    params(StatusFilter),
    responses(
        (status = 200, description = "Parties ordered by id", body = Vec<PartyResponse>),
        (status = 422, description = "Unknown status filter", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub(crate) async fn list_parties(
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<PartyResponse>>, AppError> {
    let parties = list_by_status(&state.parties, filter.parse()?, |p| p.status, |p| {
        p.party_id.to_string()
    });
    Ok(Json(parties.iter().map(PartyResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use evote_core::{Constituency, VoterId};
    use evote_receipt::ReceiptSalt;

    use super::*;

    fn state_with_pending_voter() -> AppState {
        let state = AppState::new(ReceiptSalt::new("admin-test-salt-0123").unwrap());
        state.voters.insert(
            "V001",
            Voter::register(
                VoterId::new("V001").unwrap(),
                "Asha Rao".into(),
                Constituency::new("C001").unwrap(),
            ),
        );
        state
    }

    #[tokio::test]
    async fn approval_is_one_shot() {
        let state = state_with_pending_voter();
        let approved = moderate(&state, &state.voters, "V001", Decision::Approve)
            .await
            .unwrap();
        assert_eq!(approved.status, ApprovalStatus::Approved);

        let err = moderate(&state, &state.voters, "V001", Decision::Reject)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(
            state.voters.get("V001").unwrap().status,
            ApprovalStatus::Approved
        );
    }

    #[tokio::test]
    async fn unknown_record_is_not_found() {
        let state = state_with_pending_voter();
        let err = moderate(&state, &state.parties, "P404", Decision::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m.contains("party")));
    }

    #[test]
    fn status_filter_rejects_unknown_values() {
        let filter = StatusFilter {
            status: Some("maybe".into()),
        };
        assert!(matches!(filter.parse(), Err(AppError::Validation(_))));

        let filter = StatusFilter {
            status: Some("pending".into()),
        };
        assert_eq!(filter.parse().unwrap(), Some(ApprovalStatus::Pending));
    }

    #[test]
    fn transition_request_validates_target() {
        let req = TransitionRequest {
            to: "PAUSED".into(),
            reason: None,
        };
        assert!(req.validate().is_err());

        let req = TransitionRequest {
            to: "active".into(),
            reason: Some("polls open".into()),
        };
        assert!(req.validate().is_ok());
    }
}
