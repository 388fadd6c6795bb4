//! # Registration Routes
//!
//! Self-service registration for voters, candidates and parties. Every new
//! record starts `PENDING` and must be approved through the admin surface
//! before it takes part in an election.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use evote_core::{
    validate_text, ApprovalStatus, Candidate, CandidateId, Constituency, Party, PartyId, Voter,
    VoterId,
};

use crate::db::registrations::{self, is_duplicate};
use crate::error::AppError;
use crate::extractors::{check, extract_validated_json, Validate};
use crate::state::AppState;

const MAX_NAME_LEN: usize = 200;
const MAX_SYMBOL_LEN: usize = 64;

// ── Request DTOs ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterVoterRequest {
    pub voter_id: String,
    pub full_name: String,
    pub constituency: String,
}

impl Validate for RegisterVoterRequest {
    fn validate(&self) -> Result<(), String> {
        check(validate_text("full_name", &self.full_name, MAX_NAME_LEN))
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterPartyRequest {
    pub party_id: String,
    pub name: String,
    #[serde(default)]
    pub symbol: Option<String>,
}

impl Validate for RegisterPartyRequest {
    fn validate(&self) -> Result<(), String> {
        check(validate_text("name", &self.name, MAX_NAME_LEN))?;
        if let Some(symbol) = &self.symbol {
            check(validate_text("symbol", symbol, MAX_SYMBOL_LEN))?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterCandidateRequest {
    pub candidate_id: String,
    pub full_name: String,
    pub constituency: String,
    /// Independent candidates omit this.
    #[serde(default)]
    pub party_id: Option<String>,
}

impl Validate for RegisterCandidateRequest {
    fn validate(&self) -> Result<(), String> {
        check(validate_text("full_name", &self.full_name, MAX_NAME_LEN))
    }
}

// ── Response DTOs ────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VoterResponse {
    pub voter_id: String,
    pub full_name: String,
    pub constituency: String,
    /// PENDING, APPROVED or REJECTED.
    pub status: String,
    pub registered_at: DateTime<Utc>,
}

impl From<&Voter> for VoterResponse {
    fn from(v: &Voter) -> Self {
        Self {
            voter_id: v.voter_id.to_string(),
            full_name: v.full_name.clone(),
            constituency: v.constituency.to_string(),
            status: v.status.as_str().to_string(),
            registered_at: v.registered_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PartyResponse {
    pub party_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub status: String,
    pub registered_at: DateTime<Utc>,
}

impl From<&Party> for PartyResponse {
    fn from(p: &Party) -> Self {
        Self {
            party_id: p.party_id.to_string(),
            name: p.name.clone(),
            symbol: p.symbol.clone(),
            status: p.status.as_str().to_string(),
            registered_at: p.registered_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CandidateResponse {
    pub candidate_id: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_id: Option<String>,
    pub constituency: String,
    pub status: String,
    pub registered_at: DateTime<Utc>,
}

impl From<&Candidate> for CandidateResponse {
    fn from(c: &Candidate) -> Self {
        Self {
            candidate_id: c.candidate_id.to_string(),
            full_name: c.full_name.clone(),
            party_id: c.party_id.as_ref().map(|p| p.to_string()),
            constituency: c.constituency.to_string(),
            status: c.status.as_str().to_string(),
            registered_at: c.registered_at,
        }
    }
}

// ── Router ───────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/voter/register", post(register_voter))
        .route("/party/register", post(register_party))
        .route("/candidate/register", post(register_candidate))
}

fn already_registered(kind: &str, id: &str) -> AppError {
    AppError::Conflict(format!("{kind} {id} is already registered"))
}

/// Map an insert failure, treating a primary-key collision as a conflict.
fn insert_error(kind: &'static str, id: String) -> impl FnOnce(sqlx::Error) -> AppError {
    move |err| {
        if is_duplicate(&err) {
            already_registered(kind, &id)
        } else {
            err.into()
        }
    }
}

/// POST /voter/register: Register a voter in a constituency.
#[utoipa::path(
    post,
    path = "/voter/register",
    request_body = RegisterVoterRequest,
    responses(
        (status = 201, description = "Voter registered, pending approval", body = VoterResponse),
        (status = 409, description = "Voter id already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "registration"
)]
pub(crate) async fn register_voter(
    State(state): State<AppState>,
    body: Result<Json<RegisterVoterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<VoterResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let voter = Voter::register(
        VoterId::new(req.voter_id)?,
        req.full_name.trim().to_string(),
        Constituency::new(req.constituency)?,
    );
    let id = voter.voter_id.to_string();

    if state.voters.contains(&id) {
        return Err(already_registered("voter", &id));
    }
    if let Some(pool) = &state.db_pool {
        registrations::insert_voter(pool, &voter)
            .await
            .map_err(insert_error("voter", id.clone()))?;
    }
    if !state.voters.insert_new(id.clone(), voter.clone()) {
        return Err(already_registered("voter", &id));
    }

    tracing::info!(constituency = %voter.constituency, "voter registered");
    Ok((StatusCode::CREATED, Json(VoterResponse::from(&voter))))
}

/// POST /party/register: Register a political party.
#[utoipa::path(
    post,
    path = "/party/register",
    request_body = RegisterPartyRequest,
    responses(
        (status = 201, description = "Party registered, pending approval", body = PartyResponse),
        (status = 409, description = "Party id already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "registration"
)]
pub(crate) async fn register_party(
    State(state): State<AppState>,
    body: Result<Json<RegisterPartyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PartyResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let party = Party::register(
        PartyId::new(req.party_id)?,
        req.name.trim().to_string(),
        req.symbol.map(|s| s.trim().to_string()),
    );
    let id = party.party_id.to_string();

    if state.parties.contains(&id) {
        return Err(already_registered("party", &id));
    }
    if let Some(pool) = &state.db_pool {
        registrations::insert_party(pool, &party)
            .await
            .map_err(insert_error("party", id.clone()))?;
    }
    if !state.parties.insert_new(id.clone(), party.clone()) {
        return Err(already_registered("party", &id));
    }

    tracing::info!(party_id = %id, "party registered");
    Ok((StatusCode::CREATED, Json(PartyResponse::from(&party))))
}

/// POST /candidate/register: Register a candidate for a constituency.
///
/// A referenced party must exist and must not have been rejected.
#[utoipa::path(
    post,
    path = "/candidate/register",
    request_body = RegisterCandidateRequest,
    responses(
        (status = 201, description = "Candidate registered, pending approval", body = CandidateResponse),
        (status = 409, description = "Candidate id already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request or unknown party", body = crate::error::ErrorBody),
    ),
    tag = "registration"
)]
pub(crate) async fn register_candidate(
    State(state): State<AppState>,
    body: Result<Json<RegisterCandidateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CandidateResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let party_id = req.party_id.map(PartyId::new).transpose()?;
    if let Some(pid) = &party_id {
        match state.parties.get(pid.as_str()) {
            None => {
                return Err(AppError::Validation(format!("party {pid} is not registered")));
            }
            Some(p) if p.status == ApprovalStatus::Rejected => {
                return Err(AppError::Validation(format!("party {pid} has been rejected")));
            }
            Some(_) => {}
        }
    }

    let candidate = Candidate::register(
        CandidateId::new(req.candidate_id)?,
        req.full_name.trim().to_string(),
        party_id,
        Constituency::new(req.constituency)?,
    );
    let id = candidate.candidate_id.to_string();

    if state.candidates.contains(&id) {
        return Err(already_registered("candidate", &id));
    }
    if let Some(pool) = &state.db_pool {
        registrations::insert_candidate(pool, &candidate)
            .await
            .map_err(insert_error("candidate", id.clone()))?;
    }
    if !state.candidates.insert_new(id.clone(), candidate.clone()) {
        return Err(already_registered("candidate", &id));
    }

    tracing::info!(
        candidate_id = %id,
        constituency = %candidate.constituency,
        "candidate registered"
    );
    Ok((StatusCode::CREATED, Json(CandidateResponse::from(&candidate))))
}
