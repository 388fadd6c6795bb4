//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the admin Bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Admin bearer token. Set via EVOTE_ADMIN_TOKEN env var.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "evote API",
        version = "0.1.0",
        description = "Voter, candidate and party registration, election lifecycle, ballot casting and anonymous vote receipts.\n\nAdmin endpoints (`/admin/*`) require `Authorization: Bearer <token>`. Health probes, `/metrics` and `/openapi.json` are unauthenticated."
    ),
    paths(
        // Registration
        crate::routes::registration::register_voter,
        crate::routes::registration::register_party,
        crate::routes::registration::register_candidate,
        // Voting
        crate::routes::ballot::vote,
        // Receipts
        crate::routes::receipts::verify_receipt,
        crate::routes::receipts::get_receipt,
        // Elections
        crate::routes::elections::get_election,
        crate::routes::elections::get_results,
        // Admin
        crate::routes::admin::create_election,
        crate::routes::admin::transition_election,
        crate::routes::admin::list_voters,
        crate::routes::admin::approve_voter,
        crate::routes::admin::reject_voter,
        crate::routes::admin::list_candidates,
        crate::routes::admin::approve_candidate,
        crate::routes::admin::reject_candidate,
        crate::routes::admin::list_parties,
        crate::routes::admin::approve_party,
        crate::routes::admin::reject_party,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::registration::RegisterVoterRequest,
        crate::routes::registration::RegisterPartyRequest,
        crate::routes::registration::RegisterCandidateRequest,
        crate::routes::registration::VoterResponse,
        crate::routes::registration::PartyResponse,
        crate::routes::registration::CandidateResponse,
        crate::routes::ballot::CastVoteRequest,
        crate::routes::ballot::CastVoteResponse,
        crate::routes::receipts::VerifyReceiptRequest,
        crate::routes::receipts::VerifyReceiptResponse,
        crate::routes::receipts::ReceiptViewResponse,
        crate::routes::receipts::ReceiptDetailResponse,
        crate::routes::elections::ElectionResponse,
        crate::routes::elections::TransitionResponse,
        crate::routes::elections::ElectionResultsResponse,
        crate::routes::elections::CandidateTallyResponse,
        crate::routes::elections::ConstituencyResultResponse,
        crate::routes::admin::CreateElectionRequest,
        crate::routes::admin::TransitionRequest,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "registration", description = "Self-service registration, pending admin approval"),
        (name = "voting", description = "Ballot casting"),
        (name = "receipts", description = "Anonymous vote receipt verification and lookup"),
        (name = "elections", description = "Election status and published results"),
        (name = "admin", description = "Election lifecycle and registration moderation"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
