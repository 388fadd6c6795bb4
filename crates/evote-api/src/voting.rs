//! # Ballot Casting
//!
//! The cast-vote workflow in two phases:
//!
//! 1. **Commit.** Under the ballot-ledger lock: re-check the election is
//!    `ACTIVE`, reject a second ballot from the same voter, persist the
//!    marker and tally increment (when a database is configured), then
//!    update the in-memory ledger. Once this phase returns the vote stands.
//! 2. **Receipt.** Outside the lock, ask the [`ReceiptService`] for a
//!    receipt. Any failure here is logged and counted, and the caller gets
//!    a success response without receipt fields. The vote is never rolled
//!    back or retried.
//!
//! Eligibility checks (voter approved, candidate approved and standing in the
//! voter's constituency) run before the lock is taken; approvals are one-shot
//! so they cannot be revoked in between.
//!
//! [`ReceiptService`]: evote_receipt::ReceiptService

use evote_core::{CandidateId, ElectionId, VoterId};
use evote_receipt::VoteReceipt;

use crate::error::AppError;
use crate::state::AppState;

/// A validated ballot.
#[derive(Debug, Clone)]
pub struct Ballot {
    pub voter_id: VoterId,
    pub election_id: ElectionId,
    pub candidate_id: CandidateId,
}

/// Outcome of a successful cast. `receipt` is `None` when the vote was
/// recorded but receipt generation failed.
#[derive(Debug)]
pub struct CastOutcome {
    pub receipt: Option<VoteReceipt>,
}

/// Cast one ballot.
///
/// # Errors
///
/// - [`AppError::NotFound`] for an unknown election, voter or candidate.
/// - [`AppError::Conflict`] if the election is not `ACTIVE` or the voter
///   already voted in it.
/// - [`AppError::Forbidden`] if the voter is not approved.
/// - [`AppError::Validation`] if the candidate is not on the voter's ballot.
/// - [`AppError::Internal`] if the ballot could not be persisted.
///
/// Receipt failures are not errors.
pub async fn cast_vote(state: &AppState, ballot: &Ballot) -> Result<CastOutcome, AppError> {
    let voter = state
        .voters
        .get(ballot.voter_id.as_str())
        .ok_or_else(|| AppError::not_found(format!("voter {} not found", ballot.voter_id)))?;
    if !voter.is_eligible() {
        return Err(AppError::Forbidden(format!(
            "voter {} is not approved to vote (status: {})",
            voter.voter_id, voter.status
        )));
    }

    let candidate = state
        .candidates
        .get(ballot.candidate_id.as_str())
        .ok_or_else(|| {
            AppError::not_found(format!("candidate {} not found", ballot.candidate_id))
        })?;
    if !candidate.is_on_ballot_for(&voter.constituency) {
        return Err(AppError::Validation(format!(
            "candidate {} is not on the ballot in constituency {}",
            candidate.candidate_id, voter.constituency
        )));
    }

    commit_ballot(state, ballot).await?;

    state.metrics.votes_cast().inc();
    tracing::info!(election_id = %ballot.election_id, "ballot recorded");

    let receipt = match state
        .receipts
        .create_receipt(
            &ballot.voter_id,
            &ballot.election_id,
            &voter.constituency,
            &ballot.candidate_id,
        )
        .await
    {
        Ok(receipt) => {
            state.metrics.receipts_created().inc();
            Some(receipt)
        }
        Err(e) => {
            state.metrics.receipt_failures().inc();
            tracing::error!(
                election_id = %ballot.election_id,
                error = %e,
                "ballot recorded but receipt generation failed"
            );
            None
        }
    };

    Ok(CastOutcome { receipt })
}

/// Phase 1: the critical section.
async fn commit_ballot(state: &AppState, ballot: &Ballot) -> Result<(), AppError> {
    let mut ledger = state.ballots.lock().await;

    // Transitions also take the ledger lock, so the status read here cannot
    // change before the commit below.
    let election = state
        .elections
        .get(ballot.election_id.as_str())
        .ok_or_else(|| {
            AppError::not_found(format!("election {} not found", ballot.election_id))
        })?;
    if !election.status.accepts_votes() {
        return Err(AppError::Conflict(format!(
            "election {} is not accepting votes (status: {})",
            election.election_id, election.status
        )));
    }

    if ledger.has_voted(&ballot.election_id, &ballot.voter_id) {
        return Err(evote_state::BallotError::AlreadyVoted {
            election_id: ballot.election_id.clone(),
        }
        .into());
    }

    if let Some(pool) = &state.db_pool {
        let inserted = crate::db::ballots::record_vote(
            pool,
            &ballot.election_id,
            &ballot.voter_id,
            &ballot.candidate_id,
        )
        .await?;
        if !inserted {
            return Err(evote_state::BallotError::AlreadyVoted {
                election_id: ballot.election_id.clone(),
            }
            .into());
        }
    }

    ledger.record_vote(&ballot.election_id, &ballot.voter_id, &ballot.candidate_id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use evote_core::{Candidate, Constituency, Voter};
    use evote_receipt::{ReceiptSalt, ReceiptService, ReceiptStore, StoreError};
    use evote_state::{Election, ElectionStatus};

    use super::*;
    use crate::config::AppConfig;

    fn salt() -> ReceiptSalt {
        ReceiptSalt::new("voting-test-salt-0123").unwrap()
    }

    fn seed(state: &AppState, election_status: ElectionStatus) {
        let mut voter = Voter::register(
            VoterId::new("V001").unwrap(),
            "Asha Rao".into(),
            Constituency::new("C001").unwrap(),
        );
        voter.approve().unwrap();
        state.voters.insert("V001", voter);

        let mut candidate = Candidate::register(
            CandidateId::new("CD002").unwrap(),
            "Ravi Menon".into(),
            None,
            Constituency::new("C001").unwrap(),
        );
        candidate.approve().unwrap();
        state.candidates.insert("CD002", candidate);

        let mut other_seat = Candidate::register(
            CandidateId::new("CD009").unwrap(),
            "Elsewhere".into(),
            None,
            Constituency::new("C009").unwrap(),
        );
        other_seat.approve().unwrap();
        state.candidates.insert("CD009", other_seat);

        let mut election = Election::new(ElectionId::new("current").unwrap(), "General");
        for to in [
            ElectionStatus::Scheduled,
            ElectionStatus::Active,
            ElectionStatus::Completed,
        ] {
            if election.status == election_status {
                break;
            }
            election.transition(to, None).unwrap();
        }
        state.elections.insert("current", election);
    }

    fn ballot(candidate: &str) -> Ballot {
        Ballot {
            voter_id: VoterId::new("V001").unwrap(),
            election_id: ElectionId::new("current").unwrap(),
            candidate_id: CandidateId::new(candidate).unwrap(),
        }
    }

    #[tokio::test]
    async fn vote_is_tallied_and_receipted() {
        let state = AppState::new(salt());
        seed(&state, ElectionStatus::Active);

        let outcome = cast_vote(&state, &ballot("CD002")).await.unwrap();
        let receipt = outcome.receipt.unwrap();
        assert_eq!(receipt.constituency, "C001");
        assert_eq!(receipt.election_id, "current");

        let ledger = state.ballots.lock().await;
        assert_eq!(
            ledger.votes_for(
                &ElectionId::new("current").unwrap(),
                &CandidateId::new("CD002").unwrap()
            ),
            1
        );
        assert_eq!(state.metrics.votes_cast().get(), 1);
        assert_eq!(state.metrics.receipts_created().get(), 1);
    }

    #[tokio::test]
    async fn second_vote_conflicts_and_leaves_tally() {
        let state = AppState::new(salt());
        seed(&state, ElectionStatus::Active);
        cast_vote(&state, &ballot("CD002")).await.unwrap();

        let err = cast_vote(&state, &ballot("CD002")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let ledger = state.ballots.lock().await;
        assert_eq!(ledger.total_votes(&ElectionId::new("current").unwrap()), 1);
    }

    #[tokio::test]
    async fn inactive_election_rejects_votes() {
        let state = AppState::new(salt());
        seed(&state, ElectionStatus::Scheduled);
        let err = cast_vote(&state, &ballot("CD002")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m.contains("SCHEDULED")));
    }

    #[tokio::test]
    async fn candidate_outside_constituency_is_rejected() {
        let state = AppState::new(salt());
        seed(&state, ElectionStatus::Active);
        let err = cast_vote(&state, &ballot("CD009")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn unapproved_voter_is_forbidden() {
        let state = AppState::new(salt());
        seed(&state, ElectionStatus::Active);
        state.voters.insert(
            "V001",
            Voter::register(
                VoterId::new("V001").unwrap(),
                "Asha Rao".into(),
                Constituency::new("C001").unwrap(),
            ),
        );
        let err = cast_vote(&state, &ballot("CD002")).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    /// Receipt store whose inserts always fail at the backend.
    struct BrokenStore;

    #[async_trait]
    impl ReceiptStore for BrokenStore {
        async fn insert(&self, _: &VoteReceipt) -> Result<(), StoreError> {
            Err(StoreError::Backend("disk full".into()))
        }
        async fn find_by_receipt_id(&self, _: &str) -> Result<Option<VoteReceipt>, StoreError> {
            Ok(None)
        }
        async fn mark_verified(
            &self,
            _: &str,
            _: DateTime<Utc>,
        ) -> Result<Option<VoteReceipt>, StoreError> {
            Ok(None)
        }
        async fn count(&self) -> Result<u64, StoreError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn receipt_failure_keeps_the_vote() {
        let receipts = ReceiptService::new(Arc::new(BrokenStore), salt());
        let state = AppState::with_config(AppConfig::default(), receipts, None);
        seed(&state, ElectionStatus::Active);

        let outcome = cast_vote(&state, &ballot("CD002")).await.unwrap();
        assert!(outcome.receipt.is_none());
        assert_eq!(state.metrics.votes_cast().get(), 1);
        assert_eq!(state.metrics.receipt_failures().get(), 1);

        let ledger = state.ballots.lock().await;
        assert!(ledger.has_voted(
            &ElectionId::new("current").unwrap(),
            &VoterId::new("V001").unwrap()
        ));
    }
}
