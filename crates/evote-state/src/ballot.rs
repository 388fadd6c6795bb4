//! # Ballot Ledger
//!
//! Tracks which voters have cast a ballot in each election and the running
//! tally per candidate. A voter may vote at most once per election; the
//! "already voted" check and the tally increment happen in one `&mut self`
//! call so callers holding the ledger lock see them atomically.
//!
//! The ledger records *that* a voter voted and *how many* votes each
//! candidate has, but never which candidate a given voter chose.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use evote_core::{Candidate, CandidateId, Constituency, ElectionId, PartyId, VoterId};

/// Errors from ballot recording.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BallotError {
    /// The voter already has a ballot recorded in this election.
    #[error("voter has already voted in election {election_id}")]
    AlreadyVoted { election_id: ElectionId },
}

/// In-memory ballot ledger.
#[derive(Debug, Default)]
pub struct BallotLedger {
    voted: HashSet<(ElectionId, VoterId)>,
    tallies: HashMap<ElectionId, HashMap<CandidateId, u64>>,
}

impl BallotLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one ballot.
    ///
    /// # Errors
    ///
    /// [`BallotError::AlreadyVoted`] if `voter` has already voted in
    /// `election`. The tally is left untouched in that case.
    pub fn record_vote(
        &mut self,
        election: &ElectionId,
        voter: &VoterId,
        candidate: &CandidateId,
    ) -> Result<(), BallotError> {
        if !self.voted.insert((election.clone(), voter.clone())) {
            return Err(BallotError::AlreadyVoted {
                election_id: election.clone(),
            });
        }
        *self
            .tallies
            .entry(election.clone())
            .or_default()
            .entry(candidate.clone())
            .or_insert(0) += 1;
        Ok(())
    }

    /// Restore a persisted "has voted" marker without touching tallies.
    pub fn restore_marker(&mut self, election: ElectionId, voter: VoterId) {
        self.voted.insert((election, voter));
    }

    /// Restore a persisted tally, replacing any in-memory count.
    pub fn restore_tally(&mut self, election: ElectionId, candidate: CandidateId, votes: u64) {
        self.tallies
            .entry(election)
            .or_default()
            .insert(candidate, votes);
    }

    /// Whether `voter` has voted in `election`.
    pub fn has_voted(&self, election: &ElectionId, voter: &VoterId) -> bool {
        self.voted.contains(&(election.clone(), voter.clone()))
    }

    /// Votes recorded for `candidate` in `election`.
    pub fn votes_for(&self, election: &ElectionId, candidate: &CandidateId) -> u64 {
        self.tallies
            .get(election)
            .and_then(|t| t.get(candidate))
            .copied()
            .unwrap_or(0)
    }

    /// Total ballots recorded in `election`.
    pub fn total_votes(&self, election: &ElectionId) -> u64 {
        self.tallies
            .get(election)
            .map(|t| t.values().sum())
            .unwrap_or(0)
    }

    /// Build the published results for `election`.
    ///
    /// Every candidate passed in appears in the output, including those with
    /// zero votes. Candidates are ordered by votes descending, then by id.
    pub fn results<'a>(
        &self,
        election: &ElectionId,
        candidates: impl IntoIterator<Item = &'a Candidate>,
    ) -> ElectionResults {
        let mut rows: Vec<CandidateTally> = candidates
            .into_iter()
            .map(|c| CandidateTally {
                candidate_id: c.candidate_id.clone(),
                full_name: c.full_name.clone(),
                party_id: c.party_id.clone(),
                constituency: c.constituency.clone(),
                votes: self.votes_for(election, &c.candidate_id),
            })
            .collect();
        rows.sort_by(|a, b| {
            b.votes
                .cmp(&a.votes)
                .then_with(|| a.candidate_id.cmp(&b.candidate_id))
        });

        ElectionResults {
            election_id: election.clone(),
            total_votes: self.total_votes(election),
            candidates: rows,
        }
    }
}

/// Vote count for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTally {
    pub candidate_id: CandidateId,
    pub full_name: String,
    pub party_id: Option<PartyId>,
    pub constituency: Constituency,
    pub votes: u64,
}

/// Published results of an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionResults {
    pub election_id: ElectionId,
    pub total_votes: u64,
    pub candidates: Vec<CandidateTally>,
}

impl ElectionResults {
    /// The leading candidate in `constituency`, or `None` on a tie for first
    /// place or when nobody received a vote.
    pub fn leader_in(&self, constituency: &Constituency) -> Option<&CandidateTally> {
        let mut in_seat = self
            .candidates
            .iter()
            .filter(|c| &c.constituency == constituency);
        let first = in_seat.next()?;
        if first.votes == 0 {
            return None;
        }
        match in_seat.next() {
            Some(second) if second.votes == first.votes => None,
            _ => Some(first),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eid(s: &str) -> ElectionId {
        ElectionId::new(s).unwrap()
    }
    fn vid(s: &str) -> VoterId {
        VoterId::new(s).unwrap()
    }
    fn cid(s: &str) -> CandidateId {
        CandidateId::new(s).unwrap()
    }

    fn candidate(id: &str, seat: &str) -> Candidate {
        Candidate::register(
            cid(id),
            format!("Candidate {id}"),
            None,
            Constituency::new(seat).unwrap(),
        )
    }

    #[test]
    fn records_one_vote() {
        let mut ledger = BallotLedger::new();
        ledger
            .record_vote(&eid("current"), &vid("V001"), &cid("CD002"))
            .unwrap();
        assert!(ledger.has_voted(&eid("current"), &vid("V001")));
        assert_eq!(ledger.votes_for(&eid("current"), &cid("CD002")), 1);
        assert_eq!(ledger.total_votes(&eid("current")), 1);
    }

    #[test]
    fn restored_state_blocks_revote_and_keeps_counts() {
        let mut ledger = BallotLedger::new();
        ledger.restore_marker(eid("current"), vid("V001"));
        ledger.restore_tally(eid("current"), cid("CD002"), 7);

        assert!(ledger.has_voted(&eid("current"), &vid("V001")));
        assert_eq!(ledger.votes_for(&eid("current"), &cid("CD002")), 7);
        assert!(ledger
            .record_vote(&eid("current"), &vid("V001"), &cid("CD001"))
            .is_err());
        assert_eq!(ledger.total_votes(&eid("current")), 7);
    }

    #[test]
    fn second_vote_is_rejected_without_touching_tally() {
        let mut ledger = BallotLedger::new();
        let e = eid("current");
        ledger.record_vote(&e, &vid("V001"), &cid("CD002")).unwrap();
        let err = ledger
            .record_vote(&e, &vid("V001"), &cid("CD003"))
            .unwrap_err();
        assert_eq!(err, BallotError::AlreadyVoted { election_id: e.clone() });
        assert_eq!(ledger.votes_for(&e, &cid("CD003")), 0);
        assert_eq!(ledger.total_votes(&e), 1);
    }

    #[test]
    fn same_voter_may_vote_in_different_elections() {
        let mut ledger = BallotLedger::new();
        ledger
            .record_vote(&eid("e1"), &vid("V001"), &cid("CD002"))
            .unwrap();
        ledger
            .record_vote(&eid("e2"), &vid("V001"), &cid("CD002"))
            .unwrap();
        assert_eq!(ledger.total_votes(&eid("e1")), 1);
        assert_eq!(ledger.total_votes(&eid("e2")), 1);
    }

    #[test]
    fn results_include_zero_vote_candidates_in_order() {
        let mut ledger = BallotLedger::new();
        let e = eid("current");
        ledger.record_vote(&e, &vid("V1"), &cid("CD002")).unwrap();
        ledger.record_vote(&e, &vid("V2"), &cid("CD002")).unwrap();
        ledger.record_vote(&e, &vid("V3"), &cid("CD001")).unwrap();

        let cands = vec![
            candidate("CD001", "C001"),
            candidate("CD002", "C001"),
            candidate("CD003", "C001"),
        ];
        let results = ledger.results(&e, &cands);
        assert_eq!(results.total_votes, 3);
        let order: Vec<&str> = results
            .candidates
            .iter()
            .map(|c| c.candidate_id.as_str())
            .collect();
        assert_eq!(order, vec!["CD002", "CD001", "CD003"]);
        assert_eq!(results.candidates[2].votes, 0);
    }

    #[test]
    fn leader_in_handles_ties_and_empty_seats() {
        let mut ledger = BallotLedger::new();
        let e = eid("current");
        ledger.record_vote(&e, &vid("V1"), &cid("A")).unwrap();
        ledger.record_vote(&e, &vid("V2"), &cid("B")).unwrap();
        ledger.record_vote(&e, &vid("V3"), &cid("C")).unwrap();
        ledger.record_vote(&e, &vid("V4"), &cid("C")).unwrap();

        let cands = vec![
            candidate("A", "S1"),
            candidate("B", "S1"),
            candidate("C", "S2"),
            candidate("D", "S3"),
        ];
        let results = ledger.results(&e, &cands);
        let s1 = Constituency::new("S1").unwrap();
        let s2 = Constituency::new("S2").unwrap();
        let s3 = Constituency::new("S3").unwrap();
        assert!(results.leader_in(&s1).is_none(), "tie has no leader");
        assert_eq!(results.leader_in(&s2).unwrap().candidate_id.as_str(), "C");
        assert!(results.leader_in(&s3).is_none(), "no votes has no leader");
    }
}
