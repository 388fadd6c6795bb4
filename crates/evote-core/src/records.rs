//! # Registration Records
//!
//! Typed records for the participants of an election. Required and optional
//! fields are explicit, and every enumerated string (status, role) is a closed
//! enum with a canonical `SCREAMING_SNAKE_CASE` wire form.
//!
//! ## Moderation
//!
//! Voters, parties and candidates register in [`ApprovalStatus::Pending`] and
//! are moderated by an administrator exactly once:
//!
//! ```text
//! Pending ──approve──▶ Approved
//!    │
//!    └────reject────▶ Rejected
//! ```
//!
//! Only approved voters may cast a ballot and only approved candidates may
//! receive one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModerationError;
use crate::identity::{CandidateId, Constituency, PartyId, VoterId};

/// Admin moderation status of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    /// Awaiting admin review.
    Pending,
    /// Accepted by an admin.
    Approved,
    /// Refused by an admin. Terminal.
    Rejected,
}

impl ApprovalStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Parse the canonical string name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of an authenticated principal. Voters and candidates act through
/// the public routes and never authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
        }
    }
}

/// Apply a moderation decision to a status field.
fn moderate(
    kind: &'static str,
    id: &str,
    status: &mut ApprovalStatus,
    decision: ApprovalStatus,
) -> Result<(), ModerationError> {
    if *status != ApprovalStatus::Pending {
        return Err(ModerationError::AlreadyModerated {
            kind,
            id: id.to_string(),
            status: *status,
        });
    }
    *status = decision;
    Ok(())
}

/// A registered voter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voter {
    pub voter_id: VoterId,
    pub full_name: String,
    pub constituency: Constituency,
    pub status: ApprovalStatus,
    pub registered_at: DateTime<Utc>,
}

impl Voter {
    /// Register a new voter in `Pending` status.
    pub fn register(voter_id: VoterId, full_name: String, constituency: Constituency) -> Self {
        Self {
            voter_id,
            full_name,
            constituency,
            status: ApprovalStatus::Pending,
            registered_at: Utc::now(),
        }
    }

    /// Whether this voter may cast a ballot.
    pub fn is_eligible(&self) -> bool {
        self.status == ApprovalStatus::Approved
    }

    pub fn approve(&mut self) -> Result<(), ModerationError> {
        moderate("voter", self.voter_id.as_str(), &mut self.status, ApprovalStatus::Approved)
    }

    pub fn reject(&mut self) -> Result<(), ModerationError> {
        moderate("voter", self.voter_id.as_str(), &mut self.status, ApprovalStatus::Rejected)
    }
}

/// A registered political party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Party {
    pub party_id: PartyId,
    pub name: String,
    /// Ballot symbol shown next to the party's candidates.
    pub symbol: Option<String>,
    pub status: ApprovalStatus,
    pub registered_at: DateTime<Utc>,
}

impl Party {
    pub fn register(party_id: PartyId, name: String, symbol: Option<String>) -> Self {
        Self {
            party_id,
            name,
            symbol,
            status: ApprovalStatus::Pending,
            registered_at: Utc::now(),
        }
    }

    pub fn approve(&mut self) -> Result<(), ModerationError> {
        moderate("party", self.party_id.as_str(), &mut self.status, ApprovalStatus::Approved)
    }

    pub fn reject(&mut self) -> Result<(), ModerationError> {
        moderate("party", self.party_id.as_str(), &mut self.status, ApprovalStatus::Rejected)
    }
}

/// A registered candidate standing in one constituency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub candidate_id: CandidateId,
    pub full_name: String,
    /// `None` for independent candidates.
    pub party_id: Option<PartyId>,
    pub constituency: Constituency,
    pub status: ApprovalStatus,
    pub registered_at: DateTime<Utc>,
}

impl Candidate {
    pub fn register(
        candidate_id: CandidateId,
        full_name: String,
        party_id: Option<PartyId>,
        constituency: Constituency,
    ) -> Self {
        Self {
            candidate_id,
            full_name,
            party_id,
            constituency,
            status: ApprovalStatus::Pending,
            registered_at: Utc::now(),
        }
    }

    /// Whether a voter registered in `constituency` may vote for this candidate.
    pub fn is_on_ballot_for(&self, constituency: &Constituency) -> bool {
        self.status == ApprovalStatus::Approved && &self.constituency == constituency
    }

    pub fn approve(&mut self) -> Result<(), ModerationError> {
        moderate(
            "candidate",
            self.candidate_id.as_str(),
            &mut self.status,
            ApprovalStatus::Approved,
        )
    }

    pub fn reject(&mut self) -> Result<(), ModerationError> {
        moderate(
            "candidate",
            self.candidate_id.as_str(),
            &mut self.status,
            ApprovalStatus::Rejected,
        )
    }
}
