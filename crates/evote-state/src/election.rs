//! # Election Lifecycle
//!
//! An election moves through five states. `Completed` and `Cancelled` are
//! terminal. Votes are accepted only while `Active`; results are published
//! only once `Completed`.
//!
//! Transitions are validated against [`ElectionStatus::valid_transitions`]
//! and recorded in the election's transition log with a timestamp and an
//! optional operator-supplied reason.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use evote_core::ElectionId;

// ── Election Status ──────────────────────────────────────────────────

/// Lifecycle state of an election.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElectionStatus {
    /// Being configured. Candidates may still be added.
    Draft,
    /// Configuration frozen, polling not yet open.
    Scheduled,
    /// Polling open. The only state in which ballots are accepted.
    Active,
    /// Polling closed, results published. Terminal.
    Completed,
    /// Abandoned before completion. Terminal.
    Cancelled,
}

impl ElectionStatus {
    /// The canonical string name of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Scheduled => "SCHEDULED",
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parse the canonical string name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "SCHEDULED" => Some(Self::Scheduled),
            "ACTIVE" => Some(Self::Active),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether this is a terminal state (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// States reachable from this one in a single transition.
    ///
    /// No wildcard arm: adding a variant must force a decision here.
    pub fn valid_transitions(&self) -> &'static [ElectionStatus] {
        match self {
            Self::Draft => &[Self::Scheduled, Self::Cancelled],
            Self::Scheduled => &[Self::Active, Self::Cancelled],
            Self::Active => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    /// Whether ballots may be cast in this state.
    pub fn accepts_votes(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether results may be published in this state.
    pub fn results_published(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for ElectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Errors ───────────────────────────────────────────────────────────

/// Errors from election lifecycle operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElectionError {
    /// The election is in a terminal state.
    #[error("election {id} is in terminal state {state}")]
    AlreadyTerminal {
        id: ElectionId,
        state: ElectionStatus,
    },

    /// The requested transition is not in the transition table.
    #[error("invalid election transition from {from} to {to}")]
    InvalidTransition {
        from: ElectionStatus,
        to: ElectionStatus,
    },
}

// ── Election ─────────────────────────────────────────────────────────

/// One entry of the election's transition log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: ElectionStatus,
    pub to: ElectionStatus,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// An election and its lifecycle history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Election {
    pub election_id: ElectionId,
    pub name: String,
    pub status: ElectionStatus,
    pub transition_log: Vec<TransitionRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Election {
    /// Create a new election in `Draft`.
    pub fn new(election_id: ElectionId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            election_id,
            name: name.into(),
            status: ElectionStatus::Draft,
            transition_log: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the election to `to`, appending to the transition log.
    ///
    /// # Errors
    ///
    /// [`ElectionError::AlreadyTerminal`] if the election is completed or
    /// cancelled; [`ElectionError::InvalidTransition`] if `to` is not
    /// reachable from the current state.
    pub fn transition(
        &mut self,
        to: ElectionStatus,
        reason: Option<String>,
    ) -> Result<&TransitionRecord, ElectionError> {
        let from = self.status;
        if from.is_terminal() {
            return Err(ElectionError::AlreadyTerminal {
                id: self.election_id.clone(),
                state: from,
            });
        }
        if !from.valid_transitions().contains(&to) {
            return Err(ElectionError::InvalidTransition { from, to });
        }

        let now = Utc::now();
        self.status = to;
        self.updated_at = now;
        self.transition_log.push(TransitionRecord {
            from,
            to,
            at: now,
            reason,
        });
        // Just pushed, so the log is non-empty.
        Ok(&self.transition_log[self.transition_log.len() - 1])
    }
}
