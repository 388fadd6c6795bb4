//! # evote-state: Election State Machines
//!
//! ## Election lifecycle ([`election`])
//!
//! ```text
//! Draft ──▶ Scheduled ──▶ Active ──▶ Completed
//!   │           │           │
//!   └───────────┴───────────┴──────▶ Cancelled
//! ```
//!
//! The status is a single persisted enum with an explicit transition table,
//! replacing ad hoc "is running" / "results published" booleans mutated from
//! multiple places. Every transition is appended to a [`TransitionRecord`] log.
//!
//! ## Ballot ledger ([`ballot`])
//!
//! Records which voters have voted in which election and keeps per-candidate
//! tallies. The ledger is the authoritative vote write: receipt generation
//! happens strictly after a successful [`BallotLedger::record_vote`].

pub mod ballot;
pub mod election;

pub use ballot::{BallotError, BallotLedger, CandidateTally, ElectionResults};
pub use election::{Election, ElectionError, ElectionStatus, TransitionRecord};
