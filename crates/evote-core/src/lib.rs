//! # evote-core: Foundational Types
//!
//! Shared vocabulary for every other crate in the workspace:
//!
//! - **Identifiers** ([`identity`]): `VoterId`, `CandidateId`, `PartyId`,
//!   `ElectionId` and `Constituency`. Each is a distinct newtype validated at
//!   construction, so a candidate id can never be passed where a voter id is
//!   expected.
//! - **Registration records** ([`records`]): typed `Voter`, `Party` and
//!   `Candidate` records with an explicit [`ApprovalStatus`] replacing the
//!   free-form status strings of a schemaless document store.
//! - **Errors** ([`error`]): [`ValidationError`] and [`ModerationError`].
//!
//! ## Crate Policy
//!
//! - No I/O, no async, no storage. Pure data and validation.
//! - Sits at the bottom of the dependency DAG.

pub mod error;
pub mod identity;
pub mod records;

pub use error::{validate_text, ModerationError, ValidationError};
pub use identity::{CandidateId, Constituency, ElectionId, PartyId, VoterId};
pub use records::{ApprovalStatus, Candidate, Party, Role, Voter};
