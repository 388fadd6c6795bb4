//! # evote-receipt: Anonymous Vote Receipts
//!
//! A vote receipt is a one-way, unlinkable proof that a ballot was recorded.
//! The voter keeps a short verification code; anyone holding that code can
//! confirm the receipt exists without learning who voted or for whom.
//!
//! ## What is stored
//!
//! | Field | Derivation | Reversible? |
//! |-------|-----------|-------------|
//! | `receipt_id` | `VR-<unix millis>-<8 hex>` | n/a (random) |
//! | `voter_id_hash` | `SHA-256(voter_id ‖ salt)` | only with the server salt |
//! | `vote_hash` | `SHA-256(voter ‖ candidate ‖ timestamp ‖ nonce)` | no, nonce is discarded |
//! | `verification_code` | 6 chars from a 32-char unambiguous alphabet | n/a (random) |
//!
//! ## Guarantees
//!
//! - The full `vote_hash` never leaves the service: external views carry a
//!   16-hex-character prefix only ([`ReceiptView`]).
//! - `receipt_id` and `verification_code` uniqueness is enforced by the
//!   [`ReceiptStore`]; [`ReceiptService::create_receipt`] retries with fresh
//!   values on collision, up to a bounded number of attempts.
//! - The salt is mandatory configuration. There is no default value.

pub mod error;
pub mod generate;
pub mod model;
pub mod salt;
pub mod service;
pub mod store;

pub use error::{ReceiptError, StoreError, UniqueField};
pub use generate::{
    generate_receipt_id, generate_verification_code, generate_vote_hash, hash_voter_id,
    is_well_formed_code, VERIFICATION_CODE_ALPHABET, VERIFICATION_CODE_LEN,
};
pub use model::{ReceiptDetail, ReceiptView, VerificationOutcome, VoteReceipt};
pub use salt::ReceiptSalt;
pub use service::{ReceiptService, DEFAULT_MAX_ATTEMPTS};
pub use store::{MemoryReceiptStore, ReceiptStore};
