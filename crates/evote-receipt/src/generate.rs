//! # Receipt Identifiers and Digests
//!
//! Pure generation functions. All randomness comes from the operating system
//! CSPRNG via [`rand_core::OsRng`]; nothing here uses a counter or a seeded
//! generator.

use chrono::{DateTime, SecondsFormat, Utc};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Prefix of every receipt identifier.
pub const RECEIPT_ID_PREFIX: &str = "VR";

/// Verification code alphabet: `A-Z` without `I` and `O`, digits `2-9`.
///
/// Exactly 32 symbols so that one random byte masked to 5 bits selects a
/// symbol uniformly.
pub const VERIFICATION_CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of a verification code.
pub const VERIFICATION_CODE_LEN: usize = 6;

/// Bytes of nonce mixed into every vote hash.
const VOTE_NONCE_LEN: usize = 16;

/// Generate a receipt identifier: `VR-<unix millis>-<8 uppercase hex>`.
///
/// The suffix is 32 bits of OS randomness, so two receipts created in the
/// same millisecond collide with probability 2^-32. The store still rejects
/// duplicates.
pub fn generate_receipt_id() -> String {
    let mut suffix = [0u8; 4];
    OsRng.fill_bytes(&mut suffix);
    format!(
        "{RECEIPT_ID_PREFIX}-{}-{}",
        Utc::now().timestamp_millis(),
        hex::encode_upper(suffix)
    )
}

/// Generate a 6-character verification code.
///
/// Each character is drawn independently and uniformly from
/// [`VERIFICATION_CODE_ALPHABET`]. Codes are not unique by construction.
pub fn generate_verification_code() -> String {
    let mut bytes = [0u8; VERIFICATION_CODE_LEN];
    OsRng.fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| VERIFICATION_CODE_ALPHABET[(b & 0x1f) as usize] as char)
        .collect()
}

/// Whether `code` has the shape of a verification code.
pub fn is_well_formed_code(code: &str) -> bool {
    code.len() == VERIFICATION_CODE_LEN
        && code.bytes().all(|b| VERIFICATION_CODE_ALPHABET.contains(&b))
}

/// One-way digest of a voter identifier: lowercase hex `SHA-256(voter_id ‖ salt)`.
///
/// Deterministic for a given salt. All hashes in one deployment share the
/// salt, so the same voter hashes identically across elections until the
/// salt is rotated.
pub fn hash_voter_id(voter_id: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(voter_id.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Commitment digest of a single vote.
///
/// Lowercase hex `SHA-256(voter_id | candidate_id | timestamp | nonce)` where
/// `nonce` is 128 bits of fresh OS randomness that is dropped on return.
/// Two calls with identical arguments yield different digests, and the
/// candidate cannot be recovered by hashing every candidate on the ballot.
pub fn generate_vote_hash(
    voter_id: &str,
    candidate_id: &str,
    timestamp: &DateTime<Utc>,
) -> String {
    let mut nonce = [0u8; VOTE_NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let mut hasher = Sha256::new();
    hasher.update(voter_id.as_bytes());
    hasher.update(b"|");
    hasher.update(candidate_id.as_bytes());
    hasher.update(b"|");
    hasher.update(
        timestamp
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .as_bytes(),
    );
    hasher.update(b"|");
    hasher.update(hex::encode(nonce).as_bytes());
    hex::encode(hasher.finalize())
}
