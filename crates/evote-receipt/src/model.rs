//! # Receipt Records and External Views
//!
//! [`VoteReceipt`] is the stored record. It is never serialized to a client
//! directly: responses use [`ReceiptView`] or [`ReceiptDetail`], which carry a
//! truncated `vote_hash` and omit `voter_id_hash` and `verification_code`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of leading hex characters of `vote_hash` shown externally.
pub const VOTE_HASH_PREFIX_LEN: usize = 16;

/// Marker appended to a truncated hash.
pub const TRUNCATION_MARKER: &str = "...";

/// Message returned for an unknown verification code.
pub const INVALID_CODE_MESSAGE: &str = "Invalid verification code";

/// Message returned for a successful verification.
pub const VERIFIED_MESSAGE: &str = "Your vote has been recorded and verified";

/// Stored proof that one ballot was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub receipt_id: String,
    pub voter_id_hash: String,
    pub election_id: String,
    pub constituency: String,
    pub vote_hash: String,
    pub verification_code: String,
    pub timestamp: DateTime<Utc>,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
}

impl VoteReceipt {
    /// `vote_hash` cut to [`VOTE_HASH_PREFIX_LEN`] characters plus
    /// [`TRUNCATION_MARKER`].
    pub fn truncated_vote_hash(&self) -> String {
        truncate_hash(&self.vote_hash)
    }

    /// The partial view returned by verification.
    pub fn view(&self) -> ReceiptView {
        ReceiptView {
            receipt_id: self.receipt_id.clone(),
            timestamp: self.timestamp,
            constituency: self.constituency.clone(),
            vote_hash: self.truncated_vote_hash(),
        }
    }

    /// The support/debugging view returned by receipt-id lookup.
    pub fn detail(&self) -> ReceiptDetail {
        ReceiptDetail {
            receipt_id: self.receipt_id.clone(),
            election_id: self.election_id.clone(),
            constituency: self.constituency.clone(),
            timestamp: self.timestamp,
            vote_hash: self.truncated_vote_hash(),
            is_verified: self.is_verified,
            verified_at: self.verified_at,
        }
    }
}

/// Truncate a hex digest for display.
pub fn truncate_hash(hash: &str) -> String {
    let prefix: String = hash.chars().take(VOTE_HASH_PREFIX_LEN).collect();
    format!("{prefix}{TRUNCATION_MARKER}")
}

/// Receipt fields a voter sees after a successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptView {
    pub receipt_id: String,
    pub timestamp: DateTime<Utc>,
    pub constituency: String,
    /// Truncated: first 16 hex characters followed by `...`.
    pub vote_hash: String,
}

/// Receipt fields returned by lookup on `receipt_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptDetail {
    pub receipt_id: String,
    pub election_id: String,
    pub constituency: String,
    pub timestamp: DateTime<Utc>,
    /// Truncated: first 16 hex characters followed by `...`.
    pub vote_hash: String,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
}

/// Result of a verification-code lookup.
///
/// An unknown code is an expected outcome, not an error: `valid` is `false`
/// and `receipt` is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub valid: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ReceiptView>,
}

impl VerificationOutcome {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            message: INVALID_CODE_MESSAGE.to_string(),
            receipt: None,
        }
    }

    pub fn verified(receipt: &VoteReceipt) -> Self {
        Self {
            valid: true,
            message: VERIFIED_MESSAGE.to_string(),
            receipt: Some(receipt.view()),
        }
    }
}
