//! # Receipt Service
//!
//! Creates and verifies vote receipts over a [`ReceiptStore`].
//!
//! ## Ordering
//!
//! The voting workflow records the ballot first and only then calls
//! [`ReceiptService::create_receipt`]. A receipt failure never affects the
//! recorded vote; callers log it and return the vote result without a code.
//!
//! ## Collision handling
//!
//! Verification codes live in a 32^6 space and are not unique by
//! construction. `create_receipt` draws a fresh receipt id and code for each
//! attempt and retries on [`StoreError::Duplicate`] up to `max_attempts`
//! times. Backend failures are not retried.

use std::sync::Arc;

use chrono::Utc;
use evote_core::{CandidateId, Constituency, ElectionId, VoterId};

use crate::error::{ReceiptError, StoreError};
use crate::generate::{
    generate_receipt_id, generate_verification_code, generate_vote_hash, is_well_formed_code,
};
use crate::model::{VerificationOutcome, VoteReceipt};
use crate::salt::ReceiptSalt;
use crate::store::ReceiptStore;

/// Default number of insert attempts before giving up on a receipt.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Receipt creation, verification and lookup.
#[derive(Clone)]
pub struct ReceiptService {
    store: Arc<dyn ReceiptStore>,
    salt: Arc<ReceiptSalt>,
    max_attempts: u32,
}

impl std::fmt::Debug for ReceiptService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiptService")
            .field("salt", &self.salt)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl ReceiptService {
    pub fn new(store: Arc<dyn ReceiptStore>, salt: ReceiptSalt) -> Self {
        Self {
            store,
            salt: Arc::new(salt),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override the number of insert attempts (minimum 1).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Access the underlying store.
    pub fn store(&self) -> &Arc<dyn ReceiptStore> {
        &self.store
    }

    /// Create and persist the receipt for one recorded ballot.
    ///
    /// # Errors
    ///
    /// [`ReceiptError::Persistence`] when the store fails or every attempt
    /// collided.
    pub async fn create_receipt(
        &self,
        voter_id: &VoterId,
        election_id: &ElectionId,
        constituency: &Constituency,
        candidate_id: &CandidateId,
    ) -> Result<VoteReceipt, ReceiptError> {
        let timestamp = Utc::now();
        let voter_id_hash = self.salt.hash_voter_id(voter_id.as_str());
        let vote_hash = generate_vote_hash(voter_id.as_str(), candidate_id.as_str(), &timestamp);

        for attempt in 1..=self.max_attempts {
            let receipt = VoteReceipt {
                receipt_id: generate_receipt_id(),
                voter_id_hash: voter_id_hash.clone(),
                election_id: election_id.as_str().to_string(),
                constituency: constituency.as_str().to_string(),
                vote_hash: vote_hash.clone(),
                verification_code: generate_verification_code(),
                timestamp,
                is_verified: false,
                verified_at: None,
            };

            match self.store.insert(&receipt).await {
                Ok(()) => {
                    tracing::debug!(
                        receipt_id = %receipt.receipt_id,
                        %election_id,
                        attempt,
                        "vote receipt created"
                    );
                    return Ok(receipt);
                }
                Err(StoreError::Duplicate { field }) => {
                    tracing::warn!(
                        %field,
                        attempt,
                        max_attempts = self.max_attempts,
                        "receipt key collision, regenerating"
                    );
                }
                Err(e @ StoreError::Backend(_)) => return Err(e.into()),
            }
        }

        Err(ReceiptError::Persistence(format!(
            "could not allocate a unique receipt after {} attempts",
            self.max_attempts
        )))
    }

    /// Verify a receipt by its verification code.
    ///
    /// The code is trimmed and uppercased before lookup. A code that cannot
    /// have been issued is answered without a store round trip. An unknown
    /// code yields `valid: false` and touches nothing. A known code marks the
    /// receipt verified (refreshing `verified_at` on every call).
    ///
    /// # Errors
    ///
    /// [`ReceiptError::Validation`] when the code is blank;
    /// [`ReceiptError::Persistence`] when the store fails.
    pub async fn verify_receipt(&self, code: &str) -> Result<VerificationOutcome, ReceiptError> {
        let normalized = code.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(ReceiptError::Validation(
                "verification_code is required".to_string(),
            ));
        }
        if !is_well_formed_code(&normalized) {
            return Ok(VerificationOutcome::invalid());
        }

        match self.store.mark_verified(&normalized, Utc::now()).await? {
            Some(receipt) => Ok(VerificationOutcome::verified(&receipt)),
            None => Ok(VerificationOutcome::invalid()),
        }
    }

    /// Fetch a receipt by its identifier.
    pub async fn get_by_receipt_id(
        &self,
        receipt_id: &str,
    ) -> Result<Option<VoteReceipt>, ReceiptError> {
        let receipt_id = receipt_id.trim();
        if receipt_id.is_empty() {
            return Ok(None);
        }
        Ok(self.store.find_by_receipt_id(receipt_id).await?)
    }
}
