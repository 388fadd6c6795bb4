//! # Receipt Storage
//!
//! [`ReceiptStore`] is the persistence seam of the receipt service. Backends
//! must enforce uniqueness of both `receipt_id` and `verification_code` and
//! report a collision as [`StoreError::Duplicate`] without writing anything.
//! Silent overwrite is never acceptable.
//!
//! [`MemoryReceiptStore`] is the in-process backend used in development and
//! tests. The Postgres backend lives in `evote-api::db::receipts`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::{StoreError, UniqueField};
use crate::model::VoteReceipt;

/// Persistence operations needed by [`ReceiptService`](crate::ReceiptService).
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    /// Insert a new receipt.
    ///
    /// Fails with [`StoreError::Duplicate`] if either unique key exists.
    async fn insert(&self, receipt: &VoteReceipt) -> Result<(), StoreError>;

    /// Look up a receipt by its identifier.
    async fn find_by_receipt_id(&self, receipt_id: &str) -> Result<Option<VoteReceipt>, StoreError>;

    /// Set `is_verified = true` and `verified_at = at` on the receipt with
    /// this code and return the updated record. Returns `Ok(None)` and
    /// writes nothing when the code is unknown.
    async fn mark_verified(
        &self,
        code: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<VoteReceipt>, StoreError>;

    /// Number of stored receipts.
    async fn count(&self) -> Result<u64, StoreError>;
}

#[derive(Default)]
struct Indexes {
    by_id: HashMap<String, VoteReceipt>,
    /// verification_code -> receipt_id
    by_code: HashMap<String, String>,
}

/// In-memory receipt store.
///
/// Both indexes live behind one lock so the two uniqueness checks and the
/// insert are a single atomic step.
#[derive(Default)]
pub struct MemoryReceiptStore {
    inner: RwLock<Indexes>,
}

impl MemoryReceiptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for MemoryReceiptStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryReceiptStore")
            .field("receipts", &self.inner.read().by_id.len())
            .finish()
    }
}

#[async_trait]
impl ReceiptStore for MemoryReceiptStore {
    async fn insert(&self, receipt: &VoteReceipt) -> Result<(), StoreError> {
        let mut idx = self.inner.write();
        if idx.by_id.contains_key(&receipt.receipt_id) {
            return Err(StoreError::Duplicate {
                field: UniqueField::ReceiptId,
            });
        }
        if idx.by_code.contains_key(&receipt.verification_code) {
            return Err(StoreError::Duplicate {
                field: UniqueField::VerificationCode,
            });
        }
        idx.by_code.insert(receipt.verification_code.clone(), receipt.receipt_id.clone());
        idx.by_id.insert(receipt.receipt_id.clone(), receipt.clone());
        Ok(())
    }

    async fn find_by_receipt_id(
        &self,
        receipt_id: &str,
    ) -> Result<Option<VoteReceipt>, StoreError> {
        Ok(self.inner.read().by_id.get(receipt_id).cloned())
    }

    async fn mark_verified(
        &self,
        code: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<VoteReceipt>, StoreError> {
        let mut idx = self.inner.write();
        let Some(id) = idx.by_code.get(code).cloned() else {
            return Ok(None);
        };
        Ok(idx.by_id.get_mut(&id).map(|r| {
            r.is_verified = true;
            r.verified_at = Some(at);
            r.clone()
        }))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.inner.read().by_id.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl MemoryReceiptStore {
        fn id_for_code(&self, code: &str) -> Option<String> {
            self.inner.read().by_code.get(code).cloned()
        }
    }

    fn receipt(id: &str, code: &str) -> VoteReceipt {
        VoteReceipt {
            receipt_id: id.to_string(),
            voter_id_hash: "a".repeat(64),
            election_id: "current".into(),
            constituency: "C001".into(),
            vote_hash: "b".repeat(64),
            verification_code: code.to_string(),
            timestamp: Utc::now(),
            is_verified: false,
            verified_at: None,
        }
    }

    #[tokio::test]
    async fn insert_then_find_by_both_keys() {
        let store = MemoryReceiptStore::new();
        store.insert(&receipt("VR-1-AAAAAAAA", "ABC234")).await.unwrap();
        assert_eq!(store.id_for_code("ABC234").as_deref(), Some("VR-1-AAAAAAAA"));
        assert!(store
            .find_by_receipt_id("VR-1-AAAAAAAA")
            .await
            .unwrap()
            .is_some());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected_not_overwritten() {
        let store = MemoryReceiptStore::new();
        store.insert(&receipt("VR-1-AAAAAAAA", "ABC234")).await.unwrap();
        let err = store
            .insert(&receipt("VR-2-BBBBBBBB", "ABC234"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Duplicate {
                field: UniqueField::VerificationCode
            }
        );
        assert_eq!(store.id_for_code("ABC234").as_deref(), Some("VR-1-AAAAAAAA"));
        assert!(store
            .find_by_receipt_id("VR-2-BBBBBBBB")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_receipt_id_is_rejected() {
        let store = MemoryReceiptStore::new();
        store.insert(&receipt("VR-1-AAAAAAAA", "ABC234")).await.unwrap();
        let err = store
            .insert(&receipt("VR-1-AAAAAAAA", "XYZ789"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Duplicate {
                field: UniqueField::ReceiptId
            }
        );
        // The rejected code must not be left dangling in the code index.
        assert!(store.id_for_code("XYZ789").is_none());
    }

    #[tokio::test]
    async fn mark_verified_unknown_code_writes_nothing() {
        let store = MemoryReceiptStore::new();
        store.insert(&receipt("VR-1-AAAAAAAA", "ABC234")).await.unwrap();
        assert!(store
            .mark_verified("ZZZZZZ", Utc::now())
            .await
            .unwrap()
            .is_none());
        let r = store
            .find_by_receipt_id("VR-1-AAAAAAAA")
            .await
            .unwrap()
            .unwrap();
        assert!(!r.is_verified);
        assert!(r.verified_at.is_none());
    }

    #[tokio::test]
    async fn mark_verified_sets_flag_and_timestamp() {
        let store = MemoryReceiptStore::new();
        store.insert(&receipt("VR-1-AAAAAAAA", "ABC234")).await.unwrap();
        let at = Utc::now();
        let r = store.mark_verified("ABC234", at).await.unwrap().unwrap();
        assert!(r.is_verified);
        assert_eq!(r.verified_at, Some(at));
    }
}
