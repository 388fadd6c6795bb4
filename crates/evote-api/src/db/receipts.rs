//! Postgres-backed [`ReceiptStore`].
//!
//! Uniqueness of `receipt_id` and `verification_code` is enforced by the
//! `vote_receipts` table constraints. A unique violation is reported as
//! [`StoreError::Duplicate`] naming the colliding key so that the receipt
//! service can regenerate and retry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use evote_receipt::{ReceiptStore, StoreError, UniqueField, VoteReceipt};

const VERIFICATION_CODE_CONSTRAINT: &str = "vote_receipts_verification_code_key";

const RECEIPT_COLUMNS: &str = "receipt_id, voter_id_hash, election_id, constituency, vote_hash, \
                               verification_code, created_at, is_verified, verified_at";

#[derive(Debug, Clone)]
pub struct PgReceiptStore {
    pool: PgPool,
}

impl PgReceiptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a driver error to a store error, recognising unique violations.
fn store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Duplicate {
                field: unique_field(db.constraint()),
            };
        }
    }
    StoreError::Backend(err.to_string())
}

fn unique_field(constraint: Option<&str>) -> UniqueField {
    match constraint {
        Some(VERIFICATION_CODE_CONSTRAINT) => UniqueField::VerificationCode,
        _ => UniqueField::ReceiptId,
    }
}

#[async_trait]
impl ReceiptStore for PgReceiptStore {
    async fn insert(&self, receipt: &VoteReceipt) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO vote_receipts (receipt_id, voter_id_hash, election_id, constituency,
                                        vote_hash, verification_code, created_at, is_verified, verified_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&receipt.receipt_id)
        .bind(&receipt.voter_id_hash)
        .bind(&receipt.election_id)
        .bind(&receipt.constituency)
        .bind(&receipt.vote_hash)
        .bind(&receipt.verification_code)
        .bind(receipt.timestamp)
        .bind(receipt.is_verified)
        .bind(receipt.verified_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn find_by_receipt_id(
        &self,
        receipt_id: &str,
    ) -> Result<Option<VoteReceipt>, StoreError> {
        let row = sqlx::query_as::<_, ReceiptRow>(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM vote_receipts WHERE receipt_id = $1"
        ))
        .bind(receipt_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(row.map(ReceiptRow::into_record))
    }

    async fn mark_verified(
        &self,
        code: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<VoteReceipt>, StoreError> {
        let row = sqlx::query_as::<_, ReceiptRow>(&format!(
            "UPDATE vote_receipts SET is_verified = TRUE, verified_at = $2
             WHERE verification_code = $1
             RETURNING {RECEIPT_COLUMNS}"
        ))
        .bind(code)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(row.map(ReceiptRow::into_record))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vote_receipts")
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(n.max(0) as u64)
    }
}

#[derive(sqlx::FromRow)]
struct ReceiptRow {
    receipt_id: String,
    voter_id_hash: String,
    election_id: String,
    constituency: String,
    vote_hash: String,
    verification_code: String,
    created_at: DateTime<Utc>,
    is_verified: bool,
    verified_at: Option<DateTime<Utc>>,
}

impl ReceiptRow {
    fn into_record(self) -> VoteReceipt {
        VoteReceipt {
            receipt_id: self.receipt_id,
            voter_id_hash: self.voter_id_hash,
            election_id: self.election_id,
            constituency: self.constituency,
            vote_hash: self.vote_hash,
            verification_code: self.verification_code,
            timestamp: self.created_at,
            is_verified: self.is_verified,
            verified_at: self.verified_at,
        }
    }
}
