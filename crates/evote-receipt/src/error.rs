//! # Receipt Error Types

use thiserror::Error;

/// Which unique key an insert collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    ReceiptId,
    VerificationCode,
}

impl std::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReceiptId => f.write_str("receipt_id"),
            Self::VerificationCode => f.write_str("verification_code"),
        }
    }
}

/// Errors reported by a [`ReceiptStore`](crate::ReceiptStore) backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A record with the same unique key already exists. Nothing was written.
    #[error("duplicate {field}")]
    Duplicate { field: UniqueField },

    /// The backend failed (connection lost, query error, ...).
    #[error("receipt store backend error: {0}")]
    Backend(String),
}

/// Errors from [`ReceiptService`](crate::ReceiptService) operations.
#[derive(Error, Debug)]
pub enum ReceiptError {
    /// Caller input was missing or malformed. No state was changed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The receipt could not be written or read.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The voter-identity salt is not configured.
    #[error("voter-identity salt is not configured (set {0})")]
    MissingSalt(String),

    /// The configured salt is empty, too short, or a publicly-known default.
    #[error("voter-identity salt rejected: {0}")]
    WeakSalt(String),
}

impl From<StoreError> for ReceiptError {
    fn from(err: StoreError) -> Self {
        Self::Persistence(err.to_string())
    }
}
