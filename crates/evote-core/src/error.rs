//! # Error Types
//!
//! Validation and moderation errors shared across the workspace. All errors
//! use `thiserror` and carry the offending value so that API responses can
//! explain exactly what was rejected.

use thiserror::Error;

use crate::records::ApprovalStatus;

/// Input failed format validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An identifier did not match the allowed character set or length.
    #[error("invalid {kind}: {value:?} (expected 1-{max} ASCII letters, digits, '-' or '_')")]
    InvalidIdentifier {
        /// Which identifier kind was being parsed (e.g. "voter id").
        kind: &'static str,
        /// The rejected raw value.
        value: String,
        /// Maximum permitted length.
        max: usize,
    },

    /// A required text field was empty or whitespace only.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// A text field exceeded its maximum length.
    #[error("{field} must not exceed {max} characters")]
    FieldTooLong {
        /// Field name.
        field: &'static str,
        /// Maximum permitted length.
        max: usize,
    },
}

/// Admin moderation was attempted on a record that is no longer pending.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModerationError {
    /// Approval and rejection are one-shot decisions.
    #[error("{kind} {id} has already been moderated (status: {status})")]
    AlreadyModerated {
        /// Record kind ("voter", "party", "candidate").
        kind: &'static str,
        /// Record identifier.
        id: String,
        /// The status the record already holds.
        status: ApprovalStatus,
    },
}

/// Validate a free-text field: trimmed non-empty and at most `max` characters.
pub fn validate_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    if value.chars().count() > max {
        return Err(ValidationError::FieldTooLong { field, max });
    }
    Ok(())
}
