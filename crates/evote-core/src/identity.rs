//! # Identifier Newtypes
//!
//! Domain-primitive newtypes for the identifiers that flow through the voting
//! workflow. Each identifier is a distinct type: a [`CandidateId`] cannot be
//! passed where a [`VoterId`] is expected.
//!
//! ## Format
//!
//! All identifiers share one format, validated at construction and at
//! deserialization time:
//!
//! - 1 to 64 characters
//! - ASCII letters, digits, `-` and `_` only
//!
//! Identifiers are case-sensitive and stored exactly as supplied
//! (`"V001"`, `"CD002"`, `"C001"`, `"current"`).

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum identifier length in characters.
pub const MAX_IDENTIFIER_LEN: usize = 64;

fn is_valid_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_IDENTIFIER_LEN
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Declare a validated string identifier newtype.
///
/// Deserialization routes through `new()` so that invalid values are rejected
/// at the serde boundary rather than silently accepted.
macro_rules! string_identifier {
    ($(#[$meta:meta])* $ty:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $ty(String);

        impl $ty {
            /// Create the identifier, validating its format.
            ///
            /// # Errors
            ///
            /// Returns [`ValidationError::InvalidIdentifier`] if the value is
            /// empty, too long, or contains characters outside `[A-Za-z0-9_-]`.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let s = value.into();
                if !is_valid_identifier(&s) {
                    return Err(ValidationError::InvalidIdentifier {
                        kind: $kind,
                        value: s,
                        max: MAX_IDENTIFIER_LEN,
                    });
                }
                Ok(Self(s))
            }

            /// Access the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the identifier, returning the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

string_identifier!(
    /// Identifier of a registered voter (e.g. `"V001"`).
    ///
    /// This value is never persisted alongside a receipt; receipts only carry
    /// a salted one-way hash of it.
    VoterId,
    "voter id"
);

string_identifier!(
    /// Identifier of a registered candidate (e.g. `"CD002"`).
    CandidateId,
    "candidate id"
);

string_identifier!(
    /// Identifier of a registered political party.
    PartyId,
    "party id"
);

string_identifier!(
    /// Identifier of an election (e.g. `"current"`, `"general-2026"`).
    ElectionId,
    "election id"
);

string_identifier!(
    /// Code of an electoral constituency (e.g. `"C001"`).
    Constituency,
    "constituency"
);
