//! # Voter-Identity Salt
//!
//! The salt mixed into [`hash_voter_id`](crate::hash_voter_id) is the only
//! thing standing between a stored `voter_id_hash` and a dictionary attack
//! over the (small) voter-id space. It is therefore mandatory configuration:
//! there is no built-in default, and publicly-known legacy defaults are
//! refused.
//!
//! The value is zeroized on drop and redacted from `Debug` output.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::ReceiptError;
use crate::generate::hash_voter_id;

/// Environment variable the API reads the salt from.
pub const SALT_ENV_VAR: &str = "EVOTE_VOTER_SALT";

/// Minimum accepted salt length in bytes.
pub const MIN_SALT_LEN: usize = 16;

/// Literal defaults that have shipped in public code and must never be used.
const KNOWN_DEFAULTS: &[&str] = &["voting_salt", "changeme", "default_salt"];

/// Server-side secret salt for voter-identity hashing.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ReceiptSalt(String);

impl ReceiptSalt {
    /// Wrap a salt value after checking it is usable.
    ///
    /// # Errors
    ///
    /// [`ReceiptError::WeakSalt`] when the value is blank, shorter than
    /// [`MIN_SALT_LEN`] bytes once trimmed, or a known public default.
    pub fn new(value: impl Into<String>) -> Result<Self, ReceiptError> {
        let mut value = value.into();
        let meaningful = value.trim();
        let rejection = if meaningful.is_empty() {
            Some("salt is empty".to_string())
        } else if KNOWN_DEFAULTS
            .iter()
            .any(|d| d.eq_ignore_ascii_case(meaningful))
        {
            Some("salt is a publicly-known default value".to_string())
        } else if meaningful.len() < MIN_SALT_LEN {
            Some(format!(
                "salt must be at least {MIN_SALT_LEN} bytes once trimmed, got {}",
                meaningful.len()
            ))
        } else {
            None
        };

        match rejection {
            Some(reason) => {
                value.zeroize();
                Err(ReceiptError::WeakSalt(reason))
            }
            None => Ok(Self(value)),
        }
    }

    /// Read the salt from [`SALT_ENV_VAR`].
    ///
    /// # Errors
    ///
    /// [`ReceiptError::MissingSalt`] when the variable is unset or not valid
    /// UTF-8, otherwise any error from [`ReceiptSalt::new`].
    pub fn from_env() -> Result<Self, ReceiptError> {
        Self::from_env_var(SALT_ENV_VAR)
    }

    /// Read the salt from an arbitrary environment variable.
    pub fn from_env_var(var: &str) -> Result<Self, ReceiptError> {
        match std::env::var(var) {
            Ok(v) => Self::new(v),
            Err(_) => Err(ReceiptError::MissingSalt(var.to_string())),
        }
    }

    /// Hash a voter identifier with this salt.
    pub fn hash_voter_id(&self, voter_id: &str) -> String {
        hash_voter_id(voter_id, &self.0)
    }
}

impl std::fmt::Debug for ReceiptSalt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ReceiptSalt([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_long_random_salt() {
        assert!(ReceiptSalt::new("k3J9x-2mQp7Lw8Zt4Rv").is_ok());
    }

    #[test]
    fn rejects_empty_and_blank() {
        assert!(matches!(
            ReceiptSalt::new(""),
            Err(ReceiptError::WeakSalt(_))
        ));
        assert!(matches!(
            ReceiptSalt::new("                    "),
            Err(ReceiptError::WeakSalt(_))
        ));
    }

    #[test]
    fn rejects_legacy_default() {
        let err = ReceiptSalt::new("voting_salt").unwrap_err();
        assert!(err.to_string().contains("publicly-known"));
    }

    #[test]
    fn rejects_short_salt() {
        let err = ReceiptSalt::new("short").unwrap_err();
        assert!(err.to_string().contains("at least 16"));
    }

    #[test]
    fn padding_does_not_count_towards_length() {
        let err = ReceiptSalt::new("     short      ").unwrap_err();
        assert!(err.to_string().contains("got 5"));
        assert!(ReceiptSalt::new("  0123456789abcdef  ").is_ok());
    }

    #[test]
    fn missing_env_var_fails_loudly() {
        let err = ReceiptSalt::from_env_var("EVOTE_TEST_SALT_THAT_IS_NEVER_SET").unwrap_err();
        assert!(matches!(err, ReceiptError::MissingSalt(_)));
        assert!(err.to_string().contains("EVOTE_TEST_SALT_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn debug_is_redacted() {
        let salt = ReceiptSalt::new("super-secret-salt-value").unwrap();
        let dbg = format!("{salt:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("REDACTED"));
    }

    #[test]
    fn hash_matches_free_function() {
        let salt = ReceiptSalt::new("0123456789abcdef").unwrap();
        assert_eq!(
            salt.hash_voter_id("V001"),
            hash_voter_id("V001", "0123456789abcdef")
        );
    }
}
