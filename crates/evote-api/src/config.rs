//! # Process Configuration
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `EVOTE_PORT` | `8080` | HTTP listen port |
//! | `EVOTE_ADMIN_TOKEN` | unset | Bearer token for `/admin/*`; unset disables admin auth |
//! | `EVOTE_RECEIPT_MAX_ATTEMPTS` | `5` | Insert attempts per receipt before giving up |
//! | `EVOTE_VOTER_SALT` | required | Voter-identity salt, read by `ReceiptSalt::from_env` |
//! | `DATABASE_URL` | unset | Postgres URL, read by `db::init_pool` |

use thiserror::Error;

use evote_receipt::DEFAULT_MAX_ATTEMPTS;

use crate::auth::SecretString;

pub const PORT_ENV_VAR: &str = "EVOTE_PORT";
pub const ADMIN_TOKEN_ENV_VAR: &str = "EVOTE_ADMIN_TOKEN";
pub const MAX_ATTEMPTS_ENV_VAR: &str = "EVOTE_RECEIPT_MAX_ATTEMPTS";

const DEFAULT_PORT: u16 = 8080;

/// A configuration variable was present but unusable.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer token for the admin surface. `None` disables admin auth.
    pub auth_token: Option<SecretString>,
    /// Insert attempts per receipt on unique-key collisions.
    pub receipt_max_attempts: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            auth_token: None,
            receipt_max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl AppConfig {
    /// Build configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup(PORT_ENV_VAR) {
            Some(v) => v.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                var: PORT_ENV_VAR,
                expected: "a port number",
                value: v.clone(),
            })?,
            None => DEFAULT_PORT,
        };

        let auth_token = lookup(ADMIN_TOKEN_ENV_VAR)
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::new);

        let receipt_max_attempts = match lookup(MAX_ATTEMPTS_ENV_VAR) {
            Some(v) => match v.trim().parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: MAX_ATTEMPTS_ENV_VAR,
                        expected: "a positive integer",
                        value: v,
                    })
                }
            },
            None => DEFAULT_MAX_ATTEMPTS,
        };

        Ok(Self {
            port,
            auth_token,
            receipt_max_attempts,
        })
    }
}
