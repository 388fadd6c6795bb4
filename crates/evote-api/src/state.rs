//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor.
//!
//! ## Architecture
//!
//! - **Registrations**: voters, candidates and parties in [`Store`]s keyed by
//!   their identifier string.
//! - **Elections**: lifecycle records in a [`Store`].
//! - **Ballots**: the [`BallotLedger`] behind a `tokio::sync::Mutex`. The
//!   cast-vote path holds it across the database write so that the
//!   "already voted" check, the election status check and the tally commit
//!   are one critical section.
//! - **Receipts**: the [`ReceiptService`] over either the in-memory or the
//!   Postgres receipt store.
//!
//! When a database pool is configured every write is persisted before the
//! in-memory store is updated, and [`AppState::hydrate_from_db`] reloads all
//! of it on startup.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use sqlx::PgPool;
use tokio::sync::Mutex;

use evote_core::{Candidate, Party, Voter};
use evote_receipt::{MemoryReceiptStore, ReceiptSalt, ReceiptService};
use evote_state::{BallotLedger, Election};

use crate::config::AppConfig;
use crate::middleware::metrics::ApiMetrics;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous. The lock is never held across `.await`.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<String, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: impl Into<String>, value: T) -> Option<T> {
        self.data.write().insert(id.into(), value)
    }

    /// Insert only if `id` is not present. Returns `false` if it was.
    pub fn insert_new(&self, id: impl Into<String>, value: T) -> bool {
        use std::collections::hash_map::Entry;
        match self.data.write().entry(id.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.data.read().contains_key(id)
    }

    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Atomically read-validate-update a record.
    ///
    /// Returns `None` if the record doesn't exist, or `Some(result)` with the
    /// closure's `Result`. The closure runs under the write lock.
    pub fn try_update<R, E>(
        &self,
        id: &str,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Application State --------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub voters: Store<Voter>,
    pub candidates: Store<Candidate>,
    pub parties: Store<Party>,
    pub elections: Store<Election>,

    /// Has-voted markers and tallies. Lock order: `ballots` before any
    /// `Store` write lock.
    pub ballots: Arc<Mutex<BallotLedger>>,

    pub receipts: ReceiptService,

    /// Prometheus registry shared with the HTTP metrics middleware.
    pub metrics: ApiMetrics,

    /// PostgreSQL pool for durable state. `None` means in-memory only.
    pub db_pool: Option<PgPool>,

    pub config: AppConfig,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("voters", &self.voters.len())
            .field("candidates", &self.candidates.len())
            .field("parties", &self.parties.len())
            .field("elections", &self.elections.len())
            .field("receipts", &self.receipts)
            .field("db", &self.db_pool.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl AppState {
    /// In-memory state with default configuration and a memory receipt store.
    pub fn new(salt: ReceiptSalt) -> Self {
        let receipts = ReceiptService::new(Arc::new(MemoryReceiptStore::new()), salt);
        Self::with_config(AppConfig::default(), receipts, None)
    }

    /// State with explicit configuration, receipt service and optional pool.
    pub fn with_config(
        config: AppConfig,
        receipts: ReceiptService,
        db_pool: Option<PgPool>,
    ) -> Self {
        Self {
            voters: Store::new(),
            candidates: Store::new(),
            parties: Store::new(),
            elections: Store::new(),
            ballots: Arc::new(Mutex::new(BallotLedger::new())),
            receipts: receipts.with_max_attempts(config.receipt_max_attempts),
            metrics: ApiMetrics::new(),
            db_pool,
            config,
        }
    }

    /// Load registrations, elections and the ballot ledger from the database.
    ///
    /// Called once on startup. Receipts are not loaded: the Postgres receipt
    /// store reads them on demand.
    pub async fn hydrate_from_db(&self) -> Result<(), sqlx::Error> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let voters = crate::db::registrations::load_voters(pool).await?;
        let voter_count = voters.len();
        for v in voters {
            self.voters.insert(v.voter_id.to_string(), v);
        }

        let parties = crate::db::registrations::load_parties(pool).await?;
        let party_count = parties.len();
        for p in parties {
            self.parties.insert(p.party_id.to_string(), p);
        }

        let candidates = crate::db::registrations::load_candidates(pool).await?;
        let candidate_count = candidates.len();
        for c in candidates {
            self.candidates.insert(c.candidate_id.to_string(), c);
        }

        let elections = crate::db::elections::load_all(pool).await?;
        let election_count = elections.len();
        for e in elections {
            self.elections.insert(e.election_id.to_string(), e);
        }

        let snapshot = crate::db::ballots::load_all(pool).await?;
        let ballot_count = snapshot.markers.len();
        {
            let mut ledger = self.ballots.lock().await;
            for (election, voter) in snapshot.markers {
                ledger.restore_marker(election, voter);
            }
            for (election, candidate, votes) in snapshot.tallies {
                ledger.restore_tally(election, candidate, votes);
            }
        }

        tracing::info!(
            voters = voter_count,
            parties = party_count,
            candidates = candidate_count,
            elections = election_count,
            ballots = ballot_count,
            "hydrated in-memory stores from database"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evote_core::{Constituency, VoterId};

    fn voter(id: &str) -> Voter {
        Voter::register(
            VoterId::new(id).unwrap(),
            "Test Voter".into(),
            Constituency::new("C001").unwrap(),
        )
    }

    #[test]
    fn store_insert_new_refuses_duplicates() {
        let store = Store::new();
        assert!(store.insert_new("V001", voter("V001")));
        assert!(!store.insert_new("V001", voter("V001")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn store_try_update_runs_under_lock() {
        let store = Store::new();
        store.insert("V001", voter("V001"));

        let first = store.try_update("V001", |v| v.approve());
        assert!(matches!(first, Some(Ok(()))));
        let second = store.try_update("V001", |v| v.approve());
        assert!(matches!(second, Some(Err(_))));
        assert!(store.try_update("V404", |v| v.approve()).is_none());
        assert!(store.get("V001").unwrap().is_eligible());
    }

    #[test]
    fn store_clone_shares_data() {
        let a: Store<Voter> = Store::new();
        let b = a.clone();
        a.insert("V001", voter("V001"));
        assert!(b.contains("V001"));
        assert!(!b.is_empty());
    }

    #[test]
    fn with_config_applies_receipt_attempts() {
        let salt = ReceiptSalt::new("state-test-salt-0123").unwrap();
        let receipts = ReceiptService::new(Arc::new(MemoryReceiptStore::new()), salt);
        let config = AppConfig {
            receipt_max_attempts: 2,
            ..AppConfig::default()
        };
        let state = AppState::with_config(config, receipts, None);
        assert!(format!("{:?}", state.receipts).contains("max_attempts: 2"));
        assert!(!format!("{state:?}").contains("state-test-salt"));
    }
}
