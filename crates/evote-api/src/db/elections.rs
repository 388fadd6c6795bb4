//! Election persistence.
//!
//! State machine constraints are enforced by [`Election::transition`], not
//! in SQL. [`update_state`] additionally guards on the previous status so a
//! stale in-memory copy can never overwrite a newer row.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use evote_core::ElectionId;
use evote_state::{Election, ElectionStatus, TransitionRecord};

use super::corrupt;

pub async fn insert(pool: &PgPool, election: &Election) -> Result<(), sqlx::Error> {
    let transition_log = serde_json::to_value(&election.transition_log)
        .map_err(|e| sqlx::Error::Protocol(format!("failed to serialize transition_log: {e}")))?;

    sqlx::query(
        "INSERT INTO elections (election_id, name, status, transition_log, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(election.election_id.as_str())
    .bind(&election.name)
    .bind(election.status.as_str())
    .bind(&transition_log)
    .bind(election.created_at)
    .bind(election.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist a transition from `previous` to the election's current status.
///
/// Returns `false` if the stored row was no longer in `previous`.
pub async fn update_state(
    pool: &PgPool,
    election: &Election,
    previous: ElectionStatus,
) -> Result<bool, sqlx::Error> {
    let log_json = serde_json::to_value(&election.transition_log)
        .map_err(|e| sqlx::Error::Protocol(format!("failed to serialize transition_log: {e}")))?;

    let result = sqlx::query(
        "UPDATE elections SET status = $1, transition_log = $2, updated_at = $3
         WHERE election_id = $4 AND status = $5",
    )
    .bind(election.status.as_str())
    .bind(&log_json)
    .bind(election.updated_at)
    .bind(election.election_id.as_str())
    .bind(previous.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all elections on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Election>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ElectionRow>(
        "SELECT election_id, name, status, transition_log, created_at, updated_at
         FROM elections ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ElectionRow::into_record).collect()
}

#[derive(sqlx::FromRow)]
struct ElectionRow {
    election_id: String,
    name: String,
    status: String,
    transition_log: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ElectionRow {
    fn into_record(self) -> Result<Election, sqlx::Error> {
        let status = ElectionStatus::parse(&self.status)
            .ok_or_else(|| corrupt("election status", &self.status))?;
        let transition_log: Vec<TransitionRecord> = serde_json::from_value(self.transition_log)
            .map_err(|e| corrupt("transition_log", e))?;

        Ok(Election {
            election_id: ElectionId::new(self.election_id)
                .map_err(|e| corrupt("election_id", e))?,
            name: self.name,
            status,
            transition_log,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
