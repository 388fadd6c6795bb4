//! Ballot persistence: has-voted markers and per-candidate tallies.
//!
//! A ballot is one transaction: insert the `(election, voter)` marker and
//! increment the candidate's tally. The marker's primary key makes a second
//! ballot by the same voter a no-op that rolls back.

use sqlx::PgPool;

use evote_core::{CandidateId, ElectionId, VoterId};

use super::corrupt;

/// Everything needed to rebuild the in-memory ballot ledger.
#[derive(Debug, Default)]
pub struct BallotSnapshot {
    pub markers: Vec<(ElectionId, VoterId)>,
    pub tallies: Vec<(ElectionId, CandidateId, u64)>,
}

/// Record one ballot. Returns `false` (and writes nothing) if the voter
/// already has a marker in this election.
pub async fn record_vote(
    pool: &PgPool,
    election: &ElectionId,
    voter: &VoterId,
    candidate: &CandidateId,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let marker = sqlx::query(
        "INSERT INTO ballot_markers (election_id, voter_id) VALUES ($1, $2)
         ON CONFLICT DO NOTHING",
    )
    .bind(election.as_str())
    .bind(voter.as_str())
    .execute(&mut *tx)
    .await?;

    if marker.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query(
        "INSERT INTO candidate_tallies (election_id, candidate_id, votes) VALUES ($1, $2, 1)
         ON CONFLICT (election_id, candidate_id)
         DO UPDATE SET votes = candidate_tallies.votes + 1",
    )
    .bind(election.as_str())
    .bind(candidate.as_str())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}

/// Load all markers and tallies on startup.
pub async fn load_all(pool: &PgPool) -> Result<BallotSnapshot, sqlx::Error> {
    let markers = sqlx::query_as::<_, (String, String)>(
        "SELECT election_id, voter_id FROM ballot_markers",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|(election, voter)| {
        Ok((
            ElectionId::new(election).map_err(|e| corrupt("election_id", e))?,
            VoterId::new(voter).map_err(|e| corrupt("voter_id", e))?,
        ))
    })
    .collect::<Result<Vec<_>, sqlx::Error>>()?;

    let tallies = sqlx::query_as::<_, (String, String, i64)>(
        "SELECT election_id, candidate_id, votes FROM candidate_tallies",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|(election, candidate, votes)| {
        Ok((
            ElectionId::new(election).map_err(|e| corrupt("election_id", e))?,
            CandidateId::new(candidate).map_err(|e| corrupt("candidate_id", e))?,
            u64::try_from(votes).map_err(|e| corrupt("votes", e))?,
        ))
    })
    .collect::<Result<Vec<_>, sqlx::Error>>()?;

    Ok(BallotSnapshot { markers, tallies })
}
