//! Voter, party and candidate persistence.
//!
//! Approval is a one-shot decision: [`set_status`] only updates rows that are
//! still `PENDING`, so two concurrent moderations cannot both succeed.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use evote_core::{
    ApprovalStatus, Candidate, CandidateId, Constituency, Party, PartyId, Voter, VoterId,
};

use super::corrupt;

/// Which registration table a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationKind {
    Voter,
    Party,
    Candidate,
}

impl RegistrationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voter => "voter",
            Self::Party => "party",
            Self::Candidate => "candidate",
        }
    }

    fn set_status_sql(&self) -> &'static str {
        match self {
            Self::Voter => {
                "UPDATE voters SET status = $1 WHERE voter_id = $2 AND status = 'PENDING'"
            }
            Self::Party => {
                "UPDATE parties SET status = $1 WHERE party_id = $2 AND status = 'PENDING'"
            }
            Self::Candidate => {
                "UPDATE candidates SET status = $1 WHERE candidate_id = $2 AND status = 'PENDING'"
            }
        }
    }
}

/// Whether the error is a primary-key collision, i.e. the id is taken.
pub fn is_duplicate(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub async fn insert_voter(pool: &PgPool, voter: &Voter) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO voters (voter_id, full_name, constituency, status, registered_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(voter.voter_id.as_str())
    .bind(&voter.full_name)
    .bind(voter.constituency.as_str())
    .bind(voter.status.as_str())
    .bind(voter.registered_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_party(pool: &PgPool, party: &Party) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO parties (party_id, name, symbol, status, registered_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(party.party_id.as_str())
    .bind(&party.name)
    .bind(party.symbol.as_deref())
    .bind(party.status.as_str())
    .bind(party.registered_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_candidate(pool: &PgPool, candidate: &Candidate) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO candidates (candidate_id, full_name, party_id, constituency, status, registered_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(candidate.candidate_id.as_str())
    .bind(&candidate.full_name)
    .bind(candidate.party_id.as_ref().map(|p| p.as_str()))
    .bind(candidate.constituency.as_str())
    .bind(candidate.status.as_str())
    .bind(candidate.registered_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Move a `PENDING` record to `status`. Returns `false` if no pending row matched.
pub async fn set_status(
    pool: &PgPool,
    kind: RegistrationKind,
    id: &str,
    status: ApprovalStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(kind.set_status_sql())
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn load_voters(pool: &PgPool) -> Result<Vec<Voter>, sqlx::Error> {
    let rows = sqlx::query_as::<_, VoterRow>(
        "SELECT voter_id, full_name, constituency, status, registered_at
         FROM voters ORDER BY registered_at",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(VoterRow::into_record).collect()
}

pub async fn load_parties(pool: &PgPool) -> Result<Vec<Party>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PartyRow>(
        "SELECT party_id, name, symbol, status, registered_at
         FROM parties ORDER BY registered_at",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(PartyRow::into_record).collect()
}

pub async fn load_candidates(pool: &PgPool) -> Result<Vec<Candidate>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CandidateRow>(
        "SELECT candidate_id, full_name, party_id, constituency, status, registered_at
         FROM candidates ORDER BY registered_at",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(CandidateRow::into_record).collect()
}

fn parse_status(raw: &str) -> Result<ApprovalStatus, sqlx::Error> {
    ApprovalStatus::parse(raw).ok_or_else(|| corrupt("status", raw))
}

#[derive(sqlx::FromRow)]
struct VoterRow {
    voter_id: String,
    full_name: String,
    constituency: String,
    status: String,
    registered_at: DateTime<Utc>,
}

impl VoterRow {
    fn into_record(self) -> Result<Voter, sqlx::Error> {
        Ok(Voter {
            voter_id: VoterId::new(self.voter_id).map_err(|e| corrupt("voter_id", e))?,
            full_name: self.full_name,
            constituency: Constituency::new(self.constituency)
                .map_err(|e| corrupt("constituency", e))?,
            status: parse_status(&self.status)?,
            registered_at: self.registered_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PartyRow {
    party_id: String,
    name: String,
    symbol: Option<String>,
    status: String,
    registered_at: DateTime<Utc>,
}

impl PartyRow {
    fn into_record(self) -> Result<Party, sqlx::Error> {
        Ok(Party {
            party_id: PartyId::new(self.party_id).map_err(|e| corrupt("party_id", e))?,
            name: self.name,
            symbol: self.symbol,
            status: parse_status(&self.status)?,
            registered_at: self.registered_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CandidateRow {
    candidate_id: String,
    full_name: String,
    party_id: Option<String>,
    constituency: String,
    status: String,
    registered_at: DateTime<Utc>,
}

impl CandidateRow {
    fn into_record(self) -> Result<Candidate, sqlx::Error> {
        Ok(Candidate {
            candidate_id: CandidateId::new(self.candidate_id)
                .map_err(|e| corrupt("candidate_id", e))?,
            full_name: self.full_name,
            party_id: self
                .party_id
                .map(PartyId::new)
                .transpose()
                .map_err(|e| corrupt("party_id", e))?,
            constituency: Constituency::new(self.constituency)
                .map_err(|e| corrupt("constituency", e))?,
            status: parse_status(&self.status)?,
            registered_at: self.registered_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_status_sql_only_touches_pending_rows() {
        for kind in [
            RegistrationKind::Voter,
            RegistrationKind::Party,
            RegistrationKind::Candidate,
        ] {
            assert!(kind.set_status_sql().ends_with("AND status = 'PENDING'"));
        }
    }

    #[test]
    fn row_with_bad_identifier_is_rejected() {
        let row = VoterRow {
            voter_id: "V 001".into(),
            full_name: "x".into(),
            constituency: "C001".into(),
            status: "PENDING".into(),
            registered_at: Utc::now(),
        };
        assert!(row.into_record().is_err());
    }

    #[test]
    fn candidate_row_maps_optional_party() {
        let row = CandidateRow {
            candidate_id: "CD002".into(),
            full_name: "Ravi Menon".into(),
            party_id: Some("P01".into()),
            constituency: "C001".into(),
            status: "APPROVED".into(),
            registered_at: Utc::now(),
        };
        let c = row.into_record().unwrap();
        assert_eq!(c.party_id.unwrap().as_str(), "P01");
        assert_eq!(c.status, ApprovalStatus::Approved);
    }
}
