//! Emulation grant store backed by PostgreSQL.
//!
//! Every operation runs in one transaction that first takes a
//! transaction-scoped advisory lock keyed on the subject, so the
//! expire-then-insert sequence of issuance is serialized per subject. The
//! partial unique index on `(subject_id) WHERE status = 'active'` rejects any
//! writer that bypasses the lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;
use gatehouse_entity::{Context, EmulationGrant, GrantEndReason, GrantStatus, NewEmulationGrant};

use crate::store::{ActiveGrant, EmulationGrantStore};

const GRANT_COLUMNS: &str = "id, subject_id, original_role, emulated_role, status, expires_at, \
     created_at, ended_at, end_reason, metadata";

#[derive(Debug, sqlx::FromRow)]
struct GrantRow {
    id: Uuid,
    subject_id: Uuid,
    original_role: String,
    emulated_role: String,
    status: GrantStatus,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    end_reason: Option<GrantEndReason>,
    metadata: Json<Context>,
}

impl TryFrom<GrantRow> for EmulationGrant {
    type Error = AppError;

    fn try_from(row: GrantRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            subject_id: row.subject_id,
            original_role: row.original_role.parse()?,
            emulated_role: row.emulated_role.parse()?,
            status: row.status,
            expires_at: row.expires_at,
            created_at: row.created_at,
            ended_at: row.ended_at,
            end_reason: row.end_reason,
            metadata: row.metadata.0,
        })
    }
}

fn store_error(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::StoreFailure, message, e)
}

fn into_grants(rows: Vec<GrantRow>) -> AppResult<Vec<EmulationGrant>> {
    rows.into_iter().map(EmulationGrant::try_from).collect()
}

/// PostgreSQL-backed grant store.
#[derive(Debug, Clone)]
pub struct PgEmulationGrantStore {
    pool: PgPool,
}

impl PgEmulationGrantStore {
    /// Create a new grant store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Serialize this transaction against every other one for the subject.
    async fn lock_subject(conn: &mut PgConnection, subject_id: Uuid) -> AppResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(subject_id.to_string())
            .execute(conn)
            .await
            .map_err(store_error("Failed to lock emulation grants"))?;
        Ok(())
    }

    /// Expire every active grant of the subject. Grants already past their
    /// deadline are recorded as timed out, the rest with `reason`.
    async fn end_active(
        conn: &mut PgConnection,
        subject_id: Uuid,
        reason: GrantEndReason,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<EmulationGrant>> {
        let rows = sqlx::query_as::<_, GrantRow>(&format!(
            "UPDATE emulation_grants \
             SET status = 'expired', ended_at = $2, \
                 end_reason = CASE WHEN expires_at <= $2 THEN 'timed_out'::emulation_end_reason \
                                   ELSE $3 END \
             WHERE subject_id = $1 AND status = 'active' \
             RETURNING {GRANT_COLUMNS}"
        ))
        .bind(subject_id)
        .bind(now)
        .bind(reason)
        .fetch_all(conn)
        .await
        .map_err(store_error("Failed to expire emulation grants"))?;
        into_grants(rows)
    }
}

#[async_trait]
impl EmulationGrantStore for PgEmulationGrantStore {
    async fn find_active(&self, subject_id: Uuid, now: DateTime<Utc>) -> AppResult<ActiveGrant> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(store_error("Failed to begin transaction"))?;
        Self::lock_subject(&mut tx, subject_id).await?;

        let lapsed = sqlx::query_as::<_, GrantRow>(&format!(
            "UPDATE emulation_grants \
             SET status = 'expired', ended_at = $2, end_reason = 'timed_out' \
             WHERE subject_id = $1 AND status = 'active' AND expires_at <= $2 \
             RETURNING {GRANT_COLUMNS}"
        ))
        .bind(subject_id)
        .bind(now)
        .fetch_all(&mut *tx)
        .await
        .map_err(store_error("Failed to expire lapsed emulation grants"))?;

        let active = sqlx::query_as::<_, GrantRow>(&format!(
            "SELECT {GRANT_COLUMNS} FROM emulation_grants \
             WHERE subject_id = $1 AND status = 'active' AND expires_at > $2"
        ))
        .bind(subject_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_error("Failed to load active emulation grant"))?;

        tx.commit()
            .await
            .map_err(store_error("Failed to commit transaction"))?;

        if let Some(row) = active {
            return Ok(ActiveGrant::Active(row.try_into()?));
        }
        match into_grants(lapsed)?.pop() {
            Some(grant) => {
                info!(
                    subject_id = %subject_id,
                    grant_id = %grant.id,
                    "Emulation grant expired"
                );
                Ok(ActiveGrant::Lapsed(grant))
            }
            None => Ok(ActiveGrant::Absent),
        }
    }

    async fn issue(&self, new: NewEmulationGrant, now: DateTime<Utc>) -> AppResult<EmulationGrant> {
        let grant = EmulationGrant::issue(new, now);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(store_error("Failed to begin transaction"))?;
        Self::lock_subject(&mut tx, grant.subject_id).await?;

        let ended =
            Self::end_active(&mut tx, grant.subject_id, GrantEndReason::Superseded, now).await?;

        sqlx::query(
            "INSERT INTO emulation_grants \
             (id, subject_id, original_role, emulated_role, status, expires_at, created_at, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(grant.id)
        .bind(grant.subject_id)
        .bind(grant.original_role.as_str())
        .bind(grant.emulated_role.as_str())
        .bind(grant.status)
        .bind(grant.expires_at)
        .bind(grant.created_at)
        .bind(Json(&grant.metadata))
        .execute(&mut *tx)
        .await
        .map_err(store_error("Failed to insert emulation grant"))?;

        tx.commit()
            .await
            .map_err(store_error("Failed to commit transaction"))?;

        for previous in ended {
            info!(
                subject_id = %previous.subject_id,
                grant_id = %previous.id,
                end_reason = ?previous.end_reason,
                "Emulation grant ended by new issuance"
            );
        }
        Ok(grant)
    }

    async fn stop(
        &self,
        subject_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Option<EmulationGrant>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(store_error("Failed to begin transaction"))?;
        Self::lock_subject(&mut tx, subject_id).await?;
        let ended = Self::end_active(&mut tx, subject_id, GrantEndReason::Stopped, now).await?;
        tx.commit()
            .await
            .map_err(store_error("Failed to commit transaction"))?;

        Ok(ended
            .into_iter()
            .find(|g| g.end_reason == Some(GrantEndReason::Stopped)))
    }

    async fn history(&self, subject_id: Uuid) -> AppResult<Vec<EmulationGrant>> {
        let rows = sqlx::query_as::<_, GrantRow>(&format!(
            "SELECT {GRANT_COLUMNS} FROM emulation_grants \
             WHERE subject_id = $1 ORDER BY created_at DESC"
        ))
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("Failed to load emulation history"))?;
        into_grants(rows)
    }
}
