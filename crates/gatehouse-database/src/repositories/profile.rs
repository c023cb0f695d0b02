//! Profile repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;
use gatehouse_entity::{Context, Profile};

use crate::store::ProfileStore;

/// Raw `profiles` row. The role column is free text and is parsed into the
/// closed role enum on the way out.
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    role: String,
    tenant_id: Option<Uuid>,
    context: Json<Context>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = AppError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Self {
            subject_id: row.id,
            role: row.role.parse()?,
            tenant_id: row.tenant_id,
            context: row.context.0,
        })
    }
}

/// Repository for profile lookups.
#[derive(Debug, Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    /// Create a new profile repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileRepository {
    async fn find_by_subject(&self, subject_id: Uuid) -> AppResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, role, tenant_id, context FROM profiles WHERE id = $1",
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::StoreFailure, "Failed to load profile", e))?;

        row.map(Profile::try_from).transpose()
    }
}
