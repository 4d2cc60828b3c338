use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{
    CreateKnowledgePointParams, KnowledgePointsRepo, KnowledgePointsWriteRepo, RankedRepo,
    RepoError, UpdateKnowledgePointParams,
};
use crate::domain::entities::KnowledgePointRecord;

use super::{PostgresRepositories, map_sqlx_error};

const KNOWLEDGE_POINT_COLUMNS: &str =
    "id, name, description, category_id, hot, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct KnowledgePointRow {
    id: i64,
    name: String,
    description: String,
    category_id: i64,
    hot: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<KnowledgePointRow> for KnowledgePointRecord {
    fn from(row: KnowledgePointRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            category_id: row.category_id,
            hot: row.hot,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl KnowledgePointsRepo for PostgresRepositories {
    async fn find_by_id(&self, id: i64) -> Result<Option<KnowledgePointRecord>, RepoError> {
        let row = sqlx::query_as::<_, KnowledgePointRow>(&format!(
            "SELECT {KNOWLEDGE_POINT_COLUMNS} FROM knowledge_points WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(KnowledgePointRecord::from))
    }

    async fn list_by_category(
        &self,
        category_id: i64,
    ) -> Result<Vec<KnowledgePointRecord>, RepoError> {
        let rows = sqlx::query_as::<_, KnowledgePointRow>(&format!(
            "SELECT {KNOWLEDGE_POINT_COLUMNS} FROM knowledge_points \
             WHERE category_id = $1 ORDER BY id"
        ))
        .bind(category_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(KnowledgePointRecord::from).collect())
    }
}

#[async_trait]
impl KnowledgePointsWriteRepo for PostgresRepositories {
    async fn create(
        &self,
        params: CreateKnowledgePointParams,
    ) -> Result<KnowledgePointRecord, RepoError> {
        let CreateKnowledgePointParams {
            name,
            description,
            category_id,
        } = params;

        let now = OffsetDateTime::now_utc();

        let row = sqlx::query_as::<_, KnowledgePointRow>(&format!(
            "INSERT INTO knowledge_points (name, description, category_id, hot, created_at, updated_at) \
             VALUES ($1, $2, $3, 0, $4, $4) \
             RETURNING {KNOWLEDGE_POINT_COLUMNS}"
        ))
        .bind(name)
        .bind(description)
        .bind(category_id)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(KnowledgePointRecord::from(row))
    }

    async fn update(
        &self,
        params: UpdateKnowledgePointParams,
    ) -> Result<KnowledgePointRecord, RepoError> {
        let UpdateKnowledgePointParams {
            id,
            name,
            description,
            category_id,
        } = params;

        let row = sqlx::query_as::<_, KnowledgePointRow>(&format!(
            "UPDATE knowledge_points \
             SET name = $2, description = $3, category_id = $4, updated_at = now() \
             WHERE id = $1 \
             RETURNING {KNOWLEDGE_POINT_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(category_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(KnowledgePointRecord::from)
            .ok_or(RepoError::NotFound)
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM knowledge_points WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl RankedRepo<KnowledgePointRecord> for PostgresRepositories {
    async fn exists(&self, id: i64) -> Result<bool, RepoError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1::BIGINT FROM knowledge_points WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(found.is_some())
    }

    async fn update_hotness(&self, id: i64, hot: i64) -> Result<(), RepoError> {
        sqlx::query("UPDATE knowledge_points SET hot = $2 WHERE id = $1")
            .bind(id)
            .bind(hot)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<KnowledgePointRecord>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, KnowledgePointRow>(&format!(
            "SELECT {KNOWLEDGE_POINT_COLUMNS} FROM knowledge_points \
             WHERE id = ANY($1) ORDER BY array_position($1, id)"
        ))
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(KnowledgePointRecord::from).collect())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<KnowledgePointRecord>, RepoError> {
        let rows = sqlx::query_as::<_, KnowledgePointRow>(&format!(
            "SELECT {KNOWLEDGE_POINT_COLUMNS} FROM knowledge_points \
             ORDER BY created_at DESC, id DESC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(KnowledgePointRecord::from).collect())
    }
}
