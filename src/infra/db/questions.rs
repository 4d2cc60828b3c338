use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{
    CreateQuestionParams, QuestionsRepo, QuestionsWriteRepo, RankedRepo, RepoError,
    UpdateQuestionParams,
};
use crate::domain::entities::QuestionRecord;

use super::{PostgresRepositories, map_sqlx_error};

const QUESTION_COLUMNS: &str =
    "id, content, answer, category_id, difficulty, hot, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct QuestionRow {
    id: i64,
    content: String,
    answer: String,
    category_id: i64,
    difficulty: i16,
    hot: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<QuestionRow> for QuestionRecord {
    fn from(row: QuestionRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            answer: row.answer,
            category_id: row.category_id,
            difficulty: row.difficulty,
            hot: row.hot,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl QuestionsRepo for PostgresRepositories {
    async fn find_by_id(&self, id: i64) -> Result<Option<QuestionRecord>, RepoError> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(QuestionRecord::from))
    }

    async fn list_by_category(&self, category_id: i64) -> Result<Vec<QuestionRecord>, RepoError> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions \
             WHERE category_id = $1 ORDER BY id"
        ))
        .bind(category_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(QuestionRecord::from).collect())
    }
}

#[async_trait]
impl QuestionsWriteRepo for PostgresRepositories {
    async fn create(&self, params: CreateQuestionParams) -> Result<QuestionRecord, RepoError> {
        let CreateQuestionParams {
            content,
            answer,
            category_id,
            difficulty,
        } = params;

        let now = OffsetDateTime::now_utc();

        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "INSERT INTO questions (content, answer, category_id, difficulty, hot, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, 0, $5, $5) \
             RETURNING {QUESTION_COLUMNS}"
        ))
        .bind(content)
        .bind(answer)
        .bind(category_id)
        .bind(difficulty)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(QuestionRecord::from(row))
    }

    async fn update(&self, params: UpdateQuestionParams) -> Result<QuestionRecord, RepoError> {
        let UpdateQuestionParams {
            id,
            content,
            answer,
            category_id,
            difficulty,
        } = params;

        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "UPDATE questions \
             SET content = $2, answer = $3, category_id = $4, difficulty = $5, updated_at = now() \
             WHERE id = $1 \
             RETURNING {QUESTION_COLUMNS}"
        ))
        .bind(id)
        .bind(content)
        .bind(answer)
        .bind(category_id)
        .bind(difficulty)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(QuestionRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
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
impl RankedRepo<QuestionRecord> for PostgresRepositories {
    async fn exists(&self, id: i64) -> Result<bool, RepoError> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1::BIGINT FROM questions WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(found.is_some())
    }

    async fn update_hotness(&self, id: i64, hot: i64) -> Result<(), RepoError> {
        sqlx::query("UPDATE questions SET hot = $2 WHERE id = $1")
            .bind(id)
            .bind(hot)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<QuestionRecord>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions \
             WHERE id = ANY($1) ORDER BY array_position($1, id)"
        ))
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(QuestionRecord::from).collect())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<QuestionRecord>, RepoError> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions \
             ORDER BY created_at DESC, id DESC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(QuestionRecord::from).collect())
    }
}
