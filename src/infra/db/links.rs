use async_trait::async_trait;

use crate::application::repos::{KnowledgePointLinksRepo, RepoError};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl KnowledgePointLinksRepo for PostgresRepositories {
    async fn insert_link(
        &self,
        knowledge_point_id: i64,
        question_id: i64,
    ) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO knowledge_point_questions (knowledge_point_id, question_id) \
             VALUES ($1, $2)",
        )
        .bind(knowledge_point_id)
        .bind(question_id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn link_exists(
        &self,
        knowledge_point_id: i64,
        question_id: i64,
    ) -> Result<bool, RepoError> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1::BIGINT FROM knowledge_point_questions \
             WHERE knowledge_point_id = $1 AND question_id = $2",
        )
        .bind(knowledge_point_id)
        .bind(question_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(found.is_some())
    }

    async fn delete_link(
        &self,
        knowledge_point_id: i64,
        question_id: i64,
    ) -> Result<(), RepoError> {
        sqlx::query(
            "DELETE FROM knowledge_point_questions \
             WHERE knowledge_point_id = $1 AND question_id = $2",
        )
        .bind(knowledge_point_id)
        .bind(question_id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete_links_for_point(&self, knowledge_point_id: i64) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM knowledge_point_questions WHERE knowledge_point_id = $1")
            .bind(knowledge_point_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete_links_for_question(&self, question_id: i64) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM knowledge_point_questions WHERE question_id = $1")
            .bind(question_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn question_ids_for_point(
        &self,
        knowledge_point_id: i64,
    ) -> Result<Vec<i64>, RepoError> {
        let ids = sqlx::query_scalar(
            "SELECT question_id FROM knowledge_point_questions \
             WHERE knowledge_point_id = $1 ORDER BY question_id",
        )
        .bind(knowledge_point_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ids)
    }

    async fn knowledge_point_ids_for_question(
        &self,
        question_id: i64,
    ) -> Result<Vec<i64>, RepoError> {
        let ids = sqlx::query_scalar(
            "SELECT knowledge_point_id FROM knowledge_point_questions \
             WHERE question_id = $1 ORDER BY knowledge_point_id",
        )
        .bind(question_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ids)
    }
}
