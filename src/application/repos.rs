//! Repository traits describing persistence adapters.
//!
//! The entity store is an external collaborator; everything above it talks
//! through these seams so the store can be Postgres in production and an
//! in-memory fake in tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{KnowledgePointRecord, QuestionRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateKnowledgePointParams {
    pub name: String,
    pub description: String,
    pub category_id: i64,
}

#[derive(Debug, Clone)]
pub struct UpdateKnowledgePointParams {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category_id: i64,
}

#[derive(Debug, Clone)]
pub struct CreateQuestionParams {
    pub content: String,
    pub answer: String,
    pub category_id: i64,
    pub difficulty: i16,
}

#[derive(Debug, Clone)]
pub struct UpdateQuestionParams {
    pub id: i64,
    pub content: String,
    pub answer: String,
    pub category_id: i64,
    pub difficulty: i16,
}

#[async_trait]
pub trait KnowledgePointsRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<KnowledgePointRecord>, RepoError>;

    async fn list_by_category(
        &self,
        category_id: i64,
    ) -> Result<Vec<KnowledgePointRecord>, RepoError>;
}

#[async_trait]
pub trait KnowledgePointsWriteRepo: Send + Sync {
    async fn create(
        &self,
        params: CreateKnowledgePointParams,
    ) -> Result<KnowledgePointRecord, RepoError>;

    /// Full-record update. Returns `RepoError::NotFound` when the id does
    /// not exist.
    async fn update(
        &self,
        params: UpdateKnowledgePointParams,
    ) -> Result<KnowledgePointRecord, RepoError>;

    async fn delete(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait QuestionsRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<QuestionRecord>, RepoError>;

    async fn list_by_category(&self, category_id: i64) -> Result<Vec<QuestionRecord>, RepoError>;
}

#[async_trait]
pub trait QuestionsWriteRepo: Send + Sync {
    async fn create(&self, params: CreateQuestionParams) -> Result<QuestionRecord, RepoError>;

    async fn update(&self, params: UpdateQuestionParams) -> Result<QuestionRecord, RepoError>;

    async fn delete(&self, id: i64) -> Result<(), RepoError>;
}

/// Link table between knowledge points and questions.
#[async_trait]
pub trait KnowledgePointLinksRepo: Send + Sync {
    async fn insert_link(&self, knowledge_point_id: i64, question_id: i64)
    -> Result<(), RepoError>;

    async fn link_exists(
        &self,
        knowledge_point_id: i64,
        question_id: i64,
    ) -> Result<bool, RepoError>;

    async fn delete_link(
        &self,
        knowledge_point_id: i64,
        question_id: i64,
    ) -> Result<(), RepoError>;

    async fn delete_links_for_point(&self, knowledge_point_id: i64) -> Result<(), RepoError>;

    async fn delete_links_for_question(&self, question_id: i64) -> Result<(), RepoError>;

    async fn question_ids_for_point(
        &self,
        knowledge_point_id: i64,
    ) -> Result<Vec<i64>, RepoError>;

    async fn knowledge_point_ids_for_question(
        &self,
        question_id: i64,
    ) -> Result<Vec<i64>, RepoError>;
}

/// Store-side operations the popularity tracker needs for one ranked
/// entity kind: existence checks before counting, the partial-field
/// hotness mirror, the ordered batch lookup that turns ranked ids into
/// records, and the recency query backing the degrade-to-recency fallback.
#[async_trait]
pub trait RankedRepo<E: Send>: Send + Sync {
    async fn exists(&self, id: i64) -> Result<bool, RepoError>;

    /// Partial-field update mirroring the score board onto the entity's
    /// `hot` column. Must not touch any other column.
    async fn update_hotness(&self, id: i64, hot: i64) -> Result<(), RepoError>;

    /// Batch lookup. Rows are returned in the order of `ids`; ids with no
    /// matching row are silently absent from the result.
    async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<E>, RepoError>;

    /// The `limit` most recently created entities, newest first.
    async fn list_recent(&self, limit: u32) -> Result<Vec<E>, RepoError>;
}
