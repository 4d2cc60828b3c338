//! Question business facade.
//!
//! Same shape as the knowledge-point facade, minus link management: cached
//! reads, an access event per successful detail read, whole-namespace
//! eviction after every write.

use std::sync::Arc;

use crate::cache::{CacheConfig, PopularityTracker, ReadThroughCache, keys};
use crate::domain::entities::QuestionRecord;
use crate::domain::error::DomainError;
use crate::domain::types::EntityKind;

use super::error::AppError;
use super::repos::{
    CreateQuestionParams, KnowledgePointLinksRepo, QuestionsRepo, QuestionsWriteRepo,
    UpdateQuestionParams,
};

const NS: &str = EntityKind::Question.namespace();
const KNOWLEDGE_POINT_NS: &str = EntityKind::KnowledgePoint.namespace();

pub struct QuestionService {
    repo: Arc<dyn QuestionsRepo>,
    writes: Arc<dyn QuestionsWriteRepo>,
    links: Arc<dyn KnowledgePointLinksRepo>,
    cache: Arc<ReadThroughCache>,
    tracker: Arc<PopularityTracker<QuestionRecord>>,
    config: CacheConfig,
}

impl QuestionService {
    pub fn new(
        repo: Arc<dyn QuestionsRepo>,
        writes: Arc<dyn QuestionsWriteRepo>,
        links: Arc<dyn KnowledgePointLinksRepo>,
        cache: Arc<ReadThroughCache>,
        tracker: Arc<PopularityTracker<QuestionRecord>>,
        config: CacheConfig,
    ) -> Self {
        Self {
            repo,
            writes,
            links,
            cache,
            tracker,
            config,
        }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<QuestionRecord>, AppError> {
        let repo = self.repo.clone();
        let found = self
            .cache
            .get_with(NS, keys::detail(id), self.config.detail_ttl(), || async move {
                repo.find_by_id(id).await
            })
            .await?;

        if found.is_some() {
            self.tracker.record_access(id);
        }
        Ok(found)
    }

    pub async fn list_by_category(&self, category_id: i64) -> Result<Vec<QuestionRecord>, AppError> {
        let repo = self.repo.clone();
        let questions = self
            .cache
            .get_list_with(
                NS,
                keys::category(category_id),
                self.config.list_ttl(),
                || async move { repo.list_by_category(category_id).await },
            )
            .await?;
        Ok(questions)
    }

    pub async fn popular(&self, count: u32) -> Result<Vec<QuestionRecord>, AppError> {
        Ok(self.tracker.top_n(count).await?)
    }

    pub async fn create(&self, params: CreateQuestionParams) -> Result<QuestionRecord, AppError> {
        validate_question(&params.content, params.difficulty)?;

        let record = self.writes.create(params).await?;
        self.cache.invalidate(NS).await;
        Ok(record)
    }

    pub async fn update(&self, params: UpdateQuestionParams) -> Result<QuestionRecord, AppError> {
        validate_question(&params.content, params.difficulty)?;

        let record = self.writes.update(params).await?;

        // Link views ("questions for point K") embed full question records
        // under the knowledge-point namespace, so evict that one too.
        self.cache.invalidate(NS).await;
        self.cache.invalidate(KNOWLEDGE_POINT_NS).await;
        Ok(record)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.writes.delete(id).await?;
        self.links.delete_links_for_question(id).await?;
        self.tracker.remove(id).await;

        // Link views ("questions for point K") live under the
        // knowledge-point namespace, so that one is stale too.
        self.cache.invalidate(NS).await;
        self.cache.invalidate(KNOWLEDGE_POINT_NS).await;
        Ok(())
    }
}

fn validate_question(content: &str, difficulty: i16) -> Result<(), AppError> {
    if content.trim().is_empty() {
        return Err(DomainError::validation("question content must not be empty").into());
    }
    if !(1..=5).contains(&difficulty) {
        return Err(DomainError::validation("difficulty must be between 1 and 5").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_bounds_are_enforced() {
        assert!(validate_question("What is ownership?", 1).is_ok());
        assert!(validate_question("What is ownership?", 5).is_ok());
        assert!(validate_question("What is ownership?", 0).is_err());
        assert!(validate_question("What is ownership?", 6).is_err());
        assert!(validate_question("   ", 3).is_err());
    }
}
