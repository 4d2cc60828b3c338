//! Knowledge-point business facade.
//!
//! Every read goes through the read-through cache; every successful
//! get-by-id additionally records one access with the popularity tracker,
//! without waiting for it. Every mutation writes the store and then
//! synchronously evicts every namespace that could hold stale derived
//! data. Eviction is whole-namespace rather than per key, trading some
//! extra evictions for the impossibility of per-key invalidation bugs.

use std::sync::Arc;

use crate::cache::{CacheConfig, PopularityTracker, ReadThroughCache, keys};
use crate::domain::entities::{KnowledgePointRecord, QuestionRecord};
use crate::domain::error::DomainError;
use crate::domain::types::EntityKind;

use super::error::AppError;
use super::repos::{
    CreateKnowledgePointParams, KnowledgePointLinksRepo, KnowledgePointsRepo,
    KnowledgePointsWriteRepo, QuestionsRepo, RankedRepo, UpdateKnowledgePointParams,
};

const NS: &str = EntityKind::KnowledgePoint.namespace();
const QUESTION_NS: &str = EntityKind::Question.namespace();

pub struct KnowledgePointService {
    repo: Arc<dyn KnowledgePointsRepo>,
    writes: Arc<dyn KnowledgePointsWriteRepo>,
    questions: Arc<dyn QuestionsRepo>,
    links: Arc<dyn KnowledgePointLinksRepo>,
    point_batch: Arc<dyn RankedRepo<KnowledgePointRecord>>,
    question_batch: Arc<dyn RankedRepo<QuestionRecord>>,
    cache: Arc<ReadThroughCache>,
    tracker: Arc<PopularityTracker<KnowledgePointRecord>>,
    config: CacheConfig,
}

impl KnowledgePointService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<dyn KnowledgePointsRepo>,
        writes: Arc<dyn KnowledgePointsWriteRepo>,
        questions: Arc<dyn QuestionsRepo>,
        links: Arc<dyn KnowledgePointLinksRepo>,
        point_batch: Arc<dyn RankedRepo<KnowledgePointRecord>>,
        question_batch: Arc<dyn RankedRepo<QuestionRecord>>,
        cache: Arc<ReadThroughCache>,
        tracker: Arc<PopularityTracker<KnowledgePointRecord>>,
        config: CacheConfig,
    ) -> Self {
        Self {
            repo,
            writes,
            questions,
            links,
            point_batch,
            question_batch,
            cache,
            tracker,
            config,
        }
    }

    /// Knowledge-point detail. A missing id is `None`, not an error.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<KnowledgePointRecord>, AppError> {
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

    pub async fn list_by_category(
        &self,
        category_id: i64,
    ) -> Result<Vec<KnowledgePointRecord>, AppError> {
        let repo = self.repo.clone();
        let points = self
            .cache
            .get_list_with(
                NS,
                keys::category(category_id),
                self.config.list_ttl(),
                || async move { repo.list_by_category(category_id).await },
            )
            .await?;
        Ok(points)
    }

    /// Questions linked to a knowledge point, cached as one derived view.
    pub async fn questions_for_point(
        &self,
        knowledge_point_id: i64,
    ) -> Result<Vec<QuestionRecord>, AppError> {
        let links = self.links.clone();
        let questions = self.question_batch.clone();
        let records = self
            .cache
            .get_list_with(
                NS,
                keys::questions_for_point(knowledge_point_id),
                self.config.link_ttl(),
                || async move {
                    let ids = links.question_ids_for_point(knowledge_point_id).await?;
                    if ids.is_empty() {
                        return Ok(Vec::new());
                    }
                    questions.list_by_ids(&ids).await
                },
            )
            .await?;
        Ok(records)
    }

    /// Knowledge points linked to a question.
    pub async fn knowledge_points_for_question(
        &self,
        question_id: i64,
    ) -> Result<Vec<KnowledgePointRecord>, AppError> {
        let links = self.links.clone();
        let points = self.point_batch.clone();
        let records = self
            .cache
            .get_list_with(
                NS,
                keys::points_for_question(question_id),
                self.config.link_ttl(),
                || async move {
                    let ids = links.knowledge_point_ids_for_question(question_id).await?;
                    if ids.is_empty() {
                        return Ok(Vec::new());
                    }
                    points.list_by_ids(&ids).await
                },
            )
            .await?;
        Ok(records)
    }

    /// Most-accessed knowledge points, falling back to most recently
    /// created when ranking data is unavailable.
    pub async fn popular(&self, count: u32) -> Result<Vec<KnowledgePointRecord>, AppError> {
        Ok(self.tracker.top_n(count).await?)
    }

    pub async fn create(
        &self,
        params: CreateKnowledgePointParams,
    ) -> Result<KnowledgePointRecord, AppError> {
        if params.name.trim().is_empty() {
            return Err(DomainError::validation("knowledge point name must not be empty").into());
        }

        let record = self.writes.create(params).await?;
        self.cache.invalidate(NS).await;
        Ok(record)
    }

    pub async fn update(
        &self,
        params: UpdateKnowledgePointParams,
    ) -> Result<KnowledgePointRecord, AppError> {
        if params.name.trim().is_empty() {
            return Err(DomainError::validation("knowledge point name must not be empty").into());
        }

        let record = self.writes.update(params).await?;
        self.cache.invalidate(NS).await;
        Ok(record)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.writes.delete(id).await?;
        self.links.delete_links_for_point(id).await?;
        // Without this the deleted point would linger in rankings until the
        // batch-lookup filter silently dropped it.
        self.tracker.remove(id).await;

        self.cache.invalidate(NS).await;
        self.cache.invalidate(QUESTION_NS).await;
        Ok(())
    }

    /// Link a question to a knowledge point. Linking twice is a no-op.
    pub async fn attach_question(
        &self,
        knowledge_point_id: i64,
        question_id: i64,
    ) -> Result<(), AppError> {
        if self.repo.find_by_id(knowledge_point_id).await?.is_none() {
            return Err(DomainError::not_found("knowledge_point").into());
        }
        if self.questions.find_by_id(question_id).await?.is_none() {
            return Err(DomainError::not_found("question").into());
        }
        if self.links.link_exists(knowledge_point_id, question_id).await? {
            return Ok(());
        }

        self.links.insert_link(knowledge_point_id, question_id).await?;
        self.cache.invalidate(NS).await;
        self.cache.invalidate(QUESTION_NS).await;
        Ok(())
    }

    pub async fn attach_questions(
        &self,
        knowledge_point_id: i64,
        question_ids: &[i64],
    ) -> Result<(), AppError> {
        if question_ids.is_empty() {
            return Ok(());
        }
        if self.repo.find_by_id(knowledge_point_id).await?.is_none() {
            return Err(DomainError::not_found("knowledge_point").into());
        }

        for &question_id in question_ids {
            if !self.links.link_exists(knowledge_point_id, question_id).await? {
                self.links.insert_link(knowledge_point_id, question_id).await?;
            }
        }

        self.cache.invalidate(NS).await;
        self.cache.invalidate(QUESTION_NS).await;
        Ok(())
    }

    pub async fn detach_question(
        &self,
        knowledge_point_id: i64,
        question_id: i64,
    ) -> Result<(), AppError> {
        self.links.delete_link(knowledge_point_id, question_id).await?;
        self.cache.invalidate(NS).await;
        self.cache.invalidate(QUESTION_NS).await;
        Ok(())
    }
}
