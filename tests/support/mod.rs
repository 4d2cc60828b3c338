//! Shared fixtures: an in-memory entity store and service harness.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicI64, AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;

use studyhall::application::knowledge_points::KnowledgePointService;
use studyhall::application::questions::QuestionService;
use studyhall::application::repos::{
    CreateKnowledgePointParams, CreateQuestionParams, KnowledgePointLinksRepo, KnowledgePointsRepo,
    KnowledgePointsWriteRepo, QuestionsRepo, QuestionsWriteRepo, RankedRepo, RepoError,
    UpdateKnowledgePointParams, UpdateQuestionParams,
};
use studyhall::cache::{
    CacheBackend, CacheConfig, CacheError, MemoryBackend, PopularityTracker, ReadThroughCache,
};
use studyhall::domain::entities::{KnowledgePointRecord, QuestionRecord};
use studyhall::domain::types::EntityKind;

/// Entity store fake. Ids are assigned in insertion order, so descending id
/// order doubles as creation recency.
#[derive(Default)]
pub struct TestStore {
    points: Mutex<HashMap<i64, KnowledgePointRecord>>,
    questions: Mutex<HashMap<i64, QuestionRecord>>,
    links: Mutex<Vec<(i64, i64)>>,
    next_id: AtomicI64,
    point_reads: AtomicUsize,
    question_reads: AtomicUsize,
}

impl TestStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicI64::new(1),
            ..Default::default()
        })
    }

    /// Number of knowledge-point reads that reached the store.
    pub fn point_reads(&self) -> usize {
        self.point_reads.load(Ordering::SeqCst)
    }

    pub fn question_reads(&self) -> usize {
        self.question_reads.load(Ordering::SeqCst)
    }

    pub fn point_hot(&self, id: i64) -> Option<i64> {
        self.points
            .lock()
            .expect("points lock")
            .get(&id)
            .map(|record| record.hot)
    }

    pub fn question_hot(&self, id: i64) -> Option<i64> {
        self.questions
            .lock()
            .expect("questions lock")
            .get(&id)
            .map(|record| record.hot)
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgePointsRepo for TestStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<KnowledgePointRecord>, RepoError> {
        self.point_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.points.lock().expect("points lock").get(&id).cloned())
    }

    async fn list_by_category(
        &self,
        category_id: i64,
    ) -> Result<Vec<KnowledgePointRecord>, RepoError> {
        self.point_reads.fetch_add(1, Ordering::SeqCst);
        let mut records: Vec<_> = self
            .points
            .lock()
            .expect("points lock")
            .values()
            .filter(|record| record.category_id == category_id)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }
}

#[async_trait]
impl KnowledgePointsWriteRepo for TestStore {
    async fn create(
        &self,
        params: CreateKnowledgePointParams,
    ) -> Result<KnowledgePointRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let record = KnowledgePointRecord {
            id: self.allocate_id(),
            name: params.name,
            description: params.description,
            category_id: params.category_id,
            hot: 0,
            created_at: now,
            updated_at: now,
        };
        self.points
            .lock()
            .expect("points lock")
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        params: UpdateKnowledgePointParams,
    ) -> Result<KnowledgePointRecord, RepoError> {
        let mut points = self.points.lock().expect("points lock");
        let record = points.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        record.name = params.name;
        record.description = params.description;
        record.category_id = params.category_id;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(record.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        self.points
            .lock()
            .expect("points lock")
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl QuestionsRepo for TestStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<QuestionRecord>, RepoError> {
        self.question_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .questions
            .lock()
            .expect("questions lock")
            .get(&id)
            .cloned())
    }

    async fn list_by_category(&self, category_id: i64) -> Result<Vec<QuestionRecord>, RepoError> {
        self.question_reads.fetch_add(1, Ordering::SeqCst);
        let mut records: Vec<_> = self
            .questions
            .lock()
            .expect("questions lock")
            .values()
            .filter(|record| record.category_id == category_id)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }
}

#[async_trait]
impl QuestionsWriteRepo for TestStore {
    async fn create(&self, params: CreateQuestionParams) -> Result<QuestionRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let record = QuestionRecord {
            id: self.allocate_id(),
            content: params.content,
            answer: params.answer,
            category_id: params.category_id,
            difficulty: params.difficulty,
            hot: 0,
            created_at: now,
            updated_at: now,
        };
        self.questions
            .lock()
            .expect("questions lock")
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, params: UpdateQuestionParams) -> Result<QuestionRecord, RepoError> {
        let mut questions = self.questions.lock().expect("questions lock");
        let record = questions.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        record.content = params.content;
        record.answer = params.answer;
        record.category_id = params.category_id;
        record.difficulty = params.difficulty;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(record.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        self.questions
            .lock()
            .expect("questions lock")
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl KnowledgePointLinksRepo for TestStore {
    async fn insert_link(
        &self,
        knowledge_point_id: i64,
        question_id: i64,
    ) -> Result<(), RepoError> {
        self.links
            .lock()
            .expect("links lock")
            .push((knowledge_point_id, question_id));
        Ok(())
    }

    async fn link_exists(
        &self,
        knowledge_point_id: i64,
        question_id: i64,
    ) -> Result<bool, RepoError> {
        Ok(self
            .links
            .lock()
            .expect("links lock")
            .contains(&(knowledge_point_id, question_id)))
    }

    async fn delete_link(
        &self,
        knowledge_point_id: i64,
        question_id: i64,
    ) -> Result<(), RepoError> {
        self.links
            .lock()
            .expect("links lock")
            .retain(|&link| link != (knowledge_point_id, question_id));
        Ok(())
    }

    async fn delete_links_for_point(&self, knowledge_point_id: i64) -> Result<(), RepoError> {
        self.links
            .lock()
            .expect("links lock")
            .retain(|&(point, _)| point != knowledge_point_id);
        Ok(())
    }

    async fn delete_links_for_question(&self, question_id: i64) -> Result<(), RepoError> {
        self.links
            .lock()
            .expect("links lock")
            .retain(|&(_, question)| question != question_id);
        Ok(())
    }

    async fn question_ids_for_point(
        &self,
        knowledge_point_id: i64,
    ) -> Result<Vec<i64>, RepoError> {
        Ok(self
            .links
            .lock()
            .expect("links lock")
            .iter()
            .filter(|&&(point, _)| point == knowledge_point_id)
            .map(|&(_, question)| question)
            .collect())
    }

    async fn knowledge_point_ids_for_question(
        &self,
        question_id: i64,
    ) -> Result<Vec<i64>, RepoError> {
        Ok(self
            .links
            .lock()
            .expect("links lock")
            .iter()
            .filter(|&&(_, question)| question == question_id)
            .map(|&(point, _)| point)
            .collect())
    }
}

#[async_trait]
impl RankedRepo<KnowledgePointRecord> for TestStore {
    async fn exists(&self, id: i64) -> Result<bool, RepoError> {
        Ok(self.points.lock().expect("points lock").contains_key(&id))
    }

    async fn update_hotness(&self, id: i64, hot: i64) -> Result<(), RepoError> {
        let mut points = self.points.lock().expect("points lock");
        let record = points.get_mut(&id).ok_or(RepoError::NotFound)?;
        record.hot = hot;
        Ok(())
    }

    async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<KnowledgePointRecord>, RepoError> {
        let points = self.points.lock().expect("points lock");
        Ok(ids.iter().filter_map(|id| points.get(id).cloned()).collect())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<KnowledgePointRecord>, RepoError> {
        let mut records: Vec<_> = self
            .points
            .lock()
            .expect("points lock")
            .values()
            .cloned()
            .collect();
        records.sort_by_key(|record| std::cmp::Reverse(record.id));
        records.truncate(limit as usize);
        Ok(records)
    }
}

#[async_trait]
impl RankedRepo<QuestionRecord> for TestStore {
    async fn exists(&self, id: i64) -> Result<bool, RepoError> {
        Ok(self
            .questions
            .lock()
            .expect("questions lock")
            .contains_key(&id))
    }

    async fn update_hotness(&self, id: i64, hot: i64) -> Result<(), RepoError> {
        let mut questions = self.questions.lock().expect("questions lock");
        let record = questions.get_mut(&id).ok_or(RepoError::NotFound)?;
        record.hot = hot;
        Ok(())
    }

    async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<QuestionRecord>, RepoError> {
        let questions = self.questions.lock().expect("questions lock");
        Ok(ids
            .iter()
            .filter_map(|id| questions.get(id).cloned())
            .collect())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<QuestionRecord>, RepoError> {
        let mut records: Vec<_> = self
            .questions
            .lock()
            .expect("questions lock")
            .values()
            .cloned()
            .collect();
        records.sort_by_key(|record| std::cmp::Reverse(record.id));
        records.truncate(limit as usize);
        Ok(records)
    }
}

/// Cache backend that fails every call.
pub struct FailingBackend;

#[async_trait]
impl CacheBackend for FailingBackend {
    async fn get(&self, _: &str, _: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::unavailable("down"))
    }
    async fn set(&self, _: &str, _: &str, _: String, _: Duration) -> Result<(), CacheError> {
        Err(CacheError::unavailable("down"))
    }
    async fn delete_namespace(&self, _: &str) -> Result<(), CacheError> {
        Err(CacheError::unavailable("down"))
    }
    async fn increment_score(&self, _: &str, _: &str, _: f64) -> Result<f64, CacheError> {
        Err(CacheError::unavailable("down"))
    }
    async fn range_by_score_desc(
        &self,
        _: &str,
        _: usize,
        _: usize,
    ) -> Result<Vec<String>, CacheError> {
        Err(CacheError::unavailable("down"))
    }
    async fn remove_member(&self, _: &str, _: &str) -> Result<(), CacheError> {
        Err(CacheError::unavailable("down"))
    }
}

pub struct Harness {
    pub store: Arc<TestStore>,
    pub backend: Arc<MemoryBackend>,
    pub knowledge_points: Arc<KnowledgePointService>,
    pub questions: Arc<QuestionService>,
}

/// Build both services over a fresh store and in-memory backend.
///
/// Must run inside a tokio runtime; the popularity workers are spawned
/// detached and stop when the services drop.
pub fn harness() -> Harness {
    harness_with_config(CacheConfig::default())
}

pub fn harness_with_config(config: CacheConfig) -> Harness {
    let store = TestStore::new();
    let backend = Arc::new(MemoryBackend::new());
    let shared: Arc<dyn CacheBackend> = backend.clone();

    let (knowledge_points, questions) = services_with(store.clone(), shared, config);
    Harness {
        store,
        backend,
        knowledge_points,
        questions,
    }
}

/// Build services over an arbitrary backend, for degraded-backend tests.
pub fn services_with(
    store: Arc<TestStore>,
    backend: Arc<dyn CacheBackend>,
    config: CacheConfig,
) -> (Arc<KnowledgePointService>, Arc<QuestionService>) {
    let cache = Arc::new(ReadThroughCache::new(backend.clone(), config.clone()));

    let (point_tracker, _point_worker) = PopularityTracker::<KnowledgePointRecord>::spawn(
        EntityKind::KnowledgePoint,
        backend.clone(),
        store.clone() as Arc<dyn RankedRepo<KnowledgePointRecord>>,
        config.clone(),
    );
    let (question_tracker, _question_worker) = PopularityTracker::<QuestionRecord>::spawn(
        EntityKind::Question,
        backend.clone(),
        store.clone() as Arc<dyn RankedRepo<QuestionRecord>>,
        config.clone(),
    );

    let knowledge_points = Arc::new(KnowledgePointService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        cache.clone(),
        point_tracker,
        config.clone(),
    ));
    let questions = Arc::new(QuestionService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        cache,
        question_tracker,
        config,
    ));
    (knowledge_points, questions)
}

pub async fn create_point(harness: &Harness, name: &str, category_id: i64) -> KnowledgePointRecord {
    harness
        .knowledge_points
        .create(CreateKnowledgePointParams {
            name: name.to_string(),
            description: format!("{name} description"),
            category_id,
        })
        .await
        .expect("create knowledge point")
}

pub async fn create_question(harness: &Harness, content: &str, category_id: i64) -> QuestionRecord {
    harness
        .questions
        .create(CreateQuestionParams {
            content: content.to_string(),
            answer: "42".to_string(),
            category_id,
            difficulty: 3,
        })
        .await
        .expect("create question")
}

/// Poll until `check` holds, or panic after five seconds.
pub async fn wait_for<F: Fn() -> bool>(check: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
