//! Popularity tracking and top-N ranking.
//!
//! Access events flow through a bounded channel into one worker task per
//! entity kind. The worker bumps the member's score on the kind's score
//! board (an atomic backend increment, so concurrent events never lose
//! updates) and then best-effort mirrors the new score onto the entity's
//! durable `hot` column. Nothing on this path can block or fail the read
//! that produced the event: a full queue drops the event, a backend or
//! store failure is logged and swallowed.
//!
//! `top_n` reads the board and resolves ids to entities through an ordered
//! batch lookup. When the board errors, is empty, or yields no usable ids,
//! the call degrades to the store's creation-recency ordering. That single
//! fallback is the only retry; if the recency query fails too, the error
//! surfaces to the caller.

use std::sync::Arc;

use metrics::counter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::application::repos::{RankedRepo, RepoError};
use crate::domain::types::EntityKind;

use super::backend::{CacheBackend, CacheError};
use super::config::CacheConfig;

pub struct PopularityTracker<E: Send + 'static> {
    kind: EntityKind,
    backend: Arc<dyn CacheBackend>,
    repo: Arc<dyn RankedRepo<E>>,
    config: CacheConfig,
    events: mpsc::Sender<i64>,
}

impl<E: Send + 'static> PopularityTracker<E> {
    /// Build a tracker and spawn its access worker.
    ///
    /// The worker runs until the tracker (the only sender) is dropped; the
    /// handle is returned so the entry point can await or abort it.
    pub fn spawn(
        kind: EntityKind,
        backend: Arc<dyn CacheBackend>,
        repo: Arc<dyn RankedRepo<E>>,
        config: CacheConfig,
    ) -> (Arc<Self>, JoinHandle<()>) {
        let (events, receiver) = mpsc::channel(config.access_queue_capacity_non_zero());

        let worker = AccessWorker {
            kind,
            backend: backend.clone(),
            repo: repo.clone(),
            config: config.clone(),
        };
        let handle = tokio::spawn(worker.run(receiver));

        let tracker = Arc::new(Self {
            kind,
            backend,
            repo,
            config,
            events,
        });
        (tracker, handle)
    }

    /// Record one access to `id`. Fire-and-forget: never blocks, never
    /// fails. A full queue drops the event and bumps a counter.
    pub fn record_access(&self, id: i64) {
        match self.events.try_send(id) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                counter!("studyhall_access_dropped_total", "kind" => self.kind.namespace())
                    .increment(1);
                debug!(kind = %self.kind, id, "access queue full, event dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(kind = %self.kind, id, "access worker stopped, event dropped");
            }
        }
    }

    /// The `n` most accessed entities, most accessed first.
    ///
    /// A request for zero results uses the configured default count.
    pub async fn top_n(&self, n: u32) -> Result<Vec<E>, RepoError> {
        let n = if n == 0 { self.config.popular_count } else { n }.max(1);
        let board = self.kind.score_board();

        let members = match tokio::time::timeout(
            self.config.backend_timeout(),
            self.backend.range_by_score_desc(board, 0, n as usize - 1),
        )
        .await
        .unwrap_or(Err(CacheError::Timeout))
        {
            Ok(members) => members,
            Err(err) => {
                warn!(kind = %self.kind, error = %err, "score board query failed");
                return self.recent(n).await;
            }
        };

        if members.is_empty() {
            debug!(kind = %self.kind, "score board empty");
            return self.recent(n).await;
        }

        // Malformed members are a data problem on the board, not a reason
        // to fail the whole request: skip them item by item.
        let mut ids = Vec::with_capacity(members.len());
        for member in &members {
            match member.parse::<i64>() {
                Ok(id) => ids.push(id),
                Err(_) => {
                    warn!(kind = %self.kind, member, "skipping malformed score board member");
                }
            }
        }
        if ids.is_empty() {
            return self.recent(n).await;
        }

        // Deleted entities drop out of the batch lookup; the ordering of
        // the survivors follows the board.
        let entities = match self.repo.list_by_ids(&ids).await {
            Ok(entities) => entities,
            Err(err) => {
                warn!(kind = %self.kind, error = %err, "ranked batch lookup failed");
                return self.recent(n).await;
            }
        };
        if entities.is_empty() {
            return self.recent(n).await;
        }

        Ok(entities)
    }

    /// Drop `id` from the score board. Called from delete paths so removed
    /// entities stop appearing in rankings; best-effort.
    pub async fn remove(&self, id: i64) {
        let board = self.kind.score_board();
        let result = tokio::time::timeout(
            self.config.backend_timeout(),
            self.backend.remove_member(board, &id.to_string()),
        )
        .await
        .unwrap_or(Err(CacheError::Timeout));

        if let Err(err) = result {
            warn!(kind = %self.kind, id, error = %err, "score board cleanup failed");
        }
    }

    async fn recent(&self, n: u32) -> Result<Vec<E>, RepoError> {
        counter!("studyhall_ranking_fallback_total", "kind" => self.kind.namespace())
            .increment(1);
        debug!(kind = %self.kind, "degrading to creation recency");
        self.repo.list_recent(n).await
    }
}

/// Background consumer of access events for one entity kind.
struct AccessWorker<E: Send + 'static> {
    kind: EntityKind,
    backend: Arc<dyn CacheBackend>,
    repo: Arc<dyn RankedRepo<E>>,
    config: CacheConfig,
}

impl<E: Send + 'static> AccessWorker<E> {
    async fn run(self, mut receiver: mpsc::Receiver<i64>) {
        while let Some(id) = receiver.recv().await {
            self.apply(id).await;
        }
        debug!(kind = %self.kind, "access worker draining complete");
    }

    async fn apply(&self, id: i64) {
        match self.repo.exists(id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(kind = %self.kind, id, "access recorded for missing entity");
                return;
            }
            Err(err) => {
                warn!(kind = %self.kind, id, error = %err, "existence check failed, access dropped");
                return;
            }
        }

        let score = match tokio::time::timeout(
            self.config.backend_timeout(),
            self.backend
                .increment_score(self.kind.score_board(), &id.to_string(), 1.0),
        )
        .await
        .unwrap_or(Err(CacheError::Timeout))
        {
            Ok(score) => score,
            Err(err) => {
                counter!("studyhall_access_dropped_total", "kind" => self.kind.namespace())
                    .increment(1);
                warn!(kind = %self.kind, id, error = %err, "score increment failed, access dropped");
                return;
            }
        };
        debug!(kind = %self.kind, id, score, "access counted");

        // The mirror lags the board by design; a failed mirror only means
        // the durable `hot` column stays behind until the next access.
        if let Err(err) = self.repo.update_hotness(id, score as i64).await {
            warn!(kind = %self.kind, id, error = %err, "hotness mirror failed");
        }
    }
}
