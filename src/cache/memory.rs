//! In-process cache backend.
//!
//! Serves deployments that run without an external cache, and every test.
//! Namespaces map to sharded hash maps with per-entry expiry; score boards
//! map members to scores. Increments go through the map's entry lock, which
//! gives the atomicity the [`CacheBackend`] contract requires.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::backend::{CacheBackend, CacheError};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Default)]
pub struct MemoryBackend {
    namespaces: DashMap<String, DashMap<String, Entry>>,
    boards: DashMap<String, DashMap<String, f64>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, CacheError> {
        let Some(entries) = self.namespaces.get(namespace) else {
            return Ok(None);
        };

        // Expired entries are dropped lazily on the next read.
        if let Some(entry) = entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }

        entries.remove_if(key, |_, entry| entry.expires_at <= Instant::now());
        Ok(None)
    }

    async fn set(
        &self,
        namespace: &str,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let entries = self
            .namespaces
            .entry(namespace.to_string())
            .or_insert_with(DashMap::new);
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), CacheError> {
        // Removing the whole inner map makes the evict atomic for readers.
        self.namespaces.remove(namespace);
        Ok(())
    }

    async fn increment_score(
        &self,
        board: &str,
        member: &str,
        delta: f64,
    ) -> Result<f64, CacheError> {
        let members = self
            .boards
            .entry(board.to_string())
            .or_insert_with(DashMap::new);
        let mut score = members.entry(member.to_string()).or_insert(0.0);
        *score += delta;
        Ok(*score)
    }

    async fn range_by_score_desc(
        &self,
        board: &str,
        start: usize,
        stop: usize,
    ) -> Result<Vec<String>, CacheError> {
        let Some(members) = self.boards.get(board) else {
            return Ok(Vec::new());
        };

        let mut ranked: Vec<(String, f64)> = members
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        // Score descending; member ascending keeps ties stable across calls.
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        Ok(ranked
            .into_iter()
            .skip(start)
            .take(stop.saturating_sub(start) + 1)
            .map(|(member, _)| member)
            .collect())
    }

    async fn remove_member(&self, board: &str, member: &str) -> Result<(), CacheError> {
        if let Some(members) = self.boards.get(board) {
            members.remove(member);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_roundtrip_within_ttl() {
        let backend = MemoryBackend::new();

        backend
            .set("kp", "detail:1", "value".into(), Duration::from_secs(60))
            .await
            .expect("set");

        assert_eq!(
            backend.get("kp", "detail:1").await.expect("get"),
            Some("value".to_string())
        );
        assert_eq!(backend.get("kp", "detail:2").await.expect("get"), None);
    }

    #[tokio::test]
    async fn expired_entries_are_not_served() {
        let backend = MemoryBackend::new();

        backend
            .set("kp", "detail:1", "value".into(), Duration::from_millis(10))
            .await
            .expect("set");
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(backend.get("kp", "detail:1").await.expect("get"), None);
    }

    #[tokio::test]
    async fn delete_namespace_removes_every_key() {
        let backend = MemoryBackend::new();

        for key in ["detail:1", "detail:2", "category:9"] {
            backend
                .set("kp", key, "value".into(), Duration::from_secs(60))
                .await
                .expect("set");
        }
        backend
            .set("question", "detail:1", "value".into(), Duration::from_secs(60))
            .await
            .expect("set");

        backend.delete_namespace("kp").await.expect("evict");

        for key in ["detail:1", "detail:2", "category:9"] {
            assert_eq!(backend.get("kp", key).await.expect("get"), None);
        }
        // Other namespaces are untouched.
        assert!(backend.get("question", "detail:1").await.expect("get").is_some());
    }

    #[tokio::test]
    async fn increment_creates_member_at_delta() {
        let backend = MemoryBackend::new();

        assert_eq!(
            backend.increment_score("board", "1", 1.0).await.expect("incr"),
            1.0
        );
        assert_eq!(
            backend.increment_score("board", "1", 1.0).await.expect("incr"),
            2.0
        );
    }

    #[tokio::test]
    async fn concurrent_increments_lose_no_updates() {
        use std::sync::Arc;

        let backend = Arc::new(MemoryBackend::new());
        let mut handles = Vec::new();
        for _ in 0..64 {
            let backend = backend.clone();
            handles.push(tokio::spawn(async move {
                backend.increment_score("board", "7", 1.0).await.expect("incr");
            }));
        }
        for handle in handles {
            handle.await.expect("join");
        }

        assert_eq!(
            backend
                .range_by_score_desc("board", 0, 0)
                .await
                .expect("range"),
            vec!["7".to_string()]
        );
        assert_eq!(
            backend.increment_score("board", "7", 0.0).await.expect("incr"),
            64.0
        );
    }

    #[tokio::test]
    async fn range_orders_by_score_descending() {
        let backend = MemoryBackend::new();

        backend.increment_score("board", "a", 1.0).await.expect("incr");
        backend.increment_score("board", "b", 3.0).await.expect("incr");
        backend.increment_score("board", "c", 2.0).await.expect("incr");

        let top = backend.range_by_score_desc("board", 0, 1).await.expect("range");
        assert_eq!(top, vec!["b".to_string(), "c".to_string()]);

        let all = backend.range_by_score_desc("board", 0, 9).await.expect("range");
        assert_eq!(all, vec!["b".to_string(), "c".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn remove_member_drops_it_from_ranking() {
        let backend = MemoryBackend::new();

        backend.increment_score("board", "a", 2.0).await.expect("incr");
        backend.increment_score("board", "b", 1.0).await.expect("incr");
        backend.remove_member("board", "a").await.expect("remove");

        let all = backend.range_by_score_desc("board", 0, 9).await.expect("range");
        assert_eq!(all, vec!["b".to_string()]);
    }
}
