//! Durable records owned by the entity store.
//!
//! The `hot` field on ranked records is a cached projection of the score
//! board maintained by the popularity tracker. It is mirrored
//! asynchronously and may lag behind the live score; the score board, not
//! this column, is the ranking source of truth.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A unit of learning content (e.g. "Java collections framework").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgePointRecord {
    /// Store-assigned identifier.
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category_id: i64,
    /// Mirrored access count, see module docs.
    pub hot: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// An exam question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: i64,
    pub content: String,
    pub answer: String,
    pub category_id: i64,
    /// 1 (easiest) through 5 (hardest).
    pub difficulty: i16,
    /// Mirrored access count, see module docs.
    pub hot: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Many-to-many link between a knowledge point and a question.
///
/// The store owns the canonical link; the cache only ever holds derived
/// read-views of it ("questions for point K", "points for question Q").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgePointQuestionRecord {
    pub id: i64,
    pub knowledge_point_id: i64,
    pub question_id: i64,
}
