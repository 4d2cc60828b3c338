//! Shared domain vocabulary.

use std::fmt;

/// The kinds of entities that participate in caching and popularity ranking.
///
/// Each kind owns one cache namespace and one score board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    KnowledgePoint,
    Question,
}

impl EntityKind {
    /// Logical cache region for this kind. All derived read-views of the
    /// kind live under this namespace and are evicted together.
    pub const fn namespace(self) -> &'static str {
        match self {
            EntityKind::KnowledgePoint => "knowledge_point",
            EntityKind::Question => "question",
        }
    }

    /// Name of the sorted member → score structure tracking access counts.
    pub const fn score_board(self) -> &'static str {
        match self {
            EntityKind::KnowledgePoint => "knowledge_point:view_count",
            EntityKind::Question => "question:view_count",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}
