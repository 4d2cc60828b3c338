//! Cache key builders.
//!
//! Keys are derived deterministically from query parameters so that the
//! same query always maps to the same `(namespace, key)` pair. Key prefixes
//! describe the query shape; the namespace comes from
//! [`EntityKind::namespace`](crate::domain::types::EntityKind::namespace).

/// Single-entity detail lookup.
pub fn detail(id: i64) -> String {
    format!("detail:{id}")
}

/// Entities belonging to one category.
pub fn category(category_id: i64) -> String {
    format!("category:{category_id}")
}

/// Questions linked to one knowledge point.
pub fn questions_for_point(knowledge_point_id: i64) -> String {
    format!("questions:{knowledge_point_id}")
}

/// Knowledge points linked to one question.
pub fn points_for_question(question_id: i64) -> String {
    format!("question_knowledge_points:{question_id}")
}
