//! HTTP surface: JSON handlers over the application facades.

mod knowledge_points;
mod questions;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tracing::warn;

use crate::application::knowledge_points::KnowledgePointService;
use crate::application::questions::QuestionService;

use super::db::PostgresRepositories;

#[derive(Clone)]
pub struct HttpState {
    pub knowledge_points: Arc<KnowledgePointService>,
    pub questions: Arc<QuestionService>,
    pub db: Option<PostgresRepositories>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/v1/knowledge-points",
            get(knowledge_points::list).post(knowledge_points::create),
        )
        .route("/api/v1/knowledge-points/popular", get(knowledge_points::popular))
        .route(
            "/api/v1/knowledge-points/{id}",
            get(knowledge_points::get)
                .put(knowledge_points::update)
                .delete(knowledge_points::delete),
        )
        .route(
            "/api/v1/knowledge-points/{id}/questions",
            get(knowledge_points::questions_for_point).post(knowledge_points::attach_questions),
        )
        .route(
            "/api/v1/knowledge-points/{id}/questions/{question_id}",
            axum::routing::delete(knowledge_points::detach_question),
        )
        .route(
            "/api/v1/questions",
            get(questions::list).post(questions::create),
        )
        .route("/api/v1/questions/popular", get(questions::popular))
        .route(
            "/api/v1/questions/{id}",
            get(questions::get)
                .put(questions::update)
                .delete(questions::delete),
        )
        .route(
            "/api/v1/questions/{id}/knowledge-points",
            get(knowledge_points::points_for_question),
        )
        .with_state(state)
}

async fn health(State(state): State<HttpState>) -> Response {
    let Some(db) = state.db.as_ref() else {
        return StatusCode::NO_CONTENT.into_response();
    };

    match db.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            warn!(error = %err, "database health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": "database unavailable"})),
            )
                .into_response()
        }
    }
}
