use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::application::error::AppError;
use crate::application::repos::{CreateKnowledgePointParams, UpdateKnowledgePointParams};

use super::HttpState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub count: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
    pub name: String,
    pub description: String,
    pub category_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
    pub name: String,
    pub description: String,
    pub category_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct AttachBody {
    pub question_ids: Vec<i64>,
}

pub async fn get(
    State(state): State<HttpState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .knowledge_points
        .get_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(record))
}

pub async fn list(
    State(state): State<HttpState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let records = state
        .knowledge_points
        .list_by_category(query.category_id)
        .await?;
    Ok(Json(records))
}

pub async fn popular(
    State(state): State<HttpState>,
    Query(query): Query<PopularQuery>,
) -> Result<impl IntoResponse, AppError> {
    let records = state
        .knowledge_points
        .popular(query.count.unwrap_or(0))
        .await?;
    Ok(Json(records))
}

pub async fn create(
    State(state): State<HttpState>,
    Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .knowledge_points
        .create(CreateKnowledgePointParams {
            name: body.name,
            description: body.description,
            category_id: body.category_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update(
    State(state): State<HttpState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateBody>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .knowledge_points
        .update(UpdateKnowledgePointParams {
            id,
            name: body.name,
            description: body.description,
            category_id: body.category_id,
        })
        .await?;
    Ok(Json(record))
}

pub async fn delete(
    State(state): State<HttpState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.knowledge_points.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn questions_for_point(
    State(state): State<HttpState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let records = state.knowledge_points.questions_for_point(id).await?;
    Ok(Json(records))
}

pub async fn points_for_question(
    State(state): State<HttpState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let records = state
        .knowledge_points
        .knowledge_points_for_question(id)
        .await?;
    Ok(Json(records))
}

pub async fn attach_questions(
    State(state): State<HttpState>,
    Path(id): Path<i64>,
    Json(body): Json<AttachBody>,
) -> Result<impl IntoResponse, AppError> {
    state
        .knowledge_points
        .attach_questions(id, &body.question_ids)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn detach_question(
    State(state): State<HttpState>,
    Path((id, question_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    state
        .knowledge_points
        .detach_question(id, question_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
