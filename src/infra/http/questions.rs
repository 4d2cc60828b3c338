use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::application::error::AppError;
use crate::application::repos::{CreateQuestionParams, UpdateQuestionParams};

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
    pub content: String,
    pub answer: String,
    pub category_id: i64,
    pub difficulty: i16,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
    pub content: String,
    pub answer: String,
    pub category_id: i64,
    pub difficulty: i16,
}

pub async fn get(
    State(state): State<HttpState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .questions
        .get_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(record))
}

pub async fn list(
    State(state): State<HttpState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let records = state.questions.list_by_category(query.category_id).await?;
    Ok(Json(records))
}

pub async fn popular(
    State(state): State<HttpState>,
    Query(query): Query<PopularQuery>,
) -> Result<impl IntoResponse, AppError> {
    let records = state.questions.popular(query.count.unwrap_or(0)).await?;
    Ok(Json(records))
}

pub async fn create(
    State(state): State<HttpState>,
    Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .questions
        .create(CreateQuestionParams {
            content: body.content,
            answer: body.answer,
            category_id: body.category_id,
            difficulty: body.difficulty,
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
        .questions
        .update(UpdateQuestionParams {
            id,
            content: body.content,
            answer: body.answer,
            category_id: body.category_id,
            difficulty: body.difficulty,
        })
        .await?;
    Ok(Json(record))
}

pub async fn delete(
    State(state): State<HttpState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.questions.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
