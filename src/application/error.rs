use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{application::repos::RepoError, domain::error::DomainError, infra::error::InfraError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("resource not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(DomainError::NotFound { .. })
            | AppError::Repo(RepoError::NotFound)
            | AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Domain(DomainError::Validation { .. })
            | AppError::Repo(RepoError::InvalidInput { .. })
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Repo(RepoError::Duplicate { .. })
            | AppError::Repo(RepoError::Integrity { .. }) => StatusCode::CONFLICT,
            AppError::Repo(RepoError::Persistence(_))
            | AppError::Repo(RepoError::Timeout)
            | AppError::Infra(InfraError::Database { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Domain(DomainError::Invariant { .. })
            | AppError::Infra(_)
            | AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self.status_code() {
            StatusCode::NOT_FOUND => "Resource not found",
            StatusCode::BAD_REQUEST => "Request could not be processed",
            StatusCode::CONFLICT => "Request conflicts with existing data",
            StatusCode::SERVICE_UNAVAILABLE => "Service temporarily unavailable",
            _ => "Unexpected error occurred",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_not_found_maps_to_404() {
        assert_eq!(
            AppError::from(RepoError::NotFound).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn persistence_failure_maps_to_503() {
        assert_eq!(
            AppError::from(RepoError::Persistence("boom".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn validation_maps_to_400() {
        assert_eq!(
            AppError::validation("empty name").status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
