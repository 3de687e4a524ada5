//! HTTP handlers

pub mod comments;
pub mod posts;
pub mod users;
pub mod ws;

use crate::services::ServiceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use postboard_core::StoreError;
use serde::{Deserialize, Serialize};

pub async fn health() -> &'static str {
    "OK"
}

/// `?page=n` on listing routes, zero-based
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Service error rendered as a status code and a JSON body
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::UserNotFound(_)
            | ServiceError::PostNotFound(_)
            | ServiceError::CommentNotFound(_)
            | ServiceError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServiceError::AuthorNotFound(_) | ServiceError::ParentMismatch { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServiceError::CommentsDisabled(_) => StatusCode::FORBIDDEN,
            ServiceError::Store(StoreError::AlreadyExists(_))
            | ServiceError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            ServiceError::Store(StoreError::AlreadyDeleted(_)) => StatusCode::GONE,
            ServiceError::Store(StoreError::InvalidConfiguration(_))
            | ServiceError::Store(StoreError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", self.0);
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };
        let body = ErrorBody {
            code: self.0.code().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ServiceError::PostNotFound("1".into()), StatusCode::NOT_FOUND),
            (ServiceError::AuthorNotFound("1".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (ServiceError::CommentsDisabled("1".into()), StatusCode::FORBIDDEN),
            (
                StoreError::AlreadyExists("alice".into()).into(),
                StatusCode::CONFLICT,
            ),
            (
                StoreError::already_deleted("post", "1").into(),
                StatusCode::GONE,
            ),
            (
                StoreError::Backend("disk".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }

    #[test]
    fn test_page_query_defaults_to_first_page() {
        let query: PageQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page, 0);
    }
}
