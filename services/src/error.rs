//! HTTP error type shared by every handler.

use crate::database::SqlStorageError;
use crate::media::{FileStorageError, ImageError};
use crate::users::storage::UserStorageError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Logged; clients only see a generic message.
    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Validation failure on a single payload field.
    pub fn field(field: &str, message: impl std::fmt::Display) -> Self {
        Self::BadRequest(format!("{field}: {message}"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.kind();
        let message = match self {
            Self::Internal(detail) => {
                tracing::error!(%detail, "internal error");
                "Internal server error".to_owned()
            }
            Self::BadRequest(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::NotFound(message) => message,
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

impl From<SqlStorageError> for ApiError {
    fn from(err: SqlStorageError) -> Self {
        match err {
            SqlStorageError::NotFound(what) => Self::NotFound(format!("Not found: {what}")),
            SqlStorageError::Conflict(detail) | SqlStorageError::ForeignKey(detail) => {
                Self::BadRequest(detail)
            }
            SqlStorageError::Db(detail) => Self::Internal(detail),
        }
    }
}

impl From<UserStorageError> for ApiError {
    fn from(err: UserStorageError) -> Self {
        match err {
            UserStorageError::UserAlreadyExists(_) | UserStorageError::InvalidInput(_) => {
                Self::BadRequest(err.to_string())
            }
            UserStorageError::UserNotFound(_) => Self::NotFound(err.to_string()),
            UserStorageError::StorageError(detail) => Self::Internal(detail),
        }
    }
}

impl From<FileStorageError> for ApiError {
    fn from(err: FileStorageError) -> Self {
        match err {
            FileStorageError::NotFound(_) | FileStorageError::InvalidPath(_) => {
                Self::NotFound(err.to_string())
            }
            FileStorageError::StorageError(detail) => Self::Internal(detail),
        }
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        Self::field("image", err)
    }
}

/// Malformed or mistyped request bodies are validation failures.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reasons: Vec<String> = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map_or_else(|| e.code.to_string(), ToString::to_string)
                    })
                    .collect();
                format!("{field}: {}", reasons.join(", "))
            })
            .collect();
        fields.sort();
        Self::BadRequest(fields.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn renders_kind_and_message() {
        let (status, body) = body_json(ApiError::field("ingredients", "must not be empty")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
        assert_eq!(body["message"], "ingredients: must not be empty");
    }

    #[tokio::test]
    async fn internal_detail_is_hidden() {
        let (status, body) = body_json(ApiError::Internal("pool timed out".to_owned())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], "Internal server error");
    }

    #[test]
    fn storage_errors_map_to_statuses() {
        let err: ApiError = SqlStorageError::Db("boom".to_owned()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let err: ApiError = SqlStorageError::NotFound("recipe 1".to_owned()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        let err: ApiError = UserStorageError::UserAlreadyExists("bob".to_owned()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn json_rejections_become_bad_requests() {
        use axum::extract::{FromRequest, Request};

        let request = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"cooking_time": "ten"}"#))
            .unwrap();
        let rejection = Json::<std::collections::HashMap<String, i64>>::from_request(request, &())
            .await
            .unwrap_err();

        let (status, body) = body_json(rejection.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
        assert!(body["message"].as_str().unwrap().contains("invalid type"));
    }
}
