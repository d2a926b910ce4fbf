// Centralized error handling for the registry

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

/// Errors returned by every store operation and passed through the registry unchanged
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Malformed identifier or missing required field. Not retryable.
    #[error("Bad input: {0}")]
    BadInput(String),

    #[error("User not found")]
    NotFound,

    /// Backend unreachable or failed unexpectedly. Callers may retry with backoff.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::StorageUnavailable(other.to_string()),
        }
    }
}

/// Errors surfaced by HTTP handlers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid endpoint: {0}")]
    UnknownRoute(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::UnknownRoute(_) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::BadInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::StorageUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store(StoreError::Cancelled) => StatusCode::REQUEST_TIMEOUT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use crate::models::api::ErrorResponse;

        let status = self.status();

        // Backend details stay in the logs
        let error = match &self {
            ApiError::Store(StoreError::StorageUnavailable(_)) => "Storage unavailable".to_string(),
            _ => self.to_string(),
        };

        (
            status,
            Json(ErrorResponse {
                success: false,
                error,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert_eq!(StoreError::from(sqlx::Error::RowNotFound), StoreError::NotFound);
    }

    #[test]
    fn test_pool_timeout_maps_to_unavailable() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::StorageUnavailable(_)));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(StoreError::BadInput("nil id".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::from(StoreError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(StoreError::StorageUnavailable("down".to_string())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ApiError::from(StoreError::Cancelled).status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            ApiError::InvalidParameter("id".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_unavailable_hides_backend_detail() {
        use axum::body::Body;
        use http_body_util::BodyExt;
        use crate::models::api::ErrorResponse;

        let response =
            ApiError::from(StoreError::StorageUnavailable("connection refused".to_string()))
                .into_response();

        let (parts, body) = response.into_parts();
        assert_eq!(parts.status, StatusCode::SERVICE_UNAVAILABLE);

        let bytes = Body::new(body).collect().await.unwrap().to_bytes();
        let err: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(!err.success);
        assert_eq!(err.error, "Storage unavailable");
    }
}
