use axum::{
    http::Uri,
    response::{IntoResponse, Response},
};
use crate::core::error::ApiError;

pub async fn fallback_handler(uri: Uri) -> Response {
    ApiError::UnknownRoute(format!(
        "{}. Valid endpoints: /create, /read/{{id}}, /delete/{{id}}, /search, /health, /metrics",
        uri.path()
    ))
    .into_response()
}
