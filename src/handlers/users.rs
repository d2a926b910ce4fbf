use crate::core::context::RequestContext;
use crate::core::error::{ApiError, StoreError};
use crate::core::state::AppState;
use crate::metrics::collector::Metrics;
use crate::models::api::{CreateUserRequest, SearchQuery, UserResponse};
use crate::stores::search::{SearchItem, SearchStream};
use axum::{
    body::{Body, Bytes},
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    BoxError,
};
use futures::{stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Create a user
///
/// POST /create  {"name": "...", "data": "..."}
pub async fn create_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidParameter(e.body_text()))?;

    let ctx = RequestContext::with_deadline(state.request_timeout());
    let user = state
        .users
        .create(ctx.token(), request.into())
        .await
        .map_err(|e| failed(&state, "create", e))?;

    state.metrics.increment_created();
    info!(user_id = %user.id, "User created");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))).into_response())
}

/// GET /read/{id}
pub async fn read_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;

    let ctx = RequestContext::with_deadline(state.request_timeout());
    let user = state
        .users
        .read(ctx.token(), id)
        .await
        .map_err(|e| failed(&state, "read", e))?;

    state.metrics.increment_read();

    Ok((StatusCode::OK, Json(UserResponse::from(user))).into_response())
}

/// Delete a user, returning the removed record
///
/// DELETE /delete/{id}
pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;

    let ctx = RequestContext::with_deadline(state.request_timeout());
    let user = state
        .users
        .delete(ctx.token(), id)
        .await
        .map_err(|e| failed(&state, "delete", e))?;

    state.metrics.increment_deleted();
    info!(user_id = %user.id, "User deleted");

    Ok((StatusCode::OK, Json(UserResponse::from(user))).into_response())
}

/// Stream matching users as a JSON array
///
/// GET /search?q=<substring>
///
/// Records are written as the store produces them. The search is cancelled
/// as soon as the client stops reading and the body is dropped.
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let ctx = RequestContext::new();
    let results = state
        .users
        .search(ctx.token(), &params.q)
        .await
        .map_err(|e| failed(&state, "search", e))?;

    state.metrics.increment_searches();
    debug!(query = %params.q, "Search stream opened");

    let search = SearchBody {
        results,
        metrics: Arc::clone(&state.metrics),
        written: 0,
        _ctx: ctx,
    };
    let items = stream::unfold(search, |mut search| async move {
        let item = search.results.next().await?;
        let chunk = search.encode(item);
        Some((chunk, search))
    });

    let body = stream::once(async { Ok::<_, BoxError>(Bytes::from_static(b"[")) })
        .chain(items)
        .chain(stream::once(async { Ok(Bytes::from_static(b"]")) }));

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        Body::from_stream(body),
    )
        .into_response())
}

/// State of a streamed search response.
///
/// Owns the request context, so dropping the response body cancels the search.
struct SearchBody {
    results: SearchStream,
    metrics: Arc<Metrics>,
    written: usize,
    _ctx: RequestContext,
}

impl SearchBody {
    fn encode(&mut self, item: SearchItem) -> Result<Bytes, BoxError> {
        let user = item.inspect_err(|e| {
            self.metrics.increment_failed();
            warn!(error = %e, "Search stream aborted");
        })?;
        self.metrics.increment_search_results();

        let mut chunk = if self.written == 0 { Vec::new() } else { b",".to_vec() };
        serde_json::to_writer(&mut chunk, &UserResponse::from(user))?;
        self.written += 1;

        Ok(Bytes::from(chunk))
    }
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|e| ApiError::InvalidParameter(format!("id: {}", e)))
}

fn failed(state: &AppState, op: &'static str, err: StoreError) -> ApiError {
    state.metrics.increment_failed();

    match &err {
        StoreError::BadInput(_) | StoreError::NotFound => {
            debug!(op, error = %err, "User operation rejected")
        }
        StoreError::Cancelled => warn!(op, "User operation cancelled"),
        StoreError::StorageUnavailable(_) => error!(op, error = %err, "User store unavailable"),
    }

    ApiError::from(err)
}
