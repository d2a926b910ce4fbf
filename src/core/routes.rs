// HTTP routes configuration

use crate::core::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/create", post(crate::handlers::users::create_handler))
        .route("/read/{id}", get(crate::handlers::users::read_handler))
        .route("/delete/{id}", delete(crate::handlers::users::delete_handler))
        .route("/search", get(crate::handlers::users::search_handler))

        .route("/health", get(crate::handlers::health::health_handler))
        .route("/metrics", get(crate::handlers::metrics::metrics_handler))

        // 404 fallback for all unmatched routes
        .fallback(crate::handlers::fallback::fallback_handler)

        .with_state(state)
}
