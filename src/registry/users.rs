use crate::core::error::StoreError;
use crate::models::user::{NewUser, User};
use crate::stores::search::SearchStream;
use crate::stores::user_store::UserStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// Entry point for user operations.
///
/// Holds the backend chosen at startup and forwards every call to it.
/// Inputs the store can never accept (nil ids, nameless users) are
/// rejected here with `BadInput`; everything else passes through as-is.
#[derive(Clone)]
pub struct UserRegistry {
    store: Arc<dyn UserStore>,
}

impl UserRegistry {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, ctx: &CancellationToken, user: NewUser) -> Result<User, StoreError> {
        if user.name.is_empty() {
            return Err(StoreError::BadInput("name is required".to_string()));
        }

        self.store.create(ctx, user).await
    }

    pub async fn read(&self, ctx: &CancellationToken, id: Uuid) -> Result<User, StoreError> {
        check_id(id)?;
        self.store.read(ctx, id).await
    }

    pub async fn delete(&self, ctx: &CancellationToken, id: Uuid) -> Result<User, StoreError> {
        check_id(id)?;
        self.store.delete(ctx, id).await
    }

    pub async fn search(&self, ctx: &CancellationToken, query: &str) -> Result<SearchStream, StoreError> {
        debug!(query = %query, "Search requested");
        self.store.search(ctx, query).await
    }
}

fn check_id(id: Uuid) -> Result<(), StoreError> {
    if id.is_nil() {
        return Err(StoreError::BadInput("nil user id".to_string()));
    }
    Ok(())
}
