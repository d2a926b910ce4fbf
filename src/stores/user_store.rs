use crate::core::error::StoreError;
use crate::models::user::{NewUser, User};
use crate::stores::search::SearchStream;
use async_trait::async_trait;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Storage contract implemented by every backend.
///
/// Each operation takes the caller's cancellation token. Single-value
/// operations return `StoreError::Cancelled` once it fires; `search` stops
/// producing and closes its stream.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new record under a freshly generated id and return the stored copy.
    async fn create(&self, ctx: &CancellationToken, user: NewUser) -> Result<User, StoreError>;

    async fn read(&self, ctx: &CancellationToken, id: Uuid) -> Result<User, StoreError>;

    /// Remove a record and return its prior state.
    ///
    /// Lookup and removal are atomic: of several concurrent deletes of the
    /// same id exactly one succeeds, the rest get `NotFound`.
    async fn delete(&self, ctx: &CancellationToken, id: Uuid) -> Result<User, StoreError>;

    /// Stream every record whose name or data contains `query`.
    async fn search(&self, ctx: &CancellationToken, query: &str) -> Result<SearchStream, StoreError>;
}

/// Race `op` against cancellation of `ctx`.
pub async fn run_cancellable<T, F>(ctx: &CancellationToken, op: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    if ctx.is_cancelled() {
        return Err(StoreError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(StoreError::Cancelled),
        res = op => res,
    }
}
