use crate::core::error::StoreError;
use crate::models::user::{NewUser, User};
use crate::stores::search::{SearchStream, DEFAULT_BUFFER_SIZE};
use crate::stores::user_store::{run_cancellable, UserStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// In-memory user store
///
/// All records live in one map behind a single lock: writers take it
/// exclusively, reads and search snapshots share it.
pub struct MemUserStore {
    users: Arc<RwLock<HashMap<Uuid, Arc<User>>>>,
    search_buffer: usize,
}

impl MemUserStore {
    pub const KIND: &'static str = "memory";

    pub fn new() -> Self {
        Self::with_search_buffer(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_search_buffer(search_buffer: usize) -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            search_buffer,
        }
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

impl Default for MemUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemUserStore {
    async fn create(&self, ctx: &CancellationToken, user: NewUser) -> Result<User, StoreError> {
        run_cancellable(ctx, async {
            let mut users = self.users.write().await;

            let mut id = Uuid::new_v4();
            while id.is_nil() || users.contains_key(&id) {
                id = Uuid::new_v4();
            }

            let user = user.into_user(id);
            users.insert(id, Arc::new(user.clone()));

            debug!(user_id = %id, "User created in memory");
            Ok(user)
        })
        .await
    }

    async fn read(&self, ctx: &CancellationToken, id: Uuid) -> Result<User, StoreError> {
        run_cancellable(ctx, async {
            self.users
                .read()
                .await
                .get(&id)
                .map(|user| User::clone(user))
                .ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn delete(&self, ctx: &CancellationToken, id: Uuid) -> Result<User, StoreError> {
        run_cancellable(ctx, async {
            let removed = self.users.write().await.remove(&id);

            match removed {
                Some(user) => {
                    debug!(user_id = %id, "User deleted from memory");
                    Ok(Arc::unwrap_or_clone(user))
                }
                None => Err(StoreError::NotFound),
            }
        })
        .await
    }

    async fn search(&self, ctx: &CancellationToken, query: &str) -> Result<SearchStream, StoreError> {
        // Point-in-time snapshot: later writes are not seen, later deletes
        // still emit the value captured here.
        let snapshot: Vec<Arc<User>> = run_cancellable(ctx, async {
            Ok(self
                .users
                .read()
                .await
                .values()
                .filter(|user| user.matches(query))
                .cloned()
                .collect())
        })
        .await?;

        debug!(query = %query, matches = snapshot.len(), "Memory search started");

        Ok(SearchStream::spawn(ctx, self.search_buffer, |sink| async move {
            for user in snapshot {
                if !sink.emit(User::clone(&user)).await {
                    debug!("Memory search stopped early");
                    return;
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{StreamExt, TryStreamExt};
    use std::collections::HashSet;

    async fn collect(stream: SearchStream) -> Vec<User> {
        stream.try_collect().await.unwrap()
    }

    async fn seed(store: &MemUserStore, ctx: &CancellationToken) -> (User, User) {
        let alice = store.create(ctx, NewUser::new("alice", "eng")).await.unwrap();
        let bob = store.create(ctx, NewUser::new("bob", "sales")).await.unwrap();
        (alice, bob)
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let store = MemUserStore::new();
        let ctx = CancellationToken::new();

        let created = store
            .create(&ctx, NewUser::new("alice", "eng").with_permissions(3))
            .await
            .unwrap();

        assert!(!created.id.is_nil());
        assert_eq!(created.permissions, 3);
        assert_eq!(store.read(&ctx, created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_create_assigns_distinct_ids() {
        let store = MemUserStore::new();
        let ctx = CancellationToken::new();

        let a = store.create(&ctx, NewUser::new("same", "x")).await.unwrap();
        let b = store.create(&ctx, NewUser::new("same", "x")).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let store = MemUserStore::new();
        let ctx = CancellationToken::new();

        assert_eq!(store.read(&ctx, Uuid::new_v4()).await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_delete_returns_prior_state_then_not_found() {
        let store = MemUserStore::new();
        let ctx = CancellationToken::new();
        let (alice, _) = seed(&store, &ctx).await;

        assert_eq!(store.delete(&ctx, alice.id).await.unwrap(), alice);
        assert_eq!(store.read(&ctx, alice.id).await, Err(StoreError::NotFound));
        assert_eq!(store.delete(&ctx, alice.id).await, Err(StoreError::NotFound));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_delete_exactly_one_wins() {
        let store = Arc::new(MemUserStore::new());
        let ctx = CancellationToken::new();
        let id = store.create(&ctx, NewUser::new("target", "")).await.unwrap().id;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move { store.delete(&ctx, id).await }));
        }

        let mut wins = 0;
        let mut not_found = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(StoreError::NotFound) => not_found += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(not_found, 7);
    }

    #[tokio::test]
    async fn test_search_scenario() {
        let store = MemUserStore::new();
        let ctx = CancellationToken::new();
        let (alice, bob) = seed(&store, &ctx).await;

        let found = collect(store.search(&ctx, "ali").await.unwrap()).await;
        assert_eq!(found, vec![alice.clone()]);

        // "al" is in alice's name and in bob's data ("sales")
        let found: HashSet<Uuid> = collect(store.search(&ctx, "al").await.unwrap())
            .await
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(found, HashSet::from([alice.id, bob.id]));

        // "s" only occurs in bob's data
        let found = collect(store.search(&ctx, "s").await.unwrap()).await;
        assert_eq!(found, vec![bob.clone()]);

        let all: HashSet<Uuid> = collect(store.search(&ctx, "").await.unwrap())
            .await
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(all, HashSet::from([alice.id, bob.id]));

        store.delete(&ctx, alice.id).await.unwrap();
        assert_eq!(store.read(&ctx, bob.id).await.unwrap(), bob);
    }

    #[tokio::test]
    async fn test_search_empty_query_emits_each_record_once() {
        let store = MemUserStore::with_search_buffer(2);
        let ctx = CancellationToken::new();

        for i in 0..25 {
            store
                .create(&ctx, NewUser::new(format!("user{}", i), "payload"))
                .await
                .unwrap();
        }

        let found = collect(store.search(&ctx, "").await.unwrap()).await;
        let unique: HashSet<Uuid> = found.iter().map(|u| u.id).collect();

        assert_eq!(found.len(), 25);
        assert_eq!(unique.len(), 25);
    }

    #[tokio::test]
    async fn test_search_no_match() {
        let store = MemUserStore::new();
        let ctx = CancellationToken::new();
        seed(&store, &ctx).await;

        assert!(collect(store.search(&ctx, "zzz").await.unwrap()).await.is_empty());
    }

    #[tokio::test]
    async fn test_search_snapshot_survives_concurrent_writes() {
        let store = MemUserStore::with_search_buffer(1);
        let ctx = CancellationToken::new();
        let (alice, bob) = seed(&store, &ctx).await;

        let mut stream = store.search(&ctx, "").await.unwrap();
        let first = stream.next().await.unwrap().unwrap();

        // Remove both records and add a new one mid-search
        store.delete(&ctx, alice.id).await.unwrap();
        store.delete(&ctx, bob.id).await.unwrap();
        store.create(&ctx, NewUser::new("carol", "late")).await.unwrap();

        let rest = collect(stream).await;
        let mut ids: Vec<Uuid> = rest.iter().map(|u| u.id).collect();
        ids.push(first.id);
        ids.sort();

        let mut expected = vec![alice.id, bob.id];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_search_cancel_closes_stream() {
        let store = MemUserStore::with_search_buffer(1);
        let ctx = CancellationToken::new();

        for i in 0..50 {
            store.create(&ctx, NewUser::new(format!("u{}", i), "")).await.unwrap();
        }

        let mut stream = store.search(&ctx, "").await.unwrap();
        assert!(stream.next().await.unwrap().is_ok());

        ctx.cancel();

        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_operations_on_cancelled_context() {
        let store = MemUserStore::new();
        let ctx = CancellationToken::new();
        let (alice, _) = seed(&store, &ctx).await;

        let cancelled = CancellationToken::new();
        cancelled.cancel();

        assert_eq!(
            store.create(&cancelled, NewUser::new("x", "y")).await,
            Err(StoreError::Cancelled)
        );
        assert_eq!(store.read(&cancelled, alice.id).await, Err(StoreError::Cancelled));
        assert_eq!(store.delete(&cancelled, alice.id).await, Err(StoreError::Cancelled));
        assert!(matches!(
            store.search(&cancelled, "").await,
            Err(StoreError::Cancelled)
        ));

        // Nothing was removed or added
        assert_eq!(store.len().await, 2);
    }
}
