// PostgreSQL user store

use crate::core::config::DatabaseConfig;
use crate::core::error::StoreError;
use crate::models::user::{NewUser, User};
use crate::stores::search::SearchStream;
use crate::stores::user_store::{run_cancellable, UserStore};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        data TEXT NOT NULL,
        permissions INTEGER NOT NULL DEFAULT 0
    )
"#;

const INSERT_USER: &str = r#"
    INSERT INTO users (id, name, data, permissions)
    VALUES ($1, $2, $3, $4)
    RETURNING id, name, data, permissions
"#;

const SELECT_USER: &str = r#"
    SELECT id, name, data, permissions FROM users WHERE id = $1
"#;

// Single statement, so two deleters can never both see the row
const DELETE_USER: &str = r#"
    DELETE FROM users WHERE id = $1
    RETURNING id, name, data, permissions
"#;

const SEARCH_USERS: &str = r#"
    SELECT id, name, data, permissions FROM users
    WHERE name LIKE $1 ESCAPE '\' OR data LIKE $1 ESCAPE '\'
"#;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    data: String,
    permissions: i32,
}

impl UserRow {
    fn into_user(self) -> Result<User, StoreError> {
        if self.id.is_nil() {
            return Err(StoreError::StorageUnavailable(
                "stored row has nil id".to_string(),
            ));
        }

        Ok(User {
            id: self.id,
            name: self.name,
            data: self.data,
            permissions: self.permissions,
        })
    }
}

/// Build a LIKE pattern matching `query` literally anywhere in the column.
pub fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// User store backed by a `users` table.
///
/// Holds one connection pool for the lifetime of the process. Every
/// operation borrows a connection only while its query runs.
pub struct PgUserStore {
    pool: PgPool,
    search_buffer: usize,
}

impl PgUserStore {
    pub const KIND: &'static str = "postgres";

    /// Open the pool and make sure the `users` table exists.
    pub async fn connect(
        url: &str,
        config: &DatabaseConfig,
        search_buffer: usize,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(url)
            .await?;

        let store = Self::from_pool(pool, search_buffer);
        store.ensure_schema().await?;

        info!(
            max_connections = config.max_connections,
            acquire_timeout_secs = config.acquire_timeout_secs,
            "PostgreSQL store connected"
        );

        Ok(store)
    }

    pub fn from_pool(pool: PgPool, search_buffer: usize) -> Self {
        Self {
            pool,
            search_buffer,
        }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, ctx: &CancellationToken, user: NewUser) -> Result<User, StoreError> {
        run_cancellable(ctx, async {
            let id = Uuid::new_v4();

            let row: UserRow = sqlx::query_as(INSERT_USER)
                .bind(id)
                .bind(&user.name)
                .bind(&user.data)
                .bind(user.permissions)
                .fetch_one(&self.pool)
                .await?;

            debug!(user_id = %row.id, "User inserted");
            row.into_user()
        })
        .await
    }

    async fn read(&self, ctx: &CancellationToken, id: Uuid) -> Result<User, StoreError> {
        run_cancellable(ctx, async {
            // Only a completed query with no row counts as absent; timeouts
            // and connection errors surface as StorageUnavailable.
            let row: Option<UserRow> = sqlx::query_as(SELECT_USER)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

            row.ok_or(StoreError::NotFound)?.into_user()
        })
        .await
    }

    async fn delete(&self, ctx: &CancellationToken, id: Uuid) -> Result<User, StoreError> {
        run_cancellable(ctx, async {
            let row: Option<UserRow> = sqlx::query_as(DELETE_USER)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

            let user = row.ok_or(StoreError::NotFound)?.into_user()?;
            debug!(user_id = %id, "User deleted");
            Ok(user)
        })
        .await
    }

    async fn search(&self, ctx: &CancellationToken, query: &str) -> Result<SearchStream, StoreError> {
        if ctx.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let pattern = like_pattern(query);
        let pool = self.pool.clone();

        Ok(SearchStream::spawn(ctx, self.search_buffer, |sink| async move {
            // Rows come off the connection as they are scanned; dropping
            // `rows` returns the connection to the pool.
            let mut rows = sqlx::query_as::<_, UserRow>(SEARCH_USERS)
                .bind(pattern)
                .fetch(&pool);

            loop {
                let next = tokio::select! {
                    biased;
                    _ = sink.token().cancelled() => {
                        debug!("PostgreSQL search cancelled");
                        return;
                    }
                    next = rows.try_next() => next,
                };

                let row = match next {
                    Ok(Some(row)) => row,
                    Ok(None) => return,
                    Err(e) => {
                        warn!(error = %e, "PostgreSQL search failed");
                        sink.fail(e.into()).await;
                        return;
                    }
                };

                // A corrupt row fails the whole search rather than being skipped
                let user = match row.into_user() {
                    Ok(user) => user,
                    Err(e) => {
                        warn!(error = %e, "PostgreSQL search hit a corrupt row");
                        sink.fail(e).await;
                        return;
                    }
                };

                if !sink.emit(user).await {
                    debug!("PostgreSQL search stopped by consumer");
                    return;
                }
            }
        }))
    }
}
