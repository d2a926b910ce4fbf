use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::core::config::Config;
use crate::stores::{mem_store::MemUserStore, pg_store::PgUserStore, user_store::UserStore};

/// The store picked at boot, with the name it is reported under
#[derive(Clone)]
pub struct Backend {
    pub kind: &'static str,
    pub store: Arc<dyn UserStore>,
}

impl Backend {
    pub fn memory(store: MemUserStore) -> Self {
        Self {
            kind: MemUserStore::KIND,
            store: Arc::new(store),
        }
    }

    pub fn postgres(store: PgUserStore) -> Self {
        Self {
            kind: PgUserStore::KIND,
            store: Arc::new(store),
        }
    }
}

/// Pick and construct the backend once, at boot
pub async fn build_store(config: &Config) -> Result<Backend> {
    let buffer = config.search.buffer_size;

    match &config.database.url {
        Some(url) => {
            info!("Using PostgreSQL user store");

            let store = PgUserStore::connect(url, &config.database, buffer)
                .await
                .context("Failed to connect to PostgreSQL")?;

            Ok(Backend::postgres(store))
        }
        None => {
            info!("DATABASE_URL not set, using in-memory user store");
            Ok(Backend::memory(MemUserStore::with_search_buffer(buffer)))
        }
    }
}
