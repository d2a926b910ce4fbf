// Application state (AppState)

use crate::core::config::Config;
use crate::metrics::collector::Metrics;
use crate::registry::users::UserRegistry;
use crate::core::startup::Backend;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
///
/// Cloned into every request handler. The backend behind `users` is fixed
/// for the life of the process.
#[derive(Clone)]
pub struct AppState {
    pub users: UserRegistry,

    /// Name of the active backend, for logs and metrics
    pub backend: &'static str,

    pub metrics: Arc<Metrics>,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, backend: Backend) -> Self {
        Self {
            users: UserRegistry::new(backend.store),
            backend: backend.kind,
            metrics: Arc::new(Metrics::new()),
            config: Arc::new(config),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.server.request_timeout_secs)
    }
}
