use crate::utils::time::current_timestamp;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counters for the registry
pub struct Metrics {
    pub users_created: AtomicU64,
    pub users_read: AtomicU64,
    pub users_deleted: AtomicU64,
    pub searches: AtomicU64,
    pub search_results: AtomicU64,
    pub failed_operations: AtomicU64,
    pub start_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub backend: String,
    pub users_created: u64,
    pub users_read: u64,
    pub users_deleted: u64,
    pub searches: u64,
    pub search_results: u64,
    pub failed_operations: u64,
    pub uptime_seconds: i64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            users_created: AtomicU64::new(0),
            users_read: AtomicU64::new(0),
            users_deleted: AtomicU64::new(0),
            searches: AtomicU64::new(0),
            search_results: AtomicU64::new(0),
            failed_operations: AtomicU64::new(0),
            start_time: current_timestamp(),
        }
    }

    pub fn increment_created(&self) {
        self.users_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_read(&self) {
        self.users_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deleted(&self) {
        self.users_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_searches(&self) {
        self.searches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_search_results(&self) {
        self.search_results.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed(&self) {
        self.failed_operations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self, backend: &str) -> MetricsSnapshot {
        MetricsSnapshot {
            backend: backend.to_string(),
            users_created: self.users_created.load(Ordering::Relaxed),
            users_read: self.users_read.load(Ordering::Relaxed),
            users_deleted: self.users_deleted.load(Ordering::Relaxed),
            searches: self.searches.load(Ordering::Relaxed),
            search_results: self.search_results.load(Ordering::Relaxed),
            failed_operations: self.failed_operations.load(Ordering::Relaxed),
            uptime_seconds: current_timestamp() - self.start_time,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
